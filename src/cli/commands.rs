use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sm", about = concat!("servemart v", env!("CARGO_PKG_VERSION"), " - list your service on the marketplace"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different workspace directory for drafts and sign-in state
    #[arg(short = 'C', long = "workspace", global = true)]
    pub workspace: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List listing categories
    Categories,
    /// Create, edit and submit listing drafts
    Draft(DraftCmd),
    /// Show published listings for a category
    Browse(BrowseArgs),
    /// Create an account
    Signup(SignupArgs),
    /// Sign in
    Login(LoginArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Show or edit configuration
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Draft args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct DraftCmd {
    #[command(subcommand)]
    pub action: DraftAction,
}

#[derive(Subcommand)]
pub enum DraftAction {
    /// Start a draft with the category's defaults
    New(DraftNewArgs),
    /// List stored drafts
    List,
    /// Print a draft
    Show(CategoryArg),
    /// Set a field (use parent.child for nested fields)
    Set(DraftSetArgs),
    /// Append an item to a list field
    Add(DraftAddArgs),
    /// Remove an item from a list field by index
    Rm(DraftRmArgs),
    /// Append a day/time entry to an availability field
    Slot(DraftSlotArgs),
    /// Resize, compress and attach images
    Images(DraftImagesArgs),
    /// Check required fields
    Check(CategoryArg),
    /// Print the payload that would be submitted
    Payload(CategoryArg),
    /// Validate and submit; the draft is discarded on success
    Submit(CategoryArg),
    /// Throw a draft away
    Discard(CategoryArg),
}

#[derive(Args)]
pub struct CategoryArg {
    /// Category key or label (see `sm categories`)
    pub category: String,
}

#[derive(Args)]
pub struct DraftNewArgs {
    /// Category key or label
    pub category: String,
    /// Replace an existing draft
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct DraftSetArgs {
    /// Category key or label
    pub category: String,
    /// Field path, e.g. name or contactInfo.phone
    pub path: String,
    /// New value
    pub value: String,
}

#[derive(Args)]
pub struct DraftAddArgs {
    /// Category key or label
    pub category: String,
    /// List field
    pub field: String,
    /// Item to append (trimmed; blank is ignored)
    pub value: String,
}

#[derive(Args)]
pub struct DraftRmArgs {
    /// Category key or label
    pub category: String,
    /// List field
    pub field: String,
    /// Zero-based index; out-of-range indices are ignored
    #[arg(allow_negative_numbers = true)]
    pub index: i64,
}

#[derive(Args)]
pub struct DraftSlotArgs {
    /// Category key or label
    pub category: String,
    /// Availability field
    pub field: String,
    /// Day, e.g. Monday
    pub day: String,
    /// Time, e.g. "9:00 - 17:00"
    pub time: String,
}

#[derive(Args)]
pub struct DraftImagesArgs {
    /// Category key or label
    pub category: String,
    /// Image files or directories of images
    #[arg(required = true)]
    pub paths: Vec<String>,
}

// ---------------------------------------------------------------------------
// Browse / auth args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BrowseArgs {
    /// Category label or key, e.g. "Pet Care"
    pub category: String,
}

#[derive(Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    /// Password (read from SERVEMART_PASSWORD when omitted)
    #[arg(long, env = "SERVEMART_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Password (read from SERVEMART_PASSWORD when omitted)
    #[arg(long, env = "SERVEMART_PASSWORD", hide_env_values = true)]
    pub password: String,
}

// ---------------------------------------------------------------------------
// Config args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a config value, e.g. `sm config set api.host http://localhost:5000`
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key: api.host, api.timeout_secs, images.max_width, images.quality,
    /// images.max_parallel, service_keys.<label>
    pub key: String,
    pub value: String,
}
