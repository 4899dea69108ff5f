use std::error::Error;
use std::path::PathBuf;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::api::ApiClient;
use crate::io::config_io::{self, ConfigError};
use crate::io::draft_io::{DraftIoError, Workspace};
use crate::io::session_store::FileStore;
use crate::io::{config_dir, data_dir};
use crate::model::category;
use crate::model::config::{AppConfig, maps_api_key};
use crate::model::schema::CategorySchema;
use crate::model::value::FieldValue;
use crate::ops::auth::{self, LoginRequest, SignupRequest};
use crate::ops::ingest::{FilePicker, ingest};
use crate::ops::payload::schema_payload;
use crate::ops::submit::{SubmitState, submit_draft};
use crate::ops::validate::{ValidationResult, validate_required};

type CmdResult = Result<(), Box<dyn Error>>;

/// Where this invocation reads and writes.
struct Context {
    json: bool,
    workspace_dir: PathBuf,
    config_dir: PathBuf,
}

impl Context {
    fn workspace(&self) -> Result<Workspace, DraftIoError> {
        Workspace::open(&self.workspace_dir)
    }

    fn config(&self) -> Result<AppConfig, ConfigError> {
        config_io::load_config(&self.config_dir)
    }

    fn client(&self) -> Result<ApiClient, Box<dyn Error>> {
        let config = self.config()?;
        debug!(host = %config.api.host, "using backend");
        Ok(ApiClient::from_config(&config.api)?)
    }

    fn store(&self) -> FileStore {
        FileStore::in_dir(&self.workspace_dir)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Context {
        json: cli.json,
        workspace_dir: cli
            .workspace
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(data_dir),
        config_dir: config_dir(),
    };

    match cli.command {
        Commands::Categories => cmd_categories(&ctx),
        Commands::Draft(cmd) => match cmd.action {
            DraftAction::New(args) => cmd_draft_new(&ctx, args),
            DraftAction::List => cmd_draft_list(&ctx),
            DraftAction::Show(args) => cmd_draft_show(&ctx, args),
            DraftAction::Set(args) => cmd_draft_set(&ctx, args),
            DraftAction::Add(args) => cmd_draft_add(&ctx, args),
            DraftAction::Rm(args) => cmd_draft_rm(&ctx, args),
            DraftAction::Slot(args) => cmd_draft_slot(&ctx, args),
            DraftAction::Images(args) => cmd_draft_images(&ctx, args).await,
            DraftAction::Check(args) => cmd_draft_check(&ctx, args),
            DraftAction::Payload(args) => cmd_draft_payload(&ctx, args),
            DraftAction::Submit(args) => cmd_draft_submit(&ctx, args).await,
            DraftAction::Discard(args) => cmd_draft_discard(&ctx, args),
        },
        Commands::Browse(args) => cmd_browse(&ctx, args).await,
        Commands::Signup(args) => cmd_signup(&ctx, args).await,
        Commands::Login(args) => cmd_login(&ctx, args).await,
        Commands::Logout => cmd_logout(&ctx),
        Commands::Whoami => cmd_whoami(&ctx),
        Commands::Config(cmd) => match cmd.action {
            None => cmd_config_show(&ctx),
            Some(ConfigAction::Set(args)) => cmd_config_set(&ctx, args),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_category(name: &str) -> Result<&'static CategorySchema, String> {
    category::find(name)
        .ok_or_else(|| format!("unknown category '{}' (see `sm categories`)", name))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_list_change(
    ctx: &Context,
    field: &str,
    changed: bool,
    length: usize,
    note: &str,
) -> CmdResult {
    if ctx.json {
        return print_json(&ListChangeJson {
            field: field.to_string(),
            changed,
            length,
        });
    }
    println!("{} ({} item{})", note, length, if length == 1 { "" } else { "s" });
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_categories(ctx: &Context) -> CmdResult {
    let keys = ctx.config()?.service_keys();
    if ctx.json {
        let list: Vec<CategoryJson> = category::ALL
            .iter()
            .copied()
            .map(|c| category_to_json(c, keys.key_for(c.label)))
            .collect();
        return print_json(&list);
    }
    let rows: Vec<Vec<String>> = category::ALL
        .iter()
        .map(|c| {
            vec![
                c.key.to_string(),
                c.label.to_string(),
                keys.key_for(c.label),
            ]
        })
        .collect();
    for line in format_table(&rows) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_draft_list(ctx: &Context) -> CmdResult {
    let drafts = ctx.workspace()?.list();
    if ctx.json {
        let list: Vec<DraftSummaryJson> = drafts.iter().map(summary_to_json).collect();
        return print_json(&list);
    }
    if drafts.is_empty() {
        println!("no drafts");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = drafts
        .iter()
        .map(|d| {
            vec![
                d.category.key.to_string(),
                d.category.label.to_string(),
                d.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    for line in format_table(&rows) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_draft_show(ctx: &Context, args: CategoryArg) -> CmdResult {
    let schema = find_category(&args.category)?;
    let draft = ctx.workspace()?.load_existing(schema)?;
    if ctx.json {
        return print_json(&draft_to_json(&draft));
    }
    for line in format_draft_detail(&draft) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_draft_check(ctx: &Context, args: CategoryArg) -> CmdResult {
    let schema = find_category(&args.category)?;
    let draft = ctx.workspace()?.load_existing(schema)?;
    let result = validate_required(&draft);
    if ctx.json {
        return print_json(&result);
    }
    match result {
        ValidationResult::Pass => println!("✓ ready to submit"),
        ValidationResult::Fail { message, .. } => println!("✗ {}", message),
    }
    Ok(())
}

fn cmd_draft_payload(ctx: &Context, args: CategoryArg) -> CmdResult {
    let schema = find_category(&args.category)?;
    let draft = ctx.workspace()?.load_existing(schema)?;
    print_json(&schema_payload(&draft))
}

// ---------------------------------------------------------------------------
// Draft write handlers
// ---------------------------------------------------------------------------

fn cmd_draft_new(ctx: &Context, args: DraftNewArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let draft = ctx.workspace()?.create(schema, args.force)?;
    if ctx.json {
        return print_json(&draft_to_json(&draft));
    }
    println!("started {} draft", schema.label);
    Ok(())
}

fn cmd_draft_set(ctx: &Context, args: DraftSetArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let value = FieldValue::text(args.value);
    ctx.workspace()?
        .update(schema, |d| d.set_field(&args.path, value))?;
    if !ctx.json {
        println!("set {}", args.path);
    }
    Ok(())
}

fn cmd_draft_add(ctx: &Context, args: DraftAddArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let (added, length) = ctx.workspace()?.update(schema, |d| {
        let added = d.add_list_item(&args.field, &args.value)?;
        Ok((added, d.list_len(&args.field)))
    })?;
    let note = if added { "added" } else { "skipped blank item" };
    print_list_change(ctx, &args.field, added, length, note)
}

fn cmd_draft_rm(ctx: &Context, args: DraftRmArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let (removed, length) = ctx.workspace()?.update(schema, |d| {
        let removed = d.remove_list_item(&args.field, args.index)?;
        Ok((removed, d.list_len(&args.field)))
    })?;
    let note = if removed {
        "removed".to_string()
    } else {
        format!("nothing at index {}", args.index)
    };
    print_list_change(ctx, &args.field, removed, length, &note)
}

fn cmd_draft_slot(ctx: &Context, args: DraftSlotArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let (added, length) = ctx.workspace()?.update(schema, |d| {
        let added = d.add_slot(&args.field, &args.day, &args.time)?;
        Ok((added, d.list_len(&args.field)))
    })?;
    let note = if added { "added" } else { "skipped incomplete entry" };
    print_list_change(ctx, &args.field, added, length, note)
}

async fn cmd_draft_images(ctx: &Context, args: DraftImagesArgs) -> CmdResult {
    let schema = find_category(&args.category)?;
    let ws = ctx.workspace()?;
    // Fail before doing any image work when there is no draft
    ws.load_existing(schema)?;

    let pipeline = ctx.config()?.pipeline();
    let picker = FilePicker::new(&args.paths);
    let report = ingest(&picker, pipeline).await?;
    let failed = report.failed_count();
    let failures: Vec<String> = report.failures.iter().map(|e| e.to_string()).collect();

    let accepted = report.accepted.len();
    let Some(added) = ws.update_if_present(schema, |d| d.append_images(report.accepted))? else {
        debug!(category = schema.key, accepted, "draft discarded; dropping images");
        if ctx.json {
            return print_json(&ImagesJson {
                added: 0,
                failed,
                dropped: true,
                failures,
            });
        }
        println!(
            "{} draft was discarded; {} image{} dropped",
            schema.label,
            accepted,
            if accepted == 1 { "" } else { "s" }
        );
        return Ok(());
    };

    if ctx.json {
        return print_json(&ImagesJson {
            added,
            failed,
            dropped: false,
            failures,
        });
    }
    println!("attached {} image{}", added, if added == 1 { "" } else { "s" });
    if failed > 0 {
        println!("{} image{} failed", failed, if failed == 1 { "" } else { "s" });
        for failure in &failures {
            println!("  {}", failure);
        }
    }
    Ok(())
}

async fn cmd_draft_submit(ctx: &Context, args: CategoryArg) -> CmdResult {
    let schema = find_category(&args.category)?;
    let ws = ctx.workspace()?;
    let draft = ws.load_existing(schema)?;

    let state = match validate_required(&draft) {
        // Skip building a client when nothing will be sent
        ValidationResult::Fail { field, message } => SubmitState::Invalid { field, message },
        ValidationResult::Pass => submit_draft(&draft, &ctx.client()?).await,
    };
    if state.is_submitted() {
        ws.discard(schema)?;
    }

    if ctx.json {
        print_json(&state)?;
    } else if let SubmitState::Submitted { message, .. } = &state {
        println!("✓ {}", message);
    }
    match state {
        SubmitState::Submitted { .. } => Ok(()),
        SubmitState::Invalid { message, .. } | SubmitState::Failed { message } => {
            Err(message.into())
        }
    }
}

fn cmd_draft_discard(ctx: &Context, args: CategoryArg) -> CmdResult {
    let schema = find_category(&args.category)?;
    let existed = ctx.workspace()?.discard(schema)?;
    if !ctx.json {
        if existed {
            println!("discarded {} draft", schema.label);
        } else {
            println!("no {} draft", schema.label);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Backend handlers
// ---------------------------------------------------------------------------

async fn cmd_browse(ctx: &Context, args: BrowseArgs) -> CmdResult {
    let label = category::find(&args.category)
        .map(|c| c.label)
        .unwrap_or(args.category.as_str());
    let key = ctx.config()?.service_keys().key_for(label);
    let listings = ctx.client()?.fetch_listings(&key).await?;
    if ctx.json {
        return print_json(&listings);
    }
    if listings.is_empty() {
        println!("no {} listings", label);
    }
    for entity in &listings {
        println!("{}", format_listing(entity));
    }
    Ok(())
}

async fn cmd_signup(ctx: &Context, args: SignupArgs) -> CmdResult {
    let request = SignupRequest {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        password: args.password,
    };
    let mut store = ctx.store();
    let session = auth::signup(&ctx.client()?, &mut store, &request).await?;
    if ctx.json {
        return print_json(&session_to_json(&session));
    }
    println!("welcome, {}", session.user.as_ref().map(|u| u.display_name()).unwrap_or_default());
    Ok(())
}

async fn cmd_login(ctx: &Context, args: LoginArgs) -> CmdResult {
    let request = LoginRequest {
        email: args.email,
        password: args.password,
    };
    let mut store = ctx.store();
    let session = auth::login(&ctx.client()?, &mut store, &request).await?;
    if ctx.json {
        return print_json(&session_to_json(&session));
    }
    println!(
        "signed in as {}",
        session.user.as_ref().map(|u| u.display_name()).unwrap_or_default()
    );
    Ok(())
}

fn cmd_logout(ctx: &Context) -> CmdResult {
    let mut store = ctx.store();
    auth::logout(&mut store)?;
    if !ctx.json {
        println!("signed out");
    }
    Ok(())
}

fn cmd_whoami(ctx: &Context) -> CmdResult {
    let session = auth::hydrate(&ctx.store())?;
    if ctx.json {
        return print_json(&session_to_json(&session));
    }
    match (&session.user, session.is_authenticated()) {
        (Some(user), true) => println!("{} <{}>", user.display_name(), user.email),
        _ => println!("not signed in"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config handlers
// ---------------------------------------------------------------------------

fn cmd_config_show(ctx: &Context) -> CmdResult {
    let config = ctx.config()?;
    let path = config_io::config_path(&ctx.config_dir);
    if ctx.json {
        return print_json(&ConfigJson {
            path: path.display().to_string(),
            host: config.api.host.clone(),
            timeout_secs: config.api.timeout_secs,
            max_width: config.images.max_width,
            quality: config.images.quality,
            max_parallel: config.pipeline().max_parallel,
            maps_api_key: maps_api_key().is_some(),
        });
    }
    let timeout = config
        .api
        .timeout_secs
        .map(|s| format!("{}s", s))
        .unwrap_or_else(|| "none".to_string());
    let rows = vec![
        vec!["config".to_string(), path.display().to_string()],
        vec!["api.host".to_string(), config.api.host.clone()],
        vec!["api.timeout_secs".to_string(), timeout],
        vec!["images.max_width".to_string(), config.images.max_width.to_string()],
        vec!["images.quality".to_string(), config.images.quality.to_string()],
        vec![
            "images.max_parallel".to_string(),
            config.pipeline().max_parallel.to_string(),
        ],
        vec![
            "maps api key".to_string(),
            if maps_api_key().is_some() { "built in" } else { "not set" }.to_string(),
        ],
    ];
    for line in format_table(&rows) {
        println!("{}", line);
    }
    let mut overrides: Vec<_> = config.service_keys.iter().collect();
    overrides.sort();
    for (label, key) in overrides {
        println!("service_keys.{} = {}", label, key);
    }
    Ok(())
}

fn cmd_config_set(ctx: &Context, args: ConfigSetArgs) -> CmdResult {
    config_io::set_value(&ctx.config_dir, &args.key, &args.value)?;
    if !ctx.json {
        println!("{} = {}", args.key, args.value);
    }
    Ok(())
}
