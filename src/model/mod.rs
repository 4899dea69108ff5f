pub mod category;
pub mod config;
pub mod draft;
pub mod schema;
pub mod session;
pub mod value;

pub use config::AppConfig;
pub use draft::{Draft, DraftError};
pub use schema::CategorySchema;
pub use session::{Session, User};
pub use value::FieldValue;
