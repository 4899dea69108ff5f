pub mod auth;
pub mod form;
pub mod ingest;
pub mod payload;
pub mod service_key;
pub mod submit;
pub mod validate;
