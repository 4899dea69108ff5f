use std::fs;
use std::path::{Path, PathBuf};

use crate::io::atomic_write;
use crate::model::config::AppConfig;

/// Environment variable that overrides `api.host`
pub const HOST_ENV: &str = "SERVEMART_API_HOST";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse servemart.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit servemart.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error(
        "unknown config key '{0}' (expected api.host, api.timeout_secs, images.max_width, \
         images.quality, images.max_parallel, or service_keys.<label>)"
    )]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join("servemart.toml")
}

/// Load the config from `dir`, falling back to defaults when the file is
/// absent, then apply the environment override.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = config_path(dir);
    let mut config = match fs::read_to_string(&path) {
        Ok(text) => toml::from_str(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    if let Ok(host) = std::env::var(HOST_ENV)
        && !host.trim().is_empty()
    {
        config.api.host = host.trim().to_string();
    }
    Ok(config)
}

/// Set one key in the config file, preserving the rest of its formatting.
pub fn set_value(dir: &Path, key: &str, value: &str) -> Result<(), ConfigError> {
    let path = config_path(dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    let mut doc: toml_edit::DocumentMut = text.parse()?;
    apply_value(&mut doc, key, value)?;

    // Reject edits that would leave an unloadable file
    toml::from_str::<AppConfig>(&doc.to_string())?;

    fs::create_dir_all(dir).map_err(|e| ConfigError::WriteError {
        path: dir.to_path_buf(),
        source: e,
    })?;
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

fn apply_value(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let Some((table, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    let item = match (table, field) {
        ("api", "host") | ("service_keys", _) => toml_edit::value(value),
        ("api", "timeout_secs")
        | ("images", "max_width")
        | ("images", "quality")
        | ("images", "max_parallel") => {
            let n: i64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })?;
            toml_edit::value(n)
        }
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    };
    let section = doc
        .entry(table)
        .or_insert(toml_edit::Item::Table(toml_edit::Table::new()));
    match section.as_table_like_mut() {
        Some(section) => {
            section.insert(field, item);
            Ok(())
        }
        // e.g. `api = "x"` at the top level
        None => Err(ConfigError::InvalidValue {
            key: table.to_string(),
            value: section.to_string().trim().to_string(),
        }),
    }
}
