use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ops::ingest::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, ImagePipeline, default_parallelism};
use crate::ops::service_key::ServiceKeys;

/// Configuration from servemart.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub images: ImageConfig,
    /// Category label → backend service key, layered over the built-ins
    #[serde(default)]
    pub service_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Client-side request timeout. Absent means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: default_host(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Images decoded at once. Absent means one per core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            max_parallel: None,
        }
    }
}

fn default_host() -> String {
    "https://api.servemart.lk".to_string()
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

impl AppConfig {
    pub fn pipeline(&self) -> ImagePipeline {
        ImagePipeline {
            max_width: self.images.max_width,
            quality: self.images.quality,
            max_parallel: self.images.max_parallel.unwrap_or_else(default_parallelism),
        }
    }

    pub fn service_keys(&self) -> ServiceKeys {
        ServiceKeys::with_overrides(&self.service_keys)
    }
}

/// Maps-provider key, baked in at build time.
pub fn maps_api_key() -> Option<&'static str> {
    option_env!("SERVEMART_MAPS_API_KEY").filter(|k| !k.is_empty())
}
