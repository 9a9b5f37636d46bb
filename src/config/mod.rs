use crate::constants::{
    API_URL_ENV, DEFAULT_API_URL, DEFAULT_PAGE_LIMIT, MAX_UPLOAD_RETRIES, RETRY_BASE_DELAY_MS,
    UPLOAD_DELAY_MS,
};
use crate::models::SortOrder;
use crate::upload::UploadPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("album-client/{}", crate::VERSION)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Base URL with exactly one trailing `/api` segment.
    pub fn api_root(&self) -> String {
        normalize_base_url(&self.base_url)
    }
}

pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with("/api") {
        return url.to_string();
    }
    if let Some(stripped) = url.strip_suffix("/api/") {
        return format!("{}/api", stripped);
    }
    format!("{}/api", url.trim_end_matches('/'))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    UPLOAD_DELAY_MS
}

fn default_max_retries() -> u32 {
    MAX_UPLOAD_RETRIES
}

fn default_retry_base_delay_ms() -> u64 {
    RETRY_BASE_DELAY_MS
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl UploadConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            pacing: Duration::from_millis(self.delay_ms),
            max_retries: self.max_retries,
            retry_base: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_limit")]
    pub limit: u32,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            limit: default_page_limit(),
            order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Config {
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self
    }
}

pub fn load_config(config_path: &Path) -> Config {
    read_config_file(config_path).apply_env_overrides()
}

fn read_config_file(config_path: &Path) -> Config {
    if !config_path.exists() {
        return Config::default();
    }

    match fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid config {:?}: {}", config_path, e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_default_config(config_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    fs::write(config_path, yaml)
}
