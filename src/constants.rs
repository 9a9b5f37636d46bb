use once_cell::sync::Lazy;
use std::path::PathBuf;

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("ALBUMS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("album-client")
        })
});

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| DATA_DIR.join("config.yaml"));
pub static SESSION_PATH: Lazy<PathBuf> = Lazy::new(|| DATA_DIR.join("session.json"));

pub const API_URL_ENV: &str = "ALBUMS_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

// The server accepts 15 uploads per minute.
pub const UPLOAD_DELAY_MS: u64 = 5000;
pub const MAX_UPLOAD_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 5000;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";
