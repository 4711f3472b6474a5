use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_DISCOGS_BASE_URL: &str = "https://api.discogs.com";
const DEFAULT_REQUEST_DELAY_MS: u64 = 1200;
const DEFAULT_SELECTION_TIMEOUT_SECS: u64 = 600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Discogs token is not configured (set DISCMATCH_DISCOGS_TOKEN or pass --token)")]
    MissingToken,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Application configuration
/// In debug builds: loads a .env file first, then reads the environment
#[derive(Clone, Debug)]
pub struct Config {
    /// Discogs personal access token
    pub discogs_token: Option<String>,
    /// Discogs API root, overridable for testing against a mock server
    pub discogs_base_url: String,
    /// Pause between catalog-bound jobs to stay under the Discogs rate limit
    pub request_delay: Duration,
    /// How long the worker waits on a disambiguation prompt before cancelling it
    pub selection_timeout: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discogs_token: None,
            discogs_base_url: DEFAULT_DISCOGS_BASE_URL.to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            selection_timeout: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration based on build mode
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                info!("Config: Dev mode activated - loaded .env file");
            }
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup (the environment, in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.discogs_token = lookup("DISCMATCH_DISCOGS_TOKEN").filter(|t| !t.trim().is_empty());

        if let Some(url) = lookup("DISCMATCH_DISCOGS_BASE_URL") {
            config.discogs_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = parse_number(&lookup, "DISCMATCH_REQUEST_DELAY_MS")? {
            config.request_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_number(&lookup, "DISCMATCH_SELECTION_TIMEOUT_SECS")? {
            config.selection_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, "DISCMATCH_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Token or a `MissingToken` error, for operations that need the catalog
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.discogs_token
            .as_deref()
            .ok_or(ConfigError::MissingToken)
    }

    /// Default location for spreadsheet exports
    pub fn default_export_path(&self) -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("discmatch_albums.xlsx")
    }
}

fn parse_number<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
