/// Configuration management for the feed engine
///
/// Loads configuration from environment variables.
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Persistence backend
    pub store: StoreConfig,
    /// Engine behaviour
    pub engine: EngineConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(anyhow!("unknown store backend '{}'", other)),
        }
    }
}

/// Persistence backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON document used by the file backend
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Redis URL (redis://host:port)
    pub redis_url: Option<String>,
    /// Prefix put in front of every physical key in Redis
    #[serde(default = "default_redis_namespace")]
    pub redis_namespace: String,
}

/// Engine behaviour switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Include the demonstration posts in the merged feed
    #[serde(default = "default_true")]
    pub seed_catalog: bool,
    /// Reject comment deletes by non-authors at the facade
    #[serde(default = "default_true")]
    pub enforce_authorship: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

// Default values
fn default_store_path() -> String {
    "feed-store.json".to_string()
}

fn default_redis_namespace() -> String {
    partition_store::DEFAULT_NAMESPACE.to_string()
}

fn default_log_filter() -> String {
    "info,feed_engine=debug".to_string()
}

fn default_true() -> bool {
    true
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be a boolean, got '{}'", name, other),
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(value) => parse_bool(name, &value),
        Err(_) => Ok(default),
    }
}

impl Default for Config {
    /// In-memory store, demo catalog, authorship enforced
    fn default() -> Self {
        Self {
            app: AppConfig {
                env: "development".to_string(),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                path: default_store_path(),
                redis_url: None,
                redis_namespace: default_redis_namespace(),
            },
            engine: EngineConfig {
                seed_catalog: true,
                enforce_authorship: true,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let backend = match std::env::var("FEED_STORE_BACKEND") {
            Ok(value) => value
                .parse::<StoreBackend>()
                .context("Invalid FEED_STORE_BACKEND")?,
            Err(_) => StoreBackend::Memory,
        };

        let redis_url = std::env::var("FEED_REDIS_URL").ok();
        if backend == StoreBackend::Redis && redis_url.is_none() {
            bail!("FEED_REDIS_URL environment variable not set (required by the redis backend)");
        }

        let store = StoreConfig {
            backend,
            path: std::env::var("FEED_STORE_PATH").unwrap_or_else(|_| default_store_path()),
            redis_url,
            redis_namespace: std::env::var("FEED_REDIS_NAMESPACE")
                .unwrap_or_else(|_| default_redis_namespace()),
        };

        let engine = EngineConfig {
            seed_catalog: env_bool("FEED_SEED_CATALOG", true)?,
            enforce_authorship: env_bool("FEED_ENFORCE_AUTHORSHIP", true)?,
        };

        let logging = LoggingConfig {
            filter: std::env::var("FEED_LOG_FILTER").unwrap_or_else(|_| default_log_filter()),
            json: env_bool("FEED_LOG_JSON", false)?,
        };

        Ok(Config {
            app,
            store,
            engine,
            logging,
        })
    }
}
