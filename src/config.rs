use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Owner recorded on new products
    pub owner: String,
    /// Remote commerce platform credentials
    pub remote: RemoteConfig,
}

/// Remote platform connection settings. All three fields are required
/// before any remote call can be made; `credentials()` enforces that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote REST API, e.g. "https://shop.example.com/wp-json/wc/v3"
    pub api_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

/// Fully resolved remote credentials, only constructible when complete.
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    pub api_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.consumer_key.is_some() && self.consumer_secret.is_some()
    }

    /// Resolves the credentials, failing if any are missing. Callers check
    /// this once at startup so a half-configured remote never surfaces as
    /// a mid-request error.
    pub fn credentials(&self) -> Result<RemoteCredentials, ConfigError> {
        match (&self.api_url, &self.consumer_key, &self.consumer_secret) {
            (Some(api_url), Some(key), Some(secret)) => Ok(RemoteCredentials {
                // Trailing slash would double up when joining paths
                api_url: api_url.trim_end_matches('/').to_string(),
                consumer_key: key.clone(),
                consumer_secret: secret.clone(),
            }),
            _ => Err(ConfigError::RemoteNotConfigured),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            database_path: PathBuf::from(&home).join(".shopsync").join("shopsync.db"),
            owner: "default".to_string(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("SHOPSYNC_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(owner) = std::env::var("SHOPSYNC_OWNER") {
            config.owner = owner;
        }
        if let Ok(api_url) = std::env::var("SHOPSYNC_API_URL") {
            config.remote.api_url = Some(api_url);
        }
        if let Ok(key) = std::env::var("SHOPSYNC_CONSUMER_KEY") {
            config.remote.consumer_key = Some(key);
        }
        if let Ok(secret) = std::env::var("SHOPSYNC_CONSUMER_SECRET") {
            config.remote.consumer_secret = Some(secret);
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/shopsync/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("shopsync")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    /// Remote API credentials missing or incomplete
    RemoteNotConfigured,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::RemoteNotConfigured => {
                write!(
                    f,
                    "Remote API not configured. Set api_url, consumer_key and \
                     consumer_secret under 'remote:' in the config file, or the \
                     SHOPSYNC_API_URL / SHOPSYNC_CONSUMER_KEY / \
                     SHOPSYNC_CONSUMER_SECRET environment variables."
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
