//! Application-level configuration loading: server settings, storage choice
//! and the leaderboards to serve.

use std::{env, fs, io::ErrorKind, path::Path, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/leaderboards.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LEADERBOARDS_CONFIG_PATH";
/// Environment variable that overrides [`ServerConfig::port`].
const PORT_ENV: &str = "PORT";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration.
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Backend used by every leaderboard.
    pub storage: StorageKind,
    /// Valid leaderboard definitions, in file order.
    pub leaderboards: Vec<LeaderboardDefinition>,
}

/// HTTP listener settings of the `server` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port, overridden by `PORT`.
    pub port: u16,
    /// Prefix of the leaderboard routes, without trailing `/`.
    pub base_path: String,
    /// Answer with `Access-Control-Allow-Origin: *`.
    pub cors: bool,
    /// Tokio worker threads; `None` keeps the runtime default.
    pub threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_path: String::new(),
            cors: false,
            threads: None,
        }
    }
}

/// Which backend stores the entries of every leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Plain in-process list.
    #[default]
    Memory,
    /// Cache-first backend without durable store.
    Cache,
    /// Cache-first backend persisted to MongoDB.
    Mongo,
    /// Cache-first backend persisted to CouchDB.
    Couch,
}

/// A leaderboard to register at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct LeaderboardDefinition {
    /// Unique name, used in URLs and as storage collection.
    #[validate(length(min = 1, max = 64), custom(function = "validate_name"))]
    pub name: String,
    /// Field entries are ranked by.
    #[serde(default = "default_score_field")]
    #[validate(custom(function = "validate_field_name"))]
    pub score_field: String,
    /// Field enabling upserts, if any.
    #[serde(default)]
    #[validate(custom(function = "validate_field_name"))]
    pub identity_field: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let mut config = Self::load_from(&resolve_config_path());
        if let Some(port) = env::var(PORT_ENV)
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
        {
            config.server.port = port;
        }
        config
    }

    /// Load the configuration file at `path` without consulting the environment.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        storage = ?config.storage,
                        count = config.leaderboards.len(),
                        "loaded leaderboard config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    server: ServerConfig,
    storage: StorageKind,
    leaderboards: Vec<LeaderboardDefinition>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let mut server = raw.server;
        server.base_path = server.base_path.trim_end_matches('/').to_owned();
        server.threads = server.threads.filter(|threads| *threads > 0);

        let leaderboards = raw
            .leaderboards
            .into_iter()
            .filter(|definition| match definition.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(name = %definition.name, error = %err, "skipping invalid leaderboard");
                    false
                }
            })
            .collect();

        Self {
            server,
            storage: raw.storage,
            leaderboards,
        }
    }
}

fn default_score_field() -> String {
    crate::leaderboard::DEFAULT_SCORE_FIELD.to_owned()
}

/// Leaderboard names end up in URL paths and collection names.
fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Ok(());
    }

    let mut err = ValidationError::new("leaderboard_name_format");
    err.message = Some("name may only contain ASCII letters, digits, `_` and `-`".into());
    Err(err)
}

/// Field names must be usable as document keys by every durable store.
fn validate_field_name(field: &str) -> Result<(), ValidationError> {
    if field.is_empty() {
        let mut err = ValidationError::new("field_name_empty");
        err.message = Some("field name must not be empty".into());
        return Err(err);
    }

    if field.starts_with('$') || field.starts_with('_') || field.contains('.') {
        let mut err = ValidationError::new("field_name_format");
        err.message = Some(format!("field name `{field}` is reserved by the storage layer").into());
        return Err(err);
    }

    Ok(())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
