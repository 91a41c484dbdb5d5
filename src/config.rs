//! Application-level configuration loading for the sync client.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

#[cfg(feature = "couch-store")]
use crate::dao::game_store::couchdb::CouchConfig;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QR_HUNT_CONFIG_PATH";

const DEFAULT_REMOTE_BASE_URL: &str = "http://localhost:5984";
const DEFAULT_REMOTE_DATABASE: &str = "qr-hunt";
const DEFAULT_CACHE_DIR: &str = "data/cache";
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Immutable runtime configuration shared across the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the shared game database.
    pub remote_base_url: String,
    /// Database holding the single game document.
    pub remote_database: String,
    /// Optional basic-auth credentials for the remote store.
    pub remote_username: Option<String>,
    pub remote_password: Option<String>,
    /// Long-poll window for the snapshot subscription.
    pub poll_timeout: Duration,
    /// Directory holding the on-device cache files.
    pub cache_dir: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    ///
    /// Loading never fails: a missing file means defaults, an unreadable or
    /// unparsable file is logged and ignored.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        remote = %config.remote_base_url,
                        "loaded client configuration"
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

    /// Remote store configuration derived from this client configuration.
    #[cfg(feature = "couch-store")]
    pub fn couch_config(&self) -> CouchConfig {
        let mut config = CouchConfig::new(
            self.remote_base_url.clone(),
            self.remote_database.clone(),
        );
        config.poll_timeout = self.poll_timeout;
        if let (Some(username), Some(password)) = (&self.remote_username, &self.remote_password) {
            config = config.with_credentials(username.clone(), password.clone());
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_base_url: DEFAULT_REMOTE_BASE_URL.into(),
            remote_database: DEFAULT_REMOTE_DATABASE.into(),
            remote_username: None,
            remote_password: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    remote: Option<RawRemote>,
    cache_dir: Option<PathBuf>,
}

/// JSON representation of the `remote` section.
#[derive(Debug, Deserialize)]
struct RawRemote {
    base_url: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    poll_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let remote = value.remote.unwrap_or(RawRemote {
            base_url: None,
            database: None,
            username: None,
            password: None,
            poll_timeout_secs: None,
        });

        Self {
            remote_base_url: remote.base_url.unwrap_or(defaults.remote_base_url),
            remote_database: remote.database.unwrap_or(defaults.remote_database),
            remote_username: remote.username,
            remote_password: remote.password,
            poll_timeout: remote
                .poll_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_timeout),
            cache_dir: value.cache_dir.unwrap_or(defaults.cache_dir),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
