use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

/// Default long-poll window for the `_changes` feed.
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Runtime configuration describing how to reach the shared game database.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// How long a single `_changes` long-poll is allowed to hang.
    pub poll_timeout: Duration,
}

impl CouchConfig {
    /// Construct a configuration from explicit base URL and database name.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Attach basic-auth credentials to the configuration.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> CouchResult<Self> {
        let base_url =
            std::env::var("QR_HUNT_COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
                var: "QR_HUNT_COUCH_BASE_URL",
            })?;
        let database = std::env::var("QR_HUNT_COUCH_DB").map_err(|_| {
            CouchDaoError::MissingEnvVar {
                var: "QR_HUNT_COUCH_DB",
            }
        })?;

        let mut config = Self::new(base_url, database);

        if let (Some(username), Some(password)) = (
            std::env::var("QR_HUNT_COUCH_USERNAME").ok(),
            std::env::var("QR_HUNT_COUCH_PASSWORD").ok(),
        ) {
            config = config.with_credentials(username, password);
        }

        Ok(config)
    }
}
