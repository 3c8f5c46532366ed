//! Configuration for zotsync.
//!
//! Every field has a default, so the daemon runs with no config file at all;
//! only the two Zotero credentials are mandatory and they always come from the
//! process environment (`ZOTERO_USERID`, `ZOTERO_APIKEY` unless renamed).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level zotsync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Zotero web API settings.
    #[serde(default)]
    pub zotero: ZoteroConfig,

    /// reMarkable tablet settings.
    #[serde(default)]
    pub tablet: TabletConfig,

    /// Pass scheduling.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Daemon process settings.
    #[serde(default)]
    pub daemon: DaemonSection,
}

// ---------------------------------------------------------------------------
// Zotero
// ---------------------------------------------------------------------------

/// Zotero web API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroConfig {
    /// API base URL (default `https://api.zotero.org`).
    #[serde(default = "default_zotero_api_url")]
    pub api_url: String,

    /// Environment variable holding the Zotero user ID.
    #[serde(default = "default_user_id_env")]
    pub user_id_env: String,

    /// Environment variable holding the Zotero API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Resolved user ID (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub user_id: Option<String>,

    /// Resolved API key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            api_url: default_zotero_api_url(),
            user_id_env: default_user_id_env(),
            api_key_env: default_api_key_env(),
            user_id: None,
            api_key: None,
        }
    }
}

impl ZoteroConfig {
    /// The resolved credentials, or an error naming the missing variable.
    pub fn credentials(&self) -> Result<ZoteroCredentials, ConfigError> {
        let user_id = self.user_id.clone().ok_or_else(|| ConfigError::EnvVarMissing {
            var: self.user_id_env.clone(),
            field: "zotero.user_id_env".into(),
        })?;
        let api_key = self.api_key.clone().ok_or_else(|| ConfigError::EnvVarMissing {
            var: self.api_key_env.clone(),
            field: "zotero.api_key_env".into(),
        })?;
        Ok(ZoteroCredentials { user_id, api_key })
    }
}

fn default_zotero_api_url() -> String {
    "https://api.zotero.org".into()
}

fn default_user_id_env() -> String {
    "ZOTERO_USERID".into()
}

fn default_api_key_env() -> String {
    "ZOTERO_APIKEY".into()
}

/// Credentials for the Zotero web API.
#[derive(Clone, PartialEq, Eq)]
pub struct ZoteroCredentials {
    pub user_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ZoteroCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoteroCredentials")
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tablet
// ---------------------------------------------------------------------------

/// reMarkable tablet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabletConfig {
    /// Root of the xochitl document store.
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// USB web interface upload endpoint.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
}

impl Default for TabletConfig {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            upload_url: default_upload_url(),
        }
    }
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("/home/root/.local/share/remarkable/xochitl/")
}

fn default_upload_url() -> String {
    "http://10.11.99.1/upload".into()
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// When passes run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minimum seconds between the start of the last successful pass and the
    /// next one (default 600).
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Seconds between scheduler ticks (default 60). A failed pass is retried
    /// on the next tick.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ScheduleConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_sync_interval() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default 10). There is no per-pass
    /// deadline.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the shared HTTP client with the configured timeout.
    pub fn build_client(&self) -> Result<reqwest::Client, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout())
            .user_agent(concat!("zotsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

fn default_request_timeout() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load a [`SyncConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the Zotero credentials from the environment. Both are required.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving Zotero credentials from environment");

        self.zotero.user_id = Some(resolve_required_env(
            &self.zotero.user_id_env,
            "zotero.user_id_env",
        )?);
        self.zotero.api_key = Some(resolve_required_env(
            &self.zotero.api_key_env,
            "zotero.api_key_env",
        )?);

        debug!("credential resolution complete");
        Ok(())
    }

    /// Validate that all values are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zotero.api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "zotero.api_url".into(),
                detail: "Zotero API URL must not be empty".into(),
            });
        }
        if self.tablet.upload_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tablet.upload_url".into(),
                detail: "tablet upload URL must not be empty".into(),
            });
        }
        if self.tablet.library_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tablet.library_dir".into(),
                detail: "library directory must not be empty".into(),
            });
        }
        if self.schedule.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.sync_interval_secs".into(),
                detail: "sync interval must be > 0".into(),
            });
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.poll_interval_secs".into(),
                detail: "poll interval must be > 0".into(),
            });
        }
        if self.schedule.poll_interval_secs > self.schedule.sync_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "schedule.poll_interval_secs".into(),
                detail: "poll interval must not exceed the sync interval".into(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.request_timeout_secs".into(),
                detail: "request timeout must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load (or default), resolve, and validate in one call.
    pub fn load_and_resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                info!("no configuration file, using defaults");
                Self::default()
            }
        };
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# zotsync configuration
# Credentials are never stored here; they are read from the environment.

[zotero]
api_url = "https://api.zotero.org"
user_id_env = "ZOTERO_USERID"
api_key_env = "ZOTERO_APIKEY"

[tablet]
library_dir = "/home/root/.local/share/remarkable/xochitl/"
upload_url = "http://10.11.99.1/upload"

[schedule]
sync_interval_secs = 600
poll_interval_secs = 60

[http]
request_timeout_secs = 10

[daemon]
log_level = "info"
"#
    }
}

/// Read an environment variable that must be present and non-empty.
fn resolve_required_env(env_name: &str, field: &str) -> Result<String, ConfigError> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Ok(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            Err(ConfigError::EnvVarMissing {
                var: env_name.into(),
                field: field.into(),
            })
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            Err(ConfigError::EnvVarMissing {
                var: env_name.into(),
                field: field.into(),
            })
        }
    }
}
