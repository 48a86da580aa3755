//! Client configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) is valid:
//!
//! ```toml
//! token = "4632b104-88ff-11ed-8c47-0242ac110002"
//! history_path = "/home/me/chat_history.txt"
//! keepalive_secs = 5
//! silence_timeout_secs = 10
//! reconnect_delay_secs = 1
//!
//! [read]
//! host = "minechat.example.org"
//! port = 5000
//!
//! [write]
//! host = "minechat.example.org"
//! port = 5050
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use minechat_core::ConnectionRole;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::{ClientError, Result};
use crate::watchdog::WatchdogConfig;

/// Default port of the read-only feed.
pub const DEFAULT_READ_PORT: u16 = 5000;

/// Default port of the write connection.
pub const DEFAULT_WRITE_PORT: u16 = 5050;

/// Interval of silence after which a keepalive is sent.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);

/// Silence after which the cohort is declared dead.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between a failed cohort and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

const APP_DIR: &str = "minechat";

// ============================================================================
// Endpoint
// ============================================================================

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address string accepted by `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Client Config
// ============================================================================

/// Configuration for the chat engine.
///
/// # Example
///
/// ```rust
/// use minechat_client::config::{ClientConfig, Endpoint};
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     read: Endpoint::new("chat.example.org", 5000),
///     reconnect_delay: Duration::from_millis(500),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Read-only live feed.
    pub read: Endpoint,

    /// Authenticated write connection.
    pub write: Endpoint,

    /// Append-only session log.
    pub history_path: PathBuf,

    /// Newline-delimited JSON credential store.
    pub credentials_path: PathBuf,

    /// Account token; takes precedence over a credential-store lookup.
    pub token: Option<String>,

    /// Nickname to look up in the credential store when no token is set.
    pub nickname: Option<String>,

    /// Silence before a keepalive ping is queued.
    #[serde(rename = "keepalive_secs", deserialize_with = "deserialize_secs")]
    pub keepalive_interval: Duration,

    /// Silence before the cohort is torn down.
    #[serde(rename = "silence_timeout_secs", deserialize_with = "deserialize_secs")]
    pub silence_timeout: Duration,

    /// Fixed backoff between cohort attempts.
    #[serde(rename = "reconnect_delay_secs", deserialize_with = "deserialize_secs")]
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read: Endpoint::new("127.0.0.1", DEFAULT_READ_PORT),
            write: Endpoint::new("127.0.0.1", DEFAULT_WRITE_PORT),
            history_path: data_dir().join("chat_history.txt"),
            credentials_path: data_dir().join("credentials.jsonl"),
            token: None,
            nickname: None,
            keepalive_interval: DEFAULT_KEEPALIVE,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ClientError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source, path)
    }

    /// Loads `path` if given, else the default config file if it exists,
    /// else the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let invalid = |reason: String| ClientError::Config {
            path: origin.to_path_buf(),
            reason,
        };

        for (role, endpoint) in [
            (ConnectionRole::Read, &self.read),
            (ConnectionRole::Write, &self.write),
        ] {
            if endpoint.host.trim().is_empty() {
                return Err(invalid(format!("{role} host must not be empty")));
            }
            if endpoint.port == 0 {
                return Err(invalid(format!("{role} port must not be 0")));
            }
        }

        if self.keepalive_interval.is_zero() {
            return Err(invalid("keepalive_secs must be positive".to_string()));
        }
        if self.silence_timeout <= self.keepalive_interval {
            return Err(invalid(format!(
                "silence_timeout_secs ({:?}) must exceed keepalive_secs ({:?})",
                self.silence_timeout, self.keepalive_interval
            )));
        }
        Ok(())
    }

    /// Endpoint serving the given role.
    pub fn endpoint(&self, role: ConnectionRole) -> &Endpoint {
        match role {
            ConnectionRole::Read => &self.read,
            ConnectionRole::Write => &self.write,
        }
    }

    /// Watchdog timing derived from this config.
    pub fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            keepalive_interval: self.keepalive_interval,
            silence_timeout: self.silence_timeout,
        }
    }
}

/// Directory for history and credentials.
///
/// Respects the platform data directory (`$XDG_DATA_HOME` on Linux),
/// falling back to the working directory.
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<config_dir>/minechat/config.toml`, if a config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
}

// ============================================================================
// Tests
// ============================================================================
