//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/timeblock/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use timeblock_core::RequestError;
use timeblock_providers::DEFAULT_LOOPBACK_PORT;
use timeblock_providers::FileSecretStore;
use timeblock_providers::google::GoogleConfig;

use crate::error::{ClientError, ClientResult};

/// Default calendar when none is configured.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Default slot length in minutes.
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

/// Default IANA time zone for scheduling.
pub const DEFAULT_TIMEZONE: &str = "America/Bogota";

/// Configuration for the timeblock client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    pub google: GoogleSettings,

    /// Scheduling defaults.
    pub schedule: ScheduleSettings,
}

impl ClientConfig {
    /// Loads configuration from `path`, or the default path when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timeblock")
    }

    /// Checks every setting that can be checked offline.
    pub fn validate(&self) -> ClientResult<()> {
        self.schedule.time_zone()?;
        self.schedule.slot_duration()?;
        if self.schedule.calendar_id.trim().is_empty() {
            return Err(ClientError::Config(
                "schedule.calendar_id must not be empty".to_string(),
            ));
        }
        if self.google.timeout_secs == 0 {
            return Err(ClientError::Config(
                "google.timeout_secs must be at least 1".to_string(),
            ));
        }
        self.google.client()?;
        Ok(())
    }
}

/// Google Calendar provider settings.
///
/// Credentials are optional here: when absent, built-in defaults apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Where the credential store lives.
    pub token_path: Option<PathBuf>,

    /// Loopback port for the OAuth redirect.
    pub loopback_port: u16,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_path: None,
            loopback_port: DEFAULT_LOOPBACK_PORT,
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GoogleSettings {
    /// Resolves the configured client id and secret, expanding secret
    /// references. Absent values stay absent.
    pub fn client(&self) -> ClientResult<(Option<String>, Option<String>)> {
        Ok((
            crate::secret::resolve_optional("client_id", self.client_id.as_deref())?,
            crate::secret::resolve_optional("client_secret", self.client_secret.as_deref())?,
        ))
    }

    /// Converts to provider configuration.
    pub fn to_provider_config(&self) -> GoogleConfig {
        GoogleConfig::new().with_timeout(Duration::from_secs(self.timeout_secs.max(1)))
    }

    /// The credential store path, defaulting to the user data directory.
    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(FileSecretStore::default_path)
    }
}

/// Scheduling defaults applied to every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Calendar receiving the events.
    pub calendar_id: String,

    /// Length of every created event, in minutes.
    pub slot_minutes: i64,

    /// IANA time zone that workday and task times are read in.
    pub timezone: String,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            slot_minutes: DEFAULT_SLOT_MINUTES,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl ScheduleSettings {
    /// Parses the configured time zone.
    pub fn time_zone(&self) -> ClientResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ClientError::Config(format!(
                "schedule.timezone '{}' is not a known IANA time zone",
                self.timezone
            ))
        })
    }

    /// The slot length; must be positive.
    pub fn slot_duration(&self) -> ClientResult<chrono::Duration> {
        if self.slot_minutes <= 0 {
            return Err(RequestError::InvalidSlotDuration(self.slot_minutes).into());
        }
        Ok(chrono::Duration::minutes(self.slot_minutes))
    }
}
