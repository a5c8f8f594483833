//! Layered settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. an optional settings file (TOML, YAML or JSON, picked by extension),
//! 2. `UPTIME_ARCHIVE_*` environment variables (`UPTIME_ARCHIVE_CHECK_ID`
//!    takes a comma-separated list),
//! 3. command-line flags.
//!
//! ```toml
//! user = "ops@example.com"
//! password = "secret"
//! key = "app-key"
//! check_id = [1234, 5678]
//! output_dir = "archives"
//! ```
//!
//! Validation happens once, up front, before any request is made.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::DEFAULT_ENDPOINT;
use crate::error::ConfigError;
use crate::orchestrator::RunOptions;
use crate::pool::DEFAULT_WORKERS;
use crate::selector::IdSelection;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "UPTIME_ARCHIVE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Unvalidated settings from a single source. Every field is optional so
/// sources can be merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub key: Option<String>,
    pub all: Option<bool>,
    pub check_id: Option<Vec<String>>,
    pub from_id: Option<u64>,
    pub debug: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub probes: Option<bool>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl PartialSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: PartialSettings) -> PartialSettings {
        PartialSettings {
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            key: other.key.or(self.key),
            all: other.all.or(self.all),
            check_id: other.check_id.or(self.check_id),
            from_id: other.from_id.or(self.from_id),
            debug: other.debug.or(self.debug),
            output_dir: other.output_dir.or(self.output_dir),
            workers: other.workers.or(self.workers),
            probes: other.probes.or(self.probes),
            endpoint: other.endpoint.or(self.endpoint),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***REDACTED***")
            .field("key", &"***REDACTED***")
            .finish()
    }
}

/// Validated settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub selection: IdSelection,
    pub from_id: u64,
    pub debug: bool,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub export_probes: bool,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Settings {
    /// Load the file and environment sources, overlay `cli`, and validate.
    pub fn load(file: Option<&Path>, cli: PartialSettings) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let layered: PartialSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("check_id"),
            )
            .build()?
            .try_deserialize()?;

        Self::validate(layered.merge(cli))
    }

    /// Check a merged set of settings.
    pub fn validate(raw: PartialSettings) -> Result<Settings, ConfigError> {
        let credentials = Credentials {
            user: required(raw.user, "user")?,
            password: required(raw.password, "password")?,
            key: required(raw.key, "key")?,
        };

        let all = raw.all.unwrap_or(false);
        let check_ids = raw.check_id.unwrap_or_default();
        let selection = match (all, check_ids.is_empty()) {
            (true, false) => return Err(ConfigError::SelectionConflict),
            (false, true) => return Err(ConfigError::NoSelection),
            (true, true) => IdSelection::All,
            (false, false) => IdSelection::parse_explicit(&check_ids)?,
        };

        Ok(Settings {
            credentials,
            selection,
            from_id: raw.from_id.unwrap_or(0),
            debug: raw.debug.unwrap_or(false),
            output_dir: raw.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            workers: raw.workers.unwrap_or(DEFAULT_WORKERS).max(1),
            export_probes: raw.probes.unwrap_or(false),
            endpoint: raw
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// The orchestrator's view of these settings.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            selection: self.selection.clone(),
            from_id: self.from_id,
            workers: self.workers,
            output_dir: self.output_dir.clone(),
            export_probes: self.export_probes,
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
