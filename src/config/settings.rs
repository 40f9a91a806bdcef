//! Application settings loaded from TOML.
//!
//! ```toml
//! database = "~/.local/share/profiled/profiles.db"
//! busy_timeout_ms = 5000
//! prune_on_open = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::default_db_path;
use crate::error::{Error, Result};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Settings for the `profiled` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Database path; the platform data directory is used when unset.
    pub database: Option<PathBuf>,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u64,
    /// Remove orphaned profile rows every time the database is opened.
    pub prune_on_open: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            prune_on_open: false,
        }
    }
}

impl Settings {
    /// Loads settings.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// read if present and defaults are used otherwise.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_settings_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(Error::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let settings = Self::parse(&text)?;
        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Parses settings from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigParse(format!("Invalid settings: {e}")))
    }

    /// Database path to open: `override_path`, then `database`, then the
    /// platform default.
    pub fn database_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        match override_path.or(self.database.as_deref()) {
            Some(path) => expand_home(path),
            None => default_db_path(),
        }
    }

    /// Busy timeout as a [`Duration`].
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Default settings file: `<config dir>/profiled/config.toml`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("profiled").join("config.toml"))
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if text == "~" || text.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::InvalidArgument("Could not determine home directory".to_string())
        })?;
        let rest = text.strip_prefix("~/").unwrap_or("");
        return Ok(if rest.is_empty() { home } else { home.join(rest) });
    }
    Ok(path.to_path_buf())
}
