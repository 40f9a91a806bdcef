//! Declarative profile and instance definition files.
//!
//! Definitions can be written in YAML, TOML or JSON; the format is chosen by
//! file extension.
//!
//! # Example YAML
//!
//! ```yaml
//! description: Web tier
//! config:
//!   limits.cpu: "2"
//! devices:
//!   eth0:
//!     type: nic
//!     network: lxdbr0
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};

/// Definition file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
    /// JSON format (.json).
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting definition format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Parses a definition from text in the given format.
pub fn parse_definition<T: DeserializeOwned>(text: &str, format: ConfigFormat) -> Result<T> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| Error::ConfigParse(format!("Invalid YAML: {e}"))),
        ConfigFormat::Toml => {
            toml::from_str(text).map_err(|e| Error::ConfigParse(format!("Invalid TOML: {e}")))
        }
        ConfigFormat::Json => serde_json::from_str(text)
            .map_err(|e| Error::ConfigParse(format!("Invalid JSON: {e}"))),
    }
}

/// Loads a definition file, detecting the format from its extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_definition<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        Error::ConfigParse(format!(
            "Unsupported definition file '{}': expected .yaml, .yml, .toml or .json",
            path.display()
        ))
    })?;

    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let text = std::fs::read_to_string(path)?;
    let value = parse_definition(&text, format)?;
    debug!(format = format.extension(), "Definition loaded");
    Ok(value)
}
