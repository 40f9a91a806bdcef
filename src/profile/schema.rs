//! Profile data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat key/value configuration bag.
pub type ConfigMap = BTreeMap<String, String>;

/// Device name to device configuration; each device conventionally carries a
/// `type` key.
pub type Devices = BTreeMap<String, ConfigMap>;

/// A stored profile, as returned by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Surrogate ID, stable across renames.
    pub id: i64,
    /// Project the profile lives in (after namespace resolution).
    pub project: String,
    /// Name, unique within the project.
    pub name: String,
    /// Free-form description; empty when unset.
    #[serde(default)]
    pub description: String,
    /// Profile configuration.
    #[serde(default)]
    pub config: ConfigMap,
    /// Profile devices.
    #[serde(default)]
    pub devices: Devices,
    /// URIs of the instances referencing this profile.
    #[serde(default)]
    pub used_by: Vec<String>,
}

impl Profile {
    /// Returns the writable part of the profile.
    #[must_use]
    pub fn spec(&self) -> ProfileSpec {
        ProfileSpec {
            description: self.description.clone(),
            config: self.config.clone(),
            devices: self.devices.clone(),
        }
    }
}

/// Writable profile content: what `create` and `update` take.
///
/// # Example YAML
///
/// ```yaml
/// description: Web tier defaults
/// config:
///   limits.cpu: "2"
/// devices:
///   eth0:
///     type: nic
///     network: lxdbr0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub devices: Devices,
}

impl ProfileSpec {
    /// Create an empty profile spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set one config key.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Add a device, replacing any device of the same name.
    pub fn with_device<I, K, V>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let device = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.devices.insert(name.into(), device);
        self
    }

    /// Returns a copy with every empty value removed, which is exactly what
    /// the store persists.
    #[must_use]
    pub fn canonical(&self) -> Self {
        Self {
            description: self.description.clone(),
            config: without_empty(&self.config),
            devices: self
                .devices
                .iter()
                .map(|(name, config)| (name.clone(), without_empty(config)))
                .collect(),
        }
    }
}

fn without_empty(config: &ConfigMap) -> ConfigMap {
    config
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
