//! Minimal instance registry: the caller side of profile expansion.
//!
//! An instance lives in the project it was created in and lists its profiles
//! in the order they apply. Those profile names are looked up in the
//! instance project's *effective* profile project, so a project without its
//! own profiles attaches profiles of the default project.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::db::{Database, INSTANCE_TABLES, insert_config, insert_devices, load_config, load_devices};
use crate::error::{EntityKind, Error, Result, SqlContext, is_unique_violation};
use crate::profile::{self, ConfigMap, Devices, expand_config, expand_devices};
use crate::project::{effective_project, project_id};

/// Kind of instance record, persisted in `instances.type`.
///
/// Only regular instances count as profile users; snapshots are auxiliary
/// records of their parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    #[default]
    Regular,
    Snapshot,
}

impl InstanceKind {
    /// Value stored in the `type` column.
    pub const fn code(self) -> i64 {
        match self {
            Self::Regular => 0,
            Self::Snapshot => 1,
        }
    }

    /// Parses a stored `type` value.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Regular),
            1 => Some(Self::Snapshot),
            _ => None,
        }
    }
}

/// Input for [`Database::create_instance`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: InstanceKind,
    /// Profile names, in the order they apply.
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Local config, applied over every profile.
    #[serde(default)]
    pub config: ConfigMap,
    /// Local devices, applied over every profile.
    #[serde(default)]
    pub devices: Devices,
}

impl NewInstance {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: InstanceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

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
}

/// A stored instance with its local (unexpanded) config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub id: i64,
    pub project: String,
    pub name: String,
    pub kind: InstanceKind,
    pub profiles: Vec<String>,
    pub config: ConfigMap,
    pub devices: Devices,
}

/// The effective config and devices of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedInstance {
    pub project: String,
    pub name: String,
    pub profiles: Vec<String>,
    pub config: ConfigMap,
    pub devices: Devices,
}

fn find_instance(conn: &Connection, project: &str, name: &str) -> Result<(i64, InstanceKind)> {
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT instances.id, instances.type FROM instances
             JOIN projects ON projects.id = instances.project_id
             WHERE projects.name = ?1 AND instances.name = ?2",
            params![project, name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .with_context(|| format!("Failed to look up instance '{name}'"))?;

    let (id, code) = row.ok_or_else(|| Error::not_found(EntityKind::Instance, name))?;
    let kind = InstanceKind::from_code(code).ok_or_else(|| {
        Error::InvalidArgument(format!("Instance '{name}' has unknown type {code}"))
    })?;
    Ok((id, kind))
}

/// Loads an instance with its profiles in apply order.
pub fn load_instance(conn: &Connection, project: &str, name: &str) -> Result<Instance> {
    let (id, kind) = find_instance(conn, project, name)?;

    let mut stmt = conn
        .prepare_cached(
            "SELECT profiles.name FROM instances_profiles
             JOIN profiles ON profiles.id = instances_profiles.profile_id
             WHERE instances_profiles.instance_id = ?1
             ORDER BY instances_profiles.apply_order",
        )
        .context("Failed to prepare statement")?;
    let profiles = stmt
        .query_map(params![id], |row| row.get(0))
        .context("Failed to query instance profiles")?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("Failed to collect instance profiles")?;

    let config = load_config(conn, &INSTANCE_TABLES, id)
        .with_context(|| format!("Failed to load config of instance '{name}'"))?;
    let devices = load_devices(conn, &INSTANCE_TABLES, id)
        .with_context(|| format!("Failed to load devices of instance '{name}'"))?;

    Ok(Instance {
        id,
        project: project.to_string(),
        name: name.to_string(),
        kind,
        profiles,
        config,
        devices,
    })
}

/// Creates an instance and attaches its profiles in order.
pub fn create_instance(conn: &Connection, project: &str, new: &NewInstance) -> Result<i64> {
    let mut seen = BTreeSet::new();
    if let Some(dup) = new.profiles.iter().find(|p| !seen.insert(p.as_str())) {
        return Err(Error::InvalidArgument(format!(
            "Profile '{dup}' is listed more than once"
        )));
    }

    let project_id = project_id(conn, project)?;
    let profile_project = effective_project(conn, project)?;
    let profile_ids = new
        .profiles
        .iter()
        .map(|name| profile::profile_id(conn, &profile_project, name))
        .collect::<Result<Vec<_>>>()?;

    conn.execute(
        "INSERT INTO instances (project_id, name, type) VALUES (?1, ?2, ?3)",
        params![project_id, new.name, new.kind.code()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(EntityKind::Instance, new.name.clone())
        } else {
            Error::Storage {
                context: format!("Failed to insert instance '{}'", new.name),
                source: e,
            }
        }
    })?;
    let id = conn.last_insert_rowid();

    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO instances_profiles (instance_id, profile_id, apply_order) VALUES (?1, ?2, ?3)",
        )
        .context("Failed to prepare statement")?;
    for (order, profile_id) in (0_i64..).zip(&profile_ids) {
        stmt.execute(params![id, profile_id, order])
            .context("Failed to attach profile")?;
    }

    insert_config(conn, &INSTANCE_TABLES, id, &new.config)
        .context("Failed to write instance config")?;
    insert_devices(conn, &INSTANCE_TABLES, id, &new.devices)
        .context("Failed to write instance devices")?;
    Ok(id)
}

/// Loads an instance and expands it with its profiles.
pub fn expand_instance(conn: &Connection, project: &str, name: &str) -> Result<ExpandedInstance> {
    let instance = load_instance(conn, project, name)?;
    let profile_project = effective_project(conn, project)?;
    let profiles = profile::profiles(conn, &profile_project, &instance.profiles)?;

    Ok(ExpandedInstance {
        config: expand_config(&instance.config, &profiles),
        devices: expand_devices(&instance.devices, &profiles),
        project: instance.project,
        name: instance.name,
        profiles: instance.profiles,
    })
}

impl Database {
    /// Creates an instance in `project`.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_instance(&mut self, project: &str, new: &NewInstance) -> Result<i64> {
        let id = self.write(|conn| create_instance(conn, project, new))?;
        info!(project, name = %new.name, id, profiles = new.profiles.len(), "Instance created");
        Ok(id)
    }

    /// Loads an instance with its local config.
    pub fn instance(&self, project: &str, name: &str) -> Result<Instance> {
        self.read(|conn| load_instance(conn, project, name))
    }

    /// Returns the effective config and devices of an instance.
    #[instrument(skip(self))]
    pub fn expanded_instance(&self, project: &str, name: &str) -> Result<ExpandedInstance> {
        self.read(|conn| expand_instance(conn, project, name))
    }

    /// Lists instance names of a project in lexical order.
    pub fn instance_names(&self, project: &str) -> Result<Vec<String>> {
        self.read(|conn| {
            project_id(conn, project)?;
            let mut stmt = conn
                .prepare(
                    "SELECT instances.name FROM instances
                     JOIN projects ON projects.id = instances.project_id
                     WHERE projects.name = ?1 ORDER BY instances.name",
                )
                .context("Failed to prepare statement")?;
            let names = stmt
                .query_map(params![project], |row| row.get(0))
                .context("Failed to query instances")?
                .collect::<rusqlite::Result<Vec<String>>>()
                .context("Failed to collect instances")?;
            Ok(names)
        })
    }

    /// Deletes an instance, releasing its profile references.
    #[instrument(skip(self))]
    pub fn delete_instance(&mut self, project: &str, name: &str) -> Result<()> {
        self.write(|conn| {
            let (id, _) = find_instance(conn, project, name)?;
            conn.execute("DELETE FROM instances WHERE id = ?1", params![id])
                .context("Failed to delete instance")?;
            Ok(())
        })?;

        info!(project, name, "Instance deleted");
        Ok(())
    }
}
