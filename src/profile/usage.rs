//! Reverse lookup of the instances that reference a profile.

use std::collections::BTreeMap;

use rusqlite::{Connection, params};
use tracing::instrument;

use crate::db::{DEFAULT_PROJECT, Database};
use crate::error::{Result, SqlContext};
use crate::instance::InstanceKind;
use crate::project::effective_project;

/// Instance names grouped by the project they live in.
pub type InstanceRefs = BTreeMap<String, Vec<String>>;

/// Lists the regular instances using the profile `name` of `project`.
///
/// `project` must already be the effective profile project. Snapshots are
/// excluded. Returns an empty map when nothing references the profile or the
/// profile does not exist.
pub fn instances_with_profile(conn: &Connection, project: &str, name: &str) -> Result<InstanceRefs> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT instances.name, projects.name FROM instances
             JOIN instances_profiles ON instances.id = instances_profiles.instance_id
             JOIN projects ON projects.id = instances.project_id
             WHERE instances_profiles.profile_id =
               (SELECT profiles.id FROM profiles
                JOIN projects ON projects.id = profiles.project_id
                WHERE profiles.name = ?1 AND projects.name = ?2)
             AND instances.type = ?3
             ORDER BY projects.name, instances.name",
        )
        .context("Failed to prepare usage query")?;

    let rows = stmt
        .query_map(params![name, project, InstanceKind::Regular.code()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .context("Failed to query profile usage")?;

    let mut refs = InstanceRefs::new();
    for row in rows {
        let (instance, instance_project) = row.context("Failed to read usage row")?;
        refs.entry(instance_project).or_default().push(instance);
    }
    Ok(refs)
}

/// Renders instance references as API URIs.
///
/// Instances outside the default project carry a `?project=` suffix.
pub fn used_by_uris(refs: &InstanceRefs) -> Vec<String> {
    refs.iter()
        .flat_map(|(project, names)| {
            names.iter().map(move |name| {
                if project == DEFAULT_PROJECT {
                    format!("/1.0/instances/{name}")
                } else {
                    format!("/1.0/instances/{name}?project={project}")
                }
            })
        })
        .collect()
}

impl Database {
    /// Lists the instances using a profile, resolving `project` first.
    #[instrument(skip(self))]
    pub fn instances_with_profile(&self, project: &str, name: &str) -> Result<InstanceRefs> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            instances_with_profile(conn, &project, name)
        })
    }
}
