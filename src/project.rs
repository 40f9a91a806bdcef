//! Projects and namespace resolution.
//!
//! A project either owns its profiles (`features.profiles = true`) or borrows
//! those of the [`DEFAULT_PROJECT`]. Every profile read and write path calls
//! [`effective_project`] first, inside the same transaction as the profile
//! query that follows, so the flag cannot change between the two reads.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::db::{DEFAULT_PROJECT, Database, PROFILES_FEATURE};
use crate::error::{EntityKind, Error, Result, SqlContext, is_unique_violation};

/// Returns the id of the project with the given name.
pub fn project_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM projects WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("Failed to look up project '{name}'"))?
    .ok_or_else(|| Error::not_found(EntityKind::Project, name))
}

/// Reports whether the project keeps its own profiles.
///
/// Fails with [`Error::NotFound`] when the project does not exist, which is
/// distinct from "exists but profiles disabled".
pub fn project_has_profiles(conn: &Connection, name: &str) -> Result<bool> {
    let id = project_id(conn, name)?;
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM projects_config WHERE project_id = ?1 AND key = ?2",
            params![id, PROFILES_FEATURE],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read {PROFILES_FEATURE} of project '{name}'"))?;

    Ok(value.as_deref() == Some("true"))
}

/// Returns the project whose profiles `requested` should use.
pub fn effective_project(conn: &Connection, requested: &str) -> Result<String> {
    if project_has_profiles(conn, requested)? {
        return Ok(requested.to_string());
    }

    debug!(
        requested,
        effective = DEFAULT_PROJECT,
        "Project has profiles disabled, using default"
    );
    Ok(DEFAULT_PROJECT.to_string())
}

fn write_profiles_flag(conn: &Connection, project_id: i64, enabled: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO projects_config (project_id, key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(project_id, key) DO UPDATE SET value = excluded.value",
        params![project_id, PROFILES_FEATURE, if enabled { "true" } else { "false" }],
    )
    .context("Failed to write project config")?;
    Ok(())
}

impl Database {
    /// Resolves the project whose profiles `requested` should use.
    pub fn effective_project(&self, requested: &str) -> Result<String> {
        self.read(|conn| effective_project(conn, requested))
    }

    /// Lists all project names in lexical order.
    pub fn project_names(&self) -> Result<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM projects ORDER BY name")
                .context("Failed to prepare statement")?;
            let names = stmt
                .query_map([], |row| row.get(0))
                .context("Failed to query projects")?
                .collect::<rusqlite::Result<Vec<String>>>()
                .context("Failed to collect projects")?;
            Ok(names)
        })
    }

    /// Creates a project and returns its ID.
    #[instrument(skip(self))]
    pub fn create_project(
        &mut self,
        name: &str,
        description: &str,
        profiles_enabled: bool,
    ) -> Result<i64> {
        let id = self.write(|conn| {
            conn.execute(
                "INSERT INTO projects (name, description) VALUES (?1, ?2)",
                params![name, description],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::conflict(EntityKind::Project, name)
                } else {
                    Error::Storage {
                        context: "Failed to insert project".to_string(),
                        source: e,
                    }
                }
            })?;
            let id = conn.last_insert_rowid();
            write_profiles_flag(conn, id, profiles_enabled)?;
            Ok(id)
        })?;

        info!(name, id, profiles_enabled, "Project created");
        Ok(id)
    }

    /// Turns per-project profiles on or off.
    ///
    /// The default project cannot opt out: it is the fallback target for
    /// every other project.
    #[instrument(skip(self))]
    pub fn set_project_profiles(&mut self, name: &str, enabled: bool) -> Result<()> {
        if name == DEFAULT_PROJECT && !enabled {
            return Err(Error::InvalidArgument(format!(
                "{PROFILES_FEATURE} cannot be disabled on the {DEFAULT_PROJECT} project"
            )));
        }

        self.write(|conn| {
            let id = project_id(conn, name)?;
            write_profiles_flag(conn, id, enabled)
        })?;

        info!(name, enabled, "Project profiles feature updated");
        Ok(())
    }
}
