//! Profile persistence: CRUD scoped by (project, name).
//!
//! The free functions run against any connection or transaction and take the
//! *effective* project, i.e. the result of [`effective_project`]. The
//! [`Database`] methods resolve the project themselves and wrap each call in
//! a single transaction.
//!
//! Names are always listed in lexical order (`ORDER BY profiles.name`);
//! callers paginating over [`profile_names`] can rely on it.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument, trace};

use super::schema::{ConfigMap, Devices, Profile, ProfileSpec};
use super::usage::{instances_with_profile, used_by_uris};
use crate::db::{Database, PROFILE_TABLES, insert_config, insert_devices, load_config, load_devices};
use crate::error::{
    EntityKind, Error, Result, SqlContext, is_foreign_key_violation, is_unique_violation,
};
use crate::project::{effective_project, project_id};

/// Returns the names of all profiles in the project.
pub fn profile_names(conn: &Connection, project: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT profiles.name FROM profiles
             JOIN projects ON projects.id = profiles.project_id
             WHERE projects.name = ?1
             ORDER BY profiles.name",
        )
        .context("Failed to prepare statement")?;

    let names = stmt
        .query_map(params![project], |row| row.get(0))
        .context("Failed to query profile names")?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("Failed to collect profile names")?;
    Ok(names)
}

fn find_profile(conn: &Connection, project: &str, name: &str) -> Result<Option<(i64, String)>> {
    conn.query_row(
        "SELECT profiles.id, COALESCE(profiles.description, '') FROM profiles
         JOIN projects ON projects.id = profiles.project_id
         WHERE projects.name = ?1 AND profiles.name = ?2",
        params![project, name],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .with_context(|| format!("Failed to look up profile '{name}'"))
}

/// Returns the ID of a profile.
pub fn profile_id(conn: &Connection, project: &str, name: &str) -> Result<i64> {
    find_profile(conn, project, name)?
        .map(|(id, _)| id)
        .ok_or_else(|| Error::not_found(EntityKind::Profile, name))
}

/// Reports whether a profile exists.
pub fn profile_exists(conn: &Connection, project: &str, name: &str) -> Result<bool> {
    Ok(find_profile(conn, project, name)?.is_some())
}

/// Loads a profile, including the instances that use it.
pub fn profile(conn: &Connection, project: &str, name: &str) -> Result<Profile> {
    let (id, description) = find_profile(conn, project, name)?
        .ok_or_else(|| Error::not_found(EntityKind::Profile, name))?;

    let config = load_config(conn, &PROFILE_TABLES, id)
        .with_context(|| format!("Failed to load config of profile '{name}'"))?;
    let devices = load_devices(conn, &PROFILE_TABLES, id)
        .with_context(|| format!("Failed to load devices of profile '{name}'"))?;
    let used_by = used_by_uris(&instances_with_profile(conn, project, name)?);

    trace!(project, name, id, "Profile loaded");
    Ok(Profile {
        id,
        project: project.to_string(),
        name: name.to_string(),
        description,
        config,
        devices,
        used_by,
    })
}

/// Loads several profiles, in the order given.
///
/// Fails on the first missing name; there is no partial result.
pub fn profiles<S: AsRef<str>>(conn: &Connection, project: &str, names: &[S]) -> Result<Vec<Profile>> {
    names
        .iter()
        .map(|name| profile(conn, project, name.as_ref()))
        .collect()
}

/// Creates a profile with its config and devices, returning its ID.
///
/// Empty values are skipped. A duplicate (project, name) is reported by the
/// unique index, so concurrent creators see exactly one success.
pub fn create_profile(conn: &Connection, project: &str, name: &str, spec: &ProfileSpec) -> Result<i64> {
    let project_id = project_id(conn, project)?;

    conn.execute(
        "INSERT INTO profiles (project_id, name, description) VALUES (?1, ?2, ?3)",
        params![project_id, name, spec.description],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(EntityKind::Profile, name)
        } else {
            Error::Storage {
                context: format!("Failed to insert profile '{name}'"),
                source: e,
            }
        }
    })?;
    let id = conn.last_insert_rowid();

    write_profile_config(conn, id, &spec.config, &spec.devices)?;
    Ok(id)
}

fn write_profile_config(conn: &Connection, id: i64, config: &ConfigMap, devices: &Devices) -> Result<()> {
    insert_config(conn, &PROFILE_TABLES, id, config)
        .with_context(|| format!("Failed to write config of profile {id}"))?;
    insert_devices(conn, &PROFILE_TABLES, id, devices)
        .with_context(|| format!("Failed to write devices of profile {id}"))?;
    Ok(())
}

/// Renames a profile, keeping its ID and every dependent row.
pub fn rename_profile(conn: &Connection, project: &str, name: &str, new_name: &str) -> Result<()> {
    let id = profile_id(conn, project, name)?;

    conn.execute(
        "UPDATE profiles SET name = ?1 WHERE id = ?2",
        params![new_name, id],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(EntityKind::Profile, new_name)
        } else {
            Error::Storage {
                context: format!("Failed to rename profile '{name}'"),
                source: e,
            }
        }
    })?;
    Ok(())
}

fn profile_name(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row(
        "SELECT name FROM profiles WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("Failed to look up profile {id}"))?
    .ok_or_else(|| Error::not_found(EntityKind::Profile, format!("#{id}")))
}

/// Sets the description of the profile with the given ID.
pub fn update_profile_description(conn: &Connection, id: i64, description: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE profiles SET description = ?1 WHERE id = ?2",
            params![description, id],
        )
        .context("Failed to update profile description")?;

    if updated == 0 {
        return Err(Error::not_found(EntityKind::Profile, format!("#{id}")));
    }
    Ok(())
}

/// Deletes every config, device and device config row of a profile, leaves
/// first.
pub fn clear_profile_config(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM profiles_devices_config WHERE profile_device_id IN
           (SELECT id FROM profiles_devices WHERE profile_id = ?1)",
        params![id],
    )
    .context("Failed to clear profile device config")?;
    conn.execute(
        "DELETE FROM profiles_devices WHERE profile_id = ?1",
        params![id],
    )
    .context("Failed to clear profile devices")?;
    conn.execute(
        "DELETE FROM profiles_config WHERE profile_id = ?1",
        params![id],
    )
    .context("Failed to clear profile config")?;
    Ok(())
}

/// Replaces the whole config and device set of a profile.
///
/// There is no incremental patch: to change one key, read the profile,
/// change the map in memory and replace it.
pub fn replace_profile_config(conn: &Connection, id: i64, config: &ConfigMap, devices: &Devices) -> Result<()> {
    profile_name(conn, id)?;
    clear_profile_config(conn, id)?;
    write_profile_config(conn, id, config, devices)
}

/// Deletes a profile and all its rows.
///
/// Fails with [`Error::InUse`] while instances still reference it; the
/// caller's transaction then rolls back the rows already removed.
pub fn delete_profile(conn: &Connection, id: i64) -> Result<()> {
    let name = profile_name(conn, id)?;
    clear_profile_config(conn, id)?;

    match conn.execute("DELETE FROM profiles WHERE id = ?1", params![id]) {
        Ok(_) => Ok(()),
        Err(e) if is_foreign_key_violation(&e) => {
            let references: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM instances_profiles WHERE profile_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .context("Failed to count profile references")?;
            Err(Error::InUse {
                name,
                references: usize::try_from(references).unwrap_or_default(),
            })
        }
        Err(e) => Err(Error::Storage {
            context: format!("Failed to delete profile '{name}'"),
            source: e,
        }),
    }
}

impl Database {
    /// Returns the names of all profiles visible from `project`.
    #[instrument(skip(self))]
    pub fn profile_names(&self, project: &str) -> Result<Vec<String>> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            profile_names(conn, &project)
        })
    }

    /// Loads one profile visible from `project`.
    #[instrument(skip(self))]
    pub fn profile(&self, project: &str, name: &str) -> Result<Profile> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            profile(conn, &project, name)
        })
    }

    /// Resolves a profile name visible from `project` to its ID.
    #[instrument(skip(self))]
    pub fn profile_id(&self, project: &str, name: &str) -> Result<i64> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            profile_id(conn, &project, name)
        })
    }

    /// Reports whether a profile name is visible from `project`.
    #[instrument(skip(self))]
    pub fn profile_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            profile_exists(conn, &project, name)
        })
    }

    /// Loads several profiles visible from `project`, in the order given.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub fn profiles<S: AsRef<str>>(&self, project: &str, names: &[S]) -> Result<Vec<Profile>> {
        self.read(|conn| {
            let project = effective_project(conn, project)?;
            profiles(conn, &project, names)
        })
    }

    /// Creates a profile and returns its ID.
    #[instrument(skip(self, spec))]
    pub fn create_profile(&mut self, project: &str, name: &str, spec: &ProfileSpec) -> Result<i64> {
        let (project, id) = self.write(|conn| {
            let project = effective_project(conn, project)?;
            let id = create_profile(conn, &project, name, spec)?;
            Ok((project, id))
        })?;

        info!(project = %project, name, id, "Profile created");
        Ok(id)
    }

    /// Renames a profile.
    #[instrument(skip(self))]
    pub fn rename_profile(&mut self, project: &str, name: &str, new_name: &str) -> Result<()> {
        self.write(|conn| {
            let project = effective_project(conn, project)?;
            rename_profile(conn, &project, name, new_name)
        })?;

        info!(name, new_name, "Profile renamed");
        Ok(())
    }

    /// Sets the description of the profile with the given ID.
    #[instrument(skip(self, description))]
    pub fn update_profile_description(&mut self, id: i64, description: &str) -> Result<()> {
        self.write(|conn| update_profile_description(conn, id, description))?;
        debug!(id, "Profile description updated");
        Ok(())
    }

    /// Replaces the config and devices of the profile with the given ID.
    #[instrument(skip(self, config, devices))]
    pub fn replace_profile_config(&mut self, id: i64, config: &ConfigMap, devices: &Devices) -> Result<()> {
        self.write(|conn| replace_profile_config(conn, id, config, devices))?;
        info!(id, config = config.len(), devices = devices.len(), "Profile config replaced");
        Ok(())
    }

    /// Replaces description, config and devices of a profile in one
    /// transaction.
    #[instrument(skip(self, spec))]
    pub fn update_profile(&mut self, project: &str, name: &str, spec: &ProfileSpec) -> Result<()> {
        self.write(|conn| {
            let project = effective_project(conn, project)?;
            let id = profile_id(conn, &project, name)?;
            update_profile_description(conn, id, &spec.description)?;
            replace_profile_config(conn, id, &spec.config, &spec.devices)
        })?;

        info!(name, "Profile updated");
        Ok(())
    }

    /// Reads a profile, lets `edit` change it and writes the result back, all
    /// in one transaction.
    pub fn edit_profile<F>(&mut self, project: &str, name: &str, edit: F) -> Result<Profile>
    where
        F: FnOnce(&mut ProfileSpec),
    {
        self.write(|conn| {
            let project = effective_project(conn, project)?;
            let current = profile(conn, &project, name)?;

            let mut spec = current.spec();
            edit(&mut spec);

            update_profile_description(conn, current.id, &spec.description)?;
            replace_profile_config(conn, current.id, &spec.config, &spec.devices)?;
            profile(conn, &project, name)
        })
    }

    /// Deletes the profile with the given ID.
    #[instrument(skip(self))]
    pub fn delete_profile(&mut self, id: i64) -> Result<()> {
        self.write(|conn| delete_profile(conn, id))?;
        info!(id, "Profile deleted");
        Ok(())
    }

    /// Deletes a profile by name.
    #[instrument(skip(self))]
    pub fn delete_profile_by_name(&mut self, project: &str, name: &str) -> Result<()> {
        let id = self.write(|conn| {
            let project = effective_project(conn, project)?;
            let id = profile_id(conn, &project, name)?;
            delete_profile(conn, id)?;
            Ok(id)
        })?;

        info!(name, id, "Profile deleted");
        Ok(())
    }
}
