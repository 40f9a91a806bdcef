//! Shared row codecs for config and device tables.
//!
//! Profiles and instances persist config and devices in the same shape: a
//! flat `(owner, key, value)` table plus a device table whose rows each own a
//! flat config table. Empty values are never written: an empty string means
//! "unset", not "set to empty".

use rusqlite::{Connection, params};
use tracing::trace;

use crate::profile::{ConfigMap, Devices};

/// Statements for one owner's config and device tables.
pub(crate) struct ConfigTables {
    insert_config: &'static str,
    select_config: &'static str,
    insert_device: &'static str,
    insert_device_config: &'static str,
    select_devices: &'static str,
}

pub(crate) const PROFILE_TABLES: ConfigTables = ConfigTables {
    insert_config: "INSERT INTO profiles_config (profile_id, key, value) VALUES (?1, ?2, ?3)",
    select_config: "SELECT key, value FROM profiles_config WHERE profile_id = ?1 ORDER BY key",
    insert_device: "INSERT INTO profiles_devices (profile_id, name, type) VALUES (?1, ?2, ?3)",
    insert_device_config: "INSERT INTO profiles_devices_config (profile_device_id, key, value) VALUES (?1, ?2, ?3)",
    select_devices: "SELECT profiles_devices.name, profiles_devices_config.key, profiles_devices_config.value
         FROM profiles_devices
         LEFT JOIN profiles_devices_config
           ON profiles_devices_config.profile_device_id = profiles_devices.id
         WHERE profiles_devices.profile_id = ?1
         ORDER BY profiles_devices.name, profiles_devices_config.key",
};

pub(crate) const INSTANCE_TABLES: ConfigTables = ConfigTables {
    insert_config: "INSERT INTO instances_config (instance_id, key, value) VALUES (?1, ?2, ?3)",
    select_config: "SELECT key, value FROM instances_config WHERE instance_id = ?1 ORDER BY key",
    insert_device: "INSERT INTO instances_devices (instance_id, name, type) VALUES (?1, ?2, ?3)",
    insert_device_config: "INSERT INTO instances_devices_config (instance_device_id, key, value) VALUES (?1, ?2, ?3)",
    select_devices: "SELECT instances_devices.name, instances_devices_config.key, instances_devices_config.value
         FROM instances_devices
         LEFT JOIN instances_devices_config
           ON instances_devices_config.instance_device_id = instances_devices.id
         WHERE instances_devices.instance_id = ?1
         ORDER BY instances_devices.name, instances_devices_config.key",
};

fn insert_pairs(
    conn: &Connection,
    sql: &str,
    owner_id: i64,
    config: &ConfigMap,
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut written = 0;
    for (key, value) in config {
        if value.is_empty() {
            continue;
        }
        stmt.execute(params![owner_id, key, value])?;
        written += 1;
    }
    Ok(written)
}

/// Writes the non-empty entries of `config` for `owner_id`.
pub(crate) fn insert_config(
    conn: &Connection,
    tables: &ConfigTables,
    owner_id: i64,
    config: &ConfigMap,
) -> rusqlite::Result<usize> {
    let written = insert_pairs(conn, tables.insert_config, owner_id, config)?;
    trace!(owner_id, written, "Inserted config rows");
    Ok(written)
}

/// Writes one device row per entry, then that device's non-empty config.
pub(crate) fn insert_devices(
    conn: &Connection,
    tables: &ConfigTables,
    owner_id: i64,
    devices: &Devices,
) -> rusqlite::Result<()> {
    for (name, config) in devices {
        let device_type = config.get("type").map_or("", String::as_str);
        conn.prepare_cached(tables.insert_device)?
            .execute(params![owner_id, name, device_type])?;
        let device_id = conn.last_insert_rowid();

        let written = insert_pairs(conn, tables.insert_device_config, device_id, config)?;
        trace!(owner_id, device = %name, device_type, written, "Inserted device");
    }
    Ok(())
}

/// Reads the config map owned by `owner_id`.
pub(crate) fn load_config(
    conn: &Connection,
    tables: &ConfigTables,
    owner_id: i64,
) -> rusqlite::Result<ConfigMap> {
    let mut stmt = conn.prepare_cached(tables.select_config)?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect()
}

/// Reads the device maps owned by `owner_id`.
///
/// A device without config rows still appears, with an empty map.
pub(crate) fn load_devices(
    conn: &Connection,
    tables: &ConfigTables,
    owner_id: i64,
) -> rusqlite::Result<Devices> {
    let mut stmt = conn.prepare_cached(tables.select_devices)?;
    let mut rows = stmt.query(params![owner_id])?;

    let mut devices = Devices::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let key: Option<String> = row.get(1)?;
        let value: Option<String> = row.get(2)?;

        let device = devices.entry(name).or_default();
        if let (Some(key), Some(value)) = (key, value) {
            device.insert(key, value);
        }
    }
    Ok(devices)
}
