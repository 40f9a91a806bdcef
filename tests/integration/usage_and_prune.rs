//! Usage lookup and orphan pruning tests.

use profiled::db::DEFAULT_PROJECT;
use profiled::error::Error;
use profiled::instance::{InstanceKind, NewInstance};
use profiled::profile::PruneReport;
use rusqlite::{Connection, params};

use crate::common::{TestDb, memory_db, seed_profiles, web_profile};

#[test]
fn used_by_lists_regular_instances_only() {
    let mut db = memory_db();
    seed_profiles(&mut db, DEFAULT_PROJECT);
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("c2").with_profiles(["web"]))
        .unwrap();
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("c1").with_profiles(["web", "db"]))
        .unwrap();
    db.create_instance(
        DEFAULT_PROJECT,
        &NewInstance::new("c1/snap0")
            .with_kind(InstanceKind::Snapshot)
            .with_profiles(["web"]),
    )
    .unwrap();

    let refs = db.instances_with_profile(DEFAULT_PROJECT, "web").unwrap();
    assert_eq!(refs[DEFAULT_PROJECT], vec!["c1", "c2"]);

    let web = db.profile(DEFAULT_PROJECT, "web").unwrap();
    assert_eq!(web.used_by, vec!["/1.0/instances/c1", "/1.0/instances/c2"]);
    let db_profile = db.profile(DEFAULT_PROJECT, "db").unwrap();
    assert_eq!(db_profile.used_by, vec!["/1.0/instances/c1"]);
}

#[test]
fn used_by_spans_projects_sharing_default_profiles() {
    let mut db = memory_db();
    db.create_project("shared", "", false).unwrap();
    seed_profiles(&mut db, DEFAULT_PROJECT);
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("local").with_profiles(["web"]))
        .unwrap();
    db.create_instance("shared", &NewInstance::new("remote").with_profiles(["web"]))
        .unwrap();

    let web = db.profile("shared", "web").unwrap();
    assert_eq!(
        web.used_by,
        vec![
            "/1.0/instances/local",
            "/1.0/instances/remote?project=shared",
        ]
    );
}

#[test]
fn used_by_follows_rename() {
    let mut db = memory_db();
    seed_profiles(&mut db, DEFAULT_PROJECT);
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("c1").with_profiles(["web"]))
        .unwrap();

    db.rename_profile(DEFAULT_PROJECT, "web", "frontend").unwrap();

    assert_eq!(
        db.instance(DEFAULT_PROJECT, "c1").unwrap().profiles,
        vec!["frontend"]
    );
    assert_eq!(
        db.profile(DEFAULT_PROJECT, "frontend").unwrap().used_by,
        vec!["/1.0/instances/c1"]
    );
}

#[test]
fn delete_in_use_profile_fails_and_keeps_rows() {
    let mut db = memory_db();
    seed_profiles(&mut db, DEFAULT_PROJECT);
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("c1").with_profiles(["web"]))
        .unwrap();
    db.create_instance(DEFAULT_PROJECT, &NewInstance::new("c2").with_profiles(["web"]))
        .unwrap();

    let err = db.delete_profile_by_name(DEFAULT_PROJECT, "web").unwrap_err();
    assert!(matches!(err, Error::InUse { references: 2, .. }));
    assert!(err.is_conflict());

    // The transaction rolled back: config and devices are intact.
    assert_eq!(db.profile(DEFAULT_PROJECT, "web").unwrap().spec(), web_profile());

    db.delete_instance(DEFAULT_PROJECT, "c1").unwrap();
    db.delete_instance(DEFAULT_PROJECT, "c2").unwrap();
    db.delete_profile_by_name(DEFAULT_PROJECT, "web").unwrap();
}

fn plant_orphans(path: &std::path::Path) {
    // Bundled SQLite enforces foreign keys by default; write like a writer
    // that turned them off.
    let conn = Connection::open(path).unwrap();
    conn.pragma_update(None, "foreign_keys", false).unwrap();
    let enforced: bool = conn
        .pragma_query_value(None, "foreign_keys", |row| row.get(0))
        .unwrap();
    assert!(!enforced);
    conn.execute(
        "INSERT INTO profiles_config (profile_id, key, value) VALUES (?1, 'limits.cpu', '1')",
        params![9001],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO profiles_devices (profile_id, name, type) VALUES (?1, 'eth0', 'nic')",
        params![9001],
    )
    .unwrap();
    let device_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO profiles_devices_config (profile_device_id, key, value) VALUES (?1, 'type', 'nic')",
        params![device_id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO profiles_devices_config (profile_device_id, key, value) VALUES (?1, 'key', 'value')",
        params![7777],
    )
    .unwrap();
}

#[test]
fn prune_removes_rows_left_by_foreign_key_free_writers() {
    let test_db = TestDb::new();
    {
        let mut db = test_db.open();
        seed_profiles(&mut db, DEFAULT_PROJECT);
    }
    plant_orphans(&test_db.path());

    let mut db = test_db.open();
    let report = db.prune_orphans().unwrap();
    assert_eq!(
        report,
        PruneReport {
            device_config: 2,
            devices: 1,
            config: 1,
        }
    );
    assert_eq!(report.total(), 4);

    assert_eq!(db.profile(DEFAULT_PROJECT, "web").unwrap().spec(), web_profile());
    assert!(db.prune_orphans().unwrap().is_empty());
}
