//! Definition file and settings tests.

use profiled::config::{Settings, load_definition};
use profiled::db::DEFAULT_PROJECT;
use profiled::error::Error;
use profiled::instance::NewInstance;
use profiled::profile::ProfileSpec;

use crate::common::{TestDb, web_profile};

const WEB_YAML: &str = r#"
description: Web tier
config:
  limits.cpu: "2"
  limits.memory: 1GB
devices:
  eth0:
    type: nic
    network: lxdbr0
"#;

const WEB_TOML: &str = r#"
description = "Web tier"

[config]
"limits.cpu" = "2"
"limits.memory" = "1GB"

[devices.eth0]
type = "nic"
network = "lxdbr0"
"#;

#[test]
fn yaml_and_toml_definitions_agree() {
    let test_db = TestDb::new();
    let yaml = test_db.write_file("web.yaml", WEB_YAML);
    let toml = test_db.write_file("web.toml", WEB_TOML);

    let from_yaml: ProfileSpec = load_definition(&yaml).unwrap();
    let from_toml: ProfileSpec = load_definition(&toml).unwrap();
    assert_eq!(from_yaml, from_toml);
    assert_eq!(from_yaml, web_profile());
}

#[test]
fn definition_file_creates_profile_and_instance() {
    let test_db = TestDb::new();
    let profile_file = test_db.write_file("web.yml", WEB_YAML);
    let instance_file = test_db.write_file(
        "app.json",
        r#"{"profiles": ["web"], "config": {"limits.cpu": "4"}}"#,
    );

    let mut db = test_db.open();
    let spec: ProfileSpec = load_definition(&profile_file).unwrap();
    db.create_profile(DEFAULT_PROJECT, "web", &spec).unwrap();

    let mut new: NewInstance = load_definition(&instance_file).unwrap();
    new.name = "app".to_string();
    db.create_instance(DEFAULT_PROJECT, &new).unwrap();

    let expanded = db.expanded_instance(DEFAULT_PROJECT, "app").unwrap();
    assert_eq!(expanded.config["limits.cpu"], "4");
    assert_eq!(expanded.config["limits.memory"], "1GB");
}

#[test]
fn unknown_extension_is_rejected() {
    let test_db = TestDb::new();
    let path = test_db.write_file("web.ini", "[config]\n");
    let err = load_definition::<ProfileSpec>(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
    assert!(err.is_user_recoverable());
}

#[test]
fn settings_file_names_the_database() {
    let test_db = TestDb::new();
    let db_path = test_db.dir.path().join("nested").join("store.db");
    let settings_path = test_db.write_file(
        "config.toml",
        &format!(
            "database = {:?}\nbusy_timeout_ms = 100\nprune_on_open = true\n",
            db_path.display().to_string()
        ),
    );

    let settings = Settings::load(Some(&settings_path)).unwrap();
    let resolved = settings.database_path(None).unwrap();
    assert_eq!(resolved, db_path);

    let db = profiled::Database::open(&resolved).unwrap();
    db.set_busy_timeout(settings.busy_timeout()).unwrap();
    assert!(resolved.exists());
    assert_eq!(db.project_names().unwrap(), vec![DEFAULT_PROJECT]);
}
