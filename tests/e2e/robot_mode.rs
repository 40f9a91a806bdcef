//! Robot-mode end-to-end tests.

use serde_json::{Value, json};

use crate::common::TestDb;
use crate::common::cli::CliRunner;
use crate::common::init_test_logging;

fn runner(db: &TestDb) -> CliRunner {
    CliRunner::new().with_db(&db.path())
}

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let db = TestDb::new();
    let result = runner(&db).run(&["--robot"]);
    result
        .assert_success()
        .assert_json_field("/tool", &json!("profiled"));
    assert!(result.json().get("commands").is_some());
}

#[test]
fn version_format_flag_outputs_json() {
    let db = TestDb::new();
    let result = runner(&db).run(&["version", "--format=json"]);
    result.assert_success();
    assert!(result.json().get("git_sha").is_some());
}

#[test]
fn profile_lifecycle_in_robot_mode() {
    init_test_logging();
    let db = TestDb::new();
    let cli = runner(&db);
    let file = db.write_file(
        "web.yaml",
        "description: Web tier\nconfig:\n  limits.cpu: \"2\"\ndevices:\n  eth0:\n    type: nic\n",
    );
    let file = file.display().to_string();

    cli.run_robot(&["profile", "create", "web", "--file", &file])
        .assert_success()
        .assert_json_field("/action", &json!("created"));

    cli.run_robot(&["profile", "set", "web", "limits.memory", "1GB"])
        .assert_success();

    let show = cli.run_robot(&["profile", "show", "web"]);
    show.assert_success()
        .assert_json_field("/name", &json!("web"))
        .assert_json_field("/description", &json!("Web tier"))
        .assert_json_field("/config/limits.memory", &json!("1GB"))
        .assert_json_field("/devices/eth0/type", &json!("nic"))
        .assert_json_array_len("/used_by", 0);

    cli.run_robot(&["profile", "unset", "web", "limits.memory"])
        .assert_success();
    let show = cli.run_robot(&["profile", "show", "web"]);
    assert!(show.json().pointer("/config/limits.memory").is_none());

    cli.run_robot(&["profile", "rename", "web", "frontend"])
        .assert_success();
    cli.run_robot(&["profile", "list"])
        .assert_success()
        .assert_json_field("", &json!(["frontend"]));

    cli.run_robot(&["profile", "delete", "frontend"])
        .assert_success();
    cli.run_robot(&["profile", "list"])
        .assert_success()
        .assert_json_array_len("", 0);
}

#[test]
fn expanded_instance_in_robot_mode() {
    let db = TestDb::new();
    let cli = runner(&db);

    cli.run_robot(&["profile", "create", "web"]).assert_success();
    cli.run_robot(&["profile", "set", "web", "limits.cpu", "2"])
        .assert_success();
    cli.run_robot(&["profile", "set", "web", "limits.memory", "1GB"])
        .assert_success();
    cli.run_robot(&["profile", "create", "db"]).assert_success();
    cli.run_robot(&["profile", "set", "db", "limits.memory", "4GB"])
        .assert_success();

    cli.run_robot(&[
        "instance", "create", "app", "-P", "web", "-P", "db", "--set", "user.owner=ops",
    ])
    .assert_success()
    .assert_json_field("/profiles", &json!(["web", "db"]));

    cli.run_robot(&["instance", "show", "app", "--expanded"])
        .assert_success()
        .assert_json_field(
            "/config",
            &json!({ "limits.cpu": "2", "limits.memory": "4GB", "user.owner": "ops" }),
        );

    cli.run_robot(&["instance", "show", "app"])
        .assert_success()
        .assert_json_field("/config", &json!({ "user.owner": "ops" }))
        .assert_json_field("/kind", &json!("regular"));

    cli.run_robot(&["profile", "used-by", "web"])
        .assert_success()
        .assert_json_field("", &json!(["/1.0/instances/app"]));
}

#[test]
fn delete_in_use_profile_reports_json_error() {
    let db = TestDb::new();
    let cli = runner(&db);
    cli.run_robot(&["profile", "create", "web"]).assert_success();
    cli.run_robot(&["instance", "create", "app", "-P", "web"])
        .assert_success();

    let result = cli.run_robot(&["profile", "delete", "web"]);
    result.assert_failure();

    let error = result.error_json();
    assert_eq!(error["error"], Value::Bool(true));
    assert_eq!(error["recoverable"], Value::Bool(true));
    assert!(
        error["message"]
            .as_str()
            .unwrap_or_default()
            .contains("still used by 1 instance")
    );
    assert!(error["suggestion"].as_str().is_some());
}

#[test]
fn missing_profile_is_recoverable_error() {
    let db = TestDb::new();
    let result = runner(&db).run_robot(&["profile", "show", "ghost"]);
    result.assert_failure();

    let error = result.error_json();
    assert_eq!(error["message"], json!("Profile not found: ghost"));
    assert_eq!(error["suggestion"], json!("Run: profiled profile list"));
}

#[test]
fn shared_project_uses_default_profiles() {
    let db = TestDb::new();
    let cli = runner(&db);
    cli.run_robot(&["project", "create", "shared", "--no-profiles"])
        .assert_success();
    cli.run_robot(&["project", "create", "team"]).assert_success();
    cli.run_robot(&["profile", "create", "web"]).assert_success();

    cli.run_robot(&["--project", "shared", "profile", "list"])
        .assert_success()
        .assert_json_field("", &json!(["web"]));
    cli.run_robot(&["--project", "team", "profile", "list"])
        .assert_success()
        .assert_json_array_len("", 0);

    cli.run_robot(&["--project", "shared", "instance", "create", "app", "-P", "web"])
        .assert_success();
    cli.run_robot(&["profile", "used-by", "web"])
        .assert_success()
        .assert_json_field("", &json!(["/1.0/instances/app?project=shared"]));

    cli.run_robot(&["project", "list"])
        .assert_success()
        .assert_json_field("", &json!(["default", "shared", "team"]));
}

#[test]
fn unknown_project_is_not_found() {
    let db = TestDb::new();
    let result = runner(&db).run_robot(&["--project", "nowhere", "profile", "list"]);
    result.assert_failure();
    assert_eq!(
        result.error_json()["message"],
        json!("Project not found: nowhere")
    );
}

#[test]
fn prune_reports_counts() {
    let db = TestDb::new();
    runner(&db)
        .run(&["prune", "-f", "json-compact"])
        .assert_success()
        .assert_json_field("/config", &json!(0))
        .assert_json_field("/devices", &json!(0))
        .assert_json_field("/device_config", &json!(0));
}

#[test]
fn set_description_keeps_config_and_devices() {
    let db = TestDb::new();
    let cli = runner(&db);
    let file = db.write_file(
        "web.yaml",
        "description: Web tier\nconfig:\n  limits.cpu: \"2\"\ndevices:\n  eth0:\n    type: nic\n    network: lxdbr0\n",
    );
    let created = cli.run_robot(&["profile", "create", "web", "--file", &file.display().to_string()]);
    created.assert_success();
    let id = created.json()["id"].clone();

    cli.run_robot(&["profile", "set-description", "web", "Frontends"])
        .assert_success()
        .assert_json_field("/action", &json!("updated"))
        .assert_json_field("/id", &id);

    cli.run_robot(&["profile", "show", "web"])
        .assert_success()
        .assert_json_field("/id", &id)
        .assert_json_field("/description", &json!("Frontends"))
        .assert_json_field("/config/limits.cpu", &json!("2"))
        .assert_json_field("/devices/eth0/network", &json!("lxdbr0"));

    let missing = cli.run_robot(&["profile", "set-description", "nope", "x"]);
    missing.assert_failure();
    assert_eq!(missing.error_json()["message"], json!("Profile not found: nope"));
}
