//! Settings file and environment tests.

use serde_json::json;

use crate::common::TestDb;
use crate::common::cli::CliRunner;

#[test]
fn settings_file_selects_database() {
    let dir = TestDb::new();
    let db_path = dir.dir.path().join("from-settings.db");
    let settings = dir.write_file(
        "profiled.toml",
        &format!("database = {:?}\n", db_path.display().to_string()),
    );
    let settings = settings.display().to_string();

    let cli = CliRunner::new()
        .with_env("XDG_CONFIG_HOME", &dir.dir.path().join("xdg").display().to_string());
    cli.run_robot(&["--config", &settings, "profile", "create", "web"])
        .assert_success();

    assert!(db_path.exists());
    cli.run_robot(&["--config", &settings, "profile", "list"])
        .assert_success()
        .assert_json_field("", &json!(["web"]));
}

#[test]
fn db_flag_overrides_settings_file() {
    let dir = TestDb::new();
    let settings = dir.write_file("profiled.toml", "database = \"/nonexistent/dir/x.db\"\n");
    let settings = settings.display().to_string();
    let db_path = dir.path().display().to_string();

    CliRunner::new()
        .run_robot(&["--config", &settings, "--db", &db_path, "project", "list"])
        .assert_success()
        .assert_json_field("", &json!(["default"]));
}

#[test]
fn missing_settings_file_is_an_error() {
    let dir = TestDb::new();
    let result = CliRunner::new()
        .with_db(&dir.path())
        .run_robot(&["--config", "/nonexistent/profiled.toml", "profile", "list"]);
    result.assert_failure();
    assert_eq!(result.error_json()["recoverable"], json!(true));
}

#[test]
fn malformed_settings_file_is_an_error() {
    let dir = TestDb::new();
    let settings = dir.write_file("profiled.toml", "busy_timeout_ms = \"soon\"\n");
    let result = CliRunner::new()
        .with_db(&dir.path())
        .run_robot(&["--config", &settings.display().to_string(), "profile", "list"]);
    result.assert_failure();
    assert!(
        result.error_json()["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Invalid settings")
    );
}

#[test]
fn project_from_environment() {
    let dir = TestDb::new();
    let cli = CliRunner::new().with_db(&dir.path());
    cli.run_robot(&["project", "create", "team"]).assert_success();

    CliRunner::new()
        .with_db(&dir.path())
        .with_env("PROFILED_PROJECT", "team")
        .run_robot(&["profile", "create", "local"])
        .assert_success();

    cli.run_robot(&["--project", "team", "profile", "list"])
        .assert_success()
        .assert_json_field("", &json!(["local"]));
    cli.run_robot(&["profile", "list"])
        .assert_success()
        .assert_json_array_len("", 0);
}
