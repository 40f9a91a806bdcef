//! Human-mode end-to-end tests.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::TestDb;
use crate::common::cli::CliRunner;

fn profiled(db: &TestDb) -> Command {
    let mut cmd = Command::cargo_bin("profiled").expect("binary");
    cmd.env("PROFILED_DB", db.path())
        .env("XDG_CONFIG_HOME", db.dir.path().join("xdg-config"))
        .env("RUST_LOG", "off")
        .env("NO_COLOR", "1")
        .env_remove("PROFILED_PROJECT")
        .env_remove("PROFILED_CONFIG")
        .env_remove("PROFILED_FORMAT");
    cmd
}

#[test]
fn quick_start_lists_commands() {
    let db = TestDb::new();
    profiled(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("profiled profile list"))
        .stdout(predicate::str::contains("--expanded"));
}

#[test]
fn create_and_show_profile_as_yaml() {
    let db = TestDb::new();
    profiled(&db)
        .args(["profile", "create", "web", "-d", "Web tier"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created profile web"));

    profiled(&db)
        .args(["profile", "set", "web", "limits.cpu", "2"])
        .assert()
        .success();

    profiled(&db)
        .args(["profile", "show", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("description: Web tier"))
        .stdout(predicate::str::contains("limits.cpu:"));
}

#[test]
fn duplicate_profile_prints_hint() {
    let db = TestDb::new();
    profiled(&db)
        .args(["profile", "create", "web"])
        .assert()
        .success();

    profiled(&db)
        .args(["profile", "create", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Profile already exists: web"))
        .stderr(predicate::str::contains("Hint:"));
}

#[test]
fn listing_is_one_name_per_line() {
    let db = TestDb::new();
    for name in ["zeta", "alpha"] {
        profiled(&db)
            .args(["profile", "create", name])
            .assert()
            .success();
    }

    CliRunner::new()
        .with_db(&db.path())
        .run(&["profile", "list"])
        .assert_success()
        .assert_stdout_matches(r"^alpha\nzeta\n$");
}

#[test]
fn invalid_key_value_is_rejected() {
    let db = TestDb::new();
    profiled(&db)
        .args(["instance", "create", "app", "--set", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected KEY=VALUE"));
}

#[test]
fn default_project_cannot_opt_out() {
    let db = TestDb::new();
    profiled(&db)
        .args(["project", "set-profiles", "default", "off"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("features.profiles"));
}

#[test]
fn completions_are_generated() {
    let db = TestDb::new();
    profiled(&db)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("profiled"));
}

#[test]
fn unknown_command_fails() {
    let db = TestDb::new();
    CliRunner::new()
        .with_db(&db.path())
        .run(&["nonexistent-command"])
        .assert_failure()
        .assert_stderr_contains("unrecognized subcommand");
}

#[test]
fn no_color_accepts_any_non_empty_value() {
    let db = TestDb::new();
    for value in ["1", "yes", "true"] {
        profiled(&db)
            .env("NO_COLOR", value)
            .args(["profile", "list"])
            .assert()
            .success();
    }

    profiled(&db)
        .env("NO_COLOR", "1")
        .args(["profile", "create", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}
