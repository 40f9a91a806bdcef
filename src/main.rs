//! profiled - layered instance profiles backed by SQLite.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};

use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::debug;

use profiled::cli::{
    self, Cli, Commands, InstanceCommand, ProfileCommand, ProjectCommand, parse_key_values,
};
use profiled::config::{Settings, load_definition};
use profiled::error::{Error, Result};
use profiled::instance::{InstanceKind, NewInstance};
use profiled::logging::init_logging;
use profiled::profile::ProfileSpec;
use profiled::Database;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(args),
        Some(Commands::Project { command }) => cmd_project(cli, &mut open_database(cli)?, command),
        Some(Commands::Profile { command }) => cmd_profile(cli, &mut open_database(cli)?, command),
        Some(Commands::Instance { command }) => {
            cmd_instance(cli, &mut open_database(cli)?, command)
        }
        Some(Commands::Prune) => cmd_prune(cli, &mut open_database(cli)?),
    }
}

/// Opens the database named by the flags and settings file.
fn open_database(cli: &Cli) -> Result<Database> {
    let settings = Settings::load(cli.config.as_deref())?;
    let path = settings.database_path(cli.db.as_deref())?;

    let mut db = Database::open(&path)?;
    db.set_busy_timeout(settings.busy_timeout())?;

    if settings.prune_on_open {
        let report = db.prune_orphans()?;
        debug!(removed = report.total(), "Pruned on open");
    }
    Ok(db)
}

// === Quick Start ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    commands: Vec<(&'static str, &'static str)>,
    output_flags: &'static str,
}

const QUICK_START: &[(&str, &str)] = &[
    ("list_profiles", "profiled profile list"),
    ("show_profile", "profiled profile show <NAME>"),
    ("create_profile", "profiled profile create <NAME> --file web.yaml"),
    ("set_key", "profiled profile set <NAME> <KEY> <VALUE>"),
    ("create_instance", "profiled instance create <NAME> -P <PROFILE>..."),
    ("expanded_config", "profiled instance show <NAME> --expanded"),
    ("profile_users", "profiled profile used-by <NAME>"),
    ("switch_project", "profiled --project <PROJECT> ..."),
];

fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        return output_json(
            cli,
            &RobotQuickStart {
                tool: "profiled",
                version: build_info::VERSION,
                description: "Project-namespaced instance profiles with layered config",
                commands: QUICK_START.to_vec(),
                output_flags: "--robot or --format=json for JSON, -f json-compact for one line",
            },
        );
    }

    println!("{} {}", style("profiled").bold(), build_info::VERSION);
    println!();
    for (what, command) in QUICK_START {
        println!("  {:<18} {}", style(what.replace('_', " ")).dim(), style(command).cyan());
    }
    println!();
    println!("Run `profiled --help` for all commands.");
    Ok(())
}

// === Projects ===

fn cmd_project(cli: &Cli, db: &mut Database, command: &ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::List => {
            let names = db.project_names()?;
            if cli.use_json() {
                return output_json(cli, &names);
            }
            for name in names {
                println!("{name}");
            }
        }
        ProjectCommand::Create {
            name,
            description,
            no_profiles,
        } => {
            let id = db.create_project(name, description, !no_profiles)?;
            if cli.use_json() {
                return output_json(
                    cli,
                    &serde_json::json!({ "project": name, "id": id, "profiles": !no_profiles }),
                );
            }
            println!("{} project {}", style("Created").green(), style(name).bold());
        }
        ProjectCommand::SetProfiles { name, state } => {
            db.set_project_profiles(name, state.enabled())?;
            if cli.use_json() {
                return output_json(
                    cli,
                    &serde_json::json!({ "project": name, "profiles": state.enabled() }),
                );
            }
            let word = if state.enabled() { "enabled" } else { "disabled" };
            println!("Profiles {word} for project {}", style(name).bold());
        }
    }
    Ok(())
}

// === Profiles ===

fn cmd_profile(cli: &Cli, db: &mut Database, command: &ProfileCommand) -> Result<()> {
    let project = cli.project.as_str();
    match command {
        ProfileCommand::List => {
            let names = db.profile_names(project)?;
            if cli.use_json() {
                return output_json(cli, &names);
            }
            for name in names {
                println!("{name}");
            }
        }
        ProfileCommand::Show { name } => {
            let profile = db.profile(project, name)?;
            if cli.use_json() {
                return output_json(cli, &profile);
            }
            print_yaml(&profile)?;
        }
        ProfileCommand::Create {
            name,
            file,
            description,
        } => {
            let mut spec = match file {
                Some(path) => load_definition::<ProfileSpec>(path)?,
                None => ProfileSpec::new(),
            };
            if let Some(description) = description {
                spec.description.clone_from(description);
            }
            let id = db.create_profile(project, name, &spec)?;
            return report_profile(cli, "Created", name, Some(id));
        }
        ProfileCommand::Rename { name, new_name } => {
            db.rename_profile(project, name, new_name)?;
            if cli.use_json() {
                return output_json(cli, &serde_json::json!({ "renamed": name, "name": new_name }));
            }
            println!(
                "{} profile {} to {}",
                style("Renamed").green(),
                style(name).bold(),
                style(new_name).bold()
            );
        }
        ProfileCommand::SetDescription { name, description } => {
            let id = db.profile_id(project, name)?;
            db.update_profile_description(id, description)?;
            return report_profile(cli, "Updated", name, Some(id));
        }
        ProfileCommand::Edit { name, file } => {
            let spec: ProfileSpec = load_definition(file)?;
            db.update_profile(project, name, &spec)?;
            return report_profile(cli, "Updated", name, None);
        }
        ProfileCommand::Set { name, key, value } => {
            let (key, value) = (key.clone(), value.clone());
            db.edit_profile(project, name, move |spec| {
                spec.config.insert(key, value);
            })?;
            return report_profile(cli, "Updated", name, None);
        }
        ProfileCommand::Unset { name, key } => {
            db.edit_profile(project, name, |spec| {
                spec.config.remove(key);
            })?;
            return report_profile(cli, "Updated", name, None);
        }
        ProfileCommand::Delete { name } => {
            db.delete_profile_by_name(project, name)?;
            return report_profile(cli, "Deleted", name, None);
        }
        ProfileCommand::UsedBy { name } => {
            let profile = db.profile(project, name)?;
            if cli.use_json() {
                return output_json(cli, &profile.used_by);
            }
            for uri in &profile.used_by {
                println!("{uri}");
            }
        }
    }
    Ok(())
}

fn report_profile(cli: &Cli, action: &str, name: &str, id: Option<i64>) -> Result<()> {
    if cli.use_json() {
        return output_json(
            cli,
            &serde_json::json!({
                "profile": name,
                "id": id,
                "action": action.to_lowercase(),
                "ok": true,
            }),
        );
    }
    println!("{} profile {}", style(action).green(), style(name).bold());
    Ok(())
}

// === Instances ===

fn cmd_instance(cli: &Cli, db: &mut Database, command: &InstanceCommand) -> Result<()> {
    let project = cli.project.as_str();
    match command {
        InstanceCommand::List => {
            let names = db.instance_names(project)?;
            if cli.use_json() {
                return output_json(cli, &names);
            }
            for name in names {
                println!("{name}");
            }
        }
        InstanceCommand::Create {
            name,
            profiles,
            set,
            file,
            snapshot,
        } => {
            let mut new = match file {
                Some(path) => load_definition::<NewInstance>(path)?,
                None => NewInstance::default(),
            };
            new.name.clone_from(name);
            new.profiles.extend(profiles.iter().cloned());
            new.config.extend(parse_key_values(set)?);
            if *snapshot {
                new.kind = InstanceKind::Snapshot;
            }

            let id = db.create_instance(project, &new)?;
            if cli.use_json() {
                return output_json(
                    cli,
                    &serde_json::json!({ "instance": name, "id": id, "profiles": new.profiles }),
                );
            }
            println!("{} instance {}", style("Created").green(), style(name).bold());
        }
        InstanceCommand::Show { name, expanded } => {
            if *expanded {
                let instance = db.expanded_instance(project, name)?;
                if cli.use_json() {
                    return output_json(cli, &instance);
                }
                print_yaml(&instance)?;
            } else {
                let instance = db.instance(project, name)?;
                if cli.use_json() {
                    return output_json(cli, &instance);
                }
                print_yaml(&instance)?;
            }
        }
        InstanceCommand::Delete { name } => {
            db.delete_instance(project, name)?;
            if cli.use_json() {
                return output_json(cli, &serde_json::json!({ "deleted": name, "ok": true }));
            }
            println!("{} instance {}", style("Deleted").green(), style(name).bold());
        }
    }
    Ok(())
}

// === Maintenance ===

fn cmd_prune(cli: &Cli, db: &mut Database) -> Result<()> {
    let report = db.prune_orphans()?;
    if cli.use_json() {
        return output_json(cli, &report);
    }
    if report.is_empty() {
        println!("Nothing to prune");
    } else {
        println!(
            "{} {} orphaned rows (config: {}, devices: {}, device config: {})",
            style("Removed").green(),
            report.total(),
            report.config,
            report.devices,
            report.device_config
        );
    }
    Ok(())
}

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        return output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    }

    println!("profiled {}", build_info::VERSION);
    println!(
        "git: {}{}",
        build_info::git_sha(),
        if build_info::git_dirty() == "true" {
            " (dirty)"
        } else {
            ""
        }
    );
    println!("built: {}", build_info::build_timestamp());
    println!("rustc: {}", build_info::rustc_semver());
    println!("target: {}", build_info::target());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "profiled", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let text = serde_yaml::to_string(data)
        .map_err(|e| Error::InvalidArgument(format!("Failed to render YAML: {e}")))?;
    print!("{text}");
    Ok(())
}

fn output_json<T: Serialize>(cli: &Cli, data: &T) -> Result<()> {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    println!("{json}");
    Ok(())
}

fn output_error(cli: &Cli, error: &Error) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
