//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::db::DEFAULT_PROJECT;
use crate::error::{Error, Result};
use crate::profile::ConfigMap;

/// profiled - layered instance profiles backed by SQLite.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "profiled", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "PROFILED_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (repeat for more detail)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output (any non-empty NO_COLOR value except 0/false/no/off)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Database file (overrides the settings file)
    #[arg(long, global = true, env = "PROFILED_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "PROFILED_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project to operate in
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "PROFILED_PROJECT",
        default_value = DEFAULT_PROJECT
    )]
    pub project: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Manage instances and show their expanded config
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },

    /// Remove orphaned profile config and device rows
    Prune,

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List projects
    List,

    /// Create a project
    Create {
        name: String,

        /// Project description
        #[arg(long, short = 'd', default_value = "")]
        description: String,

        /// Share the default project's profiles instead of keeping its own
        #[arg(long)]
        no_profiles: bool,
    },

    /// Turn per-project profiles on or off
    SetProfiles { name: String, state: Switch },
}

/// On/off switch for feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List profile names
    List,

    /// Show a profile
    Show { name: String },

    /// Create a profile
    Create {
        name: String,

        /// Definition file (YAML, TOML or JSON)
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Description (overrides the file's)
        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Rename a profile
    Rename { name: String, new_name: String },

    /// Set a profile's description
    SetDescription { name: String, description: String },

    /// Replace a profile's description, config and devices from a file
    Edit {
        name: String,

        /// Definition file (YAML, TOML or JSON)
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Set one config key
    Set {
        name: String,
        key: String,
        value: String,
    },

    /// Remove one config key
    Unset { name: String, key: String },

    /// Delete a profile
    Delete { name: String },

    /// List the instances using a profile
    UsedBy { name: String },
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// List instance names
    List,

    /// Create an instance
    Create {
        name: String,

        /// Profile to apply (repeatable, applied in the order given)
        #[arg(long = "profile", short = 'P', value_name = "PROFILE")]
        profiles: Vec<String>,

        /// Local config entry KEY=VALUE (repeatable)
        #[arg(long, short = 'c', value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Definition file (YAML, TOML or JSON); flags are applied on top
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Record the instance as a snapshot
        #[arg(long)]
        snapshot: bool,
    },

    /// Show an instance
    Show {
        name: String,

        /// Show the effective config with profiles applied
        #[arg(long, short = 'e')]
        expanded: bool,
    },

    /// Delete an instance
    Delete { name: String },
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Parses `KEY=VALUE` entries into a config map.
///
/// The value may be empty (`KEY=`) and may itself contain `=`.
pub fn parse_key_values<S: AsRef<str>>(entries: &[S]) -> Result<ConfigMap> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(Error::InvalidArgument(format!(
                    "Expected KEY=VALUE, got '{entry}'"
                ))),
            }
        })
        .collect()
}
