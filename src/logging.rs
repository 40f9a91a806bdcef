//! Log setup for the `profiled` binary.
//!
//! Logs always go to stderr so stdout stays reserved for YAML or JSON
//! results. Robot mode gets JSON lines, a terminal gets the default
//! formatter, anything else gets compact lines without ANSI codes.

use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How log events are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// One JSON object per event.
    Json,
    /// Colored multi-field lines for an interactive terminal.
    Terminal,
    /// Compact uncolored lines for pipes and files.
    Plain,
}

impl LogOutput {
    /// Picks the output for a run.
    pub const fn select(robot_mode: bool, stderr_is_terminal: bool) -> Self {
        match (robot_mode, stderr_is_terminal) {
            (true, _) => Self::Json,
            (false, true) => Self::Terminal,
            (false, false) => Self::Plain,
        }
    }
}

/// Filter directive for `-v`/`-q`: warn by default, `-q` keeps errors only.
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "profiled=error";
    }
    match verbose {
        0 => "profiled=warn",
        1 => "profiled=info",
        2 => "profiled=debug",
        _ => "profiled=trace",
    }
}

/// `RUST_LOG` wins over the verbosity flags when it parses.
pub fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)))
}

/// Installs the global subscriber. Does nothing if one is already set.
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let output = LogOutput::select(robot_mode, io::stderr().is_terminal());

    let layer = match output {
        LogOutput::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(io::stderr)
            .boxed(),
        LogOutput::Terminal => fmt::layer().with_target(false).with_writer(io::stderr).boxed(),
        LogOutput::Plain => fmt::layer()
            .compact()
            .with_ansi(false)
            .with_target(false)
            .with_writer(io::stderr)
            .boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(layer.with_filter(log_filter(verbose, quiet)))
        .try_init();
}
