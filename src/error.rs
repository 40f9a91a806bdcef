//! Error types for profile storage and expansion.

use std::fmt;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Kind of entity named in a lookup or uniqueness failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Profile,
    Instance,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Project => "Project",
            Self::Profile => "Profile",
            Self::Instance => "Instance",
        })
    }
}

/// Primary error type for profile operations.
#[derive(Error, Debug)]
pub enum Error {
    // Lookup and uniqueness errors
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    #[error("{kind} already exists: {name}")]
    Conflict { kind: EntityKind, name: String },

    #[error("Profile '{name}' is still used by {references} instance(s)")]
    InUse { name: String, references: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Storage errors
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn conflict(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            name: name.into(),
        }
    }

    /// Returns true for errors that signal a clash with existing state:
    /// duplicate names and deletions blocked by live references.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::InUse { .. })
    }

    /// Returns true if the error is a missing project, profile or instance.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::InUse { .. }
                | Self::InvalidArgument(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound {
                kind: EntityKind::Project,
                ..
            } => Some("Run: profiled project list"),
            Self::NotFound {
                kind: EntityKind::Profile,
                ..
            } => Some("Run: profiled profile list"),
            Self::Conflict { .. } => Some("Choose a different name or delete the existing entry"),
            Self::InUse { .. } => Some("Run: profiled profile used-by <NAME>"),
            Self::ConfigParse(_) => Some("Check the file syntax (YAML, TOML or JSON by extension)"),
            Self::Storage { .. } => Some("Check the database path with --db or PROFILED_DB"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for attaching context to SQLite failures.
pub trait SqlContext<T> {
    fn context(self, context: &str) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> SqlContext<T> for rusqlite::Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|source| Error::Storage {
            context: context.to_string(),
            source,
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Storage {
            context: f().into(),
            source,
        })
    }
}

/// Returns true if the SQLite error is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Returns true if the SQLite error is a FOREIGN KEY violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        }
        _ => false,
    }
}
