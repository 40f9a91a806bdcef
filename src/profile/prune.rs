//! Removal of config and device rows whose owning profile is gone.
//!
//! Normal deletes never leave such rows behind; this repairs drift from
//! databases written without foreign-key enforcement.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::db::Database;
use crate::error::{Result, SqlContext};

/// Rows removed by one prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub device_config: usize,
    pub devices: usize,
    pub config: usize,
}

impl PruneReport {
    /// Returns true if nothing was deleted.
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Total rows deleted.
    pub const fn total(&self) -> usize {
        self.device_config + self.devices + self.config
    }
}

/// Deletes orphaned rows, children first.
///
/// Device config goes first so that deleting an orphaned device never trips
/// the foreign key of its own config rows.
pub fn remove_unreferenced(conn: &Connection) -> Result<PruneReport> {
    let device_config = conn
        .execute(
            "DELETE FROM profiles_devices_config WHERE profile_device_id NOT IN
               (SELECT id FROM profiles_devices WHERE profile_id IN (SELECT id FROM profiles))",
            [],
        )
        .context("Failed to prune device config")?;

    let devices = conn
        .execute(
            "DELETE FROM profiles_devices WHERE profile_id NOT IN (SELECT id FROM profiles)",
            [],
        )
        .context("Failed to prune devices")?;

    let config = conn
        .execute(
            "DELETE FROM profiles_config WHERE profile_id NOT IN (SELECT id FROM profiles)",
            [],
        )
        .context("Failed to prune config")?;

    Ok(PruneReport {
        device_config,
        devices,
        config,
    })
}

impl Database {
    /// Removes orphaned profile config and device rows in one transaction.
    #[instrument(skip(self))]
    pub fn prune_orphans(&mut self) -> Result<PruneReport> {
        let report = self.write(remove_unreferenced)?;

        if report.is_empty() {
            debug!("No orphaned profile rows");
        } else {
            info!(
                device_config = report.device_config,
                devices = report.devices,
                config = report.config,
                "Orphaned profile rows removed"
            );
        }
        Ok(report)
    }
}
