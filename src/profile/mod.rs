//! Profiles: storage, expansion, usage lookup and orphan pruning.
//!
//! # Usage
//!
//! ```ignore
//! use profiled::db::Database;
//! use profiled::profile::{ProfileSpec, expand_config};
//!
//! let mut db = Database::open_default()?;
//! db.create_profile("default", "web", &ProfileSpec::new().with_config("limits.cpu", "2"))?;
//!
//! // Later profiles win, the instance's own config wins over all of them
//! let profiles = db.profiles("default", &["web", "db"])?;
//! let effective = expand_config(&instance_config, &profiles);
//! ```

mod expand;
mod prune;
mod schema;
mod store;
mod usage;

pub use expand::{expand_config, expand_devices};
pub use prune::{PruneReport, remove_unreferenced};
pub use schema::{ConfigMap, Devices, Profile, ProfileSpec};
pub use store::{profile_exists, profile_id, profiles};
pub use usage::{InstanceRefs, instances_with_profile, used_by_uris};
