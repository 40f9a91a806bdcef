//! Configuration: application settings and declarative definition files.

mod declarative;
mod settings;

pub use declarative::{ConfigFormat, load_definition, parse_definition};
pub use settings::{Settings, default_settings_path};
