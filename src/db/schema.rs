//! SQL schema for profile storage.

/// Name of the project every disabled project falls back to.
pub const DEFAULT_PROJECT: &str = "default";

/// Project config key holding the per-project profiles capability.
pub const PROFILES_FEATURE: &str = "features.profiles";

/// Tables, indexes and the built-in default project.
///
/// Profile child tables have no `ON DELETE CASCADE`; the profile store removes
/// them explicitly in dependency order.
pub(crate) const SCHEMA_SQL: &str = r"
-- Projects (profile namespaces)
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS projects_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(project_id, key)
);

-- Profiles and their config/device rows
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    name TEXT NOT NULL,
    description TEXT,
    UNIQUE(project_id, name)
);

CREATE TABLE IF NOT EXISTS profiles_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(profile_id, key)
);

CREATE TABLE IF NOT EXISTS profiles_devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id),
    name TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT '',
    UNIQUE(profile_id, name)
);

CREATE TABLE IF NOT EXISTS profiles_devices_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_device_id INTEGER NOT NULL REFERENCES profiles_devices(id),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(profile_device_id, key)
);

-- Instances and their ordered profile references
CREATE TABLE IF NOT EXISTS instances (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    name TEXT NOT NULL,
    type INTEGER NOT NULL DEFAULT 0,
    UNIQUE(project_id, name)
);

CREATE TABLE IF NOT EXISTS instances_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_id INTEGER NOT NULL REFERENCES instances(id) ON DELETE CASCADE,
    profile_id INTEGER NOT NULL REFERENCES profiles(id),
    apply_order INTEGER NOT NULL DEFAULT 0,
    UNIQUE(instance_id, profile_id)
);

CREATE TABLE IF NOT EXISTS instances_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_id INTEGER NOT NULL REFERENCES instances(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(instance_id, key)
);

CREATE TABLE IF NOT EXISTS instances_devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_id INTEGER NOT NULL REFERENCES instances(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT '',
    UNIQUE(instance_id, name)
);

CREATE TABLE IF NOT EXISTS instances_devices_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_device_id INTEGER NOT NULL REFERENCES instances_devices(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(instance_device_id, key)
);

-- Indexes for common queries
CREATE INDEX IF NOT EXISTS idx_profiles_config_profile ON profiles_config(profile_id);
CREATE INDEX IF NOT EXISTS idx_profiles_devices_profile ON profiles_devices(profile_id);
CREATE INDEX IF NOT EXISTS idx_profiles_devices_config_device ON profiles_devices_config(profile_device_id);
CREATE INDEX IF NOT EXISTS idx_instances_profiles_profile ON instances_profiles(profile_id);

-- The default project always exists and always has its own profiles
INSERT OR IGNORE INTO projects (name, description) VALUES ('default', 'Default project');
INSERT OR IGNORE INTO projects_config (project_id, key, value)
    SELECT id, 'features.profiles', 'true' FROM projects WHERE name = 'default';
";
