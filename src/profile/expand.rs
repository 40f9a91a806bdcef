//! Profile expansion: the effective config and devices of an instance.
//!
//! Layers are applied in order with later layers winning per key: each
//! profile in the order given, then the instance's own values on top. The
//! order of `profiles` is the caller's contract. Nothing here validates keys
//! or fills in defaults, and an empty value is just a value.

use std::collections::BTreeMap;
use std::iter;

use super::schema::{ConfigMap, Devices, Profile};

fn overlay<'a, V, I>(layers: I) -> BTreeMap<String, V>
where
    V: Clone + 'a,
    I: IntoIterator<Item = &'a BTreeMap<String, V>>,
{
    let mut expanded = BTreeMap::new();
    for layer in layers {
        for (key, value) in layer {
            expanded.insert(key.clone(), value.clone());
        }
    }
    expanded
}

/// Expands `config` with the config of `profiles`.
pub fn expand_config(config: &ConfigMap, profiles: &[Profile]) -> ConfigMap {
    overlay(
        profiles
            .iter()
            .map(|p| &p.config)
            .chain(iter::once(config)),
    )
}

/// Expands `devices` with the devices of `profiles`.
///
/// Devices are replaced whole by name; fields of same-named devices are never
/// merged.
pub fn expand_devices(devices: &Devices, profiles: &[Profile]) -> Devices {
    overlay(
        profiles
            .iter()
            .map(|p| &p.devices)
            .chain(iter::once(devices)),
    )
}
