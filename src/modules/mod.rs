//! Per-customer plugin modules.
//!
//! A module is a directory under the modules root holding a `module.json`
//! descriptor. Its backend half (routes and tables) is provided by a
//! compiled-in [`ModulePlugin`] looked up by module name in a
//! [`PluginCatalog`]; nothing is loaded from disk except JSON.
//!
//! Loading is a startup build step: [`ModuleLoader`] reads descriptors and
//! customer configuration and is consumed into an immutable
//! [`ModuleRegistry`], which is handed to the router assembly and mounted
//! once.

pub mod fraud_detection;
mod loader;
mod metadata;
mod registry;

pub use loader::{CustomerConfig, CustomerModules, LoadMode, ModuleLoader};
pub use metadata::{parse_metadata, BackendSpec, ModuleMetadata, MODULE_DESCRIPTOR};
pub use registry::{LoadedModule, ModuleContext, ModulePlugin, ModuleRegistry, MountPoint, PluginCatalog};

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Module and customer names become path components, so only a
/// conservative character set is accepted.
pub fn is_valid_name(name: &str) -> bool {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid module name pattern")
    });
    re.is_match(name) && !name.contains("..")
}

/// Deep-merge `overlay` into `base`: objects merge key by key, any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_config(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_config(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
