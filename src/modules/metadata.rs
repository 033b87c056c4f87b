use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Descriptor file every module directory must contain
pub const MODULE_DESCRIPTOR: &str = "module.json";

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_module_type() -> String {
    "standard".to_string()
}

/// Parsed `module.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "type", default = "default_module_type")]
    pub module_type: String,
    #[serde(default)]
    pub dependencies: Map<String, Value>,
    #[serde(default)]
    pub backend: BackendSpec,
    #[serde(default)]
    pub frontend: Map<String, Value>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Module defaults; customers override keys through their config.json
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// `backend` section of a descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Route sources; non-empty means the module's router is mounted
    #[serde(default)]
    pub routes: Vec<String>,
    /// Model sources; non-empty means the module's tables are created
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub api_prefix: Option<String>,
}

/// Parse descriptor text for the module living in `dir_name`.
/// Missing `name` and `displayName` fall back to the directory name.
pub fn parse_metadata(dir_name: &str, text: &str) -> Result<ModuleMetadata> {
    let mut metadata: ModuleMetadata = serde_json::from_str(text)?;
    if metadata.name.is_empty() {
        metadata.name = dir_name.to_string();
    }
    if metadata.display_name.is_empty() {
        metadata.display_name = dir_name.to_string();
    }
    Ok(metadata)
}
