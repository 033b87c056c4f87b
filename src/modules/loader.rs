use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use super::{
    is_valid_name, merge_config, parse_metadata, LoadedModule, ModuleMetadata, ModuleRegistry,
    MountPoint, PluginCatalog, MODULE_DESCRIPTOR,
};
use crate::config::{Config, ModulesConfig};

/// `customers/<id>/config.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerConfig {
    #[serde(default)]
    pub modules: CustomerModules,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerModules {
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Per-module overrides keyed by module name
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Which modules to load at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMode {
    /// Only the modules the customer's config.json enables
    Customer(String),
    /// Every discovered module
    Development,
}

impl LoadMode {
    pub fn from_config(config: &ModulesConfig) -> Self {
        match &config.customer_id {
            Some(id) => LoadMode::Customer(id.clone()),
            None => LoadMode::Development,
        }
    }
}

/// Reads descriptors and customer configuration, accumulating accepted
/// modules until [`ModuleLoader::into_registry`] freezes them.
#[derive(Debug)]
pub struct ModuleLoader {
    modules_dir: PathBuf,
    customers_dir: PathBuf,
    catalog: PluginCatalog,
    api_root: String,
    reserved_prefixes: Vec<String>,
    customer: Option<(String, CustomerConfig)>,
    loaded: Vec<LoadedModule>,
}

impl ModuleLoader {
    pub fn new(
        modules_dir: impl Into<PathBuf>,
        customers_dir: impl Into<PathBuf>,
        catalog: PluginCatalog,
    ) -> Self {
        let api_root = "/api/v1".to_string();
        Self {
            modules_dir: modules_dir.into(),
            customers_dir: customers_dir.into(),
            catalog,
            reserved_prefixes: crate::api::reserved_prefixes(&api_root),
            api_root,
            customer: None,
            loaded: Vec::new(),
        }
    }

    /// Root under which modules without an `apiPrefix` are mounted
    pub fn with_api_root(mut self, api_root: &str) -> Self {
        self.api_root = api_root.trim_end_matches('/').to_string();
        self.reserved_prefixes = crate::api::reserved_prefixes(&self.api_root);
        self
    }

    /// Names of module directories containing a descriptor, sorted.
    pub fn discover(&self) -> Vec<String> {
        if !self.modules_dir.is_dir() {
            log::warn!("Modules directory not found: {}", self.modules_dir.display());
            return Vec::new();
        }

        let mut names: Vec<String> = WalkDir::new(&self.modules_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| entry.path().join(MODULE_DESCRIPTOR).is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        log::info!("Discovered {} module(s): {:?}", names.len(), names);
        names
    }

    /// Descriptor of `name`, or `None` (logged) when it is missing or malformed.
    pub fn load_metadata(&self, name: &str) -> Option<ModuleMetadata> {
        if !is_valid_name(name) {
            log::error!("Invalid module name: {:?}", name);
            return None;
        }

        let path = self.modules_dir.join(name).join(MODULE_DESCRIPTOR);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Module descriptor not found for {}: {} ({})", name, path.display(), e);
                return None;
            }
        };

        match parse_metadata(name, &text) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                log::error!("Error loading metadata for {}: {}", name, e);
                None
            }
        }
    }

    /// `config.json` of a customer, or `None` (logged) when it is missing
    /// or malformed.
    pub fn load_customer_config(&self, customer_id: &str) -> Option<CustomerConfig> {
        if !is_valid_name(customer_id) {
            log::error!("Invalid customer id: {:?}", customer_id);
            return None;
        }

        let path = self.customers_dir.join(customer_id).join("config.json");
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                log::warn!("No configuration found for customer: {}", customer_id);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(config) => Some(config),
            Err(e) => {
                log::error!("Error loading config for customer {}: {}", customer_id, e);
                None
            }
        }
    }

    pub fn enabled_modules_for_customer(&self, customer_id: &str) -> Vec<String> {
        self.load_customer_config(customer_id)
            .map(|c| c.modules.enabled)
            .unwrap_or_default()
    }

    /// The customer's override for one module; an empty object when none.
    pub fn module_config_for_customer(&self, customer_id: &str, module_name: &str) -> Value {
        self.load_customer_config(customer_id)
            .and_then(|mut c| c.modules.config.remove(module_name))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Load one module. Returns false only when its descriptor cannot be
    /// read; a module whose backend is unavailable is still recorded.
    pub fn load(&mut self, name: &str) -> bool {
        if self.loaded.iter().any(|m| m.name() == name) {
            log::debug!("Module {} already loaded", name);
            return true;
        }

        let Some(metadata) = self.load_metadata(name) else {
            return false;
        };

        let mut config = Value::Object(metadata.config.clone());
        if let Some((customer_id, customer)) = &self.customer {
            if let Some(overlay) = customer.modules.config.get(name) {
                log::debug!("Applying {} overrides to module {}", customer_id, name);
                merge_config(&mut config, overlay);
            }
        }

        let mut module = LoadedModule {
            name: name.to_string(),
            metadata,
            config,
            mount: None,
            has_models: false,
            plugin: None,
        };

        if module.metadata.backend.enabled {
            match self.catalog.get(name) {
                None => {
                    log::error!("Error importing module {}: no backend built into this binary", name);
                }
                Some(plugin) => {
                    if !module.metadata.backend.routes.is_empty() {
                        match self.resolve_prefix(name, &module.metadata) {
                            Ok(prefix) => {
                                module.mount = Some(MountPoint {
                                    prefix,
                                    tag: module.metadata.display_name.clone(),
                                })
                            }
                            Err(reason) => {
                                log::error!("Routes of module {} not mounted: {}", name, reason)
                            }
                        }
                    }
                    module.has_models = !module.metadata.backend.models.is_empty();
                    module.plugin = Some(plugin);
                    if module.mount.is_some() && module.tables_skipped() {
                        log::warn!(
                            "Module {} is mounted but lists no models; its tables will not be created",
                            name
                        );
                    }
                }
            }
        }

        log::info!(
            "Loaded module: {} v{}",
            module.metadata.display_name,
            module.metadata.version
        );
        self.loaded.push(module);
        true
    }

    /// Load according to `mode`, returning how many modules were accepted.
    pub fn load_all(&mut self, mode: &LoadMode) -> usize {
        let names = match mode {
            LoadMode::Customer(customer_id) => {
                log::info!("Loading modules for customer: {}", customer_id);
                let Some(customer) = self.load_customer_config(customer_id) else {
                    return 0;
                };
                let enabled = customer.modules.enabled.clone();
                self.customer = Some((customer_id.clone(), customer));
                enabled
            }
            LoadMode::Development => {
                log::info!("No customer configured, loading all modules");
                self.discover()
            }
        };

        names.iter().filter(|name| self.load(name)).count()
    }

    pub fn loaded(&self) -> &[LoadedModule] {
        &self.loaded
    }

    pub fn into_registry(self) -> ModuleRegistry {
        ModuleRegistry::new(self.loaded)
    }

    fn resolve_prefix(&self, name: &str, metadata: &ModuleMetadata) -> Result<String, String> {
        let prefix = metadata
            .backend
            .api_prefix
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.api_root, name));

        if !prefix.starts_with('/') {
            return Err(format!("prefix {:?} must start with '/'", prefix));
        }
        if prefix == "/" || prefix.ends_with('/') || prefix == self.api_root {
            return Err(format!("prefix {:?} must name a path below the root", prefix));
        }
        if prefix.contains(':') || prefix.contains('*') {
            return Err(format!("prefix {:?} must not contain path parameters", prefix));
        }
        if self
            .reserved_prefixes
            .iter()
            .any(|r| prefix == *r || prefix.starts_with(&format!("{}/", r)))
        {
            return Err(format!("prefix {} overlaps a core route", prefix));
        }
        if let Some(other) = self
            .loaded
            .iter()
            .find(|m| m.mount.as_ref().is_some_and(|mount| mount.prefix == prefix))
        {
            return Err(format!("prefix {} is already used by module {}", prefix, other.name()));
        }
        Ok(prefix)
    }
}

impl ModuleLoader {
    /// Load the modules selected by `config` into an immutable registry.
    pub fn build(config: &Config, catalog: PluginCatalog) -> ModuleRegistry {
        let mut loader = ModuleLoader::new(
            &config.modules.modules_dir,
            &config.modules.customers_dir,
            catalog,
        )
        .with_api_root(&config.server.api_prefix);

        let count = loader.load_all(&LoadMode::from_config(&config.modules));
        log::info!("Module loading finished: {} module(s) loaded", count);
        loader.into_registry()
    }
}
