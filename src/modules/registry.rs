use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::Router;
use rusqlite::Connection;
use serde_json::Value;

use super::ModuleMetadata;
use crate::api::AppState;
use crate::db::migrate::{self, Migration};
use crate::OntographError;

/// Backend half of a module, compiled into the binary.
pub trait ModulePlugin: Send + Sync + fmt::Debug {
    /// Module directory name this plugin serves
    fn name(&self) -> &'static str;

    /// Tables the module owns. Names are local to the module; the registry
    /// prefixes them before they reach `schema_migrations`.
    fn migrations(&self) -> Vec<Migration>;

    /// Routes relative to the module's API prefix
    fn router(&self, ctx: &ModuleContext) -> Router<AppState>;
}

/// What a plugin sees of its module when building its router
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub name: String,
    pub display_name: String,
    /// Descriptor defaults merged with the customer override
    pub config: Value,
}

/// Compiled-in plugins keyed by module name
#[derive(Debug, Default, Clone)]
pub struct PluginCatalog {
    plugins: HashMap<String, Arc<dyn ModulePlugin>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every plugin shipped with this binary
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(super::fraud_detection::FraudDetectionPlugin);
        catalog
    }

    pub fn register<P: ModulePlugin + 'static>(&mut self, plugin: P) {
        self.plugins.insert(plugin.name().to_string(), Arc::new(plugin));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModulePlugin>> {
        self.plugins.get(name).cloned()
    }
}

/// Where a module's router is nested
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MountPoint {
    pub prefix: String,
    /// Grouping label for API docs; the module's display name
    pub tag: String,
}

/// A module accepted by the loader
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Directory name; the key plugins and customers refer to
    pub name: String,
    pub metadata: ModuleMetadata,
    /// Effective configuration
    pub config: Value,
    pub mount: Option<MountPoint>,
    /// True when the module's tables should be created
    pub has_models: bool,
    pub(super) plugin: Option<Arc<dyn ModulePlugin>>,
}

impl LoadedModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when a compiled-in backend was found for this module
    pub fn has_backend(&self) -> bool {
        self.plugin.is_some()
    }

    /// True when the backend owns tables but the descriptor lists no
    /// models, so they are never created.
    pub fn tables_skipped(&self) -> bool {
        !self.has_models
            && self
                .plugin
                .as_ref()
                .is_some_and(|plugin| !plugin.migrations().is_empty())
    }

    /// Plugin migrations named `<module>/<migration>`; empty unless the
    /// module declares models.
    fn migrations(&self) -> Vec<Migration> {
        let Some(plugin) = self.plugin.as_ref().filter(|_| self.has_models) else {
            return Vec::new();
        };
        plugin
            .migrations()
            .into_iter()
            .map(|migration| Migration {
                name: format!("{}/{}", self.name, migration.name),
                ..migration
            })
            .collect()
    }

    fn context(&self) -> ModuleContext {
        ModuleContext {
            name: self.name.clone(),
            display_name: self.metadata.display_name.clone(),
            config: self.config.clone(),
        }
    }
}

/// Immutable result of module loading, in load order.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: Vec<LoadedModule>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<LoadedModule>) -> Self {
        Self { modules }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    pub fn get(&self, name: &str) -> Option<&LoadedModule> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Migrations of every module that declares models, named
    /// `<module>/<migration>`.
    pub fn migrations(&self) -> Vec<Migration> {
        self.modules.iter().flat_map(LoadedModule::migrations).collect()
    }

    /// Create each module's tables. A module whose migrations fail is logged
    /// and dropped, so it is neither listed nor mounted.
    pub fn create_tables(self, conn: &mut Connection) -> Self {
        let modules = self
            .modules
            .into_iter()
            .filter(|module| {
                let migrations = module.migrations();
                if migrations.is_empty() {
                    return true;
                }
                match migrate::apply_migrations(conn, &migrations) {
                    Ok(applied) => {
                        log::info!(
                            "Tables of module {} ready ({} migration(s) newly applied)",
                            module.name(),
                            applied
                        );
                        true
                    }
                    Err(e) => {
                        let err = OntographError::Module(format!(
                            "{} unavailable, failed to create its tables: {}",
                            module.name(),
                            e
                        ));
                        log::error!("{}", err);
                        false
                    }
                }
            })
            .collect();
        Self { modules }
    }

    /// Nest every mounted module's router into `router`.
    pub fn mount(&self, mut router: Router<AppState>) -> Router<AppState> {
        for module in &self.modules {
            let (Some(mount), Some(plugin)) = (&module.mount, &module.plugin) else {
                continue;
            };
            log::info!("Mounting module {} at {}", module.name(), mount.prefix);
            router = router.nest(&mount.prefix, plugin.router(&module.context()));
        }
        router
    }
}
