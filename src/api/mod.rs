//! REST surface: ontology CRUD, graph views and the module listing.

mod entities;
mod graph;
mod modules;
mod relationships;
mod server;

pub use server::{create_router, ApiServer};

use std::sync::Arc;

use crate::config::PaginationConfig;
use crate::db::Db;
use crate::modules::ModuleRegistry;
use crate::ontology::Page;
use crate::{OntographError, Result};

/// State shared by every handler, core and module alike
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub pagination: PaginationConfig,
    pub modules: Arc<ModuleRegistry>,
}

impl AppState {
    pub fn new(db: Db, pagination: PaginationConfig, modules: ModuleRegistry) -> Self {
        Self {
            db: Arc::new(db),
            pagination,
            modules: Arc::new(modules),
        }
    }

    /// Resolve `skip`/`limit` query parameters against the configured bounds.
    /// `limit` must be within `1..=max_page_size`.
    pub fn page(&self, skip: Option<u32>, limit: Option<u32>) -> Result<Page> {
        let limit = limit.unwrap_or(self.pagination.default_page_size);
        if limit == 0 || limit > self.pagination.max_page_size {
            return Err(OntographError::InvalidInput(format!(
                "limit must be between 1 and {}",
                self.pagination.max_page_size
            )));
        }
        Ok(Page::new(skip.unwrap_or(0), limit))
    }
}

/// Core resource paths. Module prefixes may not equal or nest under any of
/// them, nor equal the API root itself.
pub fn reserved_prefixes(api_prefix: &str) -> Vec<String> {
    let root = api_prefix.trim_end_matches('/');
    let mut reserved: Vec<String> = ["entities", "relationships", "graph", "modules"]
        .iter()
        .map(|segment| format!("{}/{}", root, segment))
        .collect();
    reserved.push("/health".to_string());
    reserved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(
            Db::new("unused.db"),
            PaginationConfig {
                default_page_size: 50,
                max_page_size: 1000,
            },
            ModuleRegistry::empty(),
        )
    }

    #[test]
    fn test_page_defaults_and_bounds() {
        let state = state();
        assert_eq!(state.page(None, None).unwrap(), Page::new(0, 50));
        assert_eq!(state.page(Some(10), Some(1000)).unwrap(), Page::new(10, 1000));
        assert!(matches!(state.page(None, Some(0)), Err(OntographError::InvalidInput(_))));
        assert!(matches!(state.page(None, Some(1001)), Err(OntographError::InvalidInput(_))));
    }

    #[test]
    fn test_reserved_prefixes() {
        let reserved = reserved_prefixes("/api/v1/");
        assert!(reserved.contains(&"/api/v1/entities".to_string()));
        assert!(!reserved.contains(&"/api/v1".to_string()));
        assert!(reserved.contains(&"/health".to_string()));
        assert!(!reserved.contains(&"/api/v1/fraud-detection".to_string()));
    }
}
