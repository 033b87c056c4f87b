use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::AppState;
use crate::modules::{LoadedModule, ModuleMetadata};
use crate::{OntographError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules))
        .route("/:name", get(get_module))
}

#[derive(Debug, Serialize)]
struct ModuleSummary {
    name: String,
    version: String,
    display_name: String,
    description: String,
    #[serde(rename = "type")]
    module_type: String,
    has_backend: bool,
    api_prefix: Option<String>,
}

impl From<&LoadedModule> for ModuleSummary {
    fn from(module: &LoadedModule) -> Self {
        Self {
            name: module.name().to_string(),
            version: module.metadata.version.clone(),
            display_name: module.metadata.display_name.clone(),
            description: module.metadata.description.clone(),
            module_type: module.metadata.module_type.clone(),
            has_backend: module.has_backend(),
            api_prefix: module.mount.as_ref().map(|m| m.prefix.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModuleDetail {
    #[serde(flatten)]
    summary: ModuleSummary,
    metadata: ModuleMetadata,
    config: Value,
}

async fn list_modules(State(state): State<AppState>) -> Json<Vec<ModuleSummary>> {
    Json(state.modules.modules().iter().map(ModuleSummary::from).collect())
}

async fn get_module(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ModuleDetail>> {
    let module = state
        .modules
        .get(&name)
        .ok_or_else(|| OntographError::NotFound("Module not found".to_string()))?;
    Ok(Json(ModuleDetail {
        summary: ModuleSummary::from(module),
        metadata: module.metadata.clone(),
        config: module.config.clone(),
    }))
}
