use axum::{http::HeaderValue, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{entities, graph, modules, relationships, AppState};
use crate::config::{Config, ServerConfig};
use crate::{OntographError, Result};

/// Check if a port is available by attempting to bind to it
async fn check_port_available(host: &str, port: u16) -> bool {
    tokio::net::TcpListener::bind((host, port)).await.is_ok()
}

/// HTTP server for the ontology API and mounted modules
pub struct ApiServer {
    state: AppState,
    server: ServerConfig,
}

impl ApiServer {
    pub fn new(config: &Config, state: AppState) -> Self {
        Self {
            state,
            server: config.server.clone(),
        }
    }

    /// Run the HTTP server until it fails
    pub async fn run(&self) -> Result<()> {
        let app = create_router(self.state.clone(), &self.server);

        let addr = format!("{}:{}", self.server.host, self.server.port);
        log::info!("Starting ontology API on http://{}", addr);
        log::info!("API root: http://{}{}", addr, self.server.api_prefix);

        if !check_port_available(&self.server.host, self.server.port).await {
            return Err(OntographError::Config(format!(
                "Port {} is already in use. Stop the other process or set server.port in config.toml",
                self.server.port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            OntographError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            OntographError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    // An empty list means no restriction (local development)
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assemble core routes, mounted modules and middleware.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .nest("/entities", entities::routes())
        .nest("/relationships", relationships::routes())
        .nest("/graph", graph::routes())
        .nest("/modules", modules::routes());

    let router = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .nest(&server.api_prefix, api);

    state
        .modules
        .mount(router)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.allowed_origins)),
        )
        .with_state(state)
}

async fn handle_root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
