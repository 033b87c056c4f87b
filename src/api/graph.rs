use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::graph::{self, GraphData, GraphStats};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/explore/:entity_id", get(explore))
        .route("/subgraph", get(subgraph))
        .route("/stats", get(stats))
}

fn default_depth() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ExploreQuery {
    #[serde(default = "default_depth")]
    depth: u32,
}

#[derive(Debug, Deserialize)]
struct SubgraphQuery {
    /// Comma-separated ids, e.g. `1,2,3`
    entity_ids: String,
}

async fn explore(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<GraphData>> {
    graph::validate_depth(query.depth)?;
    let data = graph::explore_graph(&state.db, entity_id, query.depth).await?;
    Ok(Json(data))
}

async fn subgraph(
    State(state): State<AppState>,
    Query(query): Query<SubgraphQuery>,
) -> Result<Json<GraphData>> {
    let ids = graph::parse_entity_ids(&query.entity_ids)?;
    let data = state
        .db
        .with_connection(move |conn| graph::subgraph(conn, &ids))
        .await?;
    Ok(Json(data))
}

async fn stats(State(state): State<AppState>) -> Result<Json<GraphStats>> {
    let stats = state.db.with_connection(|conn| graph::graph_stats(conn)).await?;
    Ok(Json(stats))
}
