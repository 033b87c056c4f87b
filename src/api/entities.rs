use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::ontology::{
    entities, entity_types, relationships, EntityCreate, EntityFilter, EntityType, EntityTypeCreate,
    EntityTypeUpdate, EntityUpdate, EntityWithType, RelationshipWithDetails,
};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/types", get(list_entity_types).post(create_entity_type))
        .route(
            "/types/:type_id",
            get(get_entity_type).put(update_entity_type).delete(delete_entity_type),
        )
        .route("/", get(list_entities).post(create_entity))
        .route("/:entity_id", get(get_entity).put(update_entity).delete(delete_entity))
        .route("/:entity_id/relationships", get(entity_relationships))
}

#[derive(Debug, Deserialize)]
struct TypeListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EntityListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
    entity_type_id: Option<i64>,
    search: Option<String>,
}

async fn list_entity_types(
    State(state): State<AppState>,
    Query(query): Query<TypeListQuery>,
) -> Result<Json<Vec<EntityType>>> {
    let page = state.page(query.skip, query.limit)?;
    let types = state
        .db
        .with_connection(move |conn| entity_types::list(conn, page))
        .await?;
    Ok(Json(types))
}

async fn create_entity_type(
    State(state): State<AppState>,
    Json(input): Json<EntityTypeCreate>,
) -> Result<(StatusCode, Json<EntityType>)> {
    let created = state
        .db
        .with_connection(move |conn| entity_types::create(conn, &input))
        .await?;
    log::info!("Created entity type {} ({})", created.name, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_entity_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
) -> Result<Json<EntityType>> {
    let found = state
        .db
        .with_connection(move |conn| entity_types::get(conn, type_id))
        .await?;
    Ok(Json(found))
}

async fn update_entity_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
    Json(input): Json<EntityTypeUpdate>,
) -> Result<Json<EntityType>> {
    let updated = state
        .db
        .with_connection(move |conn| entity_types::update(conn, type_id, &input))
        .await?;
    Ok(Json(updated))
}

async fn delete_entity_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db
        .with_connection(move |conn| entity_types::delete(conn, type_id))
        .await?;
    log::info!("Deleted entity type {}", type_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_entities(
    State(state): State<AppState>,
    Query(query): Query<EntityListQuery>,
) -> Result<Json<Vec<EntityWithType>>> {
    let page = state.page(query.skip, query.limit)?;
    let filter = EntityFilter {
        entity_type_id: query.entity_type_id,
        search: query.search.filter(|s| !s.is_empty()),
    };
    let rows = state
        .db
        .with_connection(move |conn| entities::list(conn, &filter, page))
        .await?;
    Ok(Json(rows))
}

async fn create_entity(
    State(state): State<AppState>,
    Json(input): Json<EntityCreate>,
) -> Result<(StatusCode, Json<EntityWithType>)> {
    let created = state
        .db
        .with_connection(move |conn| entities::create(conn, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
) -> Result<Json<EntityWithType>> {
    let found = state
        .db
        .with_connection(move |conn| entities::get_with_type(conn, entity_id))
        .await?;
    Ok(Json(found))
}

async fn update_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
    Json(input): Json<EntityUpdate>,
) -> Result<Json<EntityWithType>> {
    let updated = state
        .db
        .with_connection(move |conn| entities::update(conn, entity_id, &input))
        .await?;
    Ok(Json(updated))
}

async fn delete_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db
        .with_connection(move |conn| entities::delete(conn, entity_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Outgoing then incoming relationships of one entity
async fn entity_relationships(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
) -> Result<Json<Vec<RelationshipWithDetails>>> {
    let rows = state
        .db
        .with_connection(move |conn| relationships::for_entity(conn, entity_id))
        .await?;
    Ok(Json(rows))
}
