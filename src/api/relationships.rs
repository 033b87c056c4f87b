use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::ontology::{
    relationship_types, relationships, RelationshipCreate, RelationshipFilter, RelationshipType,
    RelationshipTypeCreate, RelationshipTypeUpdate, RelationshipUpdate, RelationshipWithDetails,
};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/types",
            get(list_relationship_types).post(create_relationship_type),
        )
        .route(
            "/types/:type_id",
            get(get_relationship_type)
                .put(update_relationship_type)
                .delete(delete_relationship_type),
        )
        .route("/", get(list_relationships).post(create_relationship))
        .route(
            "/:relationship_id",
            get(get_relationship)
                .put(update_relationship)
                .delete(delete_relationship),
        )
}

#[derive(Debug, Deserialize)]
struct TypeListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RelationshipListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
    relationship_type_id: Option<i64>,
    entity_id: Option<i64>,
}

async fn list_relationship_types(
    State(state): State<AppState>,
    Query(query): Query<TypeListQuery>,
) -> Result<Json<Vec<RelationshipType>>> {
    let page = state.page(query.skip, query.limit)?;
    let types = state
        .db
        .with_connection(move |conn| relationship_types::list(conn, page))
        .await?;
    Ok(Json(types))
}

async fn create_relationship_type(
    State(state): State<AppState>,
    Json(input): Json<RelationshipTypeCreate>,
) -> Result<(StatusCode, Json<RelationshipType>)> {
    let created = state
        .db
        .with_connection(move |conn| relationship_types::create(conn, &input))
        .await?;
    log::info!("Created relationship type {} ({})", created.name, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_relationship_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
) -> Result<Json<RelationshipType>> {
    let found = state
        .db
        .with_connection(move |conn| relationship_types::get(conn, type_id))
        .await?;
    Ok(Json(found))
}

async fn update_relationship_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
    Json(input): Json<RelationshipTypeUpdate>,
) -> Result<Json<RelationshipType>> {
    let updated = state
        .db
        .with_connection(move |conn| relationship_types::update(conn, type_id, &input))
        .await?;
    Ok(Json(updated))
}

async fn delete_relationship_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db
        .with_connection(move |conn| relationship_types::delete(conn, type_id))
        .await?;
    log::info!("Deleted relationship type {}", type_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_relationships(
    State(state): State<AppState>,
    Query(query): Query<RelationshipListQuery>,
) -> Result<Json<Vec<RelationshipWithDetails>>> {
    let page = state.page(query.skip, query.limit)?;
    let filter = RelationshipFilter {
        relationship_type_id: query.relationship_type_id,
        entity_id: query.entity_id,
    };
    let rows = state
        .db
        .with_connection(move |conn| relationships::list(conn, &filter, page))
        .await?;
    Ok(Json(rows))
}

async fn create_relationship(
    State(state): State<AppState>,
    Json(input): Json<RelationshipCreate>,
) -> Result<(StatusCode, Json<RelationshipWithDetails>)> {
    let created = state
        .db
        .with_connection(move |conn| relationships::create(conn, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_relationship(
    State(state): State<AppState>,
    Path(relationship_id): Path<i64>,
) -> Result<Json<RelationshipWithDetails>> {
    let found = state
        .db
        .with_connection(move |conn| relationships::get_with_details(conn, relationship_id))
        .await?;
    Ok(Json(found))
}

/// Only `properties` can change; endpoints and type are fixed at creation.
async fn update_relationship(
    State(state): State<AppState>,
    Path(relationship_id): Path<i64>,
    Json(input): Json<RelationshipUpdate>,
) -> Result<Json<RelationshipWithDetails>> {
    let updated = state
        .db
        .with_connection(move |conn| relationships::update(conn, relationship_id, &input))
        .await?;
    Ok(Json(updated))
}

async fn delete_relationship(
    State(state): State<AppState>,
    Path(relationship_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db
        .with_connection(move |conn| relationships::delete(conn, relationship_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
