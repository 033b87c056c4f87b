//! Entity CRUD and lookups used by the graph engine.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension, Row};

use super::{
    entity_types, id_set_param, now_timestamp, parse_json_column, parse_optional_timestamp,
    parse_timestamp, to_json_column, Entity, EntityCreate, EntityFilter, EntityType, EntityUpdate,
    EntityWithType, Page, IN_ID_SET,
};
use crate::error::{OntographError, Result};

const COLUMNS: &str =
    "id, entity_type_id, title, description, properties, created_at, updated_at, created_by";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        entity_type_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        properties: parse_json_column(4, row.get(4)?)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
        updated_at: parse_optional_timestamp(6, row.get(6)?)?,
        created_by: row.get(7)?,
    })
}

fn not_found() -> OntographError {
    OntographError::NotFound("Entity not found".to_string())
}

/// Attach each entity's type, looking every type up once
fn with_types(conn: &Connection, entities: Vec<Entity>) -> Result<Vec<EntityWithType>> {
    let mut types: HashMap<i64, EntityType> = HashMap::new();
    let mut out = Vec::with_capacity(entities.len());
    for entity in entities {
        if !types.contains_key(&entity.entity_type_id) {
            let entity_type = entity_types::get(conn, entity.entity_type_id)?;
            types.insert(entity.entity_type_id, entity_type);
        }
        let entity_type = types[&entity.entity_type_id].clone();
        out.push(EntityWithType { entity, entity_type });
    }
    Ok(out)
}

pub fn list(conn: &Connection, filter: &EntityFilter, page: Page) -> Result<Vec<EntityWithType>> {
    let mut clauses = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(type_id) = filter.entity_type_id {
        clauses.push("entity_type_id = ?");
        values.push(SqlValue::Integer(type_id));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        // LIKE is case-insensitive for ASCII in SQLite
        clauses.push("title LIKE ? ESCAPE '\\'");
        let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        values.push(SqlValue::Text(format!("%{}%", escaped)));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(SqlValue::Integer(page.limit as i64));
    values.push(SqlValue::Integer(page.skip as i64));

    let sql = format!(
        "SELECT {} FROM entities {} ORDER BY id LIMIT ? OFFSET ?",
        COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    with_types(conn, rows)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Entity>> {
    let sql = format!("SELECT {} FROM entities WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<Entity> {
    find(conn, id)?.ok_or_else(not_found)
}

pub fn get_with_type(conn: &Connection, id: i64) -> Result<EntityWithType> {
    let entity = get(conn, id)?;
    let entity_type = entity_types::get(conn, entity.entity_type_id)?;
    Ok(EntityWithType { entity, entity_type })
}

/// Entities whose ids are in `ids`; unknown ids are skipped
pub fn find_many(conn: &Connection, ids: &[i64]) -> Result<Vec<Entity>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT {} FROM entities WHERE id {} ORDER BY id", COLUMNS, IN_ID_SET);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([id_set_param(ids)?], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn create(conn: &Connection, input: &EntityCreate) -> Result<EntityWithType> {
    input.validate()?;
    let entity_type = entity_types::find(conn, input.entity_type_id)?
        .ok_or_else(|| OntographError::InvalidInput("Entity type not found".to_string()))?;

    conn.execute(
        "INSERT INTO entities (entity_type_id, title, description, properties, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.entity_type_id,
            input.title,
            input.description,
            to_json_column(&input.properties)?,
            now_timestamp(),
        ],
    )?;
    let entity = get(conn, conn.last_insert_rowid())?;
    Ok(EntityWithType { entity, entity_type })
}

pub fn update(conn: &Connection, id: i64, input: &EntityUpdate) -> Result<EntityWithType> {
    let mut current = get(conn, id)?;
    input.apply(&mut current)?;

    conn.execute(
        "UPDATE entities SET title = ?1, description = ?2, properties = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            current.title,
            current.description,
            to_json_column(&current.properties)?,
            now_timestamp(),
            id,
        ],
    )?;
    get_with_type(conn, id)
}

/// Delete an entity; every relationship touching it goes with it.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let removed = conn.execute("DELETE FROM entities WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(not_found());
    }
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?)
}
