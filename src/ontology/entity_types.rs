//! Entity type CRUD.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    now_timestamp, parse_json_column, parse_optional_timestamp, parse_timestamp, to_json_column,
    EntityType, EntityTypeCreate, EntityTypeUpdate, Page,
};
use crate::error::{OntographError, Result};

const COLUMNS: &str =
    "id, name, display_name, description, icon, color, property_schema, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<EntityType> {
    Ok(EntityType {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        color: row.get(5)?,
        property_schema: parse_json_column(6, row.get(6)?)?,
        created_at: parse_timestamp(7, row.get(7)?)?,
        updated_at: parse_optional_timestamp(8, row.get(8)?)?,
    })
}

fn not_found() -> OntographError {
    OntographError::NotFound("Entity type not found".to_string())
}

pub fn list(conn: &Connection, page: Page) -> Result<Vec<EntityType>> {
    let sql = format!("SELECT {} FROM entity_types ORDER BY id LIMIT ?1 OFFSET ?2", COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![page.limit as i64, page.skip as i64], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<EntityType>> {
    let sql = format!("SELECT {} FROM entity_types WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<EntityType> {
    find(conn, id)?.ok_or_else(not_found)
}

pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<EntityType>> {
    let sql = format!("SELECT {} FROM entity_types WHERE name = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [name], from_row).optional()?)
}

pub fn create(conn: &Connection, input: &EntityTypeCreate) -> Result<EntityType> {
    input.validate()?;
    if find_by_name(conn, &input.name)?.is_some() {
        return Err(OntographError::Duplicate("Entity type already exists".to_string()));
    }

    conn.execute(
        "INSERT INTO entity_types (name, display_name, description, icon, color, property_schema, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            input.name,
            input.display_name,
            input.description,
            input.icon,
            input.color,
            to_json_column(&input.property_schema)?,
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::debug!("Created entity type {} ({})", input.name, id);
    get(conn, id)
}

pub fn update(conn: &Connection, id: i64, input: &EntityTypeUpdate) -> Result<EntityType> {
    let mut current = get(conn, id)?;
    input.apply(&mut current)?;

    conn.execute(
        "UPDATE entity_types SET display_name = ?1, description = ?2, icon = ?3, color = ?4, \
         property_schema = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            current.display_name,
            current.description,
            current.icon,
            current.color,
            to_json_column(&current.property_schema)?,
            now_timestamp(),
            id,
        ],
    )?;
    get(conn, id)
}

/// Delete a type; its entities (and their relationships) go with it.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let removed = conn.execute("DELETE FROM entity_types WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(not_found());
    }
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM entity_types", [], |row| row.get(0))?)
}
