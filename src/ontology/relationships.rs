//! Relationship CRUD plus the adjacency queries the graph engine walks.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension, Row};

use super::{
    entities, id_set_param, now_timestamp, parse_json_column, parse_optional_timestamp,
    parse_timestamp, relationship_types, to_json_column, Entity, Page, Relationship,
    RelationshipCreate, RelationshipFilter, RelationshipType, RelationshipUpdate,
    RelationshipWithDetails, IN_ID_SET,
};
use crate::error::{OntographError, Result};

const COLUMNS: &str = "id, relationship_type_id, from_entity_id, to_entity_id, properties, \
                       created_at, updated_at, created_by";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        relationship_type_id: row.get(1)?,
        from_entity_id: row.get(2)?,
        to_entity_id: row.get(3)?,
        properties: parse_json_column(4, row.get(4)?)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
        updated_at: parse_optional_timestamp(6, row.get(6)?)?,
        created_by: row.get(7)?,
    })
}

fn not_found() -> OntographError {
    OntographError::NotFound("Relationship not found".to_string())
}

fn query(conn: &Connection, sql: &str, values: Vec<SqlValue>) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

/// Attach type and endpoint records, looking each one up once
fn with_details(conn: &Connection, relationships: Vec<Relationship>) -> Result<Vec<RelationshipWithDetails>> {
    let mut types: HashMap<i64, RelationshipType> = HashMap::new();
    let mut ends: HashMap<i64, Entity> = HashMap::new();
    let mut out = Vec::with_capacity(relationships.len());

    for relationship in relationships {
        if !types.contains_key(&relationship.relationship_type_id) {
            let rt = relationship_types::get(conn, relationship.relationship_type_id)?;
            types.insert(rt.id, rt);
        }
        for id in [relationship.from_entity_id, relationship.to_entity_id] {
            if !ends.contains_key(&id) {
                ends.insert(id, entities::get(conn, id)?);
            }
        }
        out.push(RelationshipWithDetails {
            relationship_type: types[&relationship.relationship_type_id].clone(),
            from_entity: ends[&relationship.from_entity_id].clone(),
            to_entity: ends[&relationship.to_entity_id].clone(),
            relationship,
        });
    }
    Ok(out)
}

pub fn list(conn: &Connection, filter: &RelationshipFilter, page: Page) -> Result<Vec<RelationshipWithDetails>> {
    let mut clauses = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(type_id) = filter.relationship_type_id {
        clauses.push("relationship_type_id = ?");
        values.push(SqlValue::Integer(type_id));
    }
    if let Some(entity_id) = filter.entity_id {
        clauses.push("(from_entity_id = ? OR to_entity_id = ?)");
        values.push(SqlValue::Integer(entity_id));
        values.push(SqlValue::Integer(entity_id));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(SqlValue::Integer(page.limit as i64));
    values.push(SqlValue::Integer(page.skip as i64));

    let sql = format!(
        "SELECT {} FROM relationships {} ORDER BY id LIMIT ? OFFSET ?",
        COLUMNS, where_clause
    );
    let rows = query(conn, &sql, values)?;
    with_details(conn, rows)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Relationship>> {
    let sql = format!("SELECT {} FROM relationships WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<Relationship> {
    find(conn, id)?.ok_or_else(not_found)
}

pub fn get_with_details(conn: &Connection, id: i64) -> Result<RelationshipWithDetails> {
    let relationship = get(conn, id)?;
    with_details(conn, vec![relationship])?
        .pop()
        .ok_or_else(not_found)
}

/// Relationships leaving `entity_id`
pub fn outgoing(conn: &Connection, entity_id: i64) -> Result<Vec<Relationship>> {
    let sql = format!("SELECT {} FROM relationships WHERE from_entity_id = ? ORDER BY id", COLUMNS);
    query(conn, &sql, vec![SqlValue::Integer(entity_id)])
}

/// Relationships arriving at `entity_id`
pub fn incoming(conn: &Connection, entity_id: i64) -> Result<Vec<Relationship>> {
    let sql = format!("SELECT {} FROM relationships WHERE to_entity_id = ? ORDER BY id", COLUMNS);
    query(conn, &sql, vec![SqlValue::Integer(entity_id)])
}

/// Outgoing followed by incoming relationships of an existing entity.
/// A self-loop appears in both halves.
pub fn for_entity(conn: &Connection, entity_id: i64) -> Result<Vec<RelationshipWithDetails>> {
    entities::get(conn, entity_id)?;
    let mut all = outgoing(conn, entity_id)?;
    all.extend(incoming(conn, entity_id)?);
    with_details(conn, all)
}

/// Relationships with both endpoints in `ids`
pub fn among(conn: &Connection, ids: &[i64]) -> Result<Vec<Relationship>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {} FROM relationships WHERE from_entity_id {} AND to_entity_id {} ORDER BY id",
        COLUMNS, IN_ID_SET, IN_ID_SET
    );
    query(conn, &sql, vec![SqlValue::Text(id_set_param(ids)?)])
}

pub fn create(conn: &Connection, input: &RelationshipCreate) -> Result<RelationshipWithDetails> {
    if relationship_types::find(conn, input.relationship_type_id)?.is_none() {
        return Err(OntographError::InvalidInput("Relationship type not found".to_string()));
    }
    let from = entities::find(conn, input.from_entity_id)?;
    let to = entities::find(conn, input.to_entity_id)?;
    if from.is_none() || to.is_none() {
        return Err(OntographError::InvalidInput("One or both entities not found".to_string()));
    }

    conn.execute(
        "INSERT INTO relationships (relationship_type_id, from_entity_id, to_entity_id, properties, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.relationship_type_id,
            input.from_entity_id,
            input.to_entity_id,
            to_json_column(&input.properties)?,
            now_timestamp(),
        ],
    )?;
    get_with_details(conn, conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, input: &RelationshipUpdate) -> Result<RelationshipWithDetails> {
    let mut current = get(conn, id)?;
    input.apply(&mut current);

    conn.execute(
        "UPDATE relationships SET properties = ?1, updated_at = ?2 WHERE id = ?3",
        params![to_json_column(&current.properties)?, now_timestamp(), id],
    )?;
    get_with_details(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let removed = conn.execute("DELETE FROM relationships WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(not_found());
    }
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?)
}
