//! Relationship type CRUD.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    now_timestamp, parse_json_column, parse_optional_timestamp, parse_timestamp, to_json_column,
    Page, RelationshipType, RelationshipTypeCreate, RelationshipTypeUpdate,
};
use crate::error::{OntographError, Result};

const COLUMNS: &str = "id, name, display_name, description, forward_label, reverse_label, color, \
                       line_style, property_schema, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<RelationshipType> {
    Ok(RelationshipType {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        forward_label: row.get(4)?,
        reverse_label: row.get(5)?,
        color: row.get(6)?,
        line_style: row.get(7)?,
        property_schema: parse_json_column(8, row.get(8)?)?,
        created_at: parse_timestamp(9, row.get(9)?)?,
        updated_at: parse_optional_timestamp(10, row.get(10)?)?,
    })
}

fn not_found() -> OntographError {
    OntographError::NotFound("Relationship type not found".to_string())
}

pub fn list(conn: &Connection, page: Page) -> Result<Vec<RelationshipType>> {
    let sql = format!("SELECT {} FROM relationship_types ORDER BY id LIMIT ?1 OFFSET ?2", COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![page.limit as i64, page.skip as i64], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<RelationshipType>> {
    let sql = format!("SELECT {} FROM relationship_types WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<RelationshipType> {
    find(conn, id)?.ok_or_else(not_found)
}

pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<RelationshipType>> {
    let sql = format!("SELECT {} FROM relationship_types WHERE name = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [name], from_row).optional()?)
}

pub fn create(conn: &Connection, input: &RelationshipTypeCreate) -> Result<RelationshipType> {
    input.validate()?;
    if find_by_name(conn, &input.name)?.is_some() {
        return Err(OntographError::Duplicate("Relationship type already exists".to_string()));
    }

    conn.execute(
        "INSERT INTO relationship_types (name, display_name, description, forward_label, reverse_label, \
         color, line_style, property_schema, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            input.name,
            input.display_name,
            input.description,
            input.forward_label,
            input.reverse_label,
            input.color,
            input.line_style,
            to_json_column(&input.property_schema)?,
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::debug!("Created relationship type {} ({})", input.name, id);
    get(conn, id)
}

pub fn update(conn: &Connection, id: i64, input: &RelationshipTypeUpdate) -> Result<RelationshipType> {
    let mut current = get(conn, id)?;
    input.apply(&mut current)?;

    conn.execute(
        "UPDATE relationship_types SET display_name = ?1, description = ?2, forward_label = ?3, \
         reverse_label = ?4, color = ?5, line_style = ?6, property_schema = ?7, updated_at = ?8 \
         WHERE id = ?9",
        params![
            current.display_name,
            current.description,
            current.forward_label,
            current.reverse_label,
            current.color,
            current.line_style,
            to_json_column(&current.property_schema)?,
            now_timestamp(),
            id,
        ],
    )?;
    get(conn, id)
}

/// Delete a relationship type. Types still referenced by relationships are
/// refused rather than cascaded.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    get(conn, id)?;

    let in_use: i64 = conn.query_row(
        "SELECT COUNT(*) FROM relationships WHERE relationship_type_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    if in_use > 0 {
        return Err(OntographError::InvalidInput(format!(
            "Relationship type is used by {} relationship(s)",
            in_use
        )));
    }

    conn.execute("DELETE FROM relationship_types WHERE id = ?1", [id])?;
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM relationship_types", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::test_support::*;

    #[test]
    fn test_create_keeps_labels() {
        let (conn, _temp) = migrated_connection();
        let works_for = relationship_type(&conn, "works_for", "works for", "employs");
        let fetched = get(&conn, works_for.id).unwrap();
        assert_eq!(fetched.forward_label, "works for");
        assert_eq!(fetched.reverse_label, "employs");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (conn, _temp) = migrated_connection();
        relationship_type(&conn, "knows", "knows", "knows");
        let err = create(
            &conn,
            &RelationshipTypeCreate {
                name: "knows".into(),
                display_name: "Knows".into(),
                description: None,
                forward_label: "knows".into(),
                reverse_label: "knows".into(),
                color: None,
                line_style: None,
                property_schema: Default::default(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, OntographError::Duplicate(_)));
    }

    #[test]
    fn test_update_labels() {
        let (conn, _temp) = migrated_connection();
        let rt = relationship_type(&conn, "works_for", "works for", "employs");
        let updated = super::update(
            &conn,
            rt.id,
            &RelationshipTypeUpdate {
                reverse_label: Some("employer of".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.reverse_label, "employer of");
        assert_eq!(updated.forward_label, "works for");

        let empty = super::update(
            &conn,
            rt.id,
            &RelationshipTypeUpdate { forward_label: Some(String::new()), ..Default::default() },
        );
        assert!(matches!(empty, Err(OntographError::InvalidInput(_))));
    }

    #[test]
    fn test_delete_in_use_is_refused() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let knows = relationship_type(&conn, "knows", "knows", "knows");
        let a = entity(&conn, person.id, "A");
        let b = entity(&conn, person.id, "B");
        relate(&conn, knows.id, a.id, b.id);

        assert!(matches!(delete(&conn, knows.id), Err(OntographError::InvalidInput(_))));
        assert!(find(&conn, knows.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_unused() {
        let (conn, _temp) = migrated_connection();
        let knows = relationship_type(&conn, "knows", "knows", "knows");
        delete(&conn, knows.id).unwrap();
        assert!(matches!(get(&conn, knows.id), Err(OntographError::NotFound(_))));
        assert!(matches!(delete(&conn, knows.id), Err(OntographError::NotFound(_))));
    }
}
