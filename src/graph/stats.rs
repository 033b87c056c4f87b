use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::ontology::{entities, entity_types, relationship_types, relationships};
use crate::Result;

/// Instance count for one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub type_name: String,
    pub display_name: String,
    pub count: i64,
}

/// Aggregate counts over the whole ontology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_entities: i64,
    pub total_relationships: i64,
    pub entity_types: i64,
    pub relationship_types: i64,
    pub entities_by_type: Vec<TypeCount>,
    pub relationships_by_type: Vec<TypeCount>,
}

fn counts_by_type(conn: &Connection, sql: &str) -> Result<Vec<TypeCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TypeCount {
                type_name: row.get(0)?,
                display_name: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

/// Counts come straight from the tables, so they always agree with an
/// unbounded listing. Types without instances report zero.
pub fn graph_stats(conn: &Connection) -> Result<GraphStats> {
    Ok(GraphStats {
        total_entities: entities::count(conn)?,
        total_relationships: relationships::count(conn)?,
        entity_types: entity_types::count(conn)?,
        relationship_types: relationship_types::count(conn)?,
        entities_by_type: counts_by_type(
            conn,
            "SELECT t.name, t.display_name, COUNT(e.id) FROM entity_types t \
             LEFT JOIN entities e ON e.entity_type_id = t.id \
             GROUP BY t.id, t.name, t.display_name ORDER BY t.id",
        )?,
        relationships_by_type: counts_by_type(
            conn,
            "SELECT t.name, t.display_name, COUNT(r.id) FROM relationship_types t \
             LEFT JOIN relationships r ON r.relationship_type_id = t.id \
             GROUP BY t.id, t.name, t.display_name ORDER BY t.id",
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::test_support::*;
    use crate::ontology::{EntityFilter, Page, RelationshipFilter};

    #[test]
    fn test_empty_store() {
        let (conn, _temp) = migrated_connection();
        let stats = graph_stats(&conn).unwrap();
        assert_eq!(stats.total_entities, 0);
        assert!(stats.entities_by_type.is_empty());
    }

    #[test]
    fn test_stats_match_enumeration() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let event = entity_type(&conn, "event");
        let knows = relationship_type(&conn, "knows", "knows", "knows");
        let a = entity(&conn, person.id, "A");
        let b = entity(&conn, person.id, "B");
        relate(&conn, knows.id, a.id, b.id);

        let stats = graph_stats(&conn).unwrap();
        let listed_entities = entities::list(&conn, &EntityFilter::default(), Page::UNBOUNDED).unwrap();
        let listed_rels = relationships::list(&conn, &RelationshipFilter::default(), Page::UNBOUNDED).unwrap();
        assert_eq!(stats.total_entities as usize, listed_entities.len());
        assert_eq!(stats.total_relationships as usize, listed_rels.len());
        assert_eq!(stats.entity_types, 2);
        assert_eq!(stats.relationship_types, 1);

        let by_type: Vec<(String, i64)> = stats
            .entities_by_type
            .iter()
            .map(|c| (c.type_name.clone(), c.count))
            .collect();
        assert_eq!(by_type, vec![("person".to_string(), 2), (event.name.clone(), 0)]);
        assert_eq!(stats.relationships_by_type[0].count, 1);
    }
}
