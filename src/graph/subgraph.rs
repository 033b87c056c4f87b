//! Induced subgraph over an explicit entity id set.

use rusqlite::Connection;

use super::{GraphData, TypeCache};
use crate::ontology::{entities, relationships};
use crate::{OntographError, Result};

/// Parse a comma-delimited id list such as `"1, 2,3"`.
pub fn parse_entity_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| OntographError::InvalidInput("Invalid entity IDs format".to_string()))
        })
        .collect()
}

/// Nodes for every existing entity in `entity_ids` and the relationships
/// whose two endpoints are both in the set.
///
/// Ids that match no entity are dropped silently; only when none match is
/// the call an error.
pub fn subgraph(conn: &Connection, entity_ids: &[i64]) -> Result<GraphData> {
    let mut ids = entity_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let found = entities::find_many(conn, &ids)?;
    if found.is_empty() {
        return Err(OntographError::NotFound("No entities found".to_string()));
    }

    let mut types = TypeCache::default();
    let nodes = found
        .iter()
        .map(|entity| types.node(conn, entity))
        .collect::<Result<Vec<_>>>()?;

    let edges = relationships::among(conn, &ids)?
        .iter()
        .map(|rel| types.edge(conn, rel))
        .collect::<Result<Vec<_>>>()?;

    Ok(GraphData { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::test_support::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_entity_ids() {
        assert_eq!(parse_entity_ids("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_entity_ids(" 4 , 5 ").unwrap(), vec![4, 5]);
        assert!(matches!(parse_entity_ids("1,x"), Err(OntographError::InvalidInput(_))));
        assert!(parse_entity_ids("").is_err());
        assert!(parse_entity_ids("1,,2").is_err());
    }

    #[test]
    fn test_only_internal_edges() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let knows = relationship_type(&conn, "knows", "knows", "knows");
        let a = entity(&conn, person.id, "A");
        let b = entity(&conn, person.id, "B");
        let c = entity(&conn, person.id, "C");
        let d = entity(&conn, person.id, "D");
        let ab = relate(&conn, knows.id, a.id, b.id);
        let bc = relate(&conn, knows.id, b.id, c.id);
        relate(&conn, knows.id, c.id, d.id);
        relate(&conn, knows.id, d.id, a.id);

        let data = subgraph(&conn, &[a.id, b.id, c.id]).unwrap();
        let nodes: HashSet<i64> = data.nodes.iter().map(|n| n.id).collect();
        let edges: HashSet<i64> = data.edges.iter().map(|e| e.id).collect();
        assert_eq!(nodes, HashSet::from([a.id, b.id, c.id]));
        assert_eq!(edges, HashSet::from([ab.id, bc.id]));
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let a = entity(&conn, person.id, "A");

        let data = subgraph(&conn, &[a.id, 9_999]).unwrap();
        assert_eq!(data.nodes.len(), 1);
        assert_eq!(data.nodes[0].id, a.id);
        assert!(data.edges.is_empty());
    }

    #[test]
    fn test_no_match_is_not_found() {
        let (conn, _temp) = migrated_connection();
        assert!(matches!(subgraph(&conn, &[1, 2]), Err(OntographError::NotFound(_))));
    }

    #[test]
    fn test_repeated_ids_yield_one_node() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let a = entity(&conn, person.id, "A");
        let data = subgraph(&conn, &[a.id, a.id]).unwrap();
        assert_eq!(data.nodes.len(), 1);
    }

    #[test]
    fn test_large_id_list() {
        let (conn, _temp) = migrated_connection();
        let person = entity_type(&conn, "person");
        let knows = relationship_type(&conn, "knows", "knows", "knows");
        let a = entity(&conn, person.id, "A");
        let b = entity(&conn, person.id, "B");
        let ab = relate(&conn, knows.id, a.id, b.id);

        let mut ids: Vec<i64> = (100_000..120_000).collect();
        ids.push(a.id);
        ids.push(b.id);

        let data = subgraph(&conn, &ids).unwrap();
        let nodes: HashSet<i64> = data.nodes.iter().map(|n| n.id).collect();
        assert_eq!(nodes, HashSet::from([a.id, b.id]));
        assert_eq!(data.edges.len(), 1);
        assert_eq!(data.edges[0].id, ab.id);
    }
}
