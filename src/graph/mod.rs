//! Graph views over the ontology: bounded exploration from a seed entity,
//! induced subgraphs over an id set, and aggregate counts.
//!
//! Nodes and edges are derived view objects, never persisted. Each carries
//! the display decoration (color, icon, label) of its type record.

mod stats;
mod subgraph;
mod traversal;

pub use stats::{graph_stats, GraphStats, TypeCount};
pub use subgraph::{parse_entity_ids, subgraph};
pub use traversal::{explore, explore_graph, validate_depth, MAX_DEPTH, MIN_DEPTH};

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ontology::{entity_types, relationship_types, Entity, EntityType, Properties, Relationship, RelationshipType};

/// Node representation for graph visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub entity_type_id: i64,
    pub entity_type_name: String,
    pub properties: Properties,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Edge representation for graph visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub relationship_type_id: i64,
    pub properties: Properties,
    pub color: Option<String>,
}

/// Complete graph payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphNode {
    pub fn new(entity: &Entity, entity_type: &EntityType) -> Self {
        Self {
            id: entity.id,
            kind: "entity".to_string(),
            title: entity.title.clone(),
            entity_type_id: entity.entity_type_id,
            entity_type_name: entity_type.name.clone(),
            properties: entity.properties.clone(),
            color: entity_type.color.clone(),
            icon: entity_type.icon.clone(),
        }
    }
}

impl GraphEdge {
    /// Edges always carry the forward label, whichever direction the walk
    /// crossed them in.
    pub fn new(relationship: &Relationship, relationship_type: &RelationshipType) -> Self {
        Self {
            id: relationship.id,
            source: relationship.from_entity_id,
            target: relationship.to_entity_id,
            kind: "relationship".to_string(),
            label: relationship_type.forward_label.clone(),
            relationship_type_id: relationship.relationship_type_id,
            properties: relationship.properties.clone(),
            color: relationship_type.color.clone(),
        }
    }
}

/// Per-call cache of type records used to decorate nodes and edges
#[derive(Default)]
struct TypeCache {
    entity_types: HashMap<i64, EntityType>,
    relationship_types: HashMap<i64, RelationshipType>,
}

impl TypeCache {
    fn node(&mut self, conn: &Connection, entity: &Entity) -> Result<GraphNode> {
        if !self.entity_types.contains_key(&entity.entity_type_id) {
            let entity_type = entity_types::get(conn, entity.entity_type_id)?;
            self.entity_types.insert(entity.entity_type_id, entity_type);
        }
        Ok(GraphNode::new(entity, &self.entity_types[&entity.entity_type_id]))
    }

    fn edge(&mut self, conn: &Connection, relationship: &Relationship) -> Result<GraphEdge> {
        let type_id = relationship.relationship_type_id;
        if !self.relationship_types.contains_key(&type_id) {
            let relationship_type = relationship_types::get(conn, type_id)?;
            self.relationship_types.insert(type_id, relationship_type);
        }
        Ok(GraphEdge::new(relationship, &self.relationship_types[&type_id]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let data = GraphData {
            nodes: vec![GraphNode {
                id: 1,
                kind: "entity".into(),
                title: "Alice".into(),
                entity_type_id: 3,
                entity_type_name: "person".into(),
                properties: Properties::new(),
                color: Some("#3b82f6".into()),
                icon: Some("user".into()),
            }],
            edges: vec![],
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["nodes"][0]["type"], "entity");
        assert_eq!(value["nodes"][0]["entity_type_name"], "person");
        assert!(value["edges"].as_array().unwrap().is_empty());
    }
}
