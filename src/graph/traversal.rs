//! Depth-bounded exploration from a seed entity.

use std::collections::HashSet;

use rusqlite::Connection;

use super::{GraphData, GraphEdge, GraphNode, TypeCache};
use crate::db::Db;
use crate::ontology::{entities, relationships, Relationship};
use crate::{OntographError, Result};

/// Smallest accepted traversal depth
pub const MIN_DEPTH: u32 = 1;
/// Largest accepted traversal depth
pub const MAX_DEPTH: u32 = 5;

pub fn validate_depth(depth: u32) -> Result<()> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(OntographError::InvalidInput(format!(
            "depth must be between {} and {}",
            MIN_DEPTH, MAX_DEPTH
        )));
    }
    Ok(())
}

/// An entity being expanded: its depth and the relationships (with the
/// entity on their far side) not crossed yet.
struct Frame {
    depth: u32,
    pending: std::vec::IntoIter<(Relationship, i64)>,
}

/// Walk state owned by one [`explore`] call.
struct Walk<'c> {
    conn: &'c Connection,
    max_depth: u32,
    visited_entities: HashSet<i64>,
    visited_relationships: HashSet<i64>,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    types: TypeCache,
    stack: Vec<Frame>,
}

impl<'c> Walk<'c> {
    fn new(conn: &'c Connection, max_depth: u32) -> Self {
        Self {
            conn,
            max_depth,
            visited_entities: HashSet::new(),
            visited_relationships: HashSet::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            types: TypeCache::default(),
            stack: Vec::new(),
        }
    }

    /// Record `entity_id` as a node and, below the depth bound, push a frame
    /// holding its outgoing then incoming relationships.
    fn enter(&mut self, entity_id: i64, depth: u32) -> Result<()> {
        if depth > self.max_depth || !self.visited_entities.insert(entity_id) {
            return Ok(());
        }
        // Missing entities (deleted mid-walk) are skipped
        let Some(entity) = entities::find(self.conn, entity_id)? else {
            return Ok(());
        };
        self.nodes.push(self.types.node(self.conn, &entity)?);

        if depth >= self.max_depth {
            return Ok(());
        }

        let mut pending: Vec<(Relationship, i64)> = relationships::outgoing(self.conn, entity_id)?
            .into_iter()
            .map(|rel| {
                let neighbor = rel.to_entity_id;
                (rel, neighbor)
            })
            .collect();
        pending.extend(
            relationships::incoming(self.conn, entity_id)?
                .into_iter()
                .map(|rel| {
                    let neighbor = rel.from_entity_id;
                    (rel, neighbor)
                }),
        );
        self.stack.push(Frame {
            depth,
            pending: pending.into_iter(),
        });
        Ok(())
    }

    /// Cross relationships one at a time, entering each neighbor before the
    /// next relationship of the same entity is looked at.
    fn run(mut self, seed_entity_id: i64) -> Result<GraphData> {
        self.enter(seed_entity_id, 0)?;

        while let Some(frame) = self.stack.last_mut() {
            let depth = frame.depth + 1;
            let Some((rel, neighbor)) = frame.pending.next() else {
                self.stack.pop();
                continue;
            };
            if !self.visited_relationships.insert(rel.id) {
                continue;
            }
            self.edges.push(self.types.edge(self.conn, &rel)?);
            self.enter(neighbor, depth)?;
        }

        Ok(GraphData {
            nodes: self.nodes,
            edges: self.edges,
        })
    }
}

/// Explore the graph around `seed_entity_id` up to `max_depth` hops.
///
/// Depth-first: each not-yet-seen relationship (outgoing first, then
/// incoming) is crossed and the entity on its far side is explored fully
/// before the next relationship. An entity is expanded only at the depth it
/// is first reached, so a long path that reaches it at `max_depth` leaves it
/// a leaf. Every entity yields one node and every relationship one edge,
/// however many paths reach them.
pub fn explore(conn: &Connection, seed_entity_id: i64, max_depth: u32) -> Result<GraphData> {
    validate_depth(max_depth)?;
    entities::get(conn, seed_entity_id)?;

    let data = Walk::new(conn, max_depth).run(seed_entity_id)?;

    log::debug!(
        "Explored entity {} to depth {}: {} nodes, {} edges",
        seed_entity_id,
        max_depth,
        data.nodes.len(),
        data.edges.len()
    );
    Ok(data)
}

/// Run [`explore`] inside one scoped database session.
pub async fn explore_graph(db: &Db, seed_entity_id: i64, max_depth: u32) -> Result<GraphData> {
    db.with_connection(move |conn| explore(conn, seed_entity_id, max_depth))
        .await
}
