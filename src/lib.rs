pub mod api;
pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod modules;
pub mod ontology;
pub mod seed;

pub use config::Config;
pub use error::{OntographError, Result};
pub use graph::{explore_graph, subgraph, GraphData};
