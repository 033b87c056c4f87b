//! Ontology store: entity types, entities, relationship types, relationships.
//!
//! Every store function takes a borrowed [`rusqlite::Connection`] so that a
//! request handler can run several of them inside one
//! [`Db::with_connection`](crate::db::Db::with_connection) session.

pub mod entities;
pub mod entity_types;
pub mod relationship_types;
pub mod relationships;

mod models;

pub use models::*;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OntographError, Result};

/// Offset/limit window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    /// Window covering every row; used by stats and enumeration.
    pub const UNBOUNDED: Page = Page { skip: 0, limit: u32::MAX };

    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }
}

/// Current time as stored in timestamp columns
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Parse an RFC 3339 timestamp column
pub(crate) fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_optional_timestamp(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(idx, v)).transpose()
}

/// Decode a JSON text column
pub(crate) fn parse_json_column<T: DeserializeOwned>(idx: usize, value: String) -> rusqlite::Result<T> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_json_column<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(OntographError::Json)
}

/// Reject empty or over-long text fields
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 {
        return Err(OntographError::InvalidInput(format!("{} must not be empty", field)));
    }
    if len > max {
        return Err(OntographError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Distinguishes an absent field from an explicit `null` in partial updates:
/// absent stays `None`, `null` becomes `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Id set bound as one JSON array parameter, so the statement needs a single
/// variable however many ids are asked for.
pub(crate) const IN_ID_SET: &str = "IN (SELECT value FROM json_each(?1))";

pub(crate) fn id_set_param(ids: &[i64]) -> crate::Result<String> {
    Ok(serde_json::to_string(ids)?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length() {
        assert!(check_length("name", "person", 100).is_ok());
        assert!(matches!(check_length("name", "", 100), Err(OntographError::InvalidInput(_))));
        assert!(check_length("name", &"x".repeat(101), 100).is_err());
    }

    #[test]
    fn test_id_set_param() {
        assert_eq!(id_set_param(&[3, 1, 2]).unwrap(), "[3,1,2]");
        assert_eq!(id_set_param(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_timestamp_round_trip_keeps_instant() {
        let stamp = now_timestamp();
        let parsed = parse_timestamp(0, stamp.clone()).unwrap();
        assert_eq!(parsed.to_rfc3339(), stamp);
        assert!(parse_timestamp(0, "yesterday".to_string()).is_err());
    }
}
