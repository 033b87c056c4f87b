use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_length, deserialize_some};
use crate::error::Result;

/// Free-form property bag stored on entities and relationships.
pub type Properties = serde_json::Map<String, Value>;

/// Declared shape of `properties` on instances of a type. Not enforced on write.
pub type PropertySchema = BTreeMap<String, PropertyDefinition>;

/// One declared property: its value type and whether it is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
}

// ============================================================================
// Entity types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub property_schema: PropertySchema,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityTypeCreate {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub property_schema: PropertySchema,
}

impl EntityTypeCreate {
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, 100)?;
        check_length("display_name", &self.display_name, 200)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityTypeUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
    #[serde(default)]
    pub property_schema: Option<PropertySchema>,
}

impl EntityTypeUpdate {
    /// Overwrite only the supplied fields
    pub fn apply(&self, target: &mut EntityType) -> Result<()> {
        if let Some(display_name) = &self.display_name {
            check_length("display_name", display_name, 200)?;
            target.display_name = display_name.clone();
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(icon) = &self.icon {
            target.icon = icon.clone();
        }
        if let Some(color) = &self.color {
            target.color = color.clone();
        }
        if let Some(schema) = &self.property_schema {
            target.property_schema = schema.clone();
        }
        Ok(())
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub entity_type_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
}

/// Entity with its type embedded, as returned by the entity endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWithType {
    #[serde(flatten)]
    pub entity: Entity,
    pub entity_type: EntityType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityCreate {
    pub entity_type_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl EntityCreate {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 500)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl EntityUpdate {
    pub fn apply(&self, target: &mut Entity) -> Result<()> {
        if let Some(title) = &self.title {
            check_length("title", title, 500)?;
            target.title = title.clone();
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(properties) = &self.properties {
            target.properties = properties.clone();
        }
        Ok(())
    }
}

/// Filters accepted by the entity listing
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub entity_type_id: Option<i64>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

// ============================================================================
// Relationship types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Label shown when reading the edge from source to target, e.g. "works for"
    pub forward_label: String,
    /// Label for the opposite direction, e.g. "employs"
    pub reverse_label: String,
    pub color: Option<String>,
    pub line_style: Option<String>,
    pub property_schema: PropertySchema,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_line_style() -> Option<String> {
    Some("solid".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipTypeCreate {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub forward_label: String,
    pub reverse_label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_line_style")]
    pub line_style: Option<String>,
    #[serde(default)]
    pub property_schema: PropertySchema,
}

impl RelationshipTypeCreate {
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, 100)?;
        check_length("display_name", &self.display_name, 200)?;
        check_length("forward_label", &self.forward_label, 100)?;
        check_length("reverse_label", &self.reverse_label, 100)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipTypeUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub forward_label: Option<String>,
    #[serde(default)]
    pub reverse_label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub line_style: Option<Option<String>>,
    #[serde(default)]
    pub property_schema: Option<PropertySchema>,
}

impl RelationshipTypeUpdate {
    pub fn apply(&self, target: &mut RelationshipType) -> Result<()> {
        if let Some(display_name) = &self.display_name {
            check_length("display_name", display_name, 200)?;
            target.display_name = display_name.clone();
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(label) = &self.forward_label {
            check_length("forward_label", label, 100)?;
            target.forward_label = label.clone();
        }
        if let Some(label) = &self.reverse_label {
            check_length("reverse_label", label, 100)?;
            target.reverse_label = label.clone();
        }
        if let Some(color) = &self.color {
            target.color = color.clone();
        }
        if let Some(line_style) = &self.line_style {
            target.line_style = line_style.clone();
        }
        if let Some(schema) = &self.property_schema {
            target.property_schema = schema.clone();
        }
        Ok(())
    }
}

// ============================================================================
// Relationships
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub relationship_type_id: i64,
    pub from_entity_id: i64,
    pub to_entity_id: i64,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
}

/// Relationship with its type and both endpoints embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipWithDetails {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub relationship_type: RelationshipType,
    pub from_entity: Entity,
    pub to_entity: Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipCreate {
    pub relationship_type_id: i64,
    pub from_entity_id: i64,
    pub to_entity_id: i64,
    #[serde(default)]
    pub properties: Properties,
}

/// Only the property bag of a relationship is mutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipUpdate {
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl RelationshipUpdate {
    pub fn apply(&self, target: &mut Relationship) {
        if let Some(properties) = &self.properties {
            target.properties = properties.clone();
        }
    }
}

/// Filters accepted by the relationship listing
#[derive(Debug, Clone, Default)]
pub struct RelationshipFilter {
    pub relationship_type_id: Option<i64>,
    /// Matches either endpoint
    pub entity_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_update_distinguishes_null_from_absent() {
        let update: EntityUpdate = serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(update.description, Some(None));
        assert!(update.title.is_none());

        let update: EntityUpdate = serde_json::from_value(json!({"title": "Bob"})).unwrap();
        assert!(update.description.is_none());
    }

    #[test]
    fn test_relationship_type_create_defaults() {
        let create: RelationshipTypeCreate = serde_json::from_value(json!({
            "name": "works_for",
            "display_name": "Works For",
            "forward_label": "works for",
            "reverse_label": "employs"
        }))
        .unwrap();
        assert_eq!(create.line_style.as_deref(), Some("solid"));
        assert!(create.property_schema.is_empty());
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_property_schema_shape() {
        let create: EntityTypeCreate = serde_json::from_value(json!({
            "name": "person",
            "display_name": "Person",
            "property_schema": {"email": {"type": "string", "required": false}, "age": {"type": "integer"}}
        }))
        .unwrap();
        assert_eq!(create.property_schema["email"].kind, "string");
        assert!(!create.property_schema["age"].required);
    }

    #[test]
    fn test_empty_title_rejected() {
        let create = EntityCreate {
            entity_type_id: 1,
            title: String::new(),
            description: None,
            properties: Properties::new(),
        };
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_entity_with_type_flattens() {
        let now = Utc::now();
        let value = serde_json::to_value(EntityWithType {
            entity: Entity {
                id: 7,
                entity_type_id: 1,
                title: "Alice".into(),
                description: None,
                properties: Properties::new(),
                created_at: now,
                updated_at: None,
                created_by: None,
            },
            entity_type: EntityType {
                id: 1,
                name: "person".into(),
                display_name: "Person".into(),
                description: None,
                icon: None,
                color: None,
                property_schema: PropertySchema::new(),
                created_at: now,
                updated_at: None,
            },
        })
        .unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["title"], "Alice");
        assert_eq!(value["entity_type"]["name"], "person");
    }
}
