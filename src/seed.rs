//! Demo ontology: people, companies, locations and a conference.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::ontology::{
    entities, entity_types, relationship_types, relationships, EntityCreate, EntityTypeCreate,
    RelationshipCreate, RelationshipTypeCreate,
};
use crate::Result;

/// Row counts after seeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub entity_types: i64,
    pub entities: i64,
    pub relationship_types: i64,
    pub relationships: i64,
}

fn input<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Delete every ontology row. Relationships go first; relationship types
/// refuse deletion while referenced.
pub fn clear_ontology(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM relationships; \
         DELETE FROM entities; \
         DELETE FROM relationship_types; \
         DELETE FROM entity_types;",
    )?;
    Ok(())
}

/// Replace the ontology with the demo data set in one transaction.
pub fn seed_sample_data(conn: &mut Connection) -> Result<SeedSummary> {
    let tx = conn.transaction()?;
    clear_ontology(&tx)?;

    log::info!("Creating entity types...");
    let entity_type = |name: &str, display: &str, description: &str, icon: &str, color: &str, schema: Value| {
        entity_types::create(
            &tx,
            &input::<EntityTypeCreate>(json!({
                "name": name,
                "display_name": display,
                "description": description,
                "icon": icon,
                "color": color,
                "property_schema": schema,
            }))?,
        )
    };
    let person = entity_type(
        "person",
        "Person",
        "An individual person",
        "user",
        "#3b82f6",
        json!({
            "email": {"type": "string", "required": false},
            "phone": {"type": "string", "required": false},
            "age": {"type": "integer", "required": false}
        }),
    )?;
    let company = entity_type(
        "company",
        "Company",
        "A business organization",
        "building",
        "#10b981",
        json!({
            "industry": {"type": "string", "required": false},
            "founded_year": {"type": "integer", "required": false},
            "employees": {"type": "integer", "required": false}
        }),
    )?;
    let location = entity_type(
        "location",
        "Location",
        "A geographic location",
        "map-pin",
        "#f59e0b",
        json!({
            "address": {"type": "string", "required": false},
            "city": {"type": "string", "required": false},
            "country": {"type": "string", "required": false}
        }),
    )?;
    let event = entity_type(
        "event",
        "Event",
        "A notable event or occurrence",
        "calendar",
        "#8b5cf6",
        json!({
            "date": {"type": "string", "required": false},
            "type": {"type": "string", "required": false}
        }),
    )?;

    log::info!("Creating relationship types...");
    let relationship_type = |name: &str, display: &str, description: &str, forward: &str, reverse: &str, color: &str| {
        relationship_types::create(
            &tx,
            &input::<RelationshipTypeCreate>(json!({
                "name": name,
                "display_name": display,
                "description": description,
                "forward_label": forward,
                "reverse_label": reverse,
                "color": color,
            }))?,
        )
    };
    let works_for = relationship_type("works_for", "Works For", "Employment relationship", "works for", "employs", "#3b82f6")?;
    let located_in = relationship_type("located_in", "Located In", "Location relationship", "located in", "contains", "#10b981")?;
    let attended = relationship_type("attended", "Attended", "Event attendance", "attended", "was attended by", "#f59e0b")?;
    let knows = relationship_type("knows", "Knows", "Personal connection", "knows", "knows", "#ec4899")?;

    log::info!("Creating sample entities...");
    let entity = |type_id: i64, title: &str, description: &str, properties: Value| {
        entities::create(
            &tx,
            &input::<EntityCreate>(json!({
                "entity_type_id": type_id,
                "title": title,
                "description": description,
                "properties": properties,
            }))?,
        )
        .map(|e| e.entity.id)
    };
    let alice = entity(
        person.id,
        "Alice Johnson",
        "Senior Software Engineer",
        json!({"email": "alice@example.com", "age": 32, "phone": "+1-555-0101"}),
    )?;
    let bob = entity(person.id, "Bob Smith", "Product Manager", json!({"email": "bob@example.com", "age": 28}))?;
    let carol = entity(person.id, "Carol Williams", "Data Scientist", json!({"email": "carol@example.com", "age": 35}))?;
    let tech_corp = entity(
        company.id,
        "TechCorp Inc.",
        "Leading technology company",
        json!({"industry": "Technology", "founded_year": 2010, "employees": 5000}),
    )?;
    let data_solutions = entity(
        company.id,
        "Data Solutions Ltd.",
        "Data analytics and consulting",
        json!({"industry": "Data Analytics", "founded_year": 2015, "employees": 200}),
    )?;
    let san_francisco = entity(location.id, "San Francisco", "City in California", json!({"city": "San Francisco", "country": "USA"}))?;
    let new_york = entity(location.id, "New York", "City in New York", json!({"city": "New York", "country": "USA"}))?;
    let conference = entity(
        event.id,
        "Tech Summit 2024",
        "Annual technology conference",
        json!({"date": "2024-03-15", "type": "Conference"}),
    )?;

    log::info!("Creating relationships...");
    let relate = |type_id: i64, from: i64, to: i64, properties: Value| {
        relationships::create(
            &tx,
            &input::<RelationshipCreate>(json!({
                "relationship_type_id": type_id,
                "from_entity_id": from,
                "to_entity_id": to,
                "properties": properties,
            }))?,
        )
        .map(|_| ())
    };
    relate(works_for.id, alice, tech_corp, json!({"position": "Senior Engineer", "since": "2020"}))?;
    relate(works_for.id, bob, tech_corp, json!({"position": "Product Manager", "since": "2021"}))?;
    relate(works_for.id, carol, data_solutions, json!({"position": "Data Scientist", "since": "2019"}))?;
    relate(located_in.id, tech_corp, san_francisco, json!({"headquarters": true}))?;
    relate(located_in.id, data_solutions, new_york, json!({"headquarters": true}))?;
    relate(attended.id, alice, conference, json!({"role": "Speaker"}))?;
    relate(attended.id, bob, conference, json!({"role": "Attendee"}))?;
    relate(attended.id, carol, conference, json!({"role": "Attendee"}))?;
    relate(knows.id, alice, bob, json!({"since": "2021", "context": "Colleagues"}))?;
    relate(knows.id, alice, carol, json!({"since": "2024", "context": "Met at conference"}))?;

    let summary = SeedSummary {
        entity_types: entity_types::count(&tx)?,
        entities: entities::count(&tx)?,
        relationship_types: relationship_types::count(&tx)?,
        relationships: relationships::count(&tx)?,
    };
    tx.commit()?;

    log::info!(
        "Sample data created: {} entity types, {} entities, {} relationship types, {} relationships",
        summary.entity_types,
        summary.entities,
        summary.relationship_types,
        summary.relationships
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::explore;
    use crate::ontology::test_support::migrated_connection;

    #[test]
    fn test_seed_counts() {
        let (mut conn, _temp) = migrated_connection();
        let summary = seed_sample_data(&mut conn).unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                entity_types: 4,
                entities: 8,
                relationship_types: 4,
                relationships: 10,
            }
        );
    }

    #[test]
    fn test_seed_replaces_existing_rows() {
        let (mut conn, _temp) = migrated_connection();
        seed_sample_data(&mut conn).unwrap();
        let again = seed_sample_data(&mut conn).unwrap();
        assert_eq!(again.entities, 8);
        assert_eq!(again.relationships, 10);
    }

    #[test]
    fn test_seeded_graph_is_connected_from_alice() {
        let (mut conn, _temp) = migrated_connection();
        seed_sample_data(&mut conn).unwrap();
        let alice = entity_types::find_by_name(&conn, "person")
            .unwrap()
            .and_then(|person| {
                entities::list(
                    &conn,
                    &crate::ontology::EntityFilter {
                        entity_type_id: Some(person.id),
                        search: Some("Alice".into()),
                    },
                    crate::ontology::Page::UNBOUNDED,
                )
                .unwrap()
                .into_iter()
                .next()
            })
            .unwrap();

        let data = explore(&conn, alice.entity.id, 3).unwrap();
        assert_eq!(data.nodes.len(), 8);
        assert_eq!(data.edges.len(), 10);
    }
}
