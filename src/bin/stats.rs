use ontograph::graph::graph_stats;
use ontograph::{config::Config, db::Db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let stats = db.with_connection(|conn| graph_stats(conn)).await?;

    println!("\n=== Ontograph Statistics ===\n");
    println!("Entity types:       {}", stats.entity_types);
    println!("Relationship types: {}", stats.relationship_types);
    println!("Entities:           {}", stats.total_entities);
    println!("Relationships:      {}", stats.total_relationships);

    if stats.total_entities == 0 {
        println!("\nNo entities yet. Run `seed` to load the demo ontology.");
        return Ok(());
    }

    println!("\nEntities by type:\n");
    println!("{:-<52}", "");
    println!("{:<20} {:<22} {:>8}", "Type", "Display name", "Count");
    println!("{:-<52}", "");
    for row in &stats.entities_by_type {
        println!("{:<20} {:<22} {:>8}", row.type_name, row.display_name, row.count);
    }

    println!("\nRelationships by type:\n");
    println!("{:-<52}", "");
    println!("{:<20} {:<22} {:>8}", "Type", "Display name", "Count");
    println!("{:-<52}", "");
    for row in &stats.relationships_by_type {
        println!("{:<20} {:<22} {:>8}", row.type_name, row.display_name, row.count);
    }
    println!();

    Ok(())
}
