use anyhow::Result;
use clap::Parser;
use ontograph::db::{migrate, Db};
use ontograph::seed::{clear_ontology, seed_sample_data};
use ontograph::Config;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Load the demo ontology into the configured database")]
struct Args {
    /// Only delete existing ontology rows, do not insert sample data
    #[arg(short, long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    if args.clear {
        db.with_connection(|conn| clear_ontology(conn)).await?;
        println!("Ontology cleared.");
        return Ok(());
    }

    let summary = db.with_connection(seed_sample_data).await?;

    println!("Sample data created successfully!");
    println!("  - {} entity types", summary.entity_types);
    println!("  - {} entities", summary.entities);
    println!("  - {} relationship types", summary.relationship_types);
    println!("  - {} relationships", summary.relationships);

    Ok(())
}
