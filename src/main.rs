use anyhow::Result;
use clap::{Parser, Subcommand};
use ontograph::api::{ApiServer, AppState};
use ontograph::db::{migrate, Db};
use ontograph::modules::{ModuleLoader, ModuleRegistry, PluginCatalog};
use ontograph::Config;

#[derive(Parser, Debug)]
#[command(name = "ontograph")]
#[command(about = "Ontology CRUD, graph exploration and per-customer modules over HTTP")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations, load modules and serve the API (default)
    Serve,
    /// Apply core and module migrations, then exit
    Migrate,
    /// List the modules that would be loaded for the configured customer
    Modules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load()?;

    // RUST_LOG wins over log_level from config.toml
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.log_level),
    )
    .init();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await?,
        Command::Migrate => {
            prepare_database(&config).await?;
        }
        Command::Modules => list_modules(&config),
    }

    Ok(())
}

/// Apply core migrations, load modules and apply theirs.
async fn prepare_database(config: &Config) -> Result<(Db, ModuleRegistry)> {
    let db = Db::new(config.db_path());

    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;
    log::info!("Database initialized: {}", config.db_path().display());

    let registry = ModuleLoader::build(config, PluginCatalog::builtin());

    let registry = db
        .with_connection(move |conn| Ok(registry.create_tables(conn)))
        .await?;

    Ok((db, registry))
}

async fn run_server(config: Config) -> Result<()> {
    log::info!("Starting Ontograph v{}", env!("CARGO_PKG_VERSION"));
    match &config.modules.customer_id {
        Some(customer_id) => log::info!("Customer: {}", customer_id),
        None => log::info!("No customer configured (development mode)"),
    }

    let (db, registry) = prepare_database(&config).await?;
    let state = AppState::new(db, config.pagination, registry);

    let server = ApiServer::new(&config, state);
    server.run().await?;

    Ok(())
}

fn list_modules(config: &Config) {
    let registry = ModuleLoader::build(config, PluginCatalog::builtin());

    if registry.is_empty() {
        println!("No modules loaded.");
        return;
    }

    println!("{:<24} {:<10} {:<10} {}", "Module", "Version", "Type", "Mounted at");
    println!("{:-<72}", "");
    for module in registry.modules() {
        let mount = module
            .mount
            .as_ref()
            .map(|m| m.prefix.as_str())
            .unwrap_or("-");
        println!(
            "{:<24} {:<10} {:<10} {}",
            module.name(),
            module.metadata.version,
            module.metadata.module_type,
            mount
        );
    }
}
