use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, OntographError};

/// A single schema change.
///
/// Core migrations are read from `NNN_name.sql` files; plugin modules build
/// theirs in code and prefix the name with the module name so that both
/// sets share one `schema_migrations` table.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: u32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            version INTEGER NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    ensure_migrations_table(conn)?;
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY applied_at, version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(OntographError::Database)?;
    Ok(names)
}

/// Load migration files from migrations directory
pub fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    let entries = fs::read_dir(migrations_dir).map_err(OntographError::Io)?;

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    files.sort_by_key(|e| e.file_name());

    for entry in files {
        let path = entry.path();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OntographError::Config("Invalid migration filename".to_string()))?;

        // "001_ontology.sql" -> 1
        let version_str = filename
            .split('_')
            .next()
            .ok_or_else(|| OntographError::Config(format!("Invalid migration filename: {}", filename)))?;
        let version: u32 = version_str
            .parse()
            .map_err(|_| OntographError::Config(format!("Invalid migration version: {}", version_str)))?;

        let sql = fs::read_to_string(&path).map_err(OntographError::Io)?;
        let name = filename.trim_end_matches(".sql").to_string();

        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);

    Ok(migrations)
}

/// Apply every migration in `migrations` that has not been recorded yet
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> Result<usize> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;
    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by_key(|m| m.version);

    let mut count = 0;
    for migration in ordered {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;

        tx.execute_batch(&migration.sql).map_err(|e| {
            OntographError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("Failed to execute migration {}: {}", migration.name, e)),
            ))
        })?;

        tx.execute(
            "INSERT INTO schema_migrations (name, version) VALUES (?1, ?2)",
            params![migration.name, migration.version],
        )?;

        tx.commit()?;
        count += 1;

        log::info!("Migration {} applied successfully", migration.name);
    }

    Ok(count)
}

/// Run all pending migrations found in `migrations_dir`
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    let migrations = load_migrations(migrations_dir)?;
    let count = apply_migrations(conn, &migrations)?;
    log::info!("All migrations completed ({} newly applied)", count);
    Ok(())
}
