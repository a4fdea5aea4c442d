use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::schema::{self, SCHEMA};

/// Version recorded once the declared schema has been applied.
pub const SCHEMA_VERSION: i64 = 1;

/// File written by `generate`.
pub const INITIAL_MIGRATION: &str = "0000_initial.sql";

/// DDL for the declared schema, one statement per table.
pub fn statements() -> Vec<String> {
    SCHEMA.iter().map(|t| t.create_sql()).collect()
}

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < SCHEMA_VERSION {
        info!("Applying schema v{} ({} tables)", SCHEMA_VERSION, SCHEMA.len());
        conn.execute_batch(&statements().join("\n"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Write the schema as a SQL migration file under `out_dir`.
///
/// The header records where the declarations live. Regenerating replaces
/// the file in place.
pub fn generate(out_dir: &Path, schema_source: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(INITIAL_MIGRATION);

    let body = format!(
        "-- Generated by scribe-kit from {}\n{}\n",
        schema_source.display(),
        schema::render(SCHEMA)
    );
    fs::write(&path, body)?;

    info!("Wrote migration {}", path.display());
    Ok(path)
}
