//! Migration runner.

use anyhow::Result;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Apply all `.sql` files from the migrations directory in sorted order.
/// Applied files are recorded in `_schema_migrations` and skipped on rerun.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _schema_migrations (name TEXT PRIMARY KEY)",
        [],
    )?;

    let migrations_dir: PathBuf = std::env::var("MIGRATIONS_DIR")
        .map(Into::into)
        .unwrap_or_else(|_| Path::new("migrations").to_path_buf());
    if !migrations_dir.exists() {
        return Ok(());
    }

    let mut paths: Vec<_> = fs::read_dir(migrations_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "sql"))
        .collect();
    paths.sort();

    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let applied: bool = conn
            .query_row(
                "SELECT 1 FROM _schema_migrations WHERE name = ?1",
                [&name],
                |row| row.get(0),
            )
            .unwrap_or(false);
        if applied {
            continue;
        }

        conn.execute_batch(&fs::read_to_string(&path)?)?;
        conn.execute("INSERT INTO _schema_migrations (name) VALUES (?1)", [&name])?;
        tracing::info!("applied migration {}", name);
    }

    Ok(())
}
