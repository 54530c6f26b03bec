use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::is_identifier;
use crate::entities::User;

/// Open (or create) a database file with WAL enabled.
pub fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Create the tables the bundled entities map to.
///
/// Schema ownership sits with the application, not the mappers: mappers
/// assume their table exists.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Users Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
        [],
    )?;

    Ok(())
}

/// Load users from a CSV with a `first_name,last_name,email,password` header.
///
/// Rows come back without identity; saving them assigns one.
pub fn load_users_csv(csv_path: &Path) -> Result<Vec<User>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut users = Vec::new();
    for result in rdr.deserialize() {
        let user: User = result.context("Failed to deserialize user")?;
        users.push(user);
    }

    Ok(users)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    if !is_identifier(table) {
        return Err(anyhow!("Refusing to count rows of {:?}", table));
    }

    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;

    Ok(count)
}
