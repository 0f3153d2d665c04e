use crate::error::MassEditError;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Tables owned by the mass edit service. The edited model tables belong to the
/// host application and are described by the registry instead.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_key TEXT PRIMARY KEY,
    data        TEXT NOT NULL,
    expire_at   INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    username     TEXT PRIMARY KEY,
    is_active    INTEGER NOT NULL DEFAULT 1,
    is_staff     INTEGER NOT NULL DEFAULT 0,
    is_superuser INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS user_permissions (
    username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    codename TEXT NOT NULL,
    PRIMARY KEY (username, codename)
);
";

pub fn open(path: &Path) -> Result<Connection, MassEditError> {
    let conn = Connection::open(path)?;
    // Request handlers and worker jobs share the file.
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), MassEditError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Quotes an SQL identifier. Identifiers only ever come from the validated registry.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
