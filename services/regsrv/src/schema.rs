//! SQLite schema for the registry
//!
//! Uniqueness and referential integrity live here; the repositories rely on
//! the store rejecting a colliding write atomically instead of checking first.
//!
//! ```rust,ignore
//! let client = common::sqlite::SqliteClient::in_memory().await?;
//! regsrv::schema::init_schema(client.pool()).await?;
//! ```

use sqlx::SqlitePool;

pub const CONNECTIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS connections (
        id TEXT NOT NULL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        port INTEGER NOT NULL UNIQUE,
        protocol_type TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        CONSTRAINT port_range CHECK (port BETWEEN 1 AND 65535),
        CHECK (protocol_type IN ('rtu_over_tcp', 'tcp'))
    )
"#;

pub const SLAVES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS slaves (
        id TEXT NOT NULL PRIMARY KEY,
        connection_id TEXT NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        slave_address INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(connection_id, slave_address),
        UNIQUE(connection_id, name),
        CONSTRAINT slave_address_range CHECK (slave_address BETWEEN 1 AND 247)
    )
"#;

pub const REGISTERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS registers (
        id TEXT NOT NULL PRIMARY KEY,
        slave_id TEXT NOT NULL REFERENCES slaves(id) ON DELETE CASCADE,
        start_address INTEGER NOT NULL,
        hex_payload TEXT NOT NULL,
        names TEXT NOT NULL DEFAULT '',
        coefficients TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(slave_id, start_address),
        CONSTRAINT start_address_range CHECK (start_address BETWEEN 1 AND 49999)
    )
"#;

pub const SLAVES_CONNECTION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_slaves_connection ON slaves(connection_id)";

pub const REGISTERS_SLAVE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_registers_slave_start ON registers(slave_id, start_address)";

/// Create every table and index; safe to run on an existing database
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for ddl in [
        CONNECTIONS_TABLE,
        SLAVES_TABLE,
        REGISTERS_TABLE,
        SLAVES_CONNECTION_INDEX,
        REGISTERS_SLAVE_INDEX,
    ] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}
