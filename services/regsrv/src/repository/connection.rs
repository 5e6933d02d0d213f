//! Connection persistence and the connection tree read

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::{Connection, ConnectionWithSlaves, ProtocolType, Slave};

/// Auto-assigned ports start above this floor
pub const AUTO_PORT_FLOOR: i64 = 501;

/// Validated connection fields ready to insert
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub name: String,
    /// `None` allocates `max(existing ports, 501) + 1`
    pub port: Option<u16>,
    pub protocol_type: ProtocolType,
}

#[derive(Clone)]
pub struct ConnectionRepository {
    pool: SqlitePool,
}

impl ConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a connection, allocating its port inside the same statement
    ///
    /// Port allocation and insert are one statement, so two concurrent
    /// auto-assigned creates serialize on the write lock instead of both
    /// reading the same maximum.
    pub async fn create(&self, new: NewConnection) -> Result<Connection> {
        let id = Uuid::new_v4().to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO connections (id, name, port, protocol_type)
            SELECT ?, ?, COALESCE(?, MAX(COALESCE(MAX(port), 0), ?) + 1), ?
            FROM connections
            RETURNING port
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(new.port.map(i64::from))
        .bind(AUTO_PORT_FLOOR)
        .bind(new.protocol_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        let port: i64 = row.try_get("port")?;
        debug!("Inserted connection {} on port {}", id, port);

        Ok(Connection {
            id,
            name: new.name,
            port: port as u16,
            protocol_type: new.protocol_type,
        })
    }

    /// Overwrite name, port and protocol type
    pub async fn update(&self, connection: &Connection) -> Result<Connection> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET name = ?, port = ?, protocol_type = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&connection.name)
        .bind(i64::from(connection.port))
        .bind(connection.protocol_type.as_str())
        .bind(&connection.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("connection", &connection.id));
        }
        Ok(connection.clone())
    }

    /// Delete a connection; slaves and registers go with it via ON DELETE CASCADE
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("connection", id));
        }
        Ok(())
    }

    /// Every connection with its slaves, by connection name then slave address
    pub async fn tree(&self) -> Result<Vec<ConnectionWithSlaves>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.port, c.protocol_type,
                   s.id AS slave_id, s.name AS slave_name, s.slave_address
            FROM connections c
            LEFT JOIN slaves s ON s.connection_id = c.id
            ORDER BY c.name ASC, c.id ASC, s.slave_address ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tree: Vec<ConnectionWithSlaves> = Vec::new();
        for row in rows {
            let connection = hydrate_connection(&row)?;
            let slave = hydrate_joined_slave(&row, &connection.id)?;

            match tree.last_mut() {
                Some(node) if node.connection.id == connection.id => {
                    node.slaves.extend(slave);
                },
                _ => tree.push(ConnectionWithSlaves {
                    connection,
                    slaves: slave.into_iter().collect(),
                }),
            }
        }
        Ok(tree)
    }
}

fn hydrate_connection(row: &SqliteRow) -> Result<Connection> {
    let protocol: String = row.try_get("protocol_type")?;
    let port: i64 = row.try_get("port")?;
    Ok(Connection {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        port: port as u16,
        protocol_type: protocol
            .parse()
            .map_err(|_| RegistryError::Internal(format!("corrupt protocol_type '{}'", protocol)))?,
    })
}

/// Slave columns of the LEFT JOIN; all NULL for a connection without slaves
fn hydrate_joined_slave(row: &SqliteRow, connection_id: &str) -> Result<Option<Slave>> {
    let slave_id: Option<String> = row.try_get("slave_id")?;
    let Some(id) = slave_id else {
        return Ok(None);
    };
    let address: i64 = row.try_get("slave_address")?;
    Ok(Some(Slave {
        id,
        connection_id: connection_id.to_string(),
        name: row.try_get("slave_name")?,
        slave_address: address as u8,
    }))
}
