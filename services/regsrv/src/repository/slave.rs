use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::Slave;

#[derive(Clone)]
pub struct SlaveRepository {
    pool: SqlitePool,
}

impl SlaveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a slave under `connection_id`
    ///
    /// A missing connection surfaces as NotFound through the foreign key.
    pub async fn create(&self, connection_id: &str, name: &str, slave_address: u8) -> Result<Slave> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO slaves (id, connection_id, name, slave_address)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(connection_id)
        .bind(name)
        .bind(i64::from(slave_address))
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::from(e).missing_parent("connection", connection_id))?;

        Ok(Slave {
            id,
            connection_id: connection_id.to_string(),
            name: name.to_string(),
            slave_address,
        })
    }

    /// Overwrite name and address of a slave that belongs to `slave.connection_id`
    pub async fn update(&self, slave: &Slave) -> Result<Slave> {
        let result = sqlx::query(
            r#"
            UPDATE slaves
            SET name = ?, slave_address = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND connection_id = ?
            "#,
        )
        .bind(&slave.name)
        .bind(i64::from(slave.slave_address))
        .bind(&slave.id)
        .bind(&slave.connection_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("slave", &slave.id));
        }
        Ok(slave.clone())
    }

    /// Delete a slave; its registers go with it via ON DELETE CASCADE
    pub async fn delete(&self, connection_id: &str, slave_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM slaves WHERE id = ? AND connection_id = ?")
            .bind(slave_id)
            .bind(connection_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("slave", slave_id));
        }
        Ok(())
    }
}
