use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::Register;

/// Validated register fields; the payload is already uppercase
#[derive(Debug, Clone)]
pub struct RegisterValues {
    pub start_address: u16,
    pub hex_payload: String,
    pub names: String,
    pub coefficients: String,
}

#[derive(Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers of one slave ordered by start address
    pub async fn list(&self, slave_id: &str) -> Result<Vec<Register>> {
        let rows = sqlx::query(
            r#"
            SELECT id, slave_id, start_address, hex_payload, names, coefficients
            FROM registers
            WHERE slave_id = ?
            ORDER BY start_address ASC
            "#,
        )
        .bind(slave_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(hydrate_register).collect()
    }

    pub async fn create(&self, slave_id: &str, values: RegisterValues) -> Result<Register> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO registers (id, slave_id, start_address, hex_payload, names, coefficients)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(slave_id)
        .bind(i64::from(values.start_address))
        .bind(&values.hex_payload)
        .bind(&values.names)
        .bind(&values.coefficients)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::from(e).missing_parent("slave", slave_id))?;

        Ok(Register {
            id,
            slave_id: slave_id.to_string(),
            start_address: values.start_address,
            hex_payload: values.hex_payload,
            names: values.names,
            coefficients: values.coefficients,
        })
    }

    /// Overwrite a register that belongs to `slave_id`
    pub async fn update(
        &self,
        slave_id: &str,
        register_id: &str,
        values: RegisterValues,
    ) -> Result<Register> {
        let result = sqlx::query(
            r#"
            UPDATE registers
            SET start_address = ?, hex_payload = ?, names = ?, coefficients = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND slave_id = ?
            "#,
        )
        .bind(i64::from(values.start_address))
        .bind(&values.hex_payload)
        .bind(&values.names)
        .bind(&values.coefficients)
        .bind(register_id)
        .bind(slave_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("register", register_id));
        }

        Ok(Register {
            id: register_id.to_string(),
            slave_id: slave_id.to_string(),
            start_address: values.start_address,
            hex_payload: values.hex_payload,
            names: values.names,
            coefficients: values.coefficients,
        })
    }

    pub async fn delete(&self, slave_id: &str, register_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM registers WHERE id = ? AND slave_id = ?")
            .bind(register_id)
            .bind(slave_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("register", register_id));
        }
        Ok(())
    }
}

fn hydrate_register(row: &SqliteRow) -> Result<Register> {
    let start_address: i64 = row.try_get("start_address")?;
    Ok(Register {
        id: row.try_get("id")?,
        slave_id: row.try_get("slave_id")?,
        start_address: start_address as u16,
        hex_payload: row.try_get("hex_payload")?,
        names: row.try_get("names")?,
        coefficients: row.try_get("coefficients")?,
    })
}
