use std::sync::Arc;
use tracing::info;

use super::{find_connection, find_slave};
use crate::coherency::CacheCoherency;
use crate::error::{RegistryError, Result};
use crate::models::{ConnectionWithSlaves, CreateSlave, Slave, UpdateSlave};
use crate::repository::{ConnectionRepository, SlaveRepository};
use crate::validation;

pub struct SlaveService {
    slaves: SlaveRepository,
    connections: ConnectionRepository,
    coherency: Arc<CacheCoherency>,
}

impl SlaveService {
    pub fn new(
        slaves: SlaveRepository,
        connections: ConnectionRepository,
        coherency: Arc<CacheCoherency>,
    ) -> Self {
        Self {
            slaves,
            connections,
            coherency,
        }
    }

    pub async fn create(&self, req: CreateSlave) -> Result<Slave> {
        let connection_id = validation::require_id("connection_id", &req.connection_id)?;
        let name = validation::name("name", &req.name)?;
        let address = validation::slave_address(req.slave_address)?;

        let tree = self.connections.tree().await?;
        let node = find_connection(&tree, connection_id)?;
        check_siblings(node, None, &name, address)?;

        let slave = self.slaves.create(connection_id, &name, address).await?;

        // Clears anything left behind by an earlier slave at this address
        self.coherency
            .invalidate(node.connection.port, slave.slave_address);

        info!(
            "Created slave {} ({}) address {} on connection {}",
            slave.name, slave.id, slave.slave_address, node.connection.name
        );
        Ok(slave)
    }

    /// Rename or re-address a slave
    ///
    /// Both the old and the new `(port, address)` entries are invalidated.
    pub async fn update(&self, req: UpdateSlave) -> Result<Slave> {
        let connection_id = validation::require_id("connection_id", &req.connection_id)?;
        let slave_id = validation::require_id("slave_id", &req.slave_id)?;
        let name = validation::name("name", &req.name)?;
        let address = validation::slave_address(req.slave_address)?;

        let tree = self.connections.tree().await?;
        let node = find_connection(&tree, connection_id)?;
        let existing = find_slave(node, slave_id)?;
        let old_address = existing.slave_address;
        check_siblings(node, Some(slave_id), &name, address)?;

        let updated = self
            .slaves
            .update(&Slave {
                id: slave_id.to_string(),
                connection_id: connection_id.to_string(),
                name,
                slave_address: address,
            })
            .await?;

        let port = node.connection.port;
        self.coherency.invalidate(port, old_address);
        self.coherency.invalidate(port, updated.slave_address);

        info!(
            "Updated slave {} ({}) address {} -> {}",
            updated.name, updated.id, old_address, updated.slave_address
        );
        Ok(updated)
    }

    /// Delete a slave and its registers
    ///
    /// The cache entry is dropped before the delete runs and again after it,
    /// since a reader in between still sees the slave and may repopulate it.
    pub async fn delete(&self, connection_id: &str, slave_id: &str) -> Result<()> {
        let connection_id = validation::require_id("connection_id", connection_id)?;
        let slave_id = validation::require_id("slave_id", slave_id)?;

        let tree = self.connections.tree().await?;
        let node = find_connection(&tree, connection_id)?;
        let slave = find_slave(node, slave_id)?;

        let port = node.connection.port;
        self.coherency.invalidate(port, slave.slave_address);
        self.slaves.delete(connection_id, slave_id).await?;
        self.coherency.invalidate(port, slave.slave_address);

        info!("Deleted slave {} ({}) and its registers", slave.name, slave_id);
        Ok(())
    }

    pub async fn get(&self, connection_id: &str, slave_id: &str) -> Result<Slave> {
        let connection_id = validation::require_id("connection_id", connection_id)?;
        let slave_id = validation::require_id("slave_id", slave_id)?;

        let tree = self.connections.tree().await?;
        let node = find_connection(&tree, connection_id)?;
        find_slave(node, slave_id).cloned()
    }
}

/// Duplicate address or name among the other slaves of one connection
fn check_siblings(
    node: &ConnectionWithSlaves,
    exclude: Option<&str>,
    name: &str,
    address: u8,
) -> Result<()> {
    let mut siblings = node
        .slaves
        .iter()
        .filter(|s| exclude != Some(s.id.as_str()));

    if let Some(taken) = siblings.clone().find(|s| s.slave_address == address) {
        return Err(RegistryError::conflict(
            "slave_address",
            format!(
                "slave address {} is already used by slave '{}' on this connection",
                address, taken.name
            ),
        ));
    }
    if siblings.any(|s| s.name == name) {
        return Err(RegistryError::conflict(
            "name",
            format!("a slave named '{}' already exists on this connection", name),
        ));
    }
    Ok(())
}
