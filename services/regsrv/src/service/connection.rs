use std::sync::Arc;
use tracing::info;

use super::find_connection;
use crate::coherency::{CacheCoherency, Invalidation};
use crate::error::Result;
use crate::models::{Connection, ConnectionWithSlaves, CreateConnection, UpdateConnection};
use crate::repository::{ConnectionRepository, NewConnection};
use crate::validation;

pub struct ConnectionService {
    connections: ConnectionRepository,
    coherency: Arc<CacheCoherency>,
}

impl ConnectionService {
    pub fn new(connections: ConnectionRepository, coherency: Arc<CacheCoherency>) -> Self {
        Self {
            connections,
            coherency,
        }
    }

    /// Create a connection; an absent or zero port is allocated as
    /// `max(existing ports, 501) + 1`
    pub async fn create(&self, req: CreateConnection) -> Result<Connection> {
        let name = validation::name("name", &req.name)?;
        let port = validation::optional_port(req.port)?;

        let connection = self
            .connections
            .create(NewConnection {
                name,
                port,
                protocol_type: req.protocol_type,
            })
            .await?;

        info!(
            "Created connection {} ({}) on port {}{}",
            connection.name,
            connection.id,
            connection.port,
            if port.is_none() { " (auto)" } else { "" }
        );
        Ok(connection)
    }

    /// Overwrite name, port and protocol type
    ///
    /// A port change moves every child endpoint, so entries for both the
    /// old and the new port are invalidated.
    pub async fn update(&self, req: UpdateConnection) -> Result<Connection> {
        let id = validation::require_id("id", &req.id)?.to_string();
        let name = validation::name("name", &req.name)?;
        let port = validation::port(req.port)?;

        let tree = self.connections.tree().await?;
        let existing = find_connection(&tree, &id)?;
        let old_port = existing.connection.port;
        let addresses: Vec<u8> = existing.slaves.iter().map(|s| s.slave_address).collect();

        let updated = self
            .connections
            .update(&Connection {
                id,
                name,
                port,
                protocol_type: req.protocol_type,
            })
            .await?;

        if old_port != updated.port {
            self.coherency.invalidate_all(
                addresses
                    .iter()
                    .flat_map(|&a| [(old_port, a), (updated.port, a)]),
            );
        }

        info!(
            "Updated connection {} ({}) port {} -> {}",
            updated.name, updated.id, old_port, updated.port
        );
        Ok(updated)
    }

    /// Delete a connection and, by cascade, all of its slaves and registers
    ///
    /// Cache entries are dropped before the delete runs, then the same keys
    /// are dropped again once the cascade has committed.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = validation::require_id("id", id)?;

        let endpoints = match self.coherency.invalidate_for_connection(id).await {
            Invalidation::Applied(keys) => keys,
            // Already logged; a skipped pass does not block the delete
            Invalidation::Skipped(_) => Vec::new(),
        };

        self.connections.delete(id).await?;
        self.coherency.invalidate_all(endpoints);
        info!("Deleted connection {} with all slaves and registers", id);
        Ok(())
    }

    pub async fn list_tree(&self) -> Result<Vec<ConnectionWithSlaves>> {
        self.connections.tree().await
    }

    pub async fn get(&self, id: &str) -> Result<ConnectionWithSlaves> {
        let id = validation::require_id("id", id)?;
        let tree = self.connections.tree().await?;
        find_connection(&tree, id).cloned()
    }
}
