use std::sync::Arc;
use tracing::{debug, info};

use super::{find_connection, find_slave, find_slave_anywhere};
use crate::address_space;
use crate::coherency::CacheCoherency;
use crate::error::{RegistryError, Result};
use crate::models::{CreateRegister, Register, UpdateRegister};
use crate::repository::{ConnectionRepository, RegisterRepository, RegisterValues};
use crate::validation;

pub struct RegisterService {
    registers: RegisterRepository,
    connections: ConnectionRepository,
    coherency: Arc<CacheCoherency>,
}

/// Where a slave sits on the wire
struct Endpoint {
    port: u16,
    slave_address: u8,
}

impl RegisterService {
    pub fn new(
        registers: RegisterRepository,
        connections: ConnectionRepository,
        coherency: Arc<CacheCoherency>,
    ) -> Self {
        Self {
            registers,
            connections,
            coherency,
        }
    }

    /// Registers of one slave ordered by start address
    pub async fn list(&self, slave_id: &str) -> Result<Vec<Register>> {
        let slave_id = validation::require_id("slave_id", slave_id)?;

        let tree = self.connections.tree().await?;
        find_slave_anywhere(&tree, slave_id)?;

        self.registers.list(slave_id).await
    }

    pub async fn get(
        &self,
        connection_id: &str,
        slave_id: &str,
        register_id: &str,
    ) -> Result<Register> {
        let connection_id = validation::require_id("connection_id", connection_id)?;
        let slave_id = validation::require_id("slave_id", slave_id)?;
        let register_id = validation::require_id("register_id", register_id)?;

        self.endpoint(connection_id, slave_id).await?;
        self.registers
            .list(slave_id)
            .await?
            .into_iter()
            .find(|r| r.id == register_id)
            .ok_or_else(|| RegistryError::not_found("register", register_id))
    }

    pub async fn create(&self, req: CreateRegister) -> Result<Register> {
        let connection_id = validation::require_id("connection_id", &req.connection_id)?;
        let slave_id = validation::require_id("slave_id", &req.slave_id)?;
        let payload = validation::register_payload(req.start_address, &req.hex_payload)?;

        let endpoint = self.endpoint(connection_id, slave_id).await?;
        let register = self
            .registers
            .create(
                slave_id,
                RegisterValues {
                    start_address: payload.start_address,
                    hex_payload: payload.hex_payload,
                    names: req.names,
                    coefficients: req.coefficients,
                },
            )
            .await?;

        self.coherency
            .invalidate(endpoint.port, endpoint.slave_address);
        info!(
            "Created {} register {} at {} ({} points) on slave {}",
            payload.class,
            register.id,
            register.start_address,
            point_count(&register),
            slave_id
        );
        Ok(register)
    }

    pub async fn update(&self, req: UpdateRegister) -> Result<Register> {
        let connection_id = validation::require_id("connection_id", &req.connection_id)?;
        let slave_id = validation::require_id("slave_id", &req.slave_id)?;
        let register_id = validation::require_id("register_id", &req.register_id)?;
        let payload = validation::register_payload(req.start_address, &req.hex_payload)?;

        let endpoint = self.endpoint(connection_id, slave_id).await?;
        let register = self
            .registers
            .update(
                slave_id,
                register_id,
                RegisterValues {
                    start_address: payload.start_address,
                    hex_payload: payload.hex_payload,
                    names: req.names,
                    coefficients: req.coefficients,
                },
            )
            .await?;

        self.coherency
            .invalidate(endpoint.port, endpoint.slave_address);
        info!(
            "Updated {} register {} at {}",
            payload.class, register.id, register.start_address
        );
        Ok(register)
    }

    pub async fn delete(&self, connection_id: &str, slave_id: &str, register_id: &str) -> Result<()> {
        let connection_id = validation::require_id("connection_id", connection_id)?;
        let slave_id = validation::require_id("slave_id", slave_id)?;
        let register_id = validation::require_id("register_id", register_id)?;

        let endpoint = self.endpoint(connection_id, slave_id).await?;
        self.registers.delete(slave_id, register_id).await?;

        self.coherency
            .invalidate(endpoint.port, endpoint.slave_address);
        info!("Deleted register {} from slave {}", register_id, slave_id);
        Ok(())
    }

    /// Register set served at one `(port, slave_address)` endpoint
    ///
    /// Served from the cache when present; otherwise loaded from the store
    /// and cached unless an invalidation raced the load.
    pub async fn resolve_endpoint(&self, port: u16, slave_address: u8) -> Result<Arc<Vec<Register>>> {
        let cache = self.coherency.cache();
        if let Some(hit) = cache.get(port, slave_address) {
            return Ok(hit);
        }

        let epoch = cache.epoch();
        let tree = self.connections.tree().await?;
        let slave = tree
            .iter()
            .find(|n| n.connection.port == port)
            .and_then(|n| n.slaves.iter().find(|s| s.slave_address == slave_address))
            .ok_or_else(|| {
                RegistryError::not_found("endpoint", format!("{}:{}", port, slave_address))
            })?;

        let registers = self.registers.list(&slave.id).await?;
        debug!(
            "Loaded {} registers for endpoint ({}, {})",
            registers.len(),
            port,
            slave_address
        );
        Ok(cache.insert_if_current(port, slave_address, registers, epoch))
    }

    /// Resolve a slave under its connection to the endpoint it answers on
    async fn endpoint(&self, connection_id: &str, slave_id: &str) -> Result<Endpoint> {
        let tree = self.connections.tree().await?;
        let node = find_connection(&tree, connection_id)?;
        let slave = find_slave(node, slave_id)?;
        Ok(Endpoint {
            port: node.connection.port,
            slave_address: slave.slave_address,
        })
    }
}

fn point_count(register: &Register) -> usize {
    address_space::lookup(i64::from(register.start_address))
        .map_or(0, |range| range.point_count(register.hex_payload.len()))
}
