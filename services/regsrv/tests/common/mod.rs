//! Shared test scaffolding
//!
//! Every test gets its own in-memory database with the full schema.

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable
#![allow(dead_code)]

use std::time::Duration;

use regsrv::models::{CreateConnection, CreateRegister, CreateSlave};
use regsrv::{AppState, Connection, ProtocolType, Register, RegisterCache, Slave};

pub struct TestEnv {
    pub state: AppState,
}

impl TestEnv {
    /// In-memory registry with a cache that never expires on its own
    pub async fn create() -> Self {
        Self::with_cache(RegisterCache::new(None)).await
    }

    pub async fn with_ttl(ttl: Duration) -> Self {
        Self::with_cache(RegisterCache::new(Some(ttl))).await
    }

    pub async fn with_cache(cache: RegisterCache) -> Self {
        let state = AppState::in_memory(cache).await.unwrap();
        Self { state }
    }

    pub async fn connection(&self, name: &str, port: Option<i64>) -> Connection {
        self.state
            .connections
            .create(CreateConnection {
                name: name.to_string(),
                port,
                protocol_type: ProtocolType::Tcp,
            })
            .await
            .unwrap()
    }

    pub async fn slave(&self, connection: &Connection, name: &str, address: i64) -> Slave {
        self.state
            .slaves
            .create(CreateSlave {
                connection_id: connection.id.clone(),
                name: name.to_string(),
                slave_address: address,
            })
            .await
            .unwrap()
    }

    pub async fn register(&self, slave: &Slave, start: i64, hex: &str) -> Register {
        self.state
            .registers
            .create(register_request(slave, start, hex))
            .await
            .unwrap()
    }
}

pub fn register_request(slave: &Slave, start: i64, hex: &str) -> CreateRegister {
    CreateRegister {
        connection_id: slave.connection_id.clone(),
        slave_id: slave.id.clone(),
        start_address: start,
        hex_payload: hex.to_string(),
        names: String::new(),
        coefficients: String::new(),
    }
}
