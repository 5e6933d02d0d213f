//! Application state
//!
//! Wires the store, cache and services over one SQLite pool.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use common::sqlite::SqliteClient;

use crate::cache::RegisterCache;
use crate::coherency::CacheCoherency;
use crate::config::RegsrvConfig;
use crate::repository::{ConnectionRepository, RegisterRepository, SlaveRepository};
use crate::schema;
use crate::service::{ConnectionService, RegisterService, SlaveService};

pub struct AppState {
    pub sqlite_client: Arc<SqliteClient>,
    pub cache: Arc<RegisterCache>,
    pub connections: ConnectionService,
    pub slaves: SlaveService,
    pub registers: RegisterService,
}

impl AppState {
    /// Build services over an already-initialized database
    pub fn new(sqlite_client: Arc<SqliteClient>, cache: Arc<RegisterCache>) -> Self {
        let pool = sqlite_client.pool().clone();
        let connection_repo = ConnectionRepository::new(pool.clone());
        let coherency = Arc::new(CacheCoherency::new(
            Arc::clone(&cache),
            connection_repo.clone(),
        ));

        Self {
            connections: ConnectionService::new(connection_repo.clone(), Arc::clone(&coherency)),
            slaves: SlaveService::new(
                SlaveRepository::new(pool.clone()),
                connection_repo.clone(),
                Arc::clone(&coherency),
            ),
            registers: RegisterService::new(
                RegisterRepository::new(pool),
                connection_repo,
                coherency,
            ),
            sqlite_client,
            cache,
        }
    }

    /// Open the configured database, create the schema if needed and wire
    /// the services
    pub async fn open(config: &RegsrvConfig) -> Result<Self> {
        let client = SqliteClient::new(&config.database.path).await?;
        client.ping().await?;
        schema::init_schema(client.pool())
            .await
            .context("Failed to initialize registry schema")?;

        let cache = if config.cache.enabled {
            RegisterCache::new(Some(config.cache.ttl()))
        } else {
            info!("Register cache disabled");
            RegisterCache::disabled()
        };

        Ok(Self::new(Arc::new(client), Arc::new(cache)))
    }

    /// In-memory database with a fresh schema, for tests and dry runs
    pub async fn in_memory(cache: RegisterCache) -> Result<Self> {
        let client = SqliteClient::in_memory().await?;
        schema::init_schema(client.pool())
            .await
            .context("Failed to initialize registry schema")?;
        Ok(Self::new(Arc::new(client), Arc::new(cache)))
    }
}
