//! Cache invalidation triggered by store mutations
//!
//! Invalidation is advisory. A failure to resolve which endpoints to drop is
//! reported as [`Invalidation::Skipped`] and logged; it never fails the
//! mutation that triggered it and is never retried. The worst outcome is a
//! stale entry that lives until the cache TTL expires it.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{EndpointKey, RegisterCache};
use crate::repository::ConnectionRepository;

/// Result of a best-effort invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Endpoint keys that were invalidated (present or not)
    Applied(Vec<EndpointKey>),
    /// Endpoints could not be resolved; nothing was invalidated
    Skipped(String),
}

pub struct CacheCoherency {
    cache: Arc<RegisterCache>,
    connections: ConnectionRepository,
}

impl CacheCoherency {
    pub fn new(cache: Arc<RegisterCache>, connections: ConnectionRepository) -> Self {
        Self { cache, connections }
    }

    pub fn cache(&self) -> &Arc<RegisterCache> {
        &self.cache
    }

    pub fn invalidate(&self, port: u16, slave_address: u8) {
        self.cache.invalidate(port, slave_address);
    }

    pub fn invalidate_all<I>(&self, endpoints: I) -> Invalidation
    where
        I: IntoIterator<Item = EndpointKey>,
    {
        let keys: Vec<EndpointKey> = endpoints.into_iter().collect();
        for &(port, address) in &keys {
            self.cache.invalidate(port, address);
        }
        Invalidation::Applied(keys)
    }

    /// Drop every `(port, slave_address)` entry under one connection
    ///
    /// The applied keys are returned so a caller can repeat the pass once
    /// the connection is gone from the store.
    pub async fn invalidate_for_connection(&self, connection_id: &str) -> Invalidation {
        let outcome = match self.connections.tree().await {
            Ok(tree) => match tree.iter().find(|n| n.connection.id == connection_id) {
                Some(node) => self.invalidate_all(node.endpoints()),
                None => Invalidation::Skipped(format!("connection {} not found", connection_id)),
            },
            Err(e) => Invalidation::Skipped(format!("tree read failed: {}", e)),
        };

        match &outcome {
            Invalidation::Applied(keys) => debug!(
                "Invalidated {} cache entries for connection {}",
                keys.len(),
                connection_id
            ),
            Invalidation::Skipped(reason) => warn!(
                "Cache invalidation for connection {} skipped: {}",
                connection_id, reason
            ),
        }
        outcome
    }
}
