//! Domain services: the only entry points that enforce business rules and
//! the only places that trigger cache invalidation.
//!
//! Every operation follows the same shape: validate input → resolve the
//! entity's place in the hierarchy through the connection tree → mutate
//! through a repository → invalidate affected cache keys.
//!
//! The tree read and the mutation are separate statements. Staleness between
//! them is accepted; uniqueness is still enforced atomically by the write.

pub mod connection;
pub mod register;
pub mod slave;

pub use connection::ConnectionService;
pub use register::RegisterService;
pub use slave::SlaveService;

use crate::error::{RegistryError, Result};
use crate::models::{ConnectionWithSlaves, Slave};

pub(crate) fn find_connection<'a>(
    tree: &'a [ConnectionWithSlaves],
    connection_id: &str,
) -> Result<&'a ConnectionWithSlaves> {
    tree.iter()
        .find(|n| n.connection.id == connection_id)
        .ok_or_else(|| RegistryError::not_found("connection", connection_id))
}

pub(crate) fn find_slave<'a>(node: &'a ConnectionWithSlaves, slave_id: &str) -> Result<&'a Slave> {
    node.slave(slave_id)
        .ok_or_else(|| RegistryError::not_found("slave", slave_id))
}

/// Locate a slave by id anywhere in the tree, with its parent
pub(crate) fn find_slave_anywhere<'a>(
    tree: &'a [ConnectionWithSlaves],
    slave_id: &str,
) -> Result<(&'a ConnectionWithSlaves, &'a Slave)> {
    tree.iter()
        .find_map(|node| node.slave(slave_id).map(|slave| (node, slave)))
        .ok_or_else(|| RegistryError::not_found("slave", slave_id))
}
