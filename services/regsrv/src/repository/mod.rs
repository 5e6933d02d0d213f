//! Entity store: per-entity persistence primitives over SQLite
//!
//! Repositories enforce nothing beyond what the schema does. Uniqueness
//! violations come back from the write itself and are translated into
//! Conflict errors naming the collided column.

pub mod connection;
pub mod register;
pub mod slave;

pub use connection::{ConnectionRepository, NewConnection, AUTO_PORT_FLOOR};
pub use register::{RegisterRepository, RegisterValues};
pub use slave::SlaveRepository;
