//! Registry of simulated Modbus endpoints
//!
//! Connections own slaves, slaves own register entries. Writes go through
//! the services in [`service`], which validate input, mutate the SQLite
//! store and invalidate the `(port, slave_address)` register cache.

pub mod address_space;
pub mod app_state;
pub mod cache;
pub mod cli;
pub mod coherency;
pub mod config;
pub mod error;
pub mod image;
pub mod models;
pub mod repository;
pub mod schema;
pub mod service;
pub mod validation;

pub use app_state::AppState;
pub use cache::{RegisterCache, RegisterCacheStats};
pub use config::RegsrvConfig;
pub use error::{ErrorInfo, ErrorKind, RegistryError, Result};
pub use image::RegisterImage;
pub use models::{Connection, ConnectionWithSlaves, ProtocolType, Register, Slave};
