//! Register registry basic library
//!
//! Provides infrastructure shared by the registry service and its tools:
//! - SQLite connection pool bootstrap
//! - logging initialisation
//! - layered configuration loading
//! - hex payload helpers

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod config_loader;
pub mod error;
pub mod hex;
pub mod logging;

pub use error::{Error, Result};

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;
