//! Entities and write requests for the connection → slave → register hierarchy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// Framing used by a connection's endpoint (informational at this layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolType {
    /// RTU frames (with CRC) carried over a TCP socket
    RtuOverTcp,
    /// Standard Modbus TCP with MBAP header
    Tcp,
}

impl ProtocolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RtuOverTcp => "rtu_over_tcp",
            Self::Tcp => "tcp",
        }
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rtu_over_tcp" | "rtuovertcp" | "rtu" => Ok(Self::RtuOverTcp),
            "tcp" => Ok(Self::Tcp),
            other => Err(RegistryError::validation(
                "protocol_type",
                format!("unknown protocol type '{}', expected rtu_over_tcp or tcp", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub port: u16,
    pub protocol_type: ProtocolType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slave {
    pub id: String,
    pub connection_id: String,
    pub name: String,
    /// Modbus unit identifier, 1..=247
    pub slave_address: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub id: String,
    pub slave_id: String,
    pub start_address: u16,
    /// Uppercase hex digits
    pub hex_payload: String,
    pub names: String,
    pub coefficients: String,
}

/// One row of the connection tree: a connection and its slaves ordered by address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionWithSlaves {
    #[serde(flatten)]
    pub connection: Connection,
    pub slaves: Vec<Slave>,
}

impl ConnectionWithSlaves {
    pub fn slave(&self, slave_id: &str) -> Option<&Slave> {
        self.slaves.iter().find(|s| s.id == slave_id)
    }

    /// `(port, slave_address)` for every slave under this connection
    pub fn endpoints(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.slaves
            .iter()
            .map(move |s| (self.connection.port, s.slave_address))
    }
}

// ============================================================================
// Write requests
//
// Numeric fields are wide signed integers so out-of-range input reaches
// validation instead of failing at deserialization.
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnection {
    pub name: String,
    /// `None` or `0` selects the next free port automatically
    #[serde(default)]
    pub port: Option<i64>,
    pub protocol_type: ProtocolType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConnection {
    pub id: String,
    pub name: String,
    pub port: i64,
    pub protocol_type: ProtocolType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlave {
    pub connection_id: String,
    pub name: String,
    pub slave_address: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSlave {
    pub connection_id: String,
    pub slave_id: String,
    pub name: String,
    pub slave_address: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegister {
    pub connection_id: String,
    pub slave_id: String,
    pub start_address: i64,
    pub hex_payload: String,
    #[serde(default)]
    pub names: String,
    #[serde(default)]
    pub coefficients: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRegister {
    pub connection_id: String,
    pub slave_id: String,
    pub register_id: String,
    pub start_address: i64,
    pub hex_payload: String,
    #[serde(default)]
    pub names: String,
    #[serde(default)]
    pub coefficients: String,
}
