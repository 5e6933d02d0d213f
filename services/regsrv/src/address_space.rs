//! Modbus address-space partitioning
//!
//! The start address of a register entry selects one of four classes from a
//! fixed table; the class dictates how the hex payload is chunked.
//!
//! | Range        | Class            | Hex chars per unit |
//! |--------------|------------------|--------------------|
//! | 1–9999       | Coil             | 2 (8 coils)        |
//! | 10001–19999  | Discrete Input   | 2 (8 inputs)       |
//! | 30001–39999  | Input Register   | 4 (1 register)     |
//! | 40001–49999  | Holding Register | 4 (1 register)     |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterClass {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl RegisterClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Coil => "Coil",
            Self::DiscreteInput => "Discrete Input",
            Self::InputRegister => "Input Register",
            Self::HoldingRegister => "Holding Register",
        }
    }

    /// Single-bit classes pack 8 points per payload byte
    pub fn is_bit(&self) -> bool {
        matches!(self, Self::Coil | Self::DiscreteInput)
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the address table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub min: u16,
    pub max: u16,
    pub class: RegisterClass,
    /// Payload length must be a multiple of this many hex characters
    pub length_multiple: usize,
}

impl AddressRange {
    pub fn contains(&self, address: i64) -> bool {
        address >= i64::from(self.min) && address <= i64::from(self.max)
    }

    /// Number of addressable points a payload of `hex_len` chars covers
    pub fn point_count(&self, hex_len: usize) -> usize {
        if self.class.is_bit() {
            hex_len / 2 * 8
        } else {
            hex_len / 4
        }
    }
}

pub const ADDRESS_TABLE: [AddressRange; 4] = [
    AddressRange {
        min: 1,
        max: 9999,
        class: RegisterClass::Coil,
        length_multiple: 2,
    },
    AddressRange {
        min: 10001,
        max: 19999,
        class: RegisterClass::DiscreteInput,
        length_multiple: 2,
    },
    AddressRange {
        min: 30001,
        max: 39999,
        class: RegisterClass::InputRegister,
        length_multiple: 4,
    },
    AddressRange {
        min: 40001,
        max: 49999,
        class: RegisterClass::HoldingRegister,
        length_multiple: 4,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("start address {address} is not in a valid range; valid ranges are {}", valid_ranges())]
    InvalidRange { address: i64 },

    #[error("payload length {length} is not a multiple of {multiple} hex characters for {class}")]
    InvalidLength {
        class: RegisterClass,
        multiple: usize,
        length: usize,
    },
}

impl From<AddressError> for RegistryError {
    fn from(err: AddressError) -> Self {
        let field = match err {
            AddressError::InvalidRange { .. } => "start_address",
            AddressError::InvalidLength { .. } => "hex_payload",
        };
        RegistryError::validation(field, err.to_string())
    }
}

/// Human-readable list of every valid range, e.g. for error messages
pub fn valid_ranges() -> String {
    ADDRESS_TABLE
        .iter()
        .map(|r| format!("{}-{} ({})", r.min, r.max, r.class))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Look up the table row containing `address`
pub fn lookup(address: i64) -> Option<&'static AddressRange> {
    ADDRESS_TABLE.iter().find(|r| r.contains(address))
}

pub fn classify(address: i64) -> Result<RegisterClass, AddressError> {
    lookup(address)
        .map(|r| r.class)
        .ok_or(AddressError::InvalidRange { address })
}

/// Range membership, then length granularity
///
/// Assumes `hex` already passed the hex-digit check.
pub fn validate_payload(address: i64, hex: &str) -> Result<RegisterClass, AddressError> {
    let range = lookup(address).ok_or(AddressError::InvalidRange { address })?;
    if hex.len() % range.length_multiple != 0 {
        return Err(AddressError::InvalidLength {
            class: range.class,
            multiple: range.length_multiple,
            length: hex.len(),
        });
    }
    Ok(range.class)
}
