//! Field-level input checks shared by the services
//!
//! Each check returns the normalized value or a Validation error naming the field.

use common::hex;

use crate::address_space::{self, RegisterClass};
use crate::error::{RegistryError, Result};

pub const MAX_NAME_LEN: usize = 100;
pub const MIN_SLAVE_ADDRESS: i64 = 1;
pub const MAX_SLAVE_ADDRESS: i64 = 247;
pub const MIN_PORT: i64 = 1;
pub const MAX_PORT: i64 = 65535;

/// Opaque identifier supplied by a caller
pub fn require_id<'a>(field: &'static str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RegistryError::validation(field, format!("{} is required", field)));
    }
    Ok(id)
}

/// Trimmed, non-blank, at most 100 characters
pub fn name(field: &'static str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::validation(field, "name must not be blank"));
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(RegistryError::validation(
            field,
            format!(
                "name is {} characters long, maximum is {}",
                len, MAX_NAME_LEN
            ),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn port(raw: i64) -> Result<u16> {
    if !(MIN_PORT..=MAX_PORT).contains(&raw) {
        return Err(RegistryError::validation(
            "port",
            format!("port {} is out of range [{}, {}]", raw, MIN_PORT, MAX_PORT),
        ));
    }
    Ok(raw as u16)
}

/// `None`/`0` request automatic assignment
pub fn optional_port(raw: Option<i64>) -> Result<Option<u16>> {
    match raw {
        None | Some(0) => Ok(None),
        Some(p) => port(p).map(Some),
    }
}

pub fn slave_address(raw: i64) -> Result<u8> {
    if !(MIN_SLAVE_ADDRESS..=MAX_SLAVE_ADDRESS).contains(&raw) {
        return Err(RegistryError::validation(
            "slave_address",
            format!(
                "slave address {} is out of range [{}, {}]",
                raw, MIN_SLAVE_ADDRESS, MAX_SLAVE_ADDRESS
            ),
        ));
    }
    Ok(raw as u8)
}

/// A register definition that passed every check, payload uppercased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayload {
    pub start_address: u16,
    pub hex_payload: String,
    pub class: RegisterClass,
}

/// Ordered register checks: address sign, payload presence, hex digits,
/// then class range and length. The first failure wins.
///
/// Id presence is checked by the caller before this runs.
pub fn register_payload(start_address: i64, hex_payload: &str) -> Result<RegisterPayload> {
    if start_address < 0 {
        return Err(RegistryError::validation(
            "start_address",
            "start address must not be negative",
        ));
    }
    if hex_payload.trim().is_empty() {
        return Err(RegistryError::validation(
            "hex_payload",
            "hex payload must not be blank",
        ));
    }
    if !hex::is_valid_hex(hex_payload) {
        return Err(RegistryError::validation(
            "hex_payload",
            "hex payload may only contain the characters 0-9, A-F and a-f",
        ));
    }
    let class = address_space::validate_payload(start_address, hex_payload)?;

    Ok(RegisterPayload {
        // validate_payload only accepts addresses inside the u16 table ranges
        start_address: start_address as u16,
        hex_payload: hex::normalize_upper(hex_payload),
        class,
    })
}
