//! Decoded point values of one endpoint
//!
//! Coil and discrete input payloads are bit-packed LSB-first, 8 points per
//! byte, starting at the register's start address. Input and holding
//! register payloads are big-endian 16-bit words. Points that would spill
//! past the end of their class range are dropped.

use std::collections::BTreeMap;

use common::hex;

use crate::address_space::{self, RegisterClass};
use crate::error::{RegistryError, Result};
use crate::models::Register;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterImage {
    bits: BTreeMap<u16, bool>,
    words: BTreeMap<u16, u16>,
}

impl RegisterImage {
    /// Decode a register set; later entries win on overlapping addresses
    pub fn from_registers(registers: &[Register]) -> Result<Self> {
        let mut image = Self::default();
        for register in registers {
            image.apply(register)?;
        }
        Ok(image)
    }

    fn apply(&mut self, register: &Register) -> Result<()> {
        let range = address_space::lookup(i64::from(register.start_address)).ok_or_else(|| {
            RegistryError::Internal(format!(
                "register {} has unmapped start address {}",
                register.id, register.start_address
            ))
        })?;
        let bytes = hex::decode(&register.hex_payload).ok_or_else(|| {
            RegistryError::Internal(format!("register {} has a corrupt payload", register.id))
        })?;

        let start = u32::from(register.start_address);
        let last = u32::from(range.max);

        if range.class.is_bit() {
            for (i, byte) in bytes.iter().enumerate() {
                for bit in 0..8u32 {
                    let address = start + i as u32 * 8 + bit;
                    if address > last {
                        return Ok(());
                    }
                    self.bits.insert(address as u16, (byte >> bit) & 0x01 == 1);
                }
            }
        } else {
            for (i, pair) in bytes.chunks_exact(2).enumerate() {
                let address = start + i as u32;
                if address > last {
                    break;
                }
                self.words
                    .insert(address as u16, u16::from_be_bytes([pair[0], pair[1]]));
            }
        }
        Ok(())
    }

    /// `count` consecutive coils or discrete inputs from `address`
    ///
    /// `None` if the class is not bit-addressed or any point is undefined.
    pub fn read_bits(&self, class: RegisterClass, address: u16, count: u16) -> Option<Vec<bool>> {
        if !class.is_bit() {
            return None;
        }
        addresses(class, address, count)?
            .map(|a| self.bits.get(&a).copied())
            .collect()
    }

    /// `count` consecutive input or holding registers from `address`
    pub fn read_words(&self, class: RegisterClass, address: u16, count: u16) -> Option<Vec<u16>> {
        if class.is_bit() {
            return None;
        }
        addresses(class, address, count)?
            .map(|a| self.words.get(&a).copied())
            .collect()
    }

    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Addresses of a read, all of which must lie in `class`
fn addresses(class: RegisterClass, address: u16, count: u16) -> Option<impl Iterator<Item = u16>> {
    let range = address_space::lookup(i64::from(address))?;
    if range.class != class {
        return None;
    }
    let end = u32::from(address) + u32::from(count);
    if count > 0 && end - 1 > u32::from(range.max) {
        return None;
    }
    Some(address..address + count)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn register(start: u16, hex: &str) -> Register {
        Register {
            id: format!("r{start}"),
            slave_id: "s1".to_string(),
            start_address: start,
            hex_payload: hex.to_string(),
            names: String::new(),
            coefficients: String::new(),
        }
    }

    #[test]
    fn test_coils_decode_lsb_first() {
        // 0x05 = 0000_0101, 0x80 = 1000_0000
        let image = RegisterImage::from_registers(&[register(1, "0580")]).unwrap();
        let bits = image.read_bits(RegisterClass::Coil, 1, 16).unwrap();

        assert_eq!(
            &bits[..8],
            &[true, false, true, false, false, false, false, false]
        );
        assert!(bits[15]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 3);
    }

    #[test]
    fn test_holding_registers_are_big_endian() {
        let image = RegisterImage::from_registers(&[register(40001, "ABCD0102")]).unwrap();
        assert_eq!(
            image.read_words(RegisterClass::HoldingRegister, 40001, 2),
            Some(vec![0xABCD, 0x0102])
        );
        assert_eq!(
            image.read_words(RegisterClass::HoldingRegister, 40002, 1),
            Some(vec![0x0102])
        );
    }

    #[test]
    fn test_undefined_address_reads_none() {
        let image = RegisterImage::from_registers(&[register(30001, "0001")]).unwrap();
        assert!(image
            .read_words(RegisterClass::InputRegister, 30001, 2)
            .is_none());
        assert!(image
            .read_words(RegisterClass::HoldingRegister, 30001, 1)
            .is_none());
    }

    #[test]
    fn test_class_mismatch_reads_none() {
        let image = RegisterImage::from_registers(&[register(10001, "FF")]).unwrap();
        assert!(image.read_bits(RegisterClass::Coil, 10001, 1).is_none());
        assert!(image
            .read_words(RegisterClass::DiscreteInput, 10001, 1)
            .is_none());
        assert_eq!(
            image.read_bits(RegisterClass::DiscreteInput, 10001, 8),
            Some(vec![true; 8])
        );
    }

    #[test]
    fn test_points_past_class_end_are_dropped() {
        let image = RegisterImage::from_registers(&[register(9998, "FF")]).unwrap();
        assert_eq!(image.bit_count(), 2);
        assert!(image.read_bits(RegisterClass::Coil, 9998, 3).is_none());
    }

    #[test]
    fn test_later_register_wins_on_overlap() {
        let image = RegisterImage::from_registers(&[
            register(40001, "00010002"),
            register(40002, "FFFF"),
        ])
        .unwrap();
        assert_eq!(
            image.read_words(RegisterClass::HoldingRegister, 40001, 2),
            Some(vec![1, 0xFFFF])
        );
        assert_eq!(image.word_count(), 2);
    }

    #[test]
    fn test_corrupt_payload_is_internal() {
        let err = RegisterImage::from_registers(&[register(40001, "ZZZZ")]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }
}
