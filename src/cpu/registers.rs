//! MIPS general-purpose register file.
//!
//! 32 registers of 32 bits each, named by the usual software convention.
//! Register 0 (`$zero`) is hard-wired: it always reads as 0 and any write
//! to it is discarded.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const NUM_REGS: usize = 32;

/// Index of the hard-wired zero register.
pub const ZERO_REG: usize = 0;

/// Canonical register names, in index order.
pub const REGISTER_NAMES: [&str; NUM_REGS] = [
    "$zero", "$at", "$v0", "$v1",
    "$a0", "$a1", "$a2", "$a3",
    "$t0", "$t1", "$t2", "$t3",
    "$t4", "$t5", "$t6", "$t7",
    "$s0", "$s1", "$s2", "$s3",
    "$s4", "$s5", "$s6", "$s7",
    "$t8", "$t9", "$k0", "$k1",
    "$gp", "$sp", "$fp", "$ra",
];

/// Look up a register index by its canonical name (`$t0`, `$ra`, ...).
pub fn register_index(name: &str) -> Option<usize> {
    REGISTER_NAMES.iter().position(|&n| n == name)
}

/// The canonical name of register `index`.
///
/// # Panics
/// Panics if `index` is not below [`NUM_REGS`].
pub fn register_name(index: usize) -> &'static str {
    REGISTER_NAMES[index]
}

/// The canonical name of a 5-bit instruction register field.
pub fn field_name(field: u8) -> &'static str {
    REGISTER_NAMES[(field & 0x1f) as usize]
}

/// The register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    #[serde(deserialize_with = "deserialize_regs")]
    regs: [u32; NUM_REGS],
}

/// Snapshots are not trusted to hold 0 in `$zero`.
fn deserialize_regs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u32; NUM_REGS], D::Error> {
    let mut regs = <[u32; NUM_REGS]>::deserialize(deserializer)?;
    regs[ZERO_REG] = 0;
    Ok(regs)
}

impl Registers {
    /// Create a register file with every register zeroed.
    pub fn new() -> Self {
        Self { regs: [0; NUM_REGS] }
    }

    /// Zero every register.
    pub fn reset(&mut self) {
        self.regs = [0; NUM_REGS];
    }

    /// Read a register. Only the low 5 bits of `index` are used, matching
    /// the width of an instruction's register fields.
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        match index & 0x1f {
            ZERO_REG => 0,
            index => self.regs[index],
        }
    }

    /// Write a register. Writes to `$zero` are silently dropped.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        let index = index & 0x1f;
        if index == ZERO_REG {
            return;
        }
        self.regs[index] = value;
    }

    /// Read a register by canonical name.
    pub fn get_by_name(&self, name: &str) -> Result<u32, RegisterError> {
        register_index(name)
            .map(|i| self.get(i))
            .ok_or_else(|| RegisterError::Unknown(name.to_string()))
    }

    /// All registers as (name, value) pairs, in index order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        REGISTER_NAMES
            .iter()
            .enumerate()
            .map(move |(i, &name)| (name, self.get(i)))
    }

    /// Raw view of the register values.
    pub fn as_slice(&self) -> &[u32] {
        &self.regs
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from register lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let regs = Registers::new();
        assert!(regs.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_zero_register_discards_writes() {
        let mut regs = Registers::new();
        regs.set(ZERO_REG, 0xDEAD_BEEF);
        assert_eq!(regs.get(ZERO_REG), 0);
    }

    #[test]
    fn test_set_get() {
        let mut regs = Registers::new();
        regs.set(8, 42);
        regs.set(31, 0xFFFF_FFFF);
        assert_eq!(regs.get(8), 42);
        assert_eq!(regs.get(31), 0xFFFF_FFFF);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut regs = Registers::new();
        regs.set(register_index("$sp").unwrap(), 0x7fff_fffc);

        assert_eq!(regs.get_by_name("$sp"), Ok(0x7fff_fffc));
        assert_eq!(regs.get_by_name("$zero"), Ok(0));
        assert_eq!(
            regs.get_by_name("$bogus"),
            Err(RegisterError::Unknown("$bogus".into()))
        );
        // Names are matched exactly
        assert!(regs.get_by_name("t0").is_err());
    }

    #[test]
    fn test_name_table_order() {
        assert_eq!(register_index("$zero"), Some(0));
        assert_eq!(register_index("$t0"), Some(8));
        assert_eq!(register_index("$s0"), Some(16));
        assert_eq!(register_index("$t8"), Some(24));
        assert_eq!(register_index("$ra"), Some(31));
        assert_eq!(register_name(29), "$sp");
    }

    #[test]
    fn test_deserialized_zero_register_reads_zero() {
        let mut values = vec![0u32; NUM_REGS];
        values[ZERO_REG] = 7;
        values[8] = 3;
        let json = serde_json::json!({ "regs": values });

        let regs: Registers = serde_json::from_value(json).unwrap();
        assert_eq!(regs.get(ZERO_REG), 0);
        assert_eq!(regs.get_by_name("$zero"), Ok(0));
        assert_eq!(regs.named().next(), Some(("$zero", 0)));
        assert_eq!(regs.as_slice()[ZERO_REG], 0);
        assert_eq!(regs.get(8), 3);
    }

    #[test]
    fn test_field_name_masks_to_five_bits() {
        assert_eq!(field_name(8), "$t0");
        assert_eq!(field_name(32), "$zero");
        assert_eq!(field_name(0xff), "$ra");
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set(5, 5);
        regs.reset();
        assert_eq!(regs.get(5), 0);
    }
}
