//! Instruction decoder.
//!
//! Every instruction is a 32-bit word. The primary opcode lives in the top
//! six bits; opcode 0 (SPECIAL) selects a register-format instruction whose
//! operation is picked by the function code in the bottom six bits.
//!
//! ```text
//! R-type: [opcode:6][rs:5][rt:5][rd:5][sa:5][funct:6]
//! I-type: [opcode:6][rs:5][rt:5][immediate:16]
//! ```

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Bit positions of the instruction fields.
const OPCODE_SHIFT: u32 = 26;
const RS_SHIFT: u32 = 21;
const RT_SHIFT: u32 = 16;
const RD_SHIFT: u32 = 11;
const SA_SHIFT: u32 = 6;

const OPCODE_MASK: u32 = 0x3f;
const REG_MASK: u32 = 0x1f;
const FUNCT_MASK: u32 = 0x3f;
const IMM_MASK: u32 = 0xffff;

/// Bit 15 of a 16-bit immediate.
const SIGN_BIT: u32 = 0x8000;
const SIGN_EXTENSION: u32 = 0xffff_0000;

/// Primary opcode values.
pub struct Opcode;

impl Opcode {
    pub const SPECIAL: u8 = 0;
    pub const BEQ: u8 = 4;
    pub const BNE: u8 = 5;
    pub const ADDI: u8 = 8;
}

/// Function codes under SPECIAL.
pub struct Funct;

impl Funct {
    pub const SLL: u8 = 0;
    pub const SRL: u8 = 2;
    pub const SRA: u8 = 3;
    pub const ADD: u8 = 32;
    pub const OR: u8 = 35;
    pub const AND: u8 = 36;
    pub const SLT: u8 = 42;
}

/// The raw fields of an instruction word.
///
/// Every field is extracted from the same bit position regardless of which
/// instruction the word turns out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub opcode: u8,
    pub rs: u8,
    pub rt: u8,
    pub rd: u8,
    pub sa: u8,
    pub funct: u8,
    pub imm: u16,
}

impl Fields {
    /// Split a word into its fields.
    pub fn extract(word: u32) -> Self {
        Self {
            opcode: ((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8,
            rs: ((word >> RS_SHIFT) & REG_MASK) as u8,
            rt: ((word >> RT_SHIFT) & REG_MASK) as u8,
            rd: ((word >> RD_SHIFT) & REG_MASK) as u8,
            sa: ((word >> SA_SHIFT) & REG_MASK) as u8,
            funct: (word & FUNCT_MASK) as u8,
            imm: (word & IMM_MASK) as u16,
        }
    }
}

/// Sign-extend a 16-bit immediate to 32 bits.
#[inline]
pub fn sign_extend(imm: u16) -> u32 {
    let value = imm as u32;
    if value & SIGN_BIT != 0 {
        value | SIGN_EXTENSION
    } else {
        value
    }
}

/// A decoded instruction.
///
/// Immediates and branch offsets are kept as the raw 16-bit field; the
/// executor sign-extends them. Shift amounts are never sign-extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Immediate ====================

    /// Add immediate: rt := rs + sign_extend(imm)
    Addi { rt: u8, rs: u8, imm: u16 },

    // ==================== Branch ====================

    /// Branch on equal: if rs == rt then pc += sign_extend(offset) * 4
    Beq { rs: u8, rt: u8, offset: u16 },

    /// Branch on not equal: if rs != rt then pc += sign_extend(offset) * 4
    Bne { rs: u8, rt: u8, offset: u16 },

    // ==================== Register ====================

    /// Add: rd := rs + rt
    Add { rd: u8, rs: u8, rt: u8 },

    /// Bitwise and: rd := rs & rt
    And { rd: u8, rs: u8, rt: u8 },

    /// Bitwise or: rd := rs | rt
    Or { rd: u8, rs: u8, rt: u8 },

    /// Set on less than (unsigned compare): rd := (rs < rt) ? 1 : 0
    Slt { rd: u8, rs: u8, rt: u8 },

    // ==================== Shift ====================

    /// Shift left logical: rd := rt << sa
    Sll { rd: u8, rt: u8, sa: u8 },

    /// Shift right arithmetic: rd := (rt as signed) >> sa
    Sra { rd: u8, rt: u8, sa: u8 },

    /// Shift right logical: rd := rt >> sa
    Srl { rd: u8, rt: u8, sa: u8 },
}

impl Instruction {
    /// Lowercase assembler mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Addi { .. } => "addi",
            Instruction::Beq { .. } => "beq",
            Instruction::Bne { .. } => "bne",
            Instruction::Add { .. } => "add",
            Instruction::And { .. } => "and",
            Instruction::Or { .. } => "or",
            Instruction::Slt { .. } => "slt",
            Instruction::Sll { .. } => "sll",
            Instruction::Sra { .. } => "sra",
            Instruction::Srl { .. } => "srl",
        }
    }

    /// Whether this instruction may change the program counter.
    pub fn is_branch(&self) -> bool {
        matches!(self, Instruction::Beq { .. } | Instruction::Bne { .. })
    }
}

/// Decode an instruction word.
pub fn decode(word: u32) -> Result<Instruction, DecodeError> {
    let Fields { opcode, rs, rt, rd, sa, funct, imm } = Fields::extract(word);

    let instruction = match opcode {
        Opcode::SPECIAL => match funct {
            Funct::ADD => Instruction::Add { rd, rs, rt },
            Funct::AND => Instruction::And { rd, rs, rt },
            Funct::OR => Instruction::Or { rd, rs, rt },
            Funct::SLT => Instruction::Slt { rd, rs, rt },
            Funct::SLL => Instruction::Sll { rd, rt, sa },
            Funct::SRA => Instruction::Sra { rd, rt, sa },
            Funct::SRL => Instruction::Srl { rd, rt, sa },
            _ => return Err(DecodeError::UnknownFunct(funct)),
        },
        Opcode::ADDI => Instruction::Addi { rt, rs, imm },
        Opcode::BEQ => Instruction::Beq { rs, rt, offset: imm },
        Opcode::BNE => Instruction::Bne { rs, rt, offset: imm },
        _ => return Err(DecodeError::UnknownOpcode(opcode)),
    };

    Ok(instruction)
}

/// Encode an instruction back to a word.
///
/// Register numbers and shift amounts are masked to 5 bits.
pub fn encode(instr: &Instruction) -> u32 {
    fn r_type(rs: u8, rt: u8, rd: u8, sa: u8, funct: u8) -> u32 {
        ((Opcode::SPECIAL as u32) << OPCODE_SHIFT)
            | ((rs as u32 & REG_MASK) << RS_SHIFT)
            | ((rt as u32 & REG_MASK) << RT_SHIFT)
            | ((rd as u32 & REG_MASK) << RD_SHIFT)
            | ((sa as u32 & REG_MASK) << SA_SHIFT)
            | (funct as u32 & FUNCT_MASK)
    }

    fn i_type(opcode: u8, rs: u8, rt: u8, imm: u16) -> u32 {
        ((opcode as u32) << OPCODE_SHIFT)
            | ((rs as u32 & REG_MASK) << RS_SHIFT)
            | ((rt as u32 & REG_MASK) << RT_SHIFT)
            | imm as u32
    }

    match *instr {
        Instruction::Addi { rt, rs, imm } => i_type(Opcode::ADDI, rs, rt, imm),
        Instruction::Beq { rs, rt, offset } => i_type(Opcode::BEQ, rs, rt, offset),
        Instruction::Bne { rs, rt, offset } => i_type(Opcode::BNE, rs, rt, offset),
        Instruction::Add { rd, rs, rt } => r_type(rs, rt, rd, 0, Funct::ADD),
        Instruction::And { rd, rs, rt } => r_type(rs, rt, rd, 0, Funct::AND),
        Instruction::Or { rd, rs, rt } => r_type(rs, rt, rd, 0, Funct::OR),
        Instruction::Slt { rd, rs, rt } => r_type(rs, rt, rd, 0, Funct::SLT),
        Instruction::Sll { rd, rt, sa } => r_type(0, rt, rd, sa, Funct::SLL),
        Instruction::Sra { rd, rt, sa } => r_type(0, rt, rd, sa, Funct::SRA),
        Instruction::Srl { rd, rt, sa } => r_type(0, rt, rd, sa, Funct::SRL),
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("unknown SPECIAL function code: {0}")]
    UnknownFunct(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extraction() {
        // add $t2, $t0, $t1 with junk in sa
        let word = (8 << 21) | (9 << 16) | (10 << 11) | (3 << 6) | 32;
        let f = Fields::extract(word);

        assert_eq!(f.opcode, 0);
        assert_eq!(f.rs, 8);
        assert_eq!(f.rt, 9);
        assert_eq!(f.rd, 10);
        assert_eq!(f.sa, 3);
        assert_eq!(f.funct, 32);
        assert_eq!(f.imm as u32, word & 0xffff);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x0000), 0);
        assert_eq!(sign_extend(0x7fff), 0x0000_7fff);
        assert_eq!(sign_extend(0x8000), 0xffff_8000);
        assert_eq!(sign_extend(0xffff), 0xffff_ffff);
    }

    #[test]
    fn test_decode_addi() {
        // addi $t0, $zero, -1
        let word = 0x2008_ffff;
        assert_eq!(decode(word), Ok(Instruction::Addi { rt: 8, rs: 0, imm: 0xffff }));
    }

    #[test]
    fn test_decode_branches() {
        // beq $t0, $t1, 2
        assert_eq!(
            decode(0x1109_0002),
            Ok(Instruction::Beq { rs: 8, rt: 9, offset: 2 })
        );
        // bne $t0, $zero, -1
        assert_eq!(
            decode(0x1500_ffff),
            Ok(Instruction::Bne { rs: 8, rt: 0, offset: 0xffff })
        );
    }

    #[test]
    fn test_decode_special_table() {
        let cases = [
            (Funct::ADD, "add"),
            (Funct::AND, "and"),
            (Funct::OR, "or"),
            (Funct::SLT, "slt"),
            (Funct::SLL, "sll"),
            (Funct::SRA, "sra"),
            (Funct::SRL, "srl"),
        ];
        for (funct, mnemonic) in cases {
            let instr = decode(funct as u32).unwrap();
            assert_eq!(instr.mnemonic(), mnemonic);
        }
    }

    #[test]
    fn test_nop_is_sll_zero() {
        assert_eq!(decode(0), Ok(Instruction::Sll { rd: 0, rt: 0, sa: 0 }));
    }

    #[test]
    fn test_unknown_opcode() {
        // j 0 (jumps are not supported)
        assert_eq!(decode(0x0800_0000), Err(DecodeError::UnknownOpcode(2)));
        // lw
        assert_eq!(decode(0x8c00_0000), Err(DecodeError::UnknownOpcode(0x23)));
    }

    #[test]
    fn test_unknown_funct() {
        // jr $ra
        assert_eq!(decode(0x03e0_0008), Err(DecodeError::UnknownFunct(8)));
        // or's neighbour 37 is not OR here
        assert_eq!(decode(37), Err(DecodeError::UnknownFunct(37)));
    }

    #[test]
    fn test_encode_known_words() {
        assert_eq!(encode(&Instruction::Addi { rt: 8, rs: 0, imm: 0xffff }), 0x2008_ffff);
        assert_eq!(encode(&Instruction::Beq { rs: 8, rt: 9, offset: 2 }), 0x1109_0002);
        assert_eq!(
            encode(&Instruction::Sra { rd: 10, rt: 9, sa: 4 }),
            (9 << 16) | (10 << 11) | (4 << 6) | 3
        );
    }
}
