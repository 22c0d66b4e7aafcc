//! CPU emulation for a MIPS32 subset.
//!
//! This module implements the machine:
//! - 32 general-purpose 32-bit registers, `$zero` hard-wired to 0
//! - A byte-addressed program counter over a read-only instruction stream
//! - ADDI, BEQ, BNE and the SPECIAL-group ADD, AND, OR, SLT, SLL, SRA, SRL

pub mod registers;
pub mod program;
pub mod decode;
pub mod execute;

pub use registers::{Registers, RegisterError, REGISTER_NAMES};
pub use program::{Endian, LoadError, Program};
pub use decode::{Instruction, DecodeError};
pub use execute::{Machine, RegisterDump, Step};
