//! Assembler, disassembler and program files.
//!
//! This module provides:
//! - A two-pass assembler (text → instruction words)
//! - A disassembler (instruction words → text)
//! - Raw binary program file I/O

pub mod assembler;
pub mod binary;
pub mod disasm;

pub use assembler::{assemble, AssemblerError};
pub use binary::{load_program, save_program, SaveError};
pub use disasm::disassemble;
