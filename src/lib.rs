//! # MIPS Emulator
//!
//! An interpreter for a small subset of the MIPS32 instruction set.
//!
//! A program is a flat file of 32-bit instruction words. The machine fetches
//! the word at the program counter, decodes it and executes it, one step at
//! a time or until the program runs off its end. Ten instructions are
//! supported: ADDI, BEQ, BNE, ADD, AND, OR, SLT, SLL, SRA and SRL. Anything
//! else is reported and skipped.

pub mod cpu;
pub mod asm;
pub mod config;
pub mod shell;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Machine, Step, Registers, RegisterDump, Instruction, DecodeError};
pub use cpu::{Endian, LoadError, Program, RegisterError};
pub use asm::{assemble, disassemble, AssemblerError, load_program, save_program};
pub use config::{Config, ConfigError};
pub use shell::Shell;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
