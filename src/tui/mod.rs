//! TUI debugger for the MIPS emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Live register view
//! - Step/run/breakpoint controls
//! - Disassembly view around the PC

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
