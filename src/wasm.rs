//! WebAssembly bindings for the MIPS emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Endian, Machine, Program, Step};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Option<Machine>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create an empty wrapper with no program loaded.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { machine: None }
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        let len = words.len();
        self.machine = Some(Machine::new(Program::new(words)));
        Ok(len)
    }

    /// Load a raw program image.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, bytes: &js_sys::Uint8Array, big_endian: bool) -> Result<usize, JsError> {
        let endian = if big_endian { Endian::Big } else { Endian::Little };
        let machine = Machine::from_bytes(&bytes.to_vec(), endian)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        let len = machine.program().len();
        self.machine = Some(machine);
        Ok(len)
    }

    /// Step one instruction. Returns the disassembled instruction, or
    /// `undefined` once the program has ended.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<Option<String>, JsError> {
        let machine = self.machine_mut()?;
        let pc = machine.pc();

        Ok(match machine.step() {
            Step::Executed(_) | Step::Unknown { .. } => {
                let word = machine.program().fetch(pc).unwrap_or_default();
                Some(disassemble_instruction(word))
            }
            Step::Finished => None,
        })
    }

    /// Run until the end of the program or `max_steps`. Returns steps taken.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u64, JsError> {
        Ok(self.machine_mut()?.run_limited(max_steps as u64))
    }

    /// Reset the machine to its freshly loaded state.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        if let Some(machine) = self.machine.as_mut() {
            machine.reset();
        }
    }

    /// Check if the program has ended.
    #[wasm_bindgen]
    pub fn is_finished(&self) -> bool {
        self.machine.as_ref().map_or(true, Machine::is_finished)
    }

    /// Get step count.
    #[wasm_bindgen]
    pub fn steps(&self) -> u64 {
        self.machine.as_ref().map_or(0, |m| m.steps)
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u32 {
        self.machine.as_ref().map_or(0, Machine::pc)
    }

    /// Get a register by canonical name.
    #[wasm_bindgen]
    pub fn register(&self, name: &str) -> Result<u32, JsError> {
        let machine = self.machine.as_ref()
            .ok_or_else(|| JsError::new("No machine is loaded."))?;
        machine.register(name)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// Get all register values in index order.
    #[wasm_bindgen]
    pub fn registers_all(&self) -> Vec<u32> {
        self.machine
            .as_ref()
            .map(|m| m.regs.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Get registers and PC as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        let machine = self.machine.as_ref()
            .ok_or_else(|| JsError::new("No machine is loaded."))?;
        serde_json::to_string(&machine.dump())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl WasmMachine {
    fn machine_mut(&mut self) -> Result<&mut Machine, JsError> {
        self.machine.as_mut()
            .ok_or_else(|| JsError::new("No machine is loaded."))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return instruction count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let words = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(words.len())
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u32) -> String {
    disassemble_instruction(word)
}
