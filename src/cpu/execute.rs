//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//!
//! Branches follow the lab machine's convention rather than the
//! architectural one: a taken branch adds `offset * 4` to the address of the
//! branch itself, and the usual `+4` is applied afterwards like for any other
//! instruction. Delay slots do not exist.

use crate::cpu::decode::{self, sign_extend, DecodeError, Instruction};
use crate::cpu::program::{Endian, LoadError, Program, INSTR_SIZE};
use crate::cpu::registers::{Registers, RegisterError};
use serde::{Serialize, Deserialize};

/// Result of a single [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction was executed.
    Executed(Instruction),
    /// The word at pc did not decode. Registers are untouched and pc has
    /// still moved on to the next word.
    Unknown { word: u32, error: DecodeError },
    /// pc is past the last instruction. Nothing was changed.
    Finished,
}

impl Step {
    /// `false` only once the program has run off its end.
    pub fn continues(&self) -> bool {
        !matches!(self, Step::Finished)
    }
}

/// A MIPS machine: register file, program counter and the loaded program.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// General-purpose registers.
    pub regs: Registers,
    /// Byte offset of the next instruction to fetch.
    pc: u32,
    /// The loaded program.
    program: Program,
    /// Steps taken so far, including skipped unknown words.
    pub steps: u64,
    /// Last executed instruction (for debugging).
    #[serde(skip)]
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with zeroed registers and pc at the first word.
    pub fn new(program: Program) -> Self {
        Self {
            regs: Registers::new(),
            pc: 0,
            program,
            steps: 0,
            last_instr: None,
        }
    }

    /// Create a machine from a raw program image.
    pub fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, LoadError> {
        let program = Program::from_bytes(bytes, endian)?;
        log::info!("loaded {} instructions", program.len());
        Ok(Self::new(program))
    }

    /// Put the machine back in its freshly loaded state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.pc = 0;
        self.steps = 0;
        self.last_instr = None;
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Step {
        let Some(word) = self.program.fetch(self.pc) else {
            log::info!("no more instructions to run (pc={:#x})", self.pc);
            return Step::Finished;
        };

        let outcome = match decode::decode(word) {
            Ok(instr) => {
                log::debug!("{:#010x}: {:#010x} {:?}", self.pc, word, instr);
                self.execute(instr);
                self.last_instr = Some(instr);
                Step::Executed(instr)
            }
            Err(error) => {
                log::warn!(
                    "unknown instruction {:#010x} at pc={:#x}: {}",
                    word, self.pc, error
                );
                Step::Unknown { word, error }
            }
        };

        // Applied after every instruction, taken branches included
        self.pc = self.pc.wrapping_add(INSTR_SIZE);
        self.steps += 1;

        outcome
    }

    /// Run until the program runs off its end.
    ///
    /// Returns the number of steps taken. There is no step limit: a
    /// backward branch that is always taken never returns.
    pub fn run(&mut self) -> u64 {
        let start = self.steps;
        while self.step().continues() {}
        self.steps - start
    }

    /// Run for at most `max_steps` steps.
    pub fn run_limited(&mut self, max_steps: u64) -> u64 {
        let start = self.steps;
        let limit = self.steps.saturating_add(max_steps);

        while self.steps < limit && self.step().continues() {}

        self.steps - start
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) {
        let regs = &mut self.regs;

        match instr {
            Instruction::Addi { rt, rs, imm } => {
                let value = regs.get(rs as usize).wrapping_add(sign_extend(imm));
                regs.set(rt as usize, value);
            }

            Instruction::Beq { rs, rt, offset } => {
                if regs.get(rs as usize) == regs.get(rt as usize) {
                    self.pc = self.pc.wrapping_add(branch_displacement(offset));
                }
            }

            Instruction::Bne { rs, rt, offset } => {
                if regs.get(rs as usize) != regs.get(rt as usize) {
                    self.pc = self.pc.wrapping_add(branch_displacement(offset));
                }
            }

            Instruction::Add { rd, rs, rt } => {
                let value = regs.get(rs as usize).wrapping_add(regs.get(rt as usize));
                regs.set(rd as usize, value);
            }

            Instruction::And { rd, rs, rt } => {
                let value = regs.get(rs as usize) & regs.get(rt as usize);
                regs.set(rd as usize, value);
            }

            Instruction::Or { rd, rs, rt } => {
                let value = regs.get(rs as usize) | regs.get(rt as usize);
                regs.set(rd as usize, value);
            }

            Instruction::Slt { rd, rs, rt } => {
                let less = regs.get(rs as usize) < regs.get(rt as usize);
                regs.set(rd as usize, less as u32);
            }

            Instruction::Sll { rd, rt, sa } => {
                let value = regs.get(rt as usize) << (sa & 0x1f);
                regs.set(rd as usize, value);
            }

            Instruction::Sra { rd, rt, sa } => {
                let value = (regs.get(rt as usize) as i32) >> (sa & 0x1f);
                regs.set(rd as usize, value as u32);
            }

            Instruction::Srl { rd, rt, sa } => {
                let value = regs.get(rt as usize) >> (sa & 0x1f);
                regs.set(rd as usize, value);
            }
        }
    }

    /// Byte offset of the next instruction.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Whether another `step()` would execute something.
    pub fn is_finished(&self) -> bool {
        self.program.fetch(self.pc).is_none()
    }

    /// Read a register by canonical name.
    pub fn register(&self, name: &str) -> Result<u32, RegisterError> {
        self.regs.get_by_name(name)
    }

    /// Snapshot every register and pc for display.
    pub fn dump(&self) -> RegisterDump {
        RegisterDump {
            registers: self
                .regs
                .named()
                .map(|(name, value)| NamedRegister { name: name.to_string(), value })
                .collect(),
            pc: self.pc,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }
}

/// Sign-extended branch offset scaled to bytes.
#[inline]
fn branch_displacement(offset: u16) -> u32 {
    sign_extend(offset).wrapping_mul(INSTR_SIZE)
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("pc", &self.pc)
            .field("steps", &self.steps)
            .field("program", &self.program)
            .field("regs", &self.regs)
            .finish()
    }
}

/// One entry of a [`RegisterDump`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRegister {
    pub name: String,
    pub value: u32,
}

/// All registers in canonical order, plus pc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDump {
    pub registers: Vec<NamedRegister>,
    pub pc: u32,
}

impl std::fmt::Display for RegisterDump {
    /// Four registers per line, then pc.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, reg) in self.registers.iter().enumerate() {
            write!(f, "{:<5}: 0x{:08x} ({:5}) ", reg.name, reg.value, reg.value as i32)?;
            if (i + 1) % 4 == 0 {
                writeln!(f)?;
            }
        }
        write!(f, "{:<5}: {}", "PC", self.pc)
    }
}
