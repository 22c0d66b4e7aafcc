//! Interactive command shell.
//!
//! Commands, one per line (extra words on a line are ignored):
//! - `load <file>` - load a program file, replacing the current machine
//! - `next` - execute one instruction
//! - `run` - execute until the program ends
//! - `regs` - print every register and the PC
//! - `reg <name>` - print one register, e.g. `reg $t0`
//! - `quit` - leave the shell
//!
//! The shell owns at most one machine. A failed `load` leaves the current
//! machine in place.

use crate::asm::binary::load_program;
use crate::asm::disasm::format_instruction;
use crate::config::Config;
use crate::cpu::{DecodeError, Endian, LoadError, Machine, Step};
use std::io::{self, BufRead, Write};

const PROMPT: &str = "> ";

/// What the shell should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Shell state.
pub struct Shell {
    /// The loaded machine, if any.
    machine: Option<Machine>,
    endian: Endian,
    max_steps: Option<u64>,
    trace: bool,
}

impl Shell {
    /// Create a shell with no machine loaded.
    pub fn new(config: &Config) -> Self {
        Self {
            machine: None,
            endian: config.endian,
            max_steps: config.max_steps,
            trace: config.trace,
        }
    }

    /// The loaded machine.
    pub fn machine(&self) -> Option<&Machine> {
        self.machine.as_ref()
    }

    /// Replace the loaded machine.
    pub fn set_machine(&mut self, machine: Machine) {
        self.machine = Some(machine);
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            if self.execute(&line, &mut out)? == Control::Quit {
                return Ok(());
            }
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }

        writeln!(out)?;
        Ok(())
    }

    /// Execute one command line.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Control> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Control::Continue);
        };
        let argument = words.next();

        if self.machine.is_none() && matches!(command, "regs" | "reg" | "next" | "run") {
            writeln!(out, "No machine is loaded.")?;
            return Ok(Control::Continue);
        }

        match command {
            "load" => self.load(argument, out)?,
            "next" => {
                self.step(out)?;
            }
            "run" => self.run_to_end(out)?,
            "regs" => self.print_regs(out)?,
            "reg" => self.print_reg(argument, out)?,
            "quit" => return Ok(Control::Quit),
            _ => writeln!(out, "Command not recognized...continuing.")?,
        }

        Ok(Control::Continue)
    }

    fn load<W: Write>(&mut self, path: Option<&str>, out: &mut W) -> io::Result<()> {
        let Some(path) = path else {
            writeln!(out, "Usage: load <file>")?;
            return Ok(());
        };

        match load_program(path, self.endian) {
            Ok(program) => {
                self.machine = Some(Machine::new(program));
            }
            Err(LoadError::Misaligned { len }) => {
                log::warn!("{} is {} bytes, not a whole number of words", path, len);
                writeln!(out, "The file '{}' could not be read from properly", path)?;
            }
            Err(e) => {
                log::warn!("load failed: {:?}", e);
                writeln!(out, "{}", e)?;
            }
        }
        Ok(())
    }

    /// Step once, reporting anything unusual. Returns whether to keep going.
    fn step<W: Write>(&mut self, out: &mut W) -> io::Result<bool> {
        let Some(machine) = self.machine.as_mut() else {
            return Ok(false);
        };

        let pc = machine.pc();
        match machine.step() {
            Step::Executed(instr) => {
                if self.trace {
                    writeln!(out, "{:08x}: {}", pc, format_instruction(&instr))?;
                }
                Ok(true)
            }
            Step::Unknown { error: DecodeError::UnknownFunct(_), .. } => {
                writeln!(out, "Unknown instruction...continuing.")?;
                Ok(true)
            }
            Step::Unknown { error: DecodeError::UnknownOpcode(_), .. } => {
                writeln!(out, "unknown instruction..continuing.")?;
                Ok(true)
            }
            Step::Finished => {
                writeln!(out, "No more instructions to run.")?;
                Ok(false)
            }
        }
    }

    fn run_to_end<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let mut taken = 0u64;
        while self.step(out)? {
            taken += 1;
            if self.max_steps.is_some_and(|max| taken >= max) {
                writeln!(out, "Stopped after {} steps.", taken)?;
                break;
            }
        }
        Ok(())
    }

    fn print_regs<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(machine) = &self.machine {
            writeln!(out, "{}", machine.dump())?;
        }
        Ok(())
    }

    fn print_reg<W: Write>(&self, name: Option<&str>, out: &mut W) -> io::Result<()> {
        let Some(machine) = &self.machine else {
            return Ok(());
        };

        match name.map(|n| machine.register(n)) {
            Some(Ok(value)) => writeln!(out, "0x{:08x} ({})", value, value as i32),
            _ => writeln!(out, "Invalid register."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{assemble, save_program};
    use crate::cpu::Program;

    fn shell_with(source: &str) -> Shell {
        let mut shell = Shell::new(&Config::default());
        shell.set_machine(Machine::new(Program::new(assemble(source).unwrap())));
        shell
    }

    fn exec(shell: &mut Shell, line: &str) -> String {
        let mut out = Vec::new();
        shell.execute(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_commands_without_machine() {
        let mut shell = Shell::new(&Config::default());
        for command in ["regs", "reg $t0", "next", "run"] {
            assert_eq!(exec(&mut shell, command), "No machine is loaded.\n");
        }
        assert_eq!(exec(&mut shell, "jump"), "Command not recognized...continuing.\n");
        assert_eq!(exec(&mut shell, ""), "");
    }

    #[test]
    fn test_next_and_reg() {
        let mut shell = shell_with("addi $t0, $zero, -2");

        assert_eq!(exec(&mut shell, "next"), "");
        assert_eq!(exec(&mut shell, "reg $t0"), "0xfffffffe (-2)\n");
        assert_eq!(exec(&mut shell, "reg $x9"), "Invalid register.\n");
        assert_eq!(exec(&mut shell, "reg"), "Invalid register.\n");
        assert_eq!(exec(&mut shell, "next"), "No more instructions to run.\n");
    }

    #[test]
    fn test_run_reports_unknown_and_end() {
        let mut shell = shell_with(
            r#"
            .word 0x08000000
            .word 0x03e00008
            addi $t1, $zero, 4
            "#,
        );

        assert_eq!(
            exec(&mut shell, "run"),
            "unknown instruction..continuing.\n\
             Unknown instruction...continuing.\n\
             No more instructions to run.\n"
        );
        assert_eq!(shell.machine().unwrap().regs.get(9), 4);
    }

    #[test]
    fn test_run_respects_step_limit() {
        let config = Config { max_steps: Some(3), ..Config::default() };
        let mut shell = Shell::new(&config);
        shell.set_machine(Machine::new(Program::new(
            assemble("spin: beq $zero, $zero, spin").unwrap(),
        )));

        assert_eq!(exec(&mut shell, "run"), "Stopped after 3 steps.\n");
    }

    #[test]
    fn test_trace_output() {
        let config = Config { trace: true, ..Config::default() };
        let mut shell = Shell::new(&config);
        shell.set_machine(Machine::new(Program::new(assemble("add $t0, $t1, $t2").unwrap())));

        assert_eq!(exec(&mut shell, "next"), "00000000: add  $t0, $t1, $t2\n");
    }

    #[test]
    fn test_regs_dump() {
        let mut shell = shell_with("addi $ra, $zero, 1");
        exec(&mut shell, "run");
        let dump = exec(&mut shell, "regs");

        assert!(dump.contains("$ra  : 0x00000001 (    1)"));
        assert!(dump.ends_with("PC   : 4\n"));
    }

    #[test]
    fn test_failed_load_keeps_machine() {
        let mut shell = shell_with("addi $t0, $zero, 1");
        exec(&mut shell, "next");

        let missing = std::env::temp_dir().join("mips-emu-no-such-file.bin");
        let missing = missing.to_str().unwrap();
        assert_eq!(
            exec(&mut shell, &format!("load {}", missing)),
            format!("The file '{}' could not be successfully opened.\n", missing)
        );
        assert_eq!(exec(&mut shell, "reg $t0"), "0x00000001 (1)\n");

        let odd = std::env::temp_dir().join(format!("mips-emu-{}-odd.bin", std::process::id()));
        std::fs::write(&odd, [0u8; 5]).unwrap();
        let odd_name = odd.to_str().unwrap();
        assert_eq!(
            exec(&mut shell, &format!("load {}", odd_name)),
            format!("The file '{}' could not be read from properly\n", odd_name)
        );
        assert_eq!(exec(&mut shell, "reg $t0"), "0x00000001 (1)\n");
        std::fs::remove_file(&odd).unwrap();
    }

    #[test]
    fn test_load_replaces_machine() {
        let path = std::env::temp_dir().join(format!("mips-emu-{}-shell.bin", std::process::id()));
        save_program(&path, &assemble("addi $s0, $zero, 77").unwrap(), Endian::Little).unwrap();

        let mut shell = shell_with("addi $s0, $zero, 1");
        exec(&mut shell, "run");

        assert_eq!(exec(&mut shell, &format!("load {}", path.display())), "");
        assert_eq!(exec(&mut shell, "reg $s0"), "0x00000000 (0)\n");
        exec(&mut shell, "run");
        assert_eq!(exec(&mut shell, "reg $s0"), "0x0000004d (77)\n");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_session_until_quit() {
        let mut shell = shell_with("addi $t0, $zero, 5");
        let input = "next\nreg $t0 trailing words\nquit\nnext\n";
        let mut out = Vec::new();

        shell.run(input.as_bytes(), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "> > 0x00000005 (5)\n> ");
        // Nothing after quit ran
        assert_eq!(shell.machine().unwrap().pc(), 4);
    }
}
