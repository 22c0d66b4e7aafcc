//! Debugger application state and logic.

use crate::{Machine, Program, Step};
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Breakpoints (by byte address).
    pub breakpoints: HashSet<u32>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Register view scroll offset, in rows of four.
    pub reg_scroll: usize,
    /// Steps to take per tick while running.
    pub steps_per_tick: u64,
    /// Step over a breakpoint at the pc where `run` was pressed.
    resuming: bool,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Program) -> Self {
        Self {
            machine: Machine::new(program),
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            reg_scroll: 0,
            steps_per_tick: 1,
            resuming: false,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.machine.pc();
        match self.machine.step() {
            Step::Executed(instr) => {
                self.status = format!("PC={:08x}: {}", pc, format_instruction(&instr));
            }
            Step::Unknown { word, error } => {
                self.status = format!("PC={:08x}: unknown instruction {:#010x} ({})", pc, word, error);
            }
            Step::Finished => {
                self.status = format!("No more instructions to run ({} steps)", self.machine.steps);
                self.running = false;
            }
        }
    }

    /// Run until end of program or breakpoint.
    pub fn run(&mut self) {
        self.running = true;
        self.resuming = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        for _ in 0..self.steps_per_tick {
            if !self.running {
                return;
            }

            if self.machine.is_finished() {
                self.running = false;
                self.status = format!("Finished after {} steps", self.machine.steps);
                return;
            }

            // Check for breakpoint
            let pc = self.machine.pc();
            let resuming = std::mem::take(&mut self.resuming);
            if !resuming && self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at PC={:08x}", pc);
                return;
            }

            self.step();
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:08x}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:08x}", pc);
        }
    }

    /// Reset the machine to its freshly loaded state.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Run faster or slower.
    pub fn change_speed(&mut self, faster: bool) {
        self.steps_per_tick = if faster {
            (self.steps_per_tick * 10).min(100_000)
        } else {
            (self.steps_per_tick / 10).max(1)
        };
        self.status = format!("{} steps per tick", self.steps_per_tick);
    }

    /// Get disassembly around the current PC as (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u32, String, bool)> {
        let words = self.machine.program().words();
        let pc = self.machine.pc();
        let current = (pc / 4) as usize;
        let start = current.saturating_sub(lines / 2);

        words
            .iter()
            .enumerate()
            .skip(start)
            .take(lines)
            .map(|(index, word)| {
                let addr = index as u32 * 4;
                (addr, disassemble_instruction(*word), addr == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Program) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(program);

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('+') => app.change_speed(true),
                        KeyCode::Char('-') => app.change_speed(false),
                        KeyCode::Up => {
                            app.reg_scroll = app.reg_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.reg_scroll < 7 {
                                app.reg_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn app(source: &str) -> DebuggerApp {
        DebuggerApp::new(Program::new(assemble(source).unwrap()))
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app(
            r#"
            addi $t0, $zero, 1
            addi $t0, $t0, 1
            addi $t0, $t0, 1
            "#,
        );
        app.machine.step();
        app.toggle_breakpoint();
        app.machine.reset();

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.machine.pc(), 4);
        assert!(app.status.starts_with("Breakpoint"));
    }

    #[test]
    fn test_run_resumes_from_breakpoint() {
        let mut app = app(
            r#"
            addi $t0, $zero, 1
            addi $t0, $t0, 1
            addi $t0, $t0, 1
            "#,
        );
        app.toggle_breakpoint();
        app.machine.step();
        app.toggle_breakpoint();
        app.machine.reset();

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert_eq!(app.machine.pc(), 4);
        assert!(app.status.starts_with("Breakpoint"));

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert!(app.machine.is_finished());
        assert_eq!(app.machine.regs.get(8), 3);
    }

    #[test]
    fn test_run_to_finish() {
        let mut app = app("addi $t0, $zero, 1\nadd $t1, $t0, $t0");
        app.steps_per_tick = 100;
        app.run();
        app.tick();

        assert!(!app.running);
        assert_eq!(app.machine.regs.get(9), 2);
        assert_eq!(app.status, "Finished after 2 steps");
    }

    #[test]
    fn test_disassembly_window() {
        let app = app("addi $t0, $zero, 1\n.word 0xffffffff");
        let lines = app.get_disassembly(10);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (0, "addi $t0, $zero, 1".to_string(), true));
        assert_eq!(lines[1].1, ".word 0xffffffff");
    }

    #[test]
    fn test_speed_bounds() {
        let mut app = app("");
        app.change_speed(false);
        assert_eq!(app.steps_per_tick, 1);
        for _ in 0..10 {
            app.change_speed(true);
        }
        assert_eq!(app.steps_per_tick, 100_000);
    }
}
