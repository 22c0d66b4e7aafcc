//! MIPS Emulator - CLI Entry Point
//!
//! Commands:
//! - `mips-emu run <program>` - Run a binary or assembly program to the end
//! - `mips-emu shell` - Interactive load/next/run/regs/reg/quit loop
//! - `mips-emu debug <program>` - Interactive TUI debugger
//! - `mips-emu asm <source>` - Assemble to a binary program
//! - `mips-emu disasm <program>` - Disassemble a binary program

use clap::{Parser, Subcommand};
use mips::{Config, Endian, Program};

#[derive(Parser)]
#[command(name = "mips-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An interpreter for a small subset of the MIPS32 instruction set")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Program files hold big-endian words
    #[arg(long, global = true)]
    big_endian: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it runs off its end
    Run {
        /// Path to the binary (or .asm/.s) program
        program: String,
        /// Maximum number of steps to run (default: unlimited)
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final registers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive command shell
    Shell,
    /// Interactive TUI debugger
    Debug {
        /// Path to the program to debug
        program: String,
    },
    /// Assemble source to a binary program
    Asm {
        /// Path to the source file
        source: String,
        /// Output file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a binary program to readable text
    Disasm {
        /// Path to the binary program
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if cli.big_endian {
        config.endian = Endian::Big;
    }

    match cli.command {
        Some(Commands::Run { program, max_steps, trace, json }) => {
            if max_steps.is_some() {
                config.max_steps = max_steps;
            }
            config.trace |= trace;
            run_program(&program, &config, json);
        }
        Some(Commands::Shell) => {
            run_shell(&config);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program, &config);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output, &config);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program, &config);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("MIPS Emulator v0.1.0");
            println!("An interpreter for a small subset of MIPS32");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Load a program, assembling it first if it is a source file.
fn load(path: &str, config: &Config) -> Program {
    use mips::{assemble, load_program};

    if path.ends_with(".asm") || path.ends_with(".s") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(words) => {
                println!("📝 Assembled {} instructions", words.len());
                Program::new(words)
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_program(path, config.endian) {
            Ok(program) => {
                println!("📂 Loaded {} instructions", program.len());
                program
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(path: &str, config: &Config, json: bool) {
    use mips::{Machine, Step};
    use mips::asm::disasm::format_instruction;

    println!("🔧 Running: {}", path);
    let mut machine = Machine::new(load(path, config));

    println!();
    println!("━━━ Execution ━━━");

    let limit = config.max_steps.unwrap_or(u64::MAX);
    let mut steps = 0u64;
    while steps < limit {
        let pc = machine.pc();
        match machine.step() {
            Step::Executed(instr) => {
                if config.trace {
                    println!("{:08x}: {}", pc, format_instruction(&instr));
                }
            }
            Step::Unknown { word, .. } => {
                println!("{:08x}: Unknown instruction {:#010x}...continuing.", pc, word);
            }
            Step::Finished => break,
        }
        steps += 1;
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Steps: {}", steps);

    if json {
        match serde_json::to_string_pretty(&machine.dump()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode registers: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", machine.dump());
    }

    if !machine.is_finished() {
        println!();
        println!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", limit);
    }
}

fn run_shell(config: &Config) {
    use mips::Shell;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut shell = Shell::new(config);

    if let Err(e) = shell.run(stdin.lock(), stdout.lock()) {
        eprintln!("❌ Shell error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: &Config) {
    use mips::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let program = load(path, config);

    if program.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(program) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: &Config) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>, config: &Config) {
    use mips::{assemble, save_program};

    let out_path = output.unwrap_or_else(|| {
        let stem = source_path
            .strip_suffix(".asm")
            .or_else(|| source_path.strip_suffix(".s"))
            .unwrap_or(source_path);
        format!("{}.bin", stem)
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    // Read source
    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble
    let words = match assemble(&source) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} instructions", words.len());

    if let Err(e) = save_program(&out_path, &words, config.endian) {
        eprintln!("❌ Failed to save program: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str, config: &Config) {
    use mips::{disassemble, load_program};

    println!("📖 Disassembling: {}", path);
    println!();

    let program = match load_program(path, config.endian) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(program.words()));
}

fn run_self_test() {
    use mips::{assemble, Machine, Step};

    println!("━━━ MIPS Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, source: &str, expect: &[(&str, u32)]| {
        print!("{}... ", name);
        let words = match assemble(source) {
            Ok(words) => words,
            Err(e) => {
                println!("✗ ({})", e);
                failed += 1;
                return;
            }
        };
        let mut machine = Machine::new(Program::new(words));
        machine.run();

        for (reg, want) in expect {
            let got = machine.register(reg).unwrap_or(!want);
            if got != *want {
                println!("✗ ({} = {:#x}, expected {:#x})", reg, got, want);
                failed += 1;
                return;
            }
        }
        println!("✓");
        passed += 1;
    };

    check("Zero register ignores writes", "addi $zero, $zero, 5", &[("$zero", 0)]);
    check("ADDI sign extension", "addi $t0, $zero, -32768", &[("$t0", 0xffff_8000)]);
    check(
        "SRA keeps sign, SRL zero-fills",
        "addi $t0, $zero, 1\nsll $t0, $t0, 31\nsra $t1, $t0, 4\nsrl $t2, $t0, 4",
        &[("$t1", 0xf800_0000), ("$t2", 0x0800_0000)],
    );
    check(
        "SLT",
        "addi $t0, $zero, 3\naddi $t1, $zero, 5\nslt $t2, $t0, $t1\nslt $t3, $t1, $t0",
        &[("$t2", 1), ("$t3", 0)],
    );
    check(
        "Counted loop",
        "addi $t0, $zero, 10\nloop: add $s0, $s0, $t0\naddi $t0, $t0, -1\nbne $t0, $zero, loop",
        &[("$s0", 55), ("$t0", 0)],
    );

    print!("Unknown instruction is skipped... ");
    let mut machine = Machine::new(Program::new(vec![0xffff_ffff]));
    if matches!(machine.step(), Step::Unknown { .. }) && machine.pc() == 4 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
