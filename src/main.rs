//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` program file
//! - `ls8-emu test` - Run the built-in self-test

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the LS-8, a small 8-bit register machine")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 file to execute
        program: String,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print a trace line to stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        /// JSON machine configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Skip unknown opcodes instead of faulting
        #[arg(long)]
        legacy_opcodes: bool,
        /// Write the final machine state as JSON to this file
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Run the built-in self-test
    Test,
}

struct RunOptions {
    max_cycles: Option<u64>,
    trace: bool,
    config: Option<String>,
    legacy_opcodes: bool,
    dump_state: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, config, legacy_opcodes, dump_state }) => {
            let options = RunOptions { max_cycles, trace, config, legacy_opcodes, dump_state };
            run_program(&program, &options);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("LS-8 Emulator v0.1.0");
            println!("An 8-bit register machine emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run_program(path: &str, options: &RunOptions) {
    use ls8::{Cpu, MachineConfig, UnknownOpcodePolicy, load_program_file};

    let mut config = match &options.config {
        Some(config_path) => match MachineConfig::from_json_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };
    if options.legacy_opcodes {
        config.unknown_opcode = UnknownOpcodePolicy::Skip;
    }

    let image = match load_program_file(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to read program: {}", e);
            std::process::exit(1);
        }
    };

    let mut cpu = Cpu::with_config(&config);
    if let Err(e) = cpu.load(&image) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }
    log::info!("running {} ({} bytes)", path, image.len());

    let mut failed = false;
    while cpu.is_running() {
        if options.max_cycles.is_some_and(|max| cpu.cycles >= max) {
            eprintln!("⚠️  Reached max cycles limit ({}).", cpu.cycles);
            break;
        }
        if options.trace {
            eprintln!("{}", cpu.trace_line());
        }

        let result = cpu.step();
        for out in cpu.take_output() {
            println!("{}", out);
        }
        if let Err(e) = result {
            eprintln!("❌ CPU error: {}", e);
            failed = true;
            break;
        }
    }
    log::info!("stopped after {} cycles: {:?}", cpu.cycles, cpu.state);

    if let Some(dump_path) = &options.dump_state {
        if let Err(e) = dump_state(&cpu, dump_path) {
            eprintln!("❌ Failed to write state: {}", e);
            std::process::exit(1);
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn dump_state(cpu: &ls8::Cpu, path: &str) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(cpu)?;
    std::fs::write(path, json)
}

fn run_self_test() {
    use ls8::{Cpu, MachineConfig, Output, RunStatus, Fault};
    use ls8::cpu::AluOp;
    use ls8::cpu::decode::encode_program;
    use ls8::cpu::Instruction::*;

    println!("━━━ LS-8 Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let run = |program: &[ls8::Instruction]| {
        let mut cpu = Cpu::new();
        let status = match cpu.load(&encode_program(program)) {
            Ok(()) => Some(cpu.run()),
            Err(_) => None,
        };
        (cpu, status)
    };

    // Test 1: Wrapping arithmetic
    print!("Wrapping INC/DEC... ");
    let (cpu, _) = run(&[
        Ldi { reg: 0, imm: 255 },
        Alu { op: AluOp::Inc, a: 0, b: 0 },
        Ldi { reg: 1, imm: 0 },
        Alu { op: AluOp::Dec, a: 1, b: 0 },
        Hlt,
    ]);
    if cpu.regs.r[0] == 0 && cpu.regs.r[1] == 255 { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 2: Comparison flags
    print!("CMP sets one flag... ");
    let (cpu, _) = run(&[
        Ldi { reg: 0, imm: 7 },
        Ldi { reg: 1, imm: 3 },
        Alu { op: AluOp::Cmp, a: 0, b: 1 },
        Hlt,
    ]);
    if cpu.regs.fl.greater() && cpu.regs.fl.bits().count_ones() == 1 { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 3: Add and print
    print!("LDI/ADD/PRN... ");
    let (cpu, status) = run(&[
        Ldi { reg: 0, imm: 5 },
        Ldi { reg: 1, imm: 3 },
        Alu { op: AluOp::Add, a: 0, b: 1 },
        Prn { reg: 0 },
        Hlt,
    ]);
    if status == Some(RunStatus::Halted) && cpu.output() == [Output::Number(8)] {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (got {:?})", cpu.output());
        failed += 1;
    }

    // Test 4: Stack round trip
    print!("PUSH/POP round trip... ");
    let (cpu, _) = run(&[Ldi { reg: 0, imm: 42 }, Push { reg: 0 }, Pop { reg: 1 }, Hlt]);
    if cpu.regs.r[1] == 42 && cpu.regs.sp == cpu.regs.stack_top() { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 5: Call and return
    print!("CALL/RET... ");
    let (cpu, _) = run(&[
        Ldi { reg: 1, imm: 8 },
        Call { reg: 1 },
        Prn { reg: 0 },
        Hlt,
        Ldi { reg: 0, imm: 99 },
        Ret,
    ]);
    if cpu.output() == [Output::Number(99)] { println!("✓"); passed += 1; }
    else { println!("✗ (got {:?})", cpu.output()); failed += 1; }

    // Test 6: Modulus by zero
    print!("MOD by zero faults... ");
    let (cpu, status) = run(&[
        Ldi { reg: 0, imm: 7 },
        Ldi { reg: 1, imm: 0 },
        Alu { op: AluOp::Mod, a: 0, b: 1 },
        Hlt,
    ]);
    match status {
        Some(RunStatus::Faulted(trap)) if trap.fault == Fault::DivisionByZero && cpu.regs.r[0] == 7 => {
            println!("✓");
            passed += 1;
        }
        other => {
            println!("✗ (got {:?})", other);
            failed += 1;
        }
    }

    // Test 7: Oversized image
    print!("Oversized program rejected... ");
    let config = MachineConfig { memory_size: 4, stack_top: 3, ..MachineConfig::default() };
    let mut cpu = Cpu::with_config(&config);
    if cpu.load(&[0x01; 5]).is_err() && cpu.cycles == 0 { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
