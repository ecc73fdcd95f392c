//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit computer with eight byte-wide
//! registers, a 256-byte address space and a 25-instruction set.
//!
//! ```
//! use ls8::{Cpu, Output, RunStatus, parse_program};
//!
//! let image = parse_program("10000010\n0\n1000\n01000111\n0\n1\n").unwrap();
//! let mut cpu = Cpu::new();
//! cpu.load(&image).unwrap();
//!
//! assert_eq!(cpu.run(), RunStatus::Halted);
//! assert_eq!(cpu.take_output(), vec![Output::Number(8)]);
//! ```

pub mod cpu;
pub mod config;
pub mod loader;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Fault, Trap, RunStatus, Output, Memory, Registers, Instruction};
pub use config::{MachineConfig, UnknownOpcodePolicy, ConfigError};
pub use loader::{parse_program, load_program_file, ProgramError};
