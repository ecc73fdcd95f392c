//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - up to 256 byte-wide memory cells
//! - 8 general-purpose registers plus PC, SP and FL
//! - a 25-instruction set decoded through a fixed dispatch table

pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
mod control;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Flags, Registers};
pub use alu::AluOp;
pub use decode::{Instruction, DecodeError};
pub use execute::{Cpu, CpuError, CpuState, Fault, Output, RunStatus, Trap};
