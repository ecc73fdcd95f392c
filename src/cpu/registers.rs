//! LS-8 CPU registers.
//!
//! The LS-8 has 8 general-purpose byte registers (R0-R7) plus three
//! internal registers that programs cannot address directly:
//! - PC: program counter
//! - SP: stack pointer
//! - FL: flags set by the last comparison

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// Initial stack pointer address.
pub const STACK_TOP: u8 = 0xF3;

/// Value R7 holds at boot.
pub const R7_BOOT: u8 = 0xF4;

/// The flags register.
///
/// Only the low three bits are used. After a comparison exactly one of
/// them is set; other instructions leave FL untouched.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags(u8);

impl Flags {
    pub const EQUAL: u8 = 0b001;
    pub const GREATER: u8 = 0b010;
    pub const LESS: u8 = 0b100;

    /// No comparison has run yet.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The flags produced by comparing `a` against `b`.
    pub fn compare(a: u8, b: u8) -> Self {
        match a.cmp(&b) {
            std::cmp::Ordering::Equal => Self(Self::EQUAL),
            std::cmp::Ordering::Greater => Self(Self::GREATER),
            std::cmp::Ordering::Less => Self(Self::LESS),
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn equal(self) -> bool {
        self.0 & Self::EQUAL != 0
    }

    pub fn greater(self) -> bool {
        self.0 & Self::GREATER != 0
    }

    pub fn less(self) -> bool {
        self.0 & Self::LESS != 0
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let l = if self.less() { 'L' } else { '-' };
        let g = if self.greater() { 'G' } else { '-' };
        let e = if self.equal() { 'E' } else { '-' };
        write!(f, "FL={}{}{}", l, g, e)
    }
}

/// An operand byte named a register that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("register index {0} out of range (R0-R7)")]
pub struct InvalidRegister(pub u8);

/// The LS-8 register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7: general-purpose registers
    pub r: [u8; NUM_REGISTERS],

    /// PC: address of the next instruction
    pub pc: usize,

    /// SP: address the next PUSH writes to.
    /// Separate from R7, which only holds a boot-time value.
    pub sp: usize,

    /// FL: result of the last CMP
    pub fl: Flags,

    /// Where SP starts; POP/RET may not move SP past it.
    stack_top: usize,

    /// Boot value of R7, kept for `reset`.
    r7_boot: u8,
}

impl Registers {
    /// Create a register file with the default boot values.
    pub fn new() -> Self {
        Self::with_boot(STACK_TOP, R7_BOOT)
    }

    /// Create a register file with a custom stack top and R7 boot value.
    pub fn with_boot(stack_top: u8, r7_boot: u8) -> Self {
        let mut regs = Self {
            r: [0; NUM_REGISTERS],
            pc: 0,
            sp: stack_top as usize,
            fl: Flags::empty(),
            stack_top: stack_top as usize,
            r7_boot,
        };
        regs.r[7] = r7_boot;
        regs
    }

    /// Reset all registers to their boot values.
    pub fn reset(&mut self) {
        self.r = [0; NUM_REGISTERS];
        self.r[7] = self.r7_boot;
        self.pc = 0;
        self.sp = self.stack_top;
        self.fl = Flags::empty();
    }

    /// Initial stack pointer address.
    pub fn stack_top(&self) -> usize {
        self.stack_top
    }

    /// Read a general-purpose register.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, InvalidRegister> {
        self.r
            .get(index as usize)
            .copied()
            .ok_or(InvalidRegister(index))
    }

    /// Write a general-purpose register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), InvalidRegister> {
        let slot = self
            .r
            .get_mut(index as usize)
            .ok_or(InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
