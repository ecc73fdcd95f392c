//! Arithmetic/logic unit.
//!
//! Pure byte arithmetic. Every operation wraps modulo 256 explicitly;
//! comparison produces a new flags value instead of a result byte.

use crate::cpu::registers::Flags;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// An ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Mul,
    Mod,
    Cmp,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Not,
    Inc,
    Dec,
}

impl AluOp {
    /// Whether the op reads its second operand register.
    ///
    /// NOT carries a second operand byte in the instruction stream but
    /// never looks at it.
    pub fn reads_b(self) -> bool {
        !matches!(self, AluOp::Not | AluOp::Inc | AluOp::Dec)
    }
}

/// What an ALU operation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOutcome {
    /// Store this value into the first operand register.
    Value(u8),
    /// Replace FL; no register changes.
    Flags(Flags),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AluError {
    #[error("modulus by zero")]
    DivisionByZero,
}

/// Apply `op` to `a` and `b`. Unary ops ignore `b`.
pub fn alu(op: AluOp, a: u8, b: u8) -> Result<AluOutcome, AluError> {
    let value = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Mod => a.checked_rem(b).ok_or(AluError::DivisionByZero)?,
        AluOp::Cmp => return Ok(AluOutcome::Flags(Flags::compare(a, b))),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Shl => shift_left(a, b),
        AluOp::Shr => shift_right(a, b),
        AluOp::Not => !a,
        AluOp::Inc => a.wrapping_add(1),
        AluOp::Dec => a.wrapping_sub(1),
    };
    Ok(AluOutcome::Value(value))
}

/// Shift left; amounts of 8 or more shift every bit out.
#[inline]
pub fn shift_left(value: u8, amount: u8) -> u8 {
    value.checked_shl(amount as u32).unwrap_or(0)
}

/// Shift right; amounts of 8 or more shift every bit out.
#[inline]
pub fn shift_right(value: u8, amount: u8) -> u8 {
    value.checked_shr(amount as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn value(op: AluOp, a: u8, b: u8) -> u8 {
        match alu(op, a, b).unwrap() {
            AluOutcome::Value(v) => v,
            other => panic!("expected a value, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapping() {
        assert_eq!(value(AluOp::Add, 255, 1), 0);
        assert_eq!(value(AluOp::Inc, 255, 0), 0);
        assert_eq!(value(AluOp::Dec, 0, 0), 255);
        assert_eq!(value(AluOp::Mul, 16, 16), 0);
        assert_eq!(value(AluOp::Mul, 20, 13), 4);
    }

    #[test]
    fn test_logic() {
        assert_eq!(value(AluOp::And, 0b1100, 0b1010), 0b1000);
        assert_eq!(value(AluOp::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(value(AluOp::Xor, 0b1100, 0b1010), 0b0110);
        assert_eq!(value(AluOp::Not, 0b1111_0000, 0xEE), 0b0000_1111);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(value(AluOp::Shl, 0b0000_0011, 2), 0b0000_1100);
        assert_eq!(value(AluOp::Shr, 0b1100_0000, 6), 0b0000_0011);
        assert_eq!(value(AluOp::Shl, 0x80, 1), 0);
        assert_eq!(value(AluOp::Shl, 0xFF, 8), 0);
        assert_eq!(value(AluOp::Shr, 0xFF, 200), 0);
    }

    #[test]
    fn test_mod() {
        assert_eq!(value(AluOp::Mod, 17, 5), 2);
        assert_eq!(alu(AluOp::Mod, 17, 0), Err(AluError::DivisionByZero));
    }

    #[test]
    fn test_cmp() {
        assert_eq!(alu(AluOp::Cmp, 5, 5), Ok(AluOutcome::Flags(Flags::compare(5, 5))));
        match alu(AluOp::Cmp, 7, 3).unwrap() {
            AluOutcome::Flags(fl) => assert!(fl.greater()),
            other => panic!("unexpected {:?}", other),
        }
        match alu(AluOp::Cmp, 3, 7).unwrap() {
            AluOutcome::Flags(fl) => assert!(fl.less()),
            other => panic!("unexpected {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn add_matches_mod_256(a: u8, b: u8) {
            prop_assert_eq!(value(AluOp::Add, a, b) as u32, (a as u32 + b as u32) % 256);
        }

        #[test]
        fn mul_matches_mod_256(a: u8, b: u8) {
            prop_assert_eq!(value(AluOp::Mul, a, b) as u32, (a as u32 * b as u32) % 256);
        }

        #[test]
        fn inc_then_dec_is_identity(a: u8) {
            let up = value(AluOp::Inc, a, 0);
            prop_assert_eq!(value(AluOp::Dec, up, 0), a);
        }

        #[test]
        fn not_is_involution(a: u8, junk: u8) {
            let once = value(AluOp::Not, a, junk);
            prop_assert_eq!(value(AluOp::Not, once, junk), a);
        }

        #[test]
        fn cmp_sets_exactly_one_flag(a: u8, b: u8) {
            match alu(AluOp::Cmp, a, b).unwrap() {
                AluOutcome::Flags(fl) => prop_assert_eq!(fl.bits().count_ones(), 1),
                AluOutcome::Value(_) => prop_assert!(false, "CMP produced a value"),
            }
        }

        #[test]
        fn mod_below_divisor(a in any::<u8>(), b in 1u8..=255) {
            prop_assert!(value(AluOp::Mod, a, b) < b);
        }
    }
}
