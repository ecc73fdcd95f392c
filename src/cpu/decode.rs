//! Instruction decoder for the LS-8.
//!
//! An instruction is one opcode byte followed by zero, one or two operand
//! bytes. The opcode byte itself describes its shape:
//!
//! ```text
//! AABCDDDD
//! AA   number of operands (0-2)
//! B    1 if this is an ALU operation
//! C    1 if the instruction sets PC
//! DDDD instruction identifier
//! ```
//!
//! Decoding goes through a fixed 256-entry dispatch table built at compile
//! time, so an unmapped byte is always an [`DecodeError::UnknownOpcode`].

use crate::cpu::alu::AluOp;
use crate::cpu::memory::{Memory, MemoryError};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// What an opcode does, independent of its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Hlt,
    Ldi,
    Prn,
    Pra,
    Alu(AluOp),
    Push,
    Pop,
    Call,
    Ret,
    Jmp,
    Jeq,
    Jne,
    Ld,
    St,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub kind: OpKind,
    /// Operand bytes following the opcode.
    pub operands: u8,
    /// Whether the instruction may set PC directly.
    pub sets_pc: bool,
}

impl OpInfo {
    const fn new(opcode: u8, mnemonic: &'static str, kind: OpKind) -> Self {
        Self {
            opcode,
            mnemonic,
            kind,
            operands: opcode >> 6,
            sets_pc: opcode & 0b0001_0000 != 0,
        }
    }

    /// Like `new`, for an opcode that consumes more operand bytes than
    /// its high bits announce.
    const fn with_operands(opcode: u8, mnemonic: &'static str, kind: OpKind, operands: u8) -> Self {
        Self {
            opcode,
            mnemonic,
            kind,
            operands,
            sets_pc: opcode & 0b0001_0000 != 0,
        }
    }

    /// Total encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + self.operands as usize
    }
}

/// Opcode definitions.
pub mod op {
    use super::{OpInfo, OpKind};
    use crate::cpu::alu::AluOp;

    pub const HLT: OpInfo = OpInfo::new(0b0000_0001, "HLT", OpKind::Hlt);
    pub const LDI: OpInfo = OpInfo::new(0b1000_0010, "LDI", OpKind::Ldi);
    pub const PRN: OpInfo = OpInfo::new(0b0100_0111, "PRN", OpKind::Prn);
    pub const PRA: OpInfo = OpInfo::new(0b0100_1000, "PRA", OpKind::Pra);

    pub const ADD: OpInfo = OpInfo::new(0b1010_0000, "ADD", OpKind::Alu(AluOp::Add));
    pub const MUL: OpInfo = OpInfo::new(0b1010_0010, "MUL", OpKind::Alu(AluOp::Mul));
    pub const MOD: OpInfo = OpInfo::new(0b1010_0100, "MOD", OpKind::Alu(AluOp::Mod));
    pub const CMP: OpInfo = OpInfo::new(0b1010_0111, "CMP", OpKind::Alu(AluOp::Cmp));
    pub const AND: OpInfo = OpInfo::new(0b1010_1000, "AND", OpKind::Alu(AluOp::And));
    pub const OR: OpInfo = OpInfo::new(0b1010_1010, "OR", OpKind::Alu(AluOp::Or));
    pub const XOR: OpInfo = OpInfo::new(0b1010_1011, "XOR", OpKind::Alu(AluOp::Xor));
    pub const SHL: OpInfo = OpInfo::new(0b1010_1100, "SHL", OpKind::Alu(AluOp::Shl));
    pub const SHR: OpInfo = OpInfo::new(0b1010_1101, "SHR", OpKind::Alu(AluOp::Shr));
    pub const INC: OpInfo = OpInfo::new(0b0110_0101, "INC", OpKind::Alu(AluOp::Inc));
    pub const DEC: OpInfo = OpInfo::new(0b0110_0110, "DEC", OpKind::Alu(AluOp::Dec));
    // Marked as one-operand by its high bits, but the second byte is part
    // of the instruction.
    pub const NOT: OpInfo = OpInfo::with_operands(0b0110_1001, "NOT", OpKind::Alu(AluOp::Not), 2);

    pub const PUSH: OpInfo = OpInfo::new(0b0100_0101, "PUSH", OpKind::Push);
    pub const POP: OpInfo = OpInfo::new(0b0100_0110, "POP", OpKind::Pop);
    pub const CALL: OpInfo = OpInfo::new(0b0101_0000, "CALL", OpKind::Call);
    pub const RET: OpInfo = OpInfo::new(0b0001_0001, "RET", OpKind::Ret);
    pub const JMP: OpInfo = OpInfo::new(0b0101_0100, "JMP", OpKind::Jmp);
    pub const JEQ: OpInfo = OpInfo::new(0b0101_0101, "JEQ", OpKind::Jeq);
    pub const JNE: OpInfo = OpInfo::new(0b0101_0110, "JNE", OpKind::Jne);

    pub const LD: OpInfo = OpInfo::new(0b1000_0011, "LD", OpKind::Ld);
    pub const ST: OpInfo = OpInfo::new(0b1000_0100, "ST", OpKind::St);

    /// Every defined opcode.
    pub const ALL: [OpInfo; 25] = [
        HLT, LDI, PRN, PRA, ADD, MUL, MOD, CMP, AND, OR, XOR, SHL, SHR, INC, DEC, NOT,
        PUSH, POP, CALL, RET, JMP, JEQ, JNE, LD, ST,
    ];
}

/// Opcode byte → table row.
static DISPATCH: [Option<OpInfo>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < op::ALL.len() {
        table[op::ALL[i].opcode as usize] = Some(op::ALL[i]);
        i += 1;
    }
    table
};

/// Look up an opcode byte in the dispatch table.
#[inline]
pub fn lookup(opcode: u8) -> Option<OpInfo> {
    DISPATCH[opcode as usize]
}

/// Decoded LS-8 instruction.
///
/// Register operands are raw operand bytes; they are validated against the
/// register file when the instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Halt execution
    Hlt,

    /// reg := imm
    Ldi { reg: u8, imm: u8 },

    /// Print reg as a decimal number
    Prn { reg: u8 },

    /// Print reg as a character
    Pra { reg: u8 },

    /// a := op(a, b), or FL := cmp(a, b).
    /// For INC/DEC `b` is always 0; for NOT it is encoded but not read.
    Alu { op: AluOp, a: u8, b: u8 },

    /// [SP] := reg; SP -= 1
    Push { reg: u8 },

    /// SP += 1; reg := [SP]
    Pop { reg: u8 },

    /// Push the return address, then PC := reg
    Call { reg: u8 },

    /// Pop the return address into PC
    Ret,

    /// PC := reg
    Jmp { reg: u8 },

    /// If FL has Equal: PC := reg
    Jeq { reg: u8 },

    /// If FL lacks Equal: PC := reg
    Jne { reg: u8 },

    /// a := [b]
    Ld { a: u8, b: u8 },

    /// [a] := b
    St { a: u8, b: u8 },
}

impl Instruction {
    /// Build an instruction from its kind and operand bytes.
    pub fn from_parts(kind: OpKind, operands: [u8; 2]) -> Self {
        let [a, b] = operands;
        match kind {
            OpKind::Hlt => Instruction::Hlt,
            OpKind::Ldi => Instruction::Ldi { reg: a, imm: b },
            OpKind::Prn => Instruction::Prn { reg: a },
            OpKind::Pra => Instruction::Pra { reg: a },
            OpKind::Alu(op @ (AluOp::Inc | AluOp::Dec)) => Instruction::Alu { op, a, b: 0 },
            OpKind::Alu(op) => Instruction::Alu { op, a, b },
            OpKind::Push => Instruction::Push { reg: a },
            OpKind::Pop => Instruction::Pop { reg: a },
            OpKind::Call => Instruction::Call { reg: a },
            OpKind::Ret => Instruction::Ret,
            OpKind::Jmp => Instruction::Jmp { reg: a },
            OpKind::Jeq => Instruction::Jeq { reg: a },
            OpKind::Jne => Instruction::Jne { reg: a },
            OpKind::Ld => Instruction::Ld { a, b },
            OpKind::St => Instruction::St { a, b },
        }
    }

    /// The dispatch table row for this instruction.
    pub fn info(&self) -> OpInfo {
        match self {
            Instruction::Hlt => op::HLT,
            Instruction::Ldi { .. } => op::LDI,
            Instruction::Prn { .. } => op::PRN,
            Instruction::Pra { .. } => op::PRA,
            Instruction::Alu { op: alu_op, .. } => match alu_op {
                AluOp::Add => op::ADD,
                AluOp::Mul => op::MUL,
                AluOp::Mod => op::MOD,
                AluOp::Cmp => op::CMP,
                AluOp::And => op::AND,
                AluOp::Or => op::OR,
                AluOp::Xor => op::XOR,
                AluOp::Shl => op::SHL,
                AluOp::Shr => op::SHR,
                AluOp::Not => op::NOT,
                AluOp::Inc => op::INC,
                AluOp::Dec => op::DEC,
            },
            Instruction::Push { .. } => op::PUSH,
            Instruction::Pop { .. } => op::POP,
            Instruction::Call { .. } => op::CALL,
            Instruction::Ret => op::RET,
            Instruction::Jmp { .. } => op::JMP,
            Instruction::Jeq { .. } => op::JEQ,
            Instruction::Jne { .. } => op::JNE,
            Instruction::Ld { .. } => op::LD,
            Instruction::St { .. } => op::ST,
        }
    }

    /// Operand bytes in encoding order. Unused slots are 0.
    pub fn operands(&self) -> [u8; 2] {
        match *self {
            Instruction::Hlt | Instruction::Ret => [0, 0],
            Instruction::Ldi { reg, imm } => [reg, imm],
            Instruction::Prn { reg }
            | Instruction::Pra { reg }
            | Instruction::Push { reg }
            | Instruction::Pop { reg }
            | Instruction::Call { reg }
            | Instruction::Jmp { reg }
            | Instruction::Jeq { reg }
            | Instruction::Jne { reg } => [reg, 0],
            Instruction::Alu { a, b, .. } | Instruction::Ld { a, b } | Instruction::St { a, b } => {
                [a, b]
            }
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.info().encoded_len()
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.info();
        let [a, b] = self.operands();
        match self {
            Instruction::Ldi { .. } => write!(f, "{} R{},{}", info.mnemonic, a, b),
            _ => match info.operands {
                0 => write!(f, "{}", info.mnemonic),
                1 => write!(f, "{} R{}", info.mnemonic, a),
                _ => write!(f, "{} R{},R{}", info.mnemonic, a, b),
            },
        }
    }
}

/// Decode the instruction starting at `pc`.
pub fn decode(mem: &Memory, pc: usize) -> Result<Instruction, DecodeError> {
    let opcode = mem.read(pc)?;
    let info = lookup(opcode).ok_or(DecodeError::UnknownOpcode(opcode))?;

    let mut operands = [0u8; 2];
    for (i, slot) in operands.iter_mut().take(info.operands as usize).enumerate() {
        *slot = mem.read(pc + 1 + i)?;
    }

    Ok(Instruction::from_parts(info.kind, operands))
}

/// Encode an instruction to its byte form.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let info = instr.info();
    let operands = instr.operands();
    let mut bytes = Vec::with_capacity(info.encoded_len());
    bytes.push(info.opcode);
    bytes.extend_from_slice(&operands[..info.operands as usize]);
    bytes
}

/// Encode a sequence of instructions into a program image.
pub fn encode_program(instructions: &[Instruction]) -> Vec<u8> {
    instructions.iter().flat_map(encode).collect()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#010b}")]
    UnknownOpcode(u8),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
