//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors
//! except the stack and control-transfer mechanics, which live in
//! [`crate::cpu::control`].

use crate::config::{MachineConfig, UnknownOpcodePolicy};
use crate::cpu::alu::{self, AluError, AluOutcome};
use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::InvalidRegister;
use crate::cpu::{Memory, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU stopped on a fault; see [`Cpu::trap`].
    Faulted,
}

/// Something a program printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// PRN: a register's decimal value.
    Number(u8),
    /// PRA: a register read as a character code.
    Char(char),
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Number(n) => write!(f, "{}", n),
            Output::Char(c) => write!(f, "{}", c),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Halted,
    Faulted(Trap),
}

/// Where the dispatcher goes after an instruction.
enum Flow {
    /// Fall through to the following instruction.
    Next,
    /// Continue at this address.
    Jump(usize),
    Halt,
}

/// The LS-8 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    unknown_opcode: UnknownOpcodePolicy,
    /// Printed values not yet taken by the caller.
    #[serde(skip)]
    output: Vec<Output>,
    /// Set once the CPU faults.
    trap: Option<Trap>,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU with the default machine configuration.
    pub fn new() -> Self {
        Self::with_config(&MachineConfig::default())
    }

    /// Create a CPU from a (validated) machine configuration.
    pub fn with_config(config: &MachineConfig) -> Self {
        Self {
            regs: Registers::with_boot(config.stack_top, config.r7_boot),
            mem: Memory::with_size(config.memory_size),
            state: CpuState::Running,
            cycles: 0,
            unknown_opcode: config.unknown_opcode,
            output: Vec::new(),
            trap: None,
            last_instr: None,
        }
    }

    /// Reset the CPU to its boot state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.output.clear();
        self.trap = None;
        self.last_instr = None;
    }

    /// Load a program image at address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(program)?;
        log::debug!(
            "loaded {} bytes into {}-byte memory",
            program.len(),
            self.mem.size()
        );
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. A fault
    /// moves the CPU into [`CpuState::Faulted`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch + decode
        let (pc, instr) = match self.fetch() {
            Ok(fetched) => fetched,
            Err(trap) => return Err(self.fault(trap)),
        };

        // Execute
        let flow = match self.execute(pc, instr) {
            Ok(flow) => flow,
            Err(fault) => {
                let trap = Trap {
                    pc,
                    opcode: Some(instr.info().opcode),
                    fault,
                };
                return Err(self.fault(trap));
            }
        };

        match flow {
            Flow::Next => self.regs.pc = pc + instr.encoded_len(),
            Flow::Jump(target) => self.regs.pc = target,
            Flow::Halt => self.state = CpuState::Halted,
        }

        self.cycles += 1;
        self.last_instr = Some(instr);
        log::trace!("{:#04x}: {}", pc, instr);

        Ok(instr)
    }

    /// Run until halt or fault.
    pub fn run(&mut self) -> RunStatus {
        while self.is_running() {
            if let Err(CpuError::Trap(trap)) = self.step() {
                return RunStatus::Faulted(trap);
            }
        }

        let status = self.status().unwrap_or(RunStatus::Halted);
        log::debug!("run finished after {} cycles: {:?}", self.cycles, status);
        status
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// Returns the number of instructions executed.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Fetch and decode the instruction at PC.
    ///
    /// Under [`UnknownOpcodePolicy::Skip`] unknown bytes are stepped over
    /// until something decodes.
    fn fetch(&mut self) -> Result<(usize, Instruction), Trap> {
        loop {
            let pc = self.regs.pc;
            match decode::decode(&self.mem, pc) {
                Ok(instr) => return Ok((pc, instr)),
                Err(DecodeError::UnknownOpcode(opcode))
                    if self.unknown_opcode == UnknownOpcodePolicy::Skip =>
                {
                    log::warn!("skipping unknown opcode {:#010b} at {:#04x}", opcode, pc);
                    self.regs.pc = pc + 1;
                }
                Err(err) => {
                    return Err(Trap {
                        pc,
                        opcode: self.mem.read(pc).ok(),
                        fault: err.into(),
                    });
                }
            }
        }
    }

    fn fault(&mut self, trap: Trap) -> CpuError {
        log::debug!("fault: {}", trap);
        self.state = CpuState::Faulted;
        self.trap = Some(trap.clone());
        CpuError::Trap(trap)
    }

    /// Execute a decoded instruction located at `pc`.
    fn execute(&mut self, pc: usize, instr: Instruction) -> Result<Flow, Fault> {
        match instr {
            Instruction::Hlt => return Ok(Flow::Halt),

            Instruction::Ldi { reg, imm } => {
                self.regs.set(reg, imm)?;
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                self.output.push(Output::Number(value));
            }

            Instruction::Pra { reg } => {
                let value = self.regs.get(reg)?;
                self.output.push(Output::Char(value as char));
            }

            Instruction::Alu { op, a, b } => {
                let x = self.regs.get(a)?;
                let y = if op.reads_b() { self.regs.get(b)? } else { 0 };
                match alu::alu(op, x, y)? {
                    AluOutcome::Value(value) => self.regs.set(a, value)?,
                    AluOutcome::Flags(fl) => self.regs.fl = fl,
                }
            }

            Instruction::Ld { a, b } => {
                let addr = self.regs.get(b)?;
                let value = self.mem.read(addr as usize)?;
                self.regs.set(a, value)?;
            }

            Instruction::St { a, b } => {
                let addr = self.regs.get(a)?;
                let value = self.regs.get(b)?;
                self.mem.write(addr as usize, value)?;
            }

            // ==================== Stack ====================
            Instruction::Push { reg } => {
                let value = self.regs.get(reg)?;
                self.push(value)?;
            }

            Instruction::Pop { reg } => {
                self.regs.get(reg)?;
                let value = self.pop()?;
                self.regs.set(reg, value)?;
            }

            // ==================== Control Flow ====================
            Instruction::Call { reg } => {
                let target = self.call(reg, pc + instr.encoded_len())?;
                return Ok(Flow::Jump(target));
            }

            Instruction::Ret => return Ok(Flow::Jump(self.ret()?)),

            Instruction::Jmp { reg } => return Ok(Flow::Jump(self.jump_target(reg)?)),

            Instruction::Jeq { reg } => {
                if self.regs.fl.equal() {
                    return Ok(Flow::Jump(self.jump_target(reg)?));
                }
            }

            Instruction::Jne { reg } => {
                if !self.regs.fl.equal() {
                    return Ok(Flow::Jump(self.jump_target(reg)?));
                }
            }
        }

        Ok(Flow::Next)
    }

    /// Take everything printed since the last call.
    pub fn take_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.output)
    }

    /// Everything printed and not yet taken.
    pub fn output(&self) -> &[Output] {
        &self.output
    }

    /// The fault that stopped the CPU, if any.
    pub fn trap(&self) -> Option<&Trap> {
        self.trap.as_ref()
    }

    /// Terminal status, or `None` while still running.
    pub fn status(&self) -> Option<RunStatus> {
        match self.state {
            CpuState::Running => None,
            CpuState::Halted => Some(RunStatus::Halted),
            CpuState::Faulted => self.trap.clone().map(RunStatus::Faulted),
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// One line of machine state:
    /// `TRACE: PC | [PC] [PC+1] [PC+2] | R0 .. R7`, all in hex.
    pub fn trace_line(&self) -> String {
        let pc = self.regs.pc;
        let mut line = format!("TRACE: {:02X} |", pc);
        for offset in 0..3 {
            match self.mem.read(pc + offset) {
                Ok(byte) => line.push_str(&format!(" {:02X}", byte)),
                Err(_) => line.push_str(" --"),
            }
        }
        line.push_str(" |");
        for value in self.regs.r {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("trap", &self.trap)
            .finish()
    }
}

/// Why an instruction could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Fault {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Register(#[from] InvalidRegister),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown opcode {0:#010b}")]
    UnknownOpcode(u8),

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,
}

impl From<AluError> for Fault {
    fn from(err: AluError) -> Self {
        match err {
            AluError::DivisionByZero => Fault::DivisionByZero,
        }
    }
}

impl From<DecodeError> for Fault {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownOpcode(opcode) => Fault::UnknownOpcode(opcode),
            DecodeError::Memory(err) => Fault::Memory(err),
        }
    }
}

/// A fault together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{fault} at PC={pc:#04x}")]
pub struct Trap {
    /// Address of the faulting instruction.
    pub pc: usize,
    /// Its opcode byte, if it could be fetched.
    pub opcode: Option<u8>,
    pub fault: Fault,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error(transparent)]
    Trap(#[from] Trap),
}
