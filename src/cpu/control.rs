//! Stack and control-transfer unit.
//!
//! The stack grows downward from the configured stack top. SP points at
//! the next free cell: PUSH writes then decrements, POP increments then
//! reads. Control transfers hand their target back to the dispatcher,
//! which sets PC without the usual fall-through advance.

use crate::cpu::execute::{Cpu, Fault};
use crate::cpu::memory::MemoryError;

impl Cpu {
    /// Push a byte. Fails without touching memory if SP is already 0.
    pub(crate) fn push(&mut self, value: u8) -> Result<(), Fault> {
        let sp = self.regs.sp;
        let next = sp.checked_sub(1).ok_or(Fault::StackOverflow)?;
        self.mem.write(sp, value)?;
        self.regs.sp = next;
        Ok(())
    }

    /// Pop a byte. Fails if the stack is empty.
    pub(crate) fn pop(&mut self) -> Result<u8, Fault> {
        let sp = self.regs.sp + 1;
        if sp > self.regs.stack_top() {
            return Err(Fault::StackUnderflow);
        }
        let value = self.mem.read(sp)?;
        self.regs.sp = sp;
        Ok(value)
    }

    /// Validate a control-transfer target.
    fn target(&self, addr: u8) -> Result<usize, Fault> {
        let addr = addr as usize;
        self.mem.check(addr)?;
        Ok(addr)
    }

    /// The address held in `reg`, checked against memory.
    pub(crate) fn jump_target(&self, reg: u8) -> Result<usize, Fault> {
        let addr = self.regs.get(reg)?;
        self.target(addr)
    }

    /// Push `return_addr` and return the subroutine address held in `reg`.
    pub(crate) fn call(&mut self, reg: u8, return_addr: usize) -> Result<usize, Fault> {
        let target = self.jump_target(reg)?;
        let ret = u8::try_from(return_addr).map_err(|_| MemoryError::OutOfBounds {
            address: return_addr,
            size: self.mem.size(),
        })?;
        self.push(ret)?;
        Ok(target)
    }

    /// Pop a return address.
    pub(crate) fn ret(&mut self) -> Result<usize, Fault> {
        let addr = self.pop()?;
        self.target(addr)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::cpu::execute::{Cpu, Fault};
    use crate::cpu::memory::MemoryError;

    #[test]
    fn test_push_writes_then_decrements() {
        let mut cpu = Cpu::new();
        cpu.push(7).unwrap();

        assert_eq!(cpu.mem.read(0xF3).unwrap(), 7);
        assert_eq!(cpu.regs.sp, 0xF2);
    }

    #[test]
    fn test_pop_restores_sp() {
        let mut cpu = Cpu::new();
        cpu.push(1).unwrap();
        cpu.push(2).unwrap();

        assert_eq!(cpu.pop(), Ok(2));
        assert_eq!(cpu.pop(), Ok(1));
        assert_eq!(cpu.regs.sp, 0xF3);
        assert_eq!(cpu.pop(), Err(Fault::StackUnderflow));
        assert_eq!(cpu.regs.sp, 0xF3);
    }

    #[test]
    fn test_overflow_at_zero() {
        let config = MachineConfig {
            memory_size: 4,
            stack_top: 0,
            ..MachineConfig::default()
        };
        let mut cpu = Cpu::with_config(&config);

        assert_eq!(cpu.push(9), Err(Fault::StackOverflow));
        assert_eq!(cpu.mem.read(0).unwrap(), 0);
    }

    #[test]
    fn test_call_pushes_return_address() {
        let mut cpu = Cpu::new();
        cpu.regs.r[2] = 0x40;

        assert_eq!(cpu.call(2, 0x12), Ok(0x40));
        assert_eq!(cpu.mem.read(0xF3).unwrap(), 0x12);
        assert_eq!(cpu.ret(), Ok(0x12));
    }

    #[test]
    fn test_call_return_address_must_fit() {
        let mut cpu = Cpu::new();
        assert_eq!(
            cpu.call(0, 256),
            Err(Fault::Memory(MemoryError::OutOfBounds { address: 256, size: 256 }))
        );
        assert_eq!(cpu.regs.sp, 0xF3);
    }
}
