//! LS-8 memory subsystem.
//!
//! A flat, byte-addressed array. Addresses come from 8-bit registers, so
//! the largest useful memory is the full 256-byte address space.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The default (and maximum) number of memory cells.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: a fixed number of byte cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a full-size memory with all cells zeroed.
    pub fn new() -> Self {
        Self::with_size(MEMORY_SIZE)
    }

    /// Create a memory of `size` zeroed cells.
    pub fn with_size(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Number of addressable cells.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Fail unless `addr` is a valid cell index.
    #[inline]
    pub fn check(&self, addr: usize) -> Result<(), MemoryError> {
        if addr < self.cells.len() {
            Ok(())
        } else {
            Err(MemoryError::OutOfBounds {
                address: addr,
                size: self.cells.len(),
            })
        }
    }

    /// Read a cell. Cells never written read as zero.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.check(addr)?;
        Ok(self.cells[addr])
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        self.check(addr)?;
        self.cells[addr] = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image into memory starting at address 0.
    ///
    /// Nothing is written if the image does not fit.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        if program.len() > self.cells.len() {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: self.cells.len(),
            });
        }

        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory address {address:#04x} out of range (memory size {size})")]
    OutOfBounds { address: usize, size: usize },

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
