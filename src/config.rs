//! Machine configuration.
//!
//! Every field has a default, so a JSON config file only needs to name what
//! it changes:
//!
//! ```json
//! { "memory_size": 128, "stack_top": 127, "unknown_opcode": "skip" }
//! ```

use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::{R7_BOOT, STACK_TOP};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// What the dispatcher does with a byte that is not in the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOpcodePolicy {
    /// Stop with an `UnknownOpcode` fault.
    #[default]
    Fault,
    /// Step over the byte, as older LS-8 interpreters did.
    Skip,
}

/// Machine parameters fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Number of memory cells (1-256).
    pub memory_size: usize,
    /// Initial stack pointer.
    pub stack_top: u8,
    /// Value R7 holds at boot.
    pub r7_boot: u8,
    pub unknown_opcode: UnknownOpcodePolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: MEMORY_SIZE,
            stack_top: STACK_TOP,
            r7_boot: R7_BOOT,
            unknown_opcode: UnknownOpcodePolicy::Fault,
        }
    }
}

impl MachineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Check the fields against each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 || self.memory_size > MEMORY_SIZE {
            return Err(ConfigError::MemorySize(self.memory_size));
        }
        if self.stack_top as usize >= self.memory_size {
            return Err(ConfigError::StackTop {
                stack_top: self.stack_top,
                memory_size: self.memory_size,
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("memory size {0} out of range (1-256)")]
    MemorySize(usize),

    #[error("stack top {stack_top:#04x} outside memory of size {memory_size}")]
    StackTop { stack_top: u8, memory_size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.memory_size, 256);
        assert_eq!(config.stack_top, 0xF3);
        assert_eq!(config.r7_boot, 0xF4);
        assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Fault);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = MachineConfig::from_json(r#"{ "unknown_opcode": "skip" }"#).unwrap();
        assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Skip);
        assert_eq!(config.memory_size, 256);
    }

    #[test]
    fn test_full_json() {
        let config = MachineConfig::from_json(
            r#"{ "memory_size": 64, "stack_top": 63, "r7_boot": 64, "unknown_opcode": "fault" }"#,
        )
        .unwrap();
        assert_eq!(config.memory_size, 64);
        assert_eq!(config.stack_top, 63);
        assert_eq!(config.r7_boot, 64);
    }

    #[test]
    fn test_rejects_stack_outside_memory() {
        let err = MachineConfig::from_json(r#"{ "memory_size": 16 }"#).unwrap_err();
        assert_eq!(
            err,
            ConfigError::StackTop { stack_top: 0xF3, memory_size: 16 }
        );
    }

    #[test]
    fn test_rejects_bad_memory_size() {
        let err = MachineConfig::from_json(r#"{ "memory_size": 1024 }"#).unwrap_err();
        assert_eq!(err, ConfigError::MemorySize(1024));

        let err = MachineConfig::from_json(r#"{ "memory_size": 0 }"#).unwrap_err();
        assert_eq!(err, ConfigError::MemorySize(0));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = MachineConfig::from_json(r#"{ "memroy_size": 16 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
