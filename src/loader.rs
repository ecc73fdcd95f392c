//! Program file format for LS-8 programs.
//!
//! A simple text format:
//! - One byte per line, written as a binary literal (`10000010`)
//! - `#` starts a comment, either on its own line or after the byte
//! - Blank lines are ignored
//! - Anything after the first word on a line is ignored
//!
//! ```text
//! # print8.ls8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::path::Path;
use thiserror::Error;

/// Parse program text into a memory image.
pub fn parse_program(source: &str) -> Result<Vec<u8>, ProgramError> {
    let mut image = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };

        // Skip empty lines and comments
        let Some(word) = code.split_whitespace().next() else {
            continue;
        };

        image.push(parse_byte(word).map_err(|message| ProgramError::ParseError {
            line: line_num + 1,
            message,
        })?);
    }

    Ok(image)
}

/// Load a program file from disk.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ProgramError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    let image = parse_program(&source)?;
    log::debug!("parsed {} bytes from {}", image.len(), path.as_ref().display());
    Ok(image)
}

fn parse_byte(word: &str) -> Result<u8, String> {
    if word.len() > 8 {
        return Err(format!("expected at most 8 binary digits, found {:?}", word));
    }
    if !word.chars().all(|c| c == '0' || c == '1') {
        return Err(format!("not a binary literal: {:?}", word));
    }
    u8::from_str_radix(word, 2).map_err(|e| format!("{}: {:?}", e, word))
}

/// Errors that can occur while loading a program file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
