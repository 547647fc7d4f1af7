//! # Error Types for shmstack encodings and mnemonics

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("Invalid cell size: {0} bytes (valid: 1, 2, 4, 8)")]
    InvalidCellSize(usize),

    #[error("Unsupported width: {bits}-bit access on {cell_size}-byte cells")]
    UnsupportedWidth { bits: u32, cell_size: usize },

    #[error("Sub-index out of range: {index} (limit {limit})")]
    SubIndexOutOfRange { index: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, SpecError>;
