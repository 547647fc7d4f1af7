//! Runtime error types for shmstack

use shmstack_spec::SpecError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Stack full (capacity {capacity})")]
    StackFull { capacity: usize },

    #[error("Stack empty")]
    StackEmpty,

    #[error("Too few operands: need {required}, have {available}")]
    TooFewOperands { required: usize, available: usize },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cell out of range: {cell} (region has {cells} cells)")]
    CellOutOfRange { cell: usize, cells: usize },

    #[error("Sub-index not supported on local memory")]
    LocalSubIndex,

    #[error("Stack size must be at least {minimum}, got {requested}")]
    StackTooSmall { requested: usize, minimum: usize },

    #[error("Shared memory segment '{name}': {source}")]
    Segment {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Clock read failed: {0}")]
    Clock(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Step limit exceeded: {limit}")]
    StepLimitExceeded { limit: u64 },

    #[error("Instruction {ip} ({instruction}): {source}")]
    Instruction {
        ip: usize,
        instruction: String,
        #[source]
        source: Box<RuntimeError>,
    },

    #[error("Failed to initialize '{name}': {source}")]
    Init {
        name: String,
        #[source]
        source: Box<RuntimeError>,
    },

    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    /// The error underneath any per-instruction wrapping
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::Instruction { source, .. } | RuntimeError::Init { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for failures of the operating system rather than the program
    pub fn is_os_error(&self) -> bool {
        matches!(
            self.root(),
            RuntimeError::Segment { .. } | RuntimeError::Clock(_) | RuntimeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
