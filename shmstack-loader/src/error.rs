//! Loader errors

use shmstack_runtime::RuntimeError;
use shmstack_spec::SpecError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Line {line} ({content}): {source}")]
    Line {
        line: usize,
        content: String,
        #[source]
        source: Box<LoadError>,
    },

    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized input: {0}")]
    Lex(String),

    // ========== Sections ==========
    #[error("Section {0} appears more than once")]
    DuplicateSection(String),

    #[error("Content outside of any section")]
    OutsideSection,

    // ========== Settings ==========
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Setting {0} given more than once")]
    DuplicateSetting(String),

    // ========== Declarations ==========
    #[error("Malformed {kind} line")]
    Malformed { kind: &'static str },

    #[error("Unknown memory kind: {0}")]
    UnknownMemoryKind(String),

    #[error("Memory {0} declared more than once")]
    DuplicateMemory(String),

    #[error("Unknown memory: {0}")]
    UnknownMemory(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    #[error("Unknown constant type: {0} (expected u, i or f)")]
    UnknownConstType(String),

    #[error("Name {0} is reserved")]
    ReservedName(String),

    #[error("Name {name} already declared as a {existing}")]
    DuplicateName { name: String, existing: &'static str },

    // ========== Initialization ==========
    #[error("{0} initialized more than once")]
    DuplicateInit(String),

    #[error("Constant {0} is never initialized")]
    UninitializedConstant(String),

    #[error("Invalid literal {literal}: expected {expected}")]
    InvalidLiteral { literal: String, expected: &'static str },

    // ========== Program ==========
    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Cannot POP into constant {0}")]
    ConstantTarget(String),

    #[error("Empty label")]
    EmptyLabel,

    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    // ========== Lower layers ==========
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Memory(#[from] RuntimeError),
}

impl LoadError {
    pub(crate) fn at(self, line: usize, content: impl Into<String>) -> Self {
        LoadError::Line {
            line,
            content: content.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error with line context removed
    pub fn root(&self) -> &LoadError {
        match self {
            LoadError::Line { source, .. } => source.root(),
            other => other,
        }
    }

    /// Line number the error was reported on, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            LoadError::Line { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// True when the failure came from the operating system rather than the text
    pub fn is_os_error(&self) -> bool {
        match self.root() {
            LoadError::Read { .. } => true,
            LoadError::Memory(err) => err.is_os_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
