//! Resolved program instructions.
//!
//! The loader produces one [`Instruction`] per program line (plus a trailing
//! [`Instruction::End`]). Names are resolved up front: constants are inlined as
//! their Word, variables become indices into the program's variable table and
//! jump targets are instruction positions.

use crate::opcode::Opcode;
use crate::reserved::{Sink, Source};
use crate::word::Word;
use std::fmt;

/// Index into a program's variable table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Zero-operand stack operator
    Op(Opcode),

    // ========== Push ==========
    /// PUSH of a constant, folded to its Word at load time
    PushConst(Word),
    /// PUSH of a variable
    PushVar(VarId),
    /// PUSH of a reserved read identifier
    PushSource(Source),

    // ========== Pop ==========
    /// POP into a variable
    PopVar(VarId),
    /// POP into a reserved write identifier
    PopSink(Sink),

    // ========== Control flow ==========
    /// J: unconditional jump
    Jump { target: usize },
    /// JZ: pop, jump if zero
    JumpZero { target: usize },
    /// JNZ: pop, jump if nonzero
    JumpNotZero { target: usize },
    /// `$name` marker, a no-op at run time
    Label(String),
    /// Terminates the cycle
    End,
}

impl Instruction {
    /// Mnemonic as it appears in program text
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Op(op) => op.mnemonic(),
            Instruction::PushConst(_) | Instruction::PushVar(_) | Instruction::PushSource(_) => "PUSH",
            Instruction::PopVar(_) | Instruction::PopSink(_) => "POP",
            Instruction::Jump { .. } => "J",
            Instruction::JumpZero { .. } => "JZ",
            Instruction::JumpNotZero { .. } => "JNZ",
            Instruction::Label(_) => "$",
            Instruction::End => "END",
        }
    }

    /// Jump target, if this is a jump
    pub fn target(&self) -> Option<usize> {
        match self {
            Instruction::Jump { target }
            | Instruction::JumpZero { target }
            | Instruction::JumpNotZero { target } => Some(*target),
            _ => None,
        }
    }

    pub fn is_jump(&self) -> bool {
        self.target().is_some()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "{}", op),
            Instruction::PushConst(value) => write!(f, "PUSH {:#x}", value),
            Instruction::PushVar(var) => write!(f, "PUSH {}", var),
            Instruction::PushSource(source) => write!(f, "PUSH {}", source),
            Instruction::PopVar(var) => write!(f, "POP {}", var),
            Instruction::PopSink(sink) => write!(f, "POP {}", sink),
            Instruction::Jump { target } => write!(f, "J @{}", target),
            Instruction::JumpZero { target } => write!(f, "JZ @{}", target),
            Instruction::JumpNotZero { target } => write!(f, "JNZ @{}", target),
            Instruction::Label(name) => write!(f, "${}", name),
            Instruction::End => write!(f, "END"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic() {
        assert_eq!(Instruction::Op(Opcode::Add).mnemonic(), "ADD");
        assert_eq!(Instruction::PushConst(7).mnemonic(), "PUSH");
        assert_eq!(Instruction::PopSink(Sink::Stdout).mnemonic(), "POP");
        assert_eq!(Instruction::JumpZero { target: 3 }.mnemonic(), "JZ");
    }

    #[test]
    fn test_target() {
        assert_eq!(Instruction::Jump { target: 4 }.target(), Some(4));
        assert_eq!(Instruction::JumpNotZero { target: 0 }.target(), Some(0));
        assert!(Instruction::JumpZero { target: 1 }.is_jump());
        assert!(!Instruction::Label("x".into()).is_jump());
        assert_eq!(Instruction::End.target(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::PushConst(255).to_string(), "PUSH 0xff");
        assert_eq!(Instruction::PopVar(VarId(2)).to_string(), "POP var#2");
        assert_eq!(Instruction::PushSource(Source::Ppid).to_string(), "PUSH PPID");
        assert_eq!(Instruction::Label("loop".into()).to_string(), "$loop");
        assert_eq!(Instruction::JumpZero { target: 9 }.to_string(), "JZ @9");
    }
}
