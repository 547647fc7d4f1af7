//! Instruction execution

use crate::error::{Result, RuntimeError};
use crate::io::IoHandler;
use crate::program::Program;
use crate::stack::StackMachine;
use shmstack_spec::Instruction;

/// Where execution continues after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to ip + 1
    Next,
    /// Continue at the given position
    Jump(usize),
    /// End of cycle
    Halt,
}

/// Execute a single instruction
pub fn execute(
    instr: &Instruction,
    program: &mut Program,
    stack: &mut StackMachine,
    io: &mut IoHandler,
) -> Result<Flow> {
    match instr {
        Instruction::Op(op) => stack.apply(*op)?,

        // ========== Push ==========
        Instruction::PushConst(value) => stack.push(*value)?,
        Instruction::PushVar(var) => {
            let value = program.load(*var)?;
            stack.push(value)?;
        }
        Instruction::PushSource(source) => {
            // capacity first, so a full stack does not consume a random value
            if stack.size() >= stack.capacity() {
                return Err(RuntimeError::StackFull {
                    capacity: stack.capacity(),
                });
            }
            let value = io.read(*source)?;
            stack.push(value)?;
        }

        // ========== Pop ==========
        // Peek first so a failed store or write leaves the Word on the stack
        Instruction::PopVar(var) => {
            let value = stack.peek()?;
            program.store(*var, value)?;
            stack.pop()?;
        }
        Instruction::PopSink(sink) => {
            let value = stack.peek()?;
            io.write(*sink, value)?;
            stack.pop()?;
        }

        // ========== Control flow ==========
        Instruction::Jump { target } => return Ok(Flow::Jump(*target)),
        Instruction::JumpZero { target } => {
            if stack.pop()? == 0 {
                return Ok(Flow::Jump(*target));
            }
        }
        Instruction::JumpNotZero { target } => {
            if stack.pop()? != 0 {
                return Ok(Flow::Jump(*target));
            }
        }
        Instruction::Label(_) => {}
        Instruction::End => return Ok(Flow::Halt),
    }

    Ok(Flow::Next)
}
