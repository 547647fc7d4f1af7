//! # shmstack Runtime
//!
//! Execute loaded shmstack programs.
//!
//! The runtime provides the pieces a program runs on:
//!
//! - **Memory**: word-oriented local regions and byte-oriented real regions,
//!   the latter optionally backed by POSIX shared memory
//! - **Stack machine**: a bounded Word stack with integer, float, double,
//!   logical, bitwise, relational, conversion and math operators
//! - **Machine**: one `run()` executes the instruction sequence once (a cycle)
//! - **Scheduler**: paces cycles on a fixed period with cooperative cancellation
//!
//! ## Example
//!
//! ```rust
//! use shmstack_runtime::{IoHandler, Machine, MachineConfig, Program, SharedBuffer};
//! use shmstack_spec::{Instruction, Opcode, Settings, Sink};
//!
//! let mut program = Program::new(Settings::default());
//! program.push_instruction(Instruction::PushConst(100));
//! program.push_instruction(Instruction::PushConst(200));
//! program.push_instruction(Instruction::Op(Opcode::Add));
//! program.push_instruction(Instruction::PopSink(Sink::Stdout));
//! program.push_instruction(Instruction::End);
//!
//! let out = SharedBuffer::new();
//! let io = IoHandler::with_output(out.clone());
//! let mut machine = Machine::with_io(program, MachineConfig::default(), io).unwrap();
//! machine.run().unwrap();
//! assert_eq!(out.contents(), "300\n");
//! ```

pub mod error;
pub mod shm;
pub mod memory;
pub mod stack;
pub mod program;
pub mod io;
pub mod execute;
pub mod machine;
pub mod scheduler;

pub use error::RuntimeError;
pub use shm::{ByteBacking, SegmentOpener, SharedSegment, ShmOpener};
pub use memory::{LocalMemory, Memory, MemoryKind, RealMemory};
pub use stack::StackMachine;
pub use program::{Program, Region, Variable};
pub use io::{IoHandler, SharedBuffer};
pub use machine::{CycleReport, Machine, MachineConfig, MachineState};
pub use scheduler::{CancelToken, RunStats, Scheduler, SchedulerConfig};

/// Run a program for one cycle and return what it printed
pub fn run_once(program: Program) -> Result<String, RuntimeError> {
    let out = SharedBuffer::new();
    let mut machine = Machine::with_io(program, MachineConfig::default(), IoHandler::with_output(out.clone()))?;
    machine.run()?;
    Ok(out.contents())
}
