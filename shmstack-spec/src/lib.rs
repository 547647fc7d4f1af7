//! # shmstack Specification
//!
//! Core types shared by the shmstack loader and runtime.
//!
//! ## Overview
//!
//! shmstack is a small stack machine that executes a linear program once per
//! cycle and exchanges data with other processes through shared memory. This
//! crate defines the pieces that carry no execution state:
//! - [`Word`]: the untyped 64-bit stack and memory slot, plus reinterpretation helpers
//! - [`Encoding`]: how a Word maps onto the raw bytes of a memory cell
//! - [`Opcode`]: the zero-operand stack operators and their mnemonics
//! - [`Instruction`]: one resolved program step
//! - [`Source`] / [`Sink`]: reserved identifiers bound to OS and I/O endpoints
//! - [`Settings`]: cycle pacing values taken from the program text
//!
//! ## Example
//!
//! ```rust
//! use shmstack_spec::{encoding, Encoding};
//!
//! let mut cell = [0u8; 8];
//! encoding::encode(0x0102_0304_0506_0708, &mut cell, Encoding::Be64r4, 0).unwrap();
//! assert_eq!(cell, [0x05, 0x06, 0x07, 0x08, 0x01, 0x02, 0x03, 0x04]);
//! assert_eq!(
//!     encoding::decode(&cell, Encoding::Be64r4, 0).unwrap(),
//!     0x0102_0304_0506_0708
//! );
//! ```

pub mod word;
pub mod encoding;
pub mod opcode;
pub mod instruction;
pub mod reserved;
pub mod config;
pub mod error;

pub use word::{Word, SignedWord};
pub use encoding::{ByteOrder, Encoding, RegisterOrder};
pub use opcode::Opcode;
pub use instruction::{Instruction, VarId};
pub use reserved::{Sink, Source};
pub use config::Settings;
pub use error::SpecError;

/// Default stack capacity in words
pub const DEFAULT_STACK_SIZE: usize = 32;

/// Smallest stack that can still run a binary operator
pub const MIN_STACK_SIZE: usize = 2;

/// Byte sizes a real memory cell may have
pub const VALID_CELL_SIZES: [usize; 4] = [1, 2, 4, 8];
