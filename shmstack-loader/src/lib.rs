//! shmstack Loader
//!
//! Parse shmstack program text into a runnable [`shmstack_runtime::Program`].
//!
//! A program is divided into sections:
//!
//! - `__SETTINGS`: `CYCLE_MS <n>`, `CYCLES <n>`
//! - `__MEM`: `local <name> <cells>`, `shm <segment> <name> <cell-size>`
//! - `__VAR`: `const <u|i|f> <name>`, `<mem>@<cell>[.<sub>] <encoding> <name>`
//! - `__INIT`: `<name> <value>`
//! - `__PROGRAM`: one instruction or `$label` per line
//!
//! ## Example
//!
//! ```rust
//! use shmstack_loader::load;
//!
//! let source = r#"
//!     __VAR
//!     const u a
//!     __INIT
//!     a 7
//!     __PROGRAM
//!     PUSH a
//!     DUP
//!     MUL
//!     POP STDOUT
//! "#;
//!
//! let program = load(source).unwrap();
//! assert_eq!(shmstack_runtime::run_once(program).unwrap(), "49\n");
//! ```

pub mod error;
pub mod lexer;
pub mod literal;
pub mod section;
pub mod parser;
pub mod loader;

pub use error::{LoadError, Result};
pub use loader::{load, load_file, Loader};
pub use section::SectionKind;
