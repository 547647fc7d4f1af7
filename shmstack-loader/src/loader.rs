//! Main loader logic

use crate::error::{LoadError, Result};
use crate::parser::{parse_settings, ProgramBuilder};
use crate::section::{split_sections, SectionKind};
use shmstack_runtime::{Program, SegmentOpener, ShmOpener};
use std::path::Path;
use tracing::debug;

/// Turns program text into a runnable [`Program`].
///
/// `shm` regions are attached through the configured [`SegmentOpener`],
/// POSIX shared memory by default.
pub struct Loader {
    opener: Box<dyn SegmentOpener>,
}

impl Loader {
    pub fn new() -> Self {
        Self::with_segment_opener(ShmOpener)
    }

    pub fn with_segment_opener(opener: impl SegmentOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
        }
    }

    pub fn load(&self, text: &str) -> Result<Program> {
        let sections = split_sections(text)?;

        // Sections are interpreted in dependency order, not file order
        let settings = parse_settings(sections.get(SectionKind::Settings))?;
        let mut builder = ProgramBuilder::new(settings, self.opener.as_ref());
        builder.parse_memory(sections.get(SectionKind::Mem))?;
        builder.parse_variables(sections.get(SectionKind::Var))?;
        builder.parse_init(sections.get(SectionKind::Init))?;
        builder.parse_program(sections.get(SectionKind::Program))?;

        let program = builder.finish();
        debug!(
            regions = program.regions().len(),
            variables = program.variables().len(),
            instructions = program.instructions().len(),
            labels = program.labels().len(),
            "program loaded"
        );
        Ok(program)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Program> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "program file read");
        self.load(&text)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load program text, attaching `shm` regions to POSIX shared memory
pub fn load(text: &str) -> Result<Program> {
    Loader::new().load(text)
}

/// Read and load a program file
pub fn load_file(path: impl AsRef<Path>) -> Result<Program> {
    Loader::new().load_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shmstack_runtime::{ByteBacking, RuntimeError};
    use shmstack_spec::{Encoding, Instruction, Opcode, Sink, Source, VarId};

    struct Buffers(usize);

    impl SegmentOpener for Buffers {
        fn open(&self, _name: &str) -> shmstack_runtime::error::Result<Box<dyn ByteBacking>> {
            Ok(Box::new(vec![0u8; self.0]))
        }
    }

    struct Unavailable;

    impl SegmentOpener for Unavailable {
        fn open(&self, name: &str) -> shmstack_runtime::error::Result<Box<dyn ByteBacking>> {
            Err(RuntimeError::Segment {
                name: name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[test]
    fn test_load_add_program() {
        let program = load(
            "__VAR
const u a
const u b
__INIT
a 100
b 200
__PROGRAM
PUSH a
PUSH b
ADD
POP STDOUT
",
        )
        .unwrap();
        assert_eq!(
            program.instructions(),
            &[
                Instruction::PushConst(100),
                Instruction::PushConst(200),
                Instruction::Op(Opcode::Add),
                Instruction::PopSink(Sink::Stdout),
                Instruction::End,
            ]
        );
    }

    #[test]
    fn test_sections_in_any_order() {
        let program = load(
            "__PROGRAM
L x
S NULL
__INIT
x 5
__VAR
m@0 le32 x
__MEM
local m 1
__SETTINGS
CYCLE_MS 50
CYCLES 3
",
        )
        .unwrap();
        assert_eq!(program.settings().cycle_time_ms, 50);
        assert_eq!(program.settings().cycles, 3);
        let var = &program.variables()[0];
        assert_eq!(var.encoding, Encoding::Le32);
        assert_eq!(var.init, Some(5));
        assert_eq!(program.instructions()[0], Instruction::PushVar(VarId(0)));
        assert_eq!(program.instructions()[1], Instruction::PopSink(Sink::Null));
    }

    #[test]
    fn test_jumps_resolve_forward_and_backward() {
        let program = load(
            "__PROGRAM
$top
PUSH RAND
JZ end
J top
$end
",
        )
        .unwrap();
        assert_eq!(program.instructions()[1], Instruction::PushSource(Source::Rand));
        assert_eq!(program.instructions()[2], Instruction::JumpZero { target: 4 });
        assert_eq!(program.instructions()[3], Instruction::Jump { target: 0 });
        assert_eq!(program.label("end"), Some(4));
        assert_eq!(program.instructions().last(), Some(&Instruction::End));
    }

    #[test]
    fn test_shm_region_through_opener() {
        let loader = Loader::with_segment_opener(Buffers(16));
        let program = loader
            .load(
                "__MEM
shm plant io 8
__VAR
io@1 be64r4 word
io@0.63 le1 flag
",
            )
            .unwrap();
        assert_eq!(program.regions()[0].memory.cells(), 2);
        assert_eq!(program.variables()[1].sub_index, Some(63));
    }

    #[test]
    fn test_segment_failure_is_os_error() {
        let loader = Loader::with_segment_opener(Unavailable);
        let err = loader.load("__MEM\nshm plant io 8\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.is_os_error());
    }

    #[test]
    fn test_load_file_missing() {
        let err = load_file("/nonexistent/program.stk").unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.is_os_error());
    }

    #[test]
    fn test_empty_text_loads_end_only() {
        let program = load("").unwrap();
        assert_eq!(program.instructions(), &[Instruction::End]);
    }
}
