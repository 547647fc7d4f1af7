//! Section parsers
//!
//! Each `parse_*` function handles one section. Line-level failures are
//! wrapped with the line number and normalized content before they leave
//! this module.

use crate::error::{LoadError, Result};
use crate::lexer::Token;
use crate::literal::{parse_address, parse_double, parse_signed, parse_unsigned, parse_variable_value};
use crate::section::SourceLine;
use shmstack_runtime::{LocalMemory, Memory, MemoryKind, Program, RealMemory, SegmentOpener, Variable};
use shmstack_spec::{encoding, reserved, word, Encoding, Instruction, Opcode, Settings, Sink, Source, Word};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Run `f` on every line, attaching line context to its errors
fn each_line<F>(lines: &[SourceLine], mut f: F) -> Result<()>
where
    F: FnMut(&[String]) -> Result<()>,
{
    for line in lines {
        f(&line.words()).map_err(|e| line.context(e))?;
    }
    Ok(())
}

fn unsigned(literal: &str) -> Result<u64> {
    parse_unsigned(literal).ok_or_else(|| LoadError::InvalidLiteral {
        literal: literal.to_string(),
        expected: "unsigned integer",
    })
}

fn index(literal: &str) -> Option<usize> {
    parse_unsigned(literal).and_then(|v| usize::try_from(v).ok())
}

fn count(literal: &str) -> Result<usize> {
    usize::try_from(unsigned(literal)?).map_err(|_| LoadError::InvalidLiteral {
        literal: literal.to_string(),
        expected: "size",
    })
}

// =============================================================================
// __SETTINGS
// =============================================================================

pub fn parse_settings(lines: &[SourceLine]) -> Result<Settings> {
    let mut settings = Settings::default();
    let mut seen: Vec<String> = Vec::new();

    each_line(lines, |words| {
        let [key, value] = words else {
            return Err(LoadError::Malformed { kind: "setting" });
        };
        if seen.contains(key) {
            return Err(LoadError::DuplicateSetting(key.clone()));
        }
        match key.as_str() {
            "CYCLE_MS" => settings.cycle_time_ms = unsigned(value)?,
            "CYCLES" => settings.cycles = unsigned(value)?,
            _ => return Err(LoadError::UnknownSetting(key.clone())),
        }
        seen.push(key.clone());
        Ok(())
    })?;

    debug!(%settings, "settings parsed");
    Ok(settings)
}

// =============================================================================
// Program builder
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstKind {
    Unsigned,
    Signed,
    Double,
}

impl ConstKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "u" => Some(ConstKind::Unsigned),
            "i" => Some(ConstKind::Signed),
            "f" => Some(ConstKind::Double),
            _ => None,
        }
    }

    fn parse(self, literal: &str) -> Result<Word> {
        let parsed = match self {
            ConstKind::Unsigned => parse_unsigned(literal),
            ConstKind::Signed => parse_signed(literal).map(word::from_i64),
            ConstKind::Double => parse_double(literal).map(word::from_f64),
        };
        parsed.ok_or_else(|| LoadError::InvalidLiteral {
            literal: literal.to_string(),
            expected: match self {
                ConstKind::Unsigned => "unsigned integer",
                ConstKind::Signed => "signed integer",
                ConstKind::Double => "floating point number",
            },
        })
    }
}

#[derive(Debug)]
struct Constant {
    name: String,
    kind: ConstKind,
    value: Option<Word>,
}

/// Accumulates declarations section by section into a [`Program`]
pub struct ProgramBuilder<'a> {
    program: Program,
    constants: Vec<Constant>,
    opener: &'a dyn SegmentOpener,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(settings: Settings, opener: &'a dyn SegmentOpener) -> Self {
        Self {
            program: Program::new(settings),
            constants: Vec::new(),
            opener,
        }
    }

    pub fn finish(self) -> Program {
        self.program
    }

    fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        if reserved::is_reserved(name) {
            return Err(LoadError::ReservedName(name.to_string()));
        }
        let existing = if self.constant(name).is_some() {
            "constant"
        } else if self.program.variable_id(name).is_some() {
            "variable"
        } else {
            return Ok(());
        };
        Err(LoadError::DuplicateName { name: name.to_string(), existing })
    }

    // ========== __MEM ==========

    pub fn parse_memory(&mut self, lines: &[SourceLine]) -> Result<()> {
        each_line(lines, |words| self.declare_memory(words))
    }

    fn declare_memory(&mut self, words: &[String]) -> Result<()> {
        let (name, memory): (&String, Box<dyn Memory>) = match words {
            [kind, name, cells] if kind == "local" => {
                self.check_new_memory(name)?;
                let memory: Box<dyn Memory> = Box::new(LocalMemory::new(count(cells)?));
                (name, memory)
            }
            [kind, segment, name, cell_size] if kind == "shm" => {
                self.check_new_memory(name)?;
                let cell_size = count(cell_size)?;
                encoding::check_cell_size(cell_size)?;
                let backing = self.opener.open(segment)?;
                let memory: Box<dyn Memory> = Box::new(RealMemory::new(backing, cell_size)?);
                (name, memory)
            }
            [kind, ..] if kind != "local" && kind != "shm" => {
                return Err(LoadError::UnknownMemoryKind(kind.clone()));
            }
            _ => return Err(LoadError::Malformed { kind: "memory" }),
        };
        debug!(name = %name, kind = ?memory.kind(), cells = memory.cells(), "memory region declared");
        self.program.add_region(name.clone(), memory);
        Ok(())
    }

    fn check_new_memory(&self, name: &str) -> Result<()> {
        match self.program.region_index(name) {
            Some(_) => Err(LoadError::DuplicateMemory(name.to_string())),
            None => Ok(()),
        }
    }

    // ========== __VAR ==========

    pub fn parse_variables(&mut self, lines: &[SourceLine]) -> Result<()> {
        each_line(lines, |words| self.declare(words))
    }

    fn declare(&mut self, words: &[String]) -> Result<()> {
        let [first, second, name] = words else {
            return Err(LoadError::Malformed { kind: "declaration" });
        };
        if first == "const" {
            let kind = ConstKind::from_tag(second).ok_or_else(|| LoadError::UnknownConstType(second.clone()))?;
            self.check_new_name(name)?;
            self.constants.push(Constant { name: name.clone(), kind, value: None });
            return Ok(());
        }

        let variable = self.resolve_location(first, second, name)?;
        self.check_new_name(name)?;
        self.program.add_variable(variable);
        Ok(())
    }

    fn resolve_location(&self, address: &str, tag: &str, name: &str) -> Result<Variable> {
        let invalid = |reason: &'static str| LoadError::InvalidAddress { address: address.to_string(), reason };
        let parts = parse_address(address).ok_or_else(|| invalid("expected <memory>@<cell>[.<sub-index>]"))?;
        let region = self
            .program
            .region_index(parts.memory)
            .ok_or_else(|| LoadError::UnknownMemory(parts.memory.to_string()))?;
        let cell = index(parts.cell).ok_or_else(|| invalid("cell is not an unsigned integer"))?;
        let sub_index = match parts.sub_index {
            Some(sub) => Some(index(sub).ok_or_else(|| invalid("sub-index is not an unsigned integer"))?),
            None => None,
        };

        let encoding = match self.program.regions()[region].memory.kind() {
            MemoryKind::Local => {
                if sub_index.is_some() {
                    return Err(invalid("sub-index not allowed on local memory"));
                }
                Encoding::from_tag(tag).unwrap_or_else(|| {
                    warn!(variable = name, tag, "unknown encoding on local memory, using full width");
                    Encoding::Le64
                })
            }
            MemoryKind::Real { cell_size } => {
                let encoding: Encoding = tag.parse()?;
                match (encoding.is_bit(), encoding == Encoding::Byte, sub_index) {
                    (true, _, None) => return Err(invalid("bit encodings require a sub-index")),
                    (false, false, Some(_)) => return Err(invalid("sub-index only allowed for bit and byte encodings")),
                    _ => {}
                }
                encoding::check_access(cell_size, encoding, sub_index.unwrap_or(0))?;
                encoding
            }
        };

        Ok(Variable {
            name: name.to_string(),
            region,
            encoding,
            cell,
            sub_index,
            init: None,
        })
    }

    // ========== __INIT ==========

    pub fn parse_init(&mut self, lines: &[SourceLine]) -> Result<()> {
        each_line(lines, |words| self.initialize(words))?;
        match self.constants.iter().find(|c| c.value.is_none()) {
            Some(c) => Err(LoadError::UninitializedConstant(c.name.clone())),
            None => Ok(()),
        }
    }

    fn initialize(&mut self, words: &[String]) -> Result<()> {
        let [name, literal] = words else {
            return Err(LoadError::Malformed { kind: "init" });
        };
        if let Some(constant) = self.constants.iter_mut().find(|c| &c.name == name) {
            if constant.value.is_some() {
                return Err(LoadError::DuplicateInit(name.clone()));
            }
            constant.value = Some(constant.kind.parse(literal)?);
            return Ok(());
        }

        let id = self
            .program
            .variable_id(name)
            .ok_or_else(|| LoadError::UnknownName(name.clone()))?;
        let value = parse_variable_value(literal).ok_or_else(|| LoadError::InvalidLiteral {
            literal: literal.clone(),
            expected: "number",
        })?;
        let variable = self
            .program
            .variable_mut(id)
            .ok_or_else(|| LoadError::UnknownName(name.clone()))?;
        if variable.init.is_some() {
            return Err(LoadError::DuplicateInit(name.clone()));
        }
        variable.init = Some(value);
        Ok(())
    }

    // ========== __PROGRAM ==========

    pub fn parse_program(&mut self, lines: &[SourceLine]) -> Result<()> {
        let mut instructions = Vec::with_capacity(lines.len() + 1);
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut pending: Vec<(usize, &SourceLine, String)> = Vec::new();

        for line in lines {
            let position = instructions.len();
            let instruction = match line.tokens.as_slice() {
                [Token::Label(name)] => {
                    if name.is_empty() {
                        return Err(line.context(LoadError::EmptyLabel));
                    }
                    if labels.insert(name.clone(), position).is_some() {
                        return Err(line.context(LoadError::DuplicateLabel(name.clone())));
                    }
                    Instruction::Label(name.clone())
                }
                [Token::Word(op), operand] => {
                    let operand = operand.text();
                    let instruction = self.resolve(op, &operand).map_err(|e| line.context(e))?;
                    if instruction.is_jump() {
                        pending.push((position, line, operand));
                    }
                    instruction
                }
                [Token::Word(mnemonic)] => match Opcode::from_mnemonic(mnemonic) {
                    Some(op) => Instruction::Op(op),
                    None => return Err(line.context(LoadError::UnknownInstruction(mnemonic.clone()))),
                },
                [first, ..] => return Err(line.context(LoadError::UnknownInstruction(first.text()))),
                [] => continue,
            };
            instructions.push(instruction);
        }
        instructions.push(Instruction::End);

        for (position, line, label) in pending {
            let target = *labels
                .get(&label)
                .ok_or_else(|| line.context(LoadError::UndefinedLabel(label.clone())))?;
            if let Instruction::Jump { target: t }
            | Instruction::JumpZero { target: t }
            | Instruction::JumpNotZero { target: t } = &mut instructions[position]
            {
                *t = target;
            }
        }

        for instruction in instructions {
            self.program.push_instruction(instruction);
        }
        for (name, position) in labels {
            self.program.add_label(name, position);
        }
        Ok(())
    }

    /// Two-token line. Jump targets are left at 0 until labels are known.
    fn resolve(&self, op: &str, operand: &str) -> Result<Instruction> {
        match op {
            "PUSH" | "L" => {
                if let Some(constant) = self.constant(operand) {
                    let value = constant
                        .value
                        .ok_or_else(|| LoadError::UninitializedConstant(operand.to_string()))?;
                    return Ok(Instruction::PushConst(value));
                }
                if let Some(id) = self.program.variable_id(operand) {
                    return Ok(Instruction::PushVar(id));
                }
                Source::from_name(operand)
                    .map(Instruction::PushSource)
                    .ok_or_else(|| LoadError::UnknownName(operand.to_string()))
            }
            "POP" | "S" => {
                if let Some(id) = self.program.variable_id(operand) {
                    return Ok(Instruction::PopVar(id));
                }
                if self.constant(operand).is_some() {
                    return Err(LoadError::ConstantTarget(operand.to_string()));
                }
                Sink::from_name(operand)
                    .map(Instruction::PopSink)
                    .ok_or_else(|| LoadError::UnknownName(operand.to_string()))
            }
            "J" => Ok(Instruction::Jump { target: 0 }),
            "JZ" => Ok(Instruction::JumpZero { target: 0 }),
            "JNZ" => Ok(Instruction::JumpNotZero { target: 0 }),
            _ => Err(LoadError::UnknownInstruction(op.to_string())),
        }
    }
}
