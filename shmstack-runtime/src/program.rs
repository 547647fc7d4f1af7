//! Loaded program model
//!
//! A [`Program`] owns its memory regions, the variable table, the resolved
//! instruction sequence and the label index. It is built once by the loader
//! and then executed repeatedly by a [`crate::Machine`].

use crate::error::{Result, RuntimeError};
use crate::memory::{Memory, MemoryKind};
use shmstack_spec::{Encoding, Instruction, Settings, VarId, Word};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named memory region
pub struct Region {
    pub name: String,
    pub memory: Box<dyn Memory>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("kind", &self.memory.kind())
            .field("cells", &self.memory.cells())
            .finish()
    }
}

/// A named location inside a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Index into [`Program::regions`]
    pub region: usize,
    pub encoding: Encoding,
    pub cell: usize,
    pub sub_index: Option<usize>,
    /// Value written by `Machine::init`
    pub init: Option<Word>,
}

#[derive(Debug, Default)]
pub struct Program {
    regions: Vec<Region>,
    variables: Vec<Variable>,
    instructions: Arc<Vec<Instruction>>,
    labels: HashMap<String, usize>,
    settings: Settings,
}

impl Program {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    // ========== Building ==========

    /// Add a region and return its index
    pub fn add_region(&mut self, name: impl Into<String>, memory: Box<dyn Memory>) -> usize {
        self.regions.push(Region {
            name: name.into(),
            memory,
        });
        self.regions.len() - 1
    }

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        self.variables.push(variable);
        VarId(self.variables.len() - 1)
    }

    pub fn variable_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.variables.get_mut(id.0)
    }

    pub fn push_instruction(&mut self, instruction: Instruction) -> usize {
        let instructions = Arc::make_mut(&mut self.instructions);
        instructions.push(instruction);
        instructions.len() - 1
    }

    /// Point `name` at an instruction position. Returns false if it already exists.
    pub fn add_label(&mut self, name: impl Into<String>, position: usize) -> bool {
        use std::collections::hash_map::Entry;
        match self.labels.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(position);
                true
            }
        }
    }

    // ========== Lookup ==========

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_index(&self, name: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn variable_id(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Handle on the instruction list that outlives a borrow of the program
    pub(crate) fn shared_instructions(&self) -> Arc<Vec<Instruction>> {
        Arc::clone(&self.instructions)
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    // ========== Variable access ==========

    fn resolve(&self, id: VarId) -> Result<&Variable> {
        self.variables
            .get(id.0)
            .ok_or_else(|| RuntimeError::Other(format!("unknown variable {}", id)))
    }

    pub fn load(&self, id: VarId) -> Result<Word> {
        let var = self.resolve(id)?;
        let region = &self.regions[var.region];
        region.memory.load(var.cell, var.encoding, var.sub_index)
    }

    pub fn store(&mut self, id: VarId, value: Word) -> Result<()> {
        let &Variable {
            region,
            encoding,
            cell,
            sub_index,
            ..
        } = self.resolve(id)?;
        self.regions[region].memory.store(value, cell, encoding, sub_index)
    }

    /// Instruction text with variable ids replaced by names
    pub fn describe(&self, ip: usize) -> String {
        let Some(instruction) = self.instructions.get(ip) else {
            return format!("<ip {} out of range>", ip);
        };
        let name = |id: &VarId| {
            self.variable(*id)
                .map(|v| v.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        match instruction {
            Instruction::PushVar(id) => format!("PUSH {}", name(id)),
            Instruction::PopVar(id) => format!("POP {}", name(id)),
            other => other.to_string(),
        }
    }

    /// Count of regions backed by a byte buffer
    pub fn real_region_count(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| matches!(r.memory.kind(), MemoryKind::Real { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{LocalMemory, RealMemory};
    use shmstack_spec::Sink;

    fn sample() -> Program {
        let mut program = Program::new(Settings::new(10, 2));
        let local = program.add_region("m", Box::new(LocalMemory::new(4)));
        let real = program.add_region(
            "io",
            Box::new(RealMemory::new(vec![0u8; 4], 2).unwrap()),
        );
        program.add_variable(Variable {
            name: "counter".into(),
            region: local,
            encoding: Encoding::Le64,
            cell: 1,
            sub_index: None,
            init: Some(5),
        });
        program.add_variable(Variable {
            name: "flag".into(),
            region: real,
            encoding: Encoding::Le1,
            cell: 1,
            sub_index: Some(3),
            init: None,
        });
        program
    }

    #[test]
    fn test_lookup() {
        let program = sample();
        assert_eq!(program.region_index("io"), Some(1));
        assert_eq!(program.variable_id("flag"), Some(VarId(1)));
        assert_eq!(program.variable_id("nope"), None);
        assert_eq!(program.settings().cycle_time_ms, 10);
        assert_eq!(program.real_region_count(), 1);
    }

    #[test]
    fn test_load_store_through_variables() {
        let mut program = sample();
        program.store(VarId(0), 77).unwrap();
        assert_eq!(program.load(VarId(0)).unwrap(), 77);

        program.store(VarId(1), 1).unwrap();
        assert_eq!(program.load(VarId(1)).unwrap(), 1);
        match program.regions()[1].memory.load(1, Encoding::Le16, None) {
            Ok(raw) => assert_eq!(raw, 0b1000),
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_push_after_sharing_keeps_snapshot() {
        let mut program = sample();
        program.push_instruction(Instruction::End);
        let snapshot = program.shared_instructions();
        program.push_instruction(Instruction::End);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(program.instructions().len(), 2);
    }

    #[test]
    fn test_unknown_variable() {
        let program = sample();
        assert!(program.load(VarId(9)).is_err());
    }

    #[test]
    fn test_labels_unique() {
        let mut program = sample();
        assert!(program.add_label("top", 0));
        assert!(!program.add_label("top", 3));
        assert_eq!(program.label("top"), Some(0));
    }

    #[test]
    fn test_describe_uses_names() {
        let mut program = sample();
        program.push_instruction(Instruction::PushVar(VarId(0)));
        program.push_instruction(Instruction::PopSink(Sink::Stdout));
        assert_eq!(program.describe(0), "PUSH counter");
        assert_eq!(program.describe(1), "POP STDOUT");
        assert_eq!(program.describe(7), "<ip 7 out of range>");
    }
}
