//! Machine for shmstack programs

use crate::error::{Result, RuntimeError};
use crate::execute::{execute, Flow};
use crate::io::IoHandler;
use crate::program::Program;
use crate::stack::StackMachine;
use shmstack_spec::DEFAULT_STACK_SIZE;
use tracing::{debug, trace};

/// Machine configuration
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Stack capacity in Words
    pub stack_size: usize,

    /// Log every executed instruction at trace level
    pub trace: bool,

    /// Per-cycle instruction limit; `None` runs until the end instruction
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            trace: false,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// Between cycles
    Ready,
    /// Inside `run`
    Running,
}

/// Outcome of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Instructions executed, the end instruction included
    pub steps: u64,
    /// Stack depth left behind
    pub stack_depth: usize,
}

pub struct Machine {
    program: Program,
    stack: StackMachine,
    io: IoHandler,
    config: MachineConfig,
    state: MachineState,
    ip: usize,
    initialized: bool,
    /// Initial values already written by a failed `init`
    init_applied: usize,
}

impl Machine {
    /// Machine writing to stdout
    pub fn new(program: Program, config: MachineConfig) -> Result<Self> {
        Self::with_io(program, config, IoHandler::stdout())
    }

    pub fn with_io(program: Program, config: MachineConfig, io: IoHandler) -> Result<Self> {
        let stack = StackMachine::new(config.stack_size)?;
        debug!(
            stack_size = config.stack_size,
            instructions = program.instructions().len(),
            variables = program.variables().len(),
            regions = program.regions().len(),
            "machine created"
        );
        Ok(Self {
            program,
            stack,
            io,
            config,
            state: MachineState::Ready,
            ip: 0,
            initialized: false,
            init_applied: 0,
        })
    }

    /// Write declared initial values, in declaration order. Only the first
    /// successful call has an effect. After a failed store, the next call
    /// resumes at that variable without rewriting the ones before it.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let inits: Vec<_> = self
            .program
            .variables()
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.init.map(|value| (shmstack_spec::VarId(i), value)))
            .collect();

        for (id, value) in inits.into_iter().skip(self.init_applied) {
            self.program.store(id, value).map_err(|e| RuntimeError::Init {
                name: self
                    .program
                    .variable(id)
                    .map(|v| v.name.clone())
                    .unwrap_or_default(),
                source: Box::new(e),
            })?;
            self.init_applied += 1;
        }

        self.initialized = true;
        debug!("initial values applied");
        Ok(())
    }

    /// Execute one cycle: from the first instruction to the end instruction
    pub fn run(&mut self) -> Result<CycleReport> {
        self.init()?;

        self.state = MachineState::Running;
        self.ip = 0;
        let result = self.run_cycle();
        self.state = MachineState::Ready;
        result
    }

    fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut steps: u64 = 0;
        let code = self.program.shared_instructions();

        loop {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    return Err(RuntimeError::StepLimitExceeded { limit });
                }
            }

            let ip = self.ip;
            let instr = code
                .get(ip)
                .ok_or_else(|| RuntimeError::Other(format!("instruction pointer {} out of range", ip)))?;

            if self.config.trace {
                trace!(ip, depth = self.stack.size(), "{}", self.program.describe(ip));
            }

            let flow = execute(instr, &mut self.program, &mut self.stack, &mut self.io).map_err(|e| {
                RuntimeError::Instruction {
                    ip,
                    instruction: self.program.describe(ip),
                    source: Box::new(e),
                }
            })?;
            steps += 1;

            match flow {
                Flow::Next => self.ip += 1,
                Flow::Jump(target) => self.ip = target,
                Flow::Halt => break,
            }
        }

        Ok(CycleReport {
            steps,
            stack_depth: self.stack.size(),
        })
    }

    // ========== Accessors ==========

    pub fn cycle_time_ms(&self) -> u64 {
        self.program.settings().cycle_time_ms
    }

    /// Configured cycle count, 0 for unlimited
    pub fn cycles(&self) -> u64 {
        self.program.settings().cycles
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn stack(&self) -> &StackMachine {
        &self.stack
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("ip", &self.ip)
            .field("stack", &self.stack.as_slice())
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SharedBuffer;
    use crate::memory::LocalMemory;
    use crate::program::Variable;
    use shmstack_spec::{Encoding, Instruction, Opcode, Settings, Sink, VarId};

    fn counter_program() -> Program {
        // counter += 1; print counter
        let mut program = Program::new(Settings::new(5, 3));
        let region = program.add_region("m", Box::new(LocalMemory::new(1)));
        program.add_variable(Variable {
            name: "counter".into(),
            region,
            encoding: Encoding::Le64,
            cell: 0,
            sub_index: None,
            init: Some(10),
        });
        for instr in [
            Instruction::PushVar(VarId(0)),
            Instruction::PushConst(1),
            Instruction::Op(Opcode::Add),
            Instruction::Op(Opcode::Dup),
            Instruction::PopVar(VarId(0)),
            Instruction::PopSink(Sink::Stdout),
            Instruction::End,
        ] {
            program.push_instruction(instr);
        }
        program
    }

    fn machine(program: Program, config: MachineConfig) -> (Machine, SharedBuffer) {
        let buf = SharedBuffer::new();
        let m = Machine::with_io(program, config, IoHandler::with_output(buf.clone())).unwrap();
        (m, buf)
    }

    #[test]
    fn test_config_default() {
        let config = MachineConfig::default();
        assert_eq!(config.stack_size, 32);
        assert!(!config.trace);
        assert_eq!(config.max_steps, None);
    }

    #[test]
    fn test_run_initializes_once() {
        let (mut m, buf) = machine(counter_program(), MachineConfig::default());
        assert!(!m.is_initialized());
        m.run().unwrap();
        m.run().unwrap();
        m.init().unwrap();
        m.run().unwrap();
        assert_eq!(buf.lines(), vec!["11", "12", "13"]);
        assert_eq!(m.state(), MachineState::Ready);
    }

    #[test]
    fn test_failed_init_does_not_rewrite_applied_values() {
        let mut program = Program::new(Settings::default());
        let region = program.add_region("m", Box::new(LocalMemory::new(2)));
        for (name, cell, init) in [("a", 0, 1), ("b", 5, 2)] {
            program.add_variable(Variable {
                name: name.into(),
                region,
                encoding: Encoding::Le64,
                cell,
                sub_index: None,
                init: Some(init),
            });
        }
        program.push_instruction(Instruction::End);
        let (mut m, _) = machine(program, MachineConfig::default());

        match m.init().unwrap_err() {
            RuntimeError::Init { name, .. } => assert_eq!(name, "b"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!m.is_initialized());

        // another writer changes `a`, then `b` becomes reachable
        m.program_mut().store(VarId(0), 99).unwrap();
        m.program_mut().variable_mut(VarId(1)).unwrap().cell = 1;

        m.run().unwrap();
        assert!(m.is_initialized());
        assert_eq!(m.program().load(VarId(0)).unwrap(), 99);
        assert_eq!(m.program().load(VarId(1)).unwrap(), 2);
    }

    #[test]
    fn test_settings_accessors() {
        let (m, _) = machine(counter_program(), MachineConfig::default());
        assert_eq!(m.cycle_time_ms(), 5);
        assert_eq!(m.cycles(), 3);
    }

    #[test]
    fn test_report() {
        let (mut m, _) = machine(counter_program(), MachineConfig::default());
        let report = m.run().unwrap();
        assert_eq!(report.steps, 7);
        assert_eq!(report.stack_depth, 0);
    }

    #[test]
    fn test_stack_survives_cycles() {
        let mut program = Program::new(Settings::default());
        program.push_instruction(Instruction::PushConst(1));
        program.push_instruction(Instruction::End);
        let (mut m, _) = machine(program, MachineConfig::default());
        m.run().unwrap();
        m.run().unwrap();
        assert_eq!(m.stack().as_slice(), &[1, 1]);
    }

    #[test]
    fn test_error_names_instruction() {
        let mut program = Program::new(Settings::default());
        program.push_instruction(Instruction::PushConst(1));
        program.push_instruction(Instruction::PushConst(0));
        program.push_instruction(Instruction::Op(Opcode::Div));
        program.push_instruction(Instruction::End);
        let (mut m, _) = machine(program, MachineConfig::default());

        match m.run().unwrap_err() {
            RuntimeError::Instruction { ip, instruction, source } => {
                assert_eq!(ip, 2);
                assert_eq!(instruction, "DIV");
                assert!(matches!(*source, RuntimeError::DivisionByZero));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(m.state(), MachineState::Ready);
    }

    #[test]
    fn test_step_limit() {
        let mut program = Program::new(Settings::default());
        program.push_instruction(Instruction::Label("spin".into()));
        program.push_instruction(Instruction::Jump { target: 0 });
        program.push_instruction(Instruction::End);
        program.add_label("spin", 0);
        let config = MachineConfig {
            max_steps: Some(100),
            ..MachineConfig::default()
        };
        let (mut m, _) = machine(program, config);
        assert!(matches!(
            m.run(),
            Err(RuntimeError::StepLimitExceeded { limit: 100 })
        ));
    }

    #[test]
    fn test_stack_too_small() {
        let config = MachineConfig {
            stack_size: 1,
            ..MachineConfig::default()
        };
        assert!(Machine::with_io(Program::default(), config, IoHandler::with_output(Vec::new())).is_err());
    }

    #[test]
    fn test_failed_init_retried() {
        let mut program = Program::new(Settings::default());
        let region = program.add_region("m", Box::new(LocalMemory::new(1)));
        program.add_variable(Variable {
            name: "far".into(),
            region,
            encoding: Encoding::Le64,
            cell: 4,
            sub_index: None,
            init: Some(1),
        });
        program.push_instruction(Instruction::End);
        let (mut m, _) = machine(program, MachineConfig::default());
        let err = m.init().unwrap_err();
        assert!(matches!(&err, RuntimeError::Init { name, .. } if name == "far"));
        assert!(matches!(err.root(), RuntimeError::CellOutOfRange { cell: 4, cells: 1 }));
        assert!(!m.is_initialized());
        assert!(m.run().is_err());
    }
}
