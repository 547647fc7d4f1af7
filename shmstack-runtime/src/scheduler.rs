//! Cycle pacing.
//!
//! The [`Scheduler`] drives a [`Machine`] on a fixed time grid: cycle `k` is
//! due at `start + k * cycle_time`. A cycle that finishes after its deadline is
//! logged as an overrun and the next cycle starts at the next grid point.
//! Between cycles the scheduler sleeps on a [`CancelToken`], so cancellation
//! takes effect without waiting out the period.

use crate::error::Result;
use crate::machine::Machine;
use shmstack_spec::Settings;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared between threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cond) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cond) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cond
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub cycle_time: Duration,
    /// 0 runs until cancelled
    pub cycles: u64,
}

impl From<Settings> for SchedulerConfig {
    fn from(settings: Settings) -> Self {
        Self {
            cycle_time: settings.cycle_time(),
            cycles: settings.cycles,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Cycles completed
    pub cycles: u64,
    /// Cycles that finished after their deadline
    pub overruns: u64,
    /// Stopped by the cancel token
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    token: CancelToken,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, token: CancelToken) -> Self {
        Self { config, token }
    }

    /// Pace taken from the machine's program settings
    pub fn for_machine(machine: &Machine, token: CancelToken) -> Self {
        Self::new(machine.program().settings().into(), token)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run cycles until the configured count is reached, the token is
    /// cancelled, or a cycle fails. The first failure is returned.
    pub fn run(&self, machine: &mut Machine) -> Result<RunStats> {
        let period = self.config.cycle_time;
        let mut stats = RunStats::default();
        let mut deadline = Instant::now();

        info!(
            cycle_ms = period.as_millis() as u64,
            cycles = self.config.cycles,
            "scheduler started"
        );

        loop {
            if self.token.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            machine.run()?;
            stats.cycles += 1;

            if self.config.cycles != 0 && stats.cycles >= self.config.cycles {
                break;
            }

            deadline += period;
            let now = Instant::now();
            if now > deadline {
                stats.overruns += 1;
                warn!(
                    cycle = stats.cycles,
                    late_ms = (now - deadline).as_millis() as u64,
                    "cycle time exceeded"
                );
                // realign to the next grid point
                let period_ns = period.as_nanos();
                deadline = if period_ns == 0 {
                    now
                } else {
                    let into_period = (now - deadline).as_nanos() % period_ns;
                    now + Duration::from_nanos((period_ns - into_period) as u64)
                };
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.token.wait_timeout(remaining) {
                stats.cancelled = true;
                break;
            }
        }

        info!(
            cycles = stats.cycles,
            overruns = stats.overruns,
            cancelled = stats.cancelled,
            "scheduler stopped"
        );
        debug!(?stats, "run statistics");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{IoHandler, SharedBuffer};
    use crate::machine::MachineConfig;
    use crate::program::Program;
    use shmstack_spec::{Instruction, Opcode, Sink};
    use std::thread;

    fn printing_machine(settings: Settings) -> (Machine, SharedBuffer) {
        let mut program = Program::new(settings);
        program.push_instruction(Instruction::PushConst(7));
        program.push_instruction(Instruction::PopSink(Sink::Stdout));
        program.push_instruction(Instruction::End);
        let buf = SharedBuffer::new();
        let machine = Machine::with_io(
            program,
            MachineConfig::default(),
            IoHandler::with_output(buf.clone()),
        )
        .unwrap();
        (machine, buf)
    }

    #[test]
    fn test_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait_timeout(Duration::from_millis(1)));
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        assert!(token.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_runs_configured_cycles() {
        let (mut machine, buf) = printing_machine(Settings::new(1, 3));
        let scheduler = Scheduler::for_machine(&machine, CancelToken::new());
        let stats = scheduler.run(&mut machine).unwrap();
        assert_eq!(stats.cycles, 3);
        assert!(!stats.cancelled);
        assert_eq!(buf.lines(), vec!["7", "7", "7"]);
    }

    #[test]
    fn test_cancel_stops_unbounded_run() {
        let (mut machine, _) = printing_machine(Settings::new(5, 0));
        let token = CancelToken::new();
        let scheduler = Scheduler::for_machine(&machine, token.clone());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            token.cancel();
        });
        let stats = scheduler.run(&mut machine).unwrap();
        canceller.join().unwrap();

        assert!(stats.cancelled);
        assert!(stats.cycles >= 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (mut machine, buf) = printing_machine(Settings::new(1, 5));
        let token = CancelToken::new();
        token.cancel();
        let stats = Scheduler::for_machine(&machine, token).run(&mut machine).unwrap();
        assert_eq!(stats.cycles, 0);
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn test_overrun_counted() {
        let (mut machine, _) = printing_machine(Settings::new(0, 3));
        let config = SchedulerConfig {
            cycle_time: Duration::from_nanos(1),
            cycles: 3,
        };
        let stats = Scheduler::new(config, CancelToken::new()).run(&mut machine).unwrap();
        assert_eq!(stats.cycles, 3);
        assert!(stats.overruns >= 1);
    }

    #[test]
    fn test_error_stops_run() {
        let mut program = Program::new(Settings::new(1, 0));
        program.push_instruction(Instruction::Op(Opcode::Add));
        program.push_instruction(Instruction::End);
        let mut machine = Machine::with_io(
            program,
            MachineConfig::default(),
            IoHandler::with_output(Vec::new()),
        )
        .unwrap();
        let scheduler = Scheduler::for_machine(&machine, CancelToken::new());
        assert!(scheduler.run(&mut machine).is_err());
    }
}
