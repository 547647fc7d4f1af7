//! # Program Settings
//!
//! Cycle pacing values read from a program's `__SETTINGS` section. The machine
//! itself never sleeps; these are passive data for whoever drives the cycles.

use std::fmt;
use std::time::Duration;

/// Cycle pacing declared by a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Settings {
    /// Target cycle period in milliseconds (`CYCLE_MS`)
    pub cycle_time_ms: u64,
    /// Number of cycles to run, 0 for no limit (`CYCLES`)
    pub cycles: u64,
}

impl Settings {
    /// One cycle per second, forever
    pub const DEFAULT: Self = Self {
        cycle_time_ms: 1000,
        cycles: 0,
    };

    pub const fn new(cycle_time_ms: u64, cycles: u64) -> Self {
        Self {
            cycle_time_ms,
            cycles,
        }
    }

    #[inline]
    pub const fn runs_indefinitely(&self) -> bool {
        self.cycles == 0
    }

    #[inline]
    pub const fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.runs_indefinitely() {
            write!(f, "Settings {{ cycle: {} ms, cycles: unlimited }}", self.cycle_time_ms)
        } else {
            write!(f, "Settings {{ cycle: {} ms, cycles: {} }}", self.cycle_time_ms, self.cycles)
        }
    }
}
