//! Reserved identifiers.
//!
//! Names that a program may `PUSH` from ([`Source`]) or `POP` into ([`Sink`])
//! without declaring them. They cannot be used as variable or constant names.

use std::fmt;

/// Read-only endpoint producing one Word per PUSH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Wall clock seconds (f64)
    Stime,
    /// Monotonic clock seconds (f64)
    Mtime,
    /// Process CPU time seconds (f64)
    Ctime,
    /// Thread CPU time seconds (f64)
    Ttime,
    Pid,
    Ppid,
    Uid,
    Euid,
    /// Uniform random Word
    Rand,
    /// Uniform f32 in [0, 1)
    Randf,
    /// Uniform f64 in [0, 1)
    Randd,
}

/// Write-only endpoint consuming one Word per POP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sink {
    /// Print as unsigned decimal
    Stdout,
    /// Print as signed decimal
    Stdouts,
    /// Print as f32
    Stdoutf,
    /// Print as f64
    Stdoutd,
    /// Discard
    Null,
}

impl Source {
    pub const ALL: [Source; 11] = [
        Source::Stime,
        Source::Mtime,
        Source::Ctime,
        Source::Ttime,
        Source::Pid,
        Source::Ppid,
        Source::Uid,
        Source::Euid,
        Source::Rand,
        Source::Randf,
        Source::Randd,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Source::Stime => "STIME",
            Source::Mtime => "MTIME",
            Source::Ctime => "CTIME",
            Source::Ttime => "TTIME",
            Source::Pid => "PID",
            Source::Ppid => "PPID",
            Source::Uid => "UID",
            Source::Euid => "EUID",
            Source::Rand => "RAND",
            Source::Randf => "RANDF",
            Source::Randd => "RANDD",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl Sink {
    pub const ALL: [Sink; 5] = [Sink::Stdout, Sink::Stdouts, Sink::Stdoutf, Sink::Stdoutd, Sink::Null];

    pub const fn name(self) -> &'static str {
        match self {
            Sink::Stdout => "STDOUT",
            Sink::Stdouts => "STDOUTS",
            Sink::Stdoutf => "STDOUTF",
            Sink::Stdoutd => "STDOUTD",
            Sink::Null => "NULL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True if `name` is a reserved read or write identifier
pub fn is_reserved(name: &str) -> bool {
    Source::from_name(name).is_some() || Sink::from_name(name).is_some()
}
