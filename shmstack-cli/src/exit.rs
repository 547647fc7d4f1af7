//! Process exit codes (BSD sysexits)

use anyhow::Error;
use shmstack_loader::LoadError;
use shmstack_runtime::RuntimeError;

pub const EX_OK: u8 = 0;
/// Command-line usage error
pub const EX_USAGE: u8 = 64;
/// Program text or program data was rejected
pub const EX_DATAERR: u8 = 65;
/// Operating system failure (shared memory, clocks, signals, output)
pub const EX_OSERR: u8 = 71;

/// Exit code for a failure that reached `main`
pub fn code_for(err: &Error) -> u8 {
    if let Some(load) = err.downcast_ref::<LoadError>() {
        return if load.is_os_error() { EX_OSERR } else { EX_DATAERR };
    }
    if let Some(runtime) = err.downcast_ref::<RuntimeError>() {
        return if runtime.is_os_error() { EX_OSERR } else { EX_DATAERR };
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return EX_OSERR;
    }
    EX_DATAERR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::io;

    fn wrapped<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Err::<(), E>(err).context("outer").unwrap_err()
    }

    #[test]
    fn test_load_errors() {
        let err = wrapped(LoadError::UnknownName("x".into()));
        assert_eq!(code_for(&err), EX_DATAERR);

        let err = wrapped(LoadError::Read {
            path: "p".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(code_for(&err), EX_OSERR);
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(code_for(&wrapped(RuntimeError::DivisionByZero)), EX_DATAERR);
        let err = RuntimeError::Instruction {
            ip: 3,
            instruction: "POP STDOUT".into(),
            source: Box::new(RuntimeError::Io(io::Error::from(io::ErrorKind::BrokenPipe))),
        };
        assert_eq!(code_for(&wrapped(err)), EX_OSERR);
    }

    #[test]
    fn test_signal_setup_failure() {
        let err = wrapped(io::Error::from_raw_os_error(libc::EINVAL));
        assert_eq!(code_for(&err), EX_OSERR);
    }
}
