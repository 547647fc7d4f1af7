//! I/O handling for reserved identifiers
//!
//! [`IoHandler`] serves `PUSH` of a [`Source`] (clocks, process ids, random
//! numbers) and `POP` into a [`Sink`] (formatted output lines). Output and the
//! random source are pluggable so tests can capture what a program prints.

use crate::error::{Result, RuntimeError};
use rand_core::{OsRng, RngCore};
use shmstack_spec::word::{from_f32, from_f64, to_f32, to_f64, to_i64};
use shmstack_spec::{Sink, Source, Word};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub struct IoHandler {
    out: Box<dyn Write + Send>,
    rng: Box<dyn RngCore + Send>,
}

impl IoHandler {
    pub fn new(out: Box<dyn Write + Send>, rng: Box<dyn RngCore + Send>) -> Self {
        Self { out, rng }
    }

    /// Process stdout and the OS random source
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(OsRng))
    }

    /// Custom output, OS random source
    pub fn with_output(out: impl Write + Send + 'static) -> Self {
        Self::new(Box::new(out), Box::new(OsRng))
    }

    /// Produce the Word for a reserved read identifier
    pub fn read(&mut self, source: Source) -> Result<Word> {
        let value = match source {
            Source::Stime => from_f64(clock_seconds(libc::CLOCK_REALTIME)?),
            Source::Mtime => from_f64(clock_seconds(libc::CLOCK_MONOTONIC)?),
            Source::Ctime => from_f64(clock_seconds(libc::CLOCK_PROCESS_CPUTIME_ID)?),
            Source::Ttime => from_f64(clock_seconds(libc::CLOCK_THREAD_CPUTIME_ID)?),
            Source::Pid => unsafe { libc::getpid() as Word },
            Source::Ppid => unsafe { libc::getppid() as Word },
            Source::Uid => unsafe { libc::getuid() as Word },
            Source::Euid => unsafe { libc::geteuid() as Word },
            Source::Rand => self.rng.next_u64(),
            // 24 and 53 random mantissa bits give uniform values in [0, 1)
            Source::Randf => from_f32((self.rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32),
            Source::Randd => from_f64((self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64),
        };
        Ok(value)
    }

    /// Consume a Word into a reserved write identifier
    pub fn write(&mut self, sink: Sink, value: Word) -> Result<()> {
        let line = match sink {
            Sink::Null => return Ok(()),
            Sink::Stdout => value.to_string(),
            Sink::Stdouts => to_i64(value).to_string(),
            Sink::Stdoutf => format_general(to_f32(value) as f64),
            Sink::Stdoutd => format_general(to_f64(value)),
        };
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }
}

impl Default for IoHandler {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for IoHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoHandler").finish_non_exhaustive()
    }
}

fn clock_seconds(clock: libc::clockid_t) -> Result<f64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if unsafe { libc::clock_gettime(clock, &mut ts) } != 0 {
        return Err(RuntimeError::Clock(io::Error::last_os_error()));
    }
    Ok(ts.tv_sec as f64 + ts.tv_nsec as f64 / 1e9)
}

/// Significant digits printed for floating point sinks
const FLOAT_PRECISION: i32 = 6;

/// Format like printf `%g` with six significant digits
pub fn format_general(value: f64) -> String {
    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value.is_nan() {
        return format!("{}nan", sign);
    }
    if value.is_infinite() {
        return format!("{}inf", sign);
    }
    if value == 0.0 {
        return format!("{}0", sign);
    }

    // The exponent is taken after rounding, so 999999.5 becomes 1e+06
    let sci = format!("{:.*e}", (FLOAT_PRECISION - 1) as usize, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= FLOAT_PRECISION {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    } else {
        let decimals = (FLOAT_PRECISION - 1 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Cloneable in-memory writer; every clone appends to the same buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written lines, without terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shmstack_spec::word::from_i64;

    /// Yields 0, 1, 2, ... from every call
    struct CountingRng(u64);

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }
        fn next_u64(&mut self) -> u64 {
            let v = self.0;
            self.0 = self.0.wrapping_add(1);
            v
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            rand_core::impls::fill_bytes_via_next(self, dest)
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn handler() -> (IoHandler, SharedBuffer) {
        let buf = SharedBuffer::new();
        (IoHandler::with_output(buf.clone()), buf)
    }

    #[test]
    fn test_integer_sinks() {
        let (mut io, buf) = handler();
        io.write(Sink::Stdout, 300).unwrap();
        io.write(Sink::Stdout, from_i64(-1)).unwrap();
        io.write(Sink::Stdouts, from_i64(-1)).unwrap();
        io.write(Sink::Null, 12345).unwrap();
        assert_eq!(buf.lines(), vec!["300", "18446744073709551615", "-1"]);
    }

    #[test]
    fn test_float_sinks() {
        let (mut io, buf) = handler();
        io.write(Sink::Stdoutf, from_f32(0.5)).unwrap();
        io.write(Sink::Stdoutd, from_f64(3.0)).unwrap();
        io.write(Sink::Stdoutd, from_f64(std::f64::consts::PI)).unwrap();
        assert_eq!(buf.contents(), "0.5\n3\n3.14159\n");
    }

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(100.0), "100");
        assert_eq!(format_general(123456.0), "123456");
        assert_eq!(format_general(1234567.0), "1.23457e+06");
        assert_eq!(format_general(999999.5), "1e+06");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001234), "1.234e-05");
        assert_eq!(format_general(-2.5), "-2.5");
        assert_eq!(format_general(1e100), "1e+100");
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(f64::INFINITY), "inf");
        assert_eq!(format_general(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_general(f64::NAN), "nan");
    }

    #[test]
    fn test_process_ids() {
        let (mut io, _) = handler();
        assert_eq!(io.read(Source::Pid).unwrap(), std::process::id() as Word);
        assert!(io.read(Source::Ppid).is_ok());
        assert!(io.read(Source::Uid).is_ok());
        assert!(io.read(Source::Euid).is_ok());
    }

    #[test]
    fn test_clocks() {
        let (mut io, _) = handler();
        let wall = to_f64(io.read(Source::Stime).unwrap());
        assert!(wall > 1.0e9);
        let a = to_f64(io.read(Source::Mtime).unwrap());
        let b = to_f64(io.read(Source::Mtime).unwrap());
        assert!(b >= a);
        assert!(to_f64(io.read(Source::Ctime).unwrap()) >= 0.0);
        assert!(to_f64(io.read(Source::Ttime).unwrap()) >= 0.0);
    }

    #[test]
    fn test_random_sources() {
        let mut io = IoHandler::new(Box::new(io::sink()), Box::new(CountingRng(0)));
        assert_eq!(io.read(Source::Rand).unwrap(), 0);
        assert_eq!(io.read(Source::Rand).unwrap(), 1);
        assert_eq!(to_f32(io.read(Source::Randf).unwrap()), 0.0);

        let mut io = IoHandler::new(Box::new(io::sink()), Box::new(CountingRng(u64::MAX)));
        let d = to_f64(io.read(Source::Randd).unwrap());
        assert!(d < 1.0 && d > 0.999);
    }

    #[test]
    fn test_os_random_range() {
        let (mut io, _) = handler();
        for _ in 0..100 {
            let f = to_f32(io.read(Source::Randf).unwrap());
            assert!((0.0..1.0).contains(&f));
            let d = to_f64(io.read(Source::Randd).unwrap());
            assert!((0.0..1.0).contains(&d));
        }
    }
}
