//! Termination signals
//!
//! SIGINT, SIGTERM and SIGQUIT set a process-wide flag. A watcher thread
//! turns the flag into a [`CancelToken`] cancellation so the scheduler stops
//! after the current cycle.

use shmstack_runtime::CancelToken;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;

static TERMINATE: AtomicBool = AtomicBool::new(false);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

extern "C" fn on_signal(_signal: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

pub fn install() -> io::Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGQUIT] {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as usize;
            action.sa_flags = libc::SA_RESTART;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

pub fn termination_requested() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}

/// Cancel `token` once a termination signal arrives. The thread exits when
/// the token is cancelled for any reason.
pub fn watch(token: CancelToken) -> JoinHandle<()> {
    thread::spawn(move || loop {
        if termination_requested() {
            info!("termination signal received");
            token.cancel();
            return;
        }
        if token.wait_timeout(POLL_INTERVAL) {
            return;
        }
    })
}
