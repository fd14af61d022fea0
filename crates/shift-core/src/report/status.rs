//! Signal-driven and interval-driven status triggers
//!
//! A run installs two flags: SIGUSR1 requests an interim status block
//! without aborting, SIGINT requests interruption. Handlers are installed
//! for exactly one run at a time; the token returned by installation
//! unregisters the flag on drop and puts the signal's default disposition
//! back, so a finished run leaves the process reacting to Ctrl-C the way it
//! did before.

use crate::error::{Result, ShiftError};
use signal_hook::consts::{SIGINT, SIGUSR1};
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

// Default-disposition emulators left behind by dropped tokens, so a later
// install can displace them again.
static RESTORED: Mutex<Vec<(i32, SigId)>> = Mutex::new(Vec::new());

fn restored() -> MutexGuard<'static, Vec<(i32, SigId)>> {
    RESTORED.lock().unwrap_or_else(|e| e.into_inner())
}

fn take_restored(signal: i32) -> Option<SigId> {
    let mut held = restored();
    held.iter()
        .position(|(s, _)| *s == signal)
        .map(|at| held.remove(at).1)
}

#[cfg(test)]
fn default_emulation_active(signal: i32) -> bool {
    restored().iter().any(|(s, _)| *s == signal)
}

/// Handle for one installed signal flag.
///
/// Dropping unregisters the flag and re-arms the signal's default
/// disposition (emulated through signal-hook, which keeps its low-level
/// handler installed for the life of the process).
pub struct SignalToken {
    signal: i32,
    id: SigId,
}

impl SignalToken {
    /// Register `flag` to be set when `signal` arrives, displacing any
    /// default-disposition emulator a previous token left behind.
    pub fn install(signal: i32, flag: Arc<AtomicBool>) -> Result<Self> {
        if let Some(prior) = take_restored(signal) {
            signal_hook::low_level::unregister(prior);
        }
        let id = signal_hook::flag::register(signal, flag)
            .map_err(|e| ShiftError::config(format!("failed to install signal handler: {e}")))?;
        Ok(Self { signal, id })
    }
}

impl Drop for SignalToken {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.id);

        let signal = self.signal;
        let emulator = unsafe {
            // emulate_default_handler is async-signal-safe.
            signal_hook::low_level::register(signal, move || {
                let _ = signal_hook::low_level::emulate_default_handler(signal);
            })
        };
        if let Ok(id) = emulator {
            restored().push((signal, id));
        }
    }
}

/// Watches for the two out-of-band triggers a run responds to.
pub struct StatusReporter {
    status_flag: Arc<AtomicBool>,
    interrupt_flag: Arc<AtomicBool>,
    interval: Option<Duration>,
    _tokens: Vec<SignalToken>,
}

impl StatusReporter {
    /// Install signal handlers for the run's duration.
    pub fn install(interval: Option<Duration>) -> Result<Self> {
        let status_flag = Arc::new(AtomicBool::new(false));
        let interrupt_flag = Arc::new(AtomicBool::new(false));

        let tokens = vec![
            SignalToken::install(SIGUSR1, Arc::clone(&status_flag))?,
            SignalToken::install(SIGINT, Arc::clone(&interrupt_flag))?,
        ];

        Ok(Self {
            status_flag,
            interrupt_flag,
            interval,
            _tokens: tokens,
        })
    }

    /// Reporter with no signal handlers, for embedding and tests.
    pub fn detached(interval: Option<Duration>) -> Self {
        Self {
            status_flag: Arc::new(AtomicBool::new(false)),
            interrupt_flag: Arc::new(AtomicBool::new(false)),
            interval,
            _tokens: Vec::new(),
        }
    }

    /// Hint line for the run header.
    pub fn trigger_hint(&self) -> String {
        let pid = std::process::id();
        match self.interval {
            Some(interval) => format!(
                "status: every {}s, or kill -USR1 {pid}",
                interval.as_secs()
            ),
            None => format!("status: kill -USR1 {pid}"),
        }
    }

    /// True when the operator interrupted the run.
    pub fn interrupted(&self) -> bool {
        self.interrupt_flag.load(Ordering::Relaxed)
    }

    /// Whether an interim status block is due, checked synchronously after
    /// each record. Consumes a pending signal request.
    pub fn status_due(&self, last_status_at: Instant) -> bool {
        if self.status_flag.swap(false, Ordering::Relaxed) {
            return true;
        }
        match self.interval {
            Some(interval) => last_status_at.elapsed() >= interval,
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn raise_status(&self) {
        self.status_flag.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn raise_interrupt(&self) {
        self.interrupt_flag.store(true, Ordering::Relaxed);
    }
}
