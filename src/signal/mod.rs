//! Ctrl-C (SIGINT) handling for tail sessions
//!
//! On the first signal the consumer stops pulling from its tailer, which
//! drops the session and its connection, and the CLI exits with code 80.
//! On a second signal the process exits immediately.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code for an interrupted session
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop pulling entries
    StopTailing,
    /// Second signal: exit immediately
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

/// Signal state shared with the handler thread
#[derive(Debug, Default)]
pub struct SignalState {
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the consumer should stop pulling
    pub fn is_cancel_requested(&self) -> bool {
        self.signal_count.load(Ordering::SeqCst) > 0
    }

    /// Get the number of signals received
    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record a signal and return what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        let count = self
            .signal_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_add(1)))
            .unwrap_or(u8::MAX);

        match count {
            0 => SignalAction::StopTailing,
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Installs the process-wide Ctrl-C handler
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SignalState::new()),
        }
    }

    /// Get a reference to the signal state
    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the handler. Must be called once at program startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::StopTailing => {
                eprintln!("\nInterrupted, stopping tail (press Ctrl-C again to exit now)...");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(EXIT_CODE_CANCELLED);
            }
            SignalAction::Ignore => {}
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
