//! Signal handling for graceful interruption (SIGINT/SIGTERM)
//!
//! On the first signal, no further artifacts are started; artifacts already
//! being routed finish their fan-out so the pool never holds a half-routed
//! artifact from a graceful stop. Artifacts that were not started are
//! reported as skipped.
//!
//! On a second signal the process exits immediately. Any artifact still in
//! flight is logged; it must be rerouted as a whole on the next run.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::report::EXIT_CANCELLED;

/// Shared interruption state
#[derive(Debug, Default)]
pub struct SignalState {
    cancel_requested: AtomicBool,
    immediate_exit: AtomicBool,
    signal_count: AtomicU8,
    /// Artifacts currently being routed
    in_flight: Mutex<Vec<String>>,
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop starting new artifacts
    StopStarting,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn is_immediate_exit(&self) -> bool {
        self.immediate_exit.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Request cancellation without a signal
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Record a received signal and decide what to do
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);

        if count == 0 {
            self.cancel_requested.store(true, Ordering::SeqCst);
            SignalAction::StopStarting
        } else if count == 1 {
            self.immediate_exit.store(true, Ordering::SeqCst);
            SignalAction::ImmediateExit
        } else {
            SignalAction::Ignore
        }
    }

    pub fn begin(&self, artifact: &str) {
        if let Ok(mut list) = self.in_flight.lock() {
            list.push(artifact.to_string());
        }
    }

    pub fn finish(&self, artifact: &str) {
        if let Ok(mut list) = self.in_flight.lock() {
            if let Some(pos) = list.iter().position(|a| a == artifact) {
                list.swap_remove(pos);
            }
        }
    }

    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

/// Installs process signal handlers bound to a [`SignalState`]
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SignalState::new()),
        }
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the handlers. Must be called once at program startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::StopStarting => {
                tracing::warn!("interrupt received, finishing in-flight artifacts");
            }
            SignalAction::ImmediateExit => {
                for artifact in state.in_flight() {
                    tracing::error!(%artifact, "interrupted mid-route, reroute on next run");
                }
                std::process::exit(EXIT_CANCELLED);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SignalState::new();
        assert!(!state.is_cancel_requested());
        assert!(!state.is_immediate_exit());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_signal_sequence() {
        let state = SignalState::new();

        assert_eq!(state.handle_signal(), SignalAction::StopStarting);
        assert!(state.is_cancel_requested());
        assert!(!state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::ImmediateExit);
        assert!(state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }

    #[test]
    fn test_cancel_without_signal() {
        let state = SignalState::new();
        state.cancel();
        assert!(state.is_cancel_requested());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_in_flight_tracking() {
        let state = SignalState::new();
        state.begin("a_1_all");
        state.begin("b_1_all");
        state.finish("a_1_all");
        assert_eq!(state.in_flight(), vec!["b_1_all".to_string()]);
        state.finish("b_1_all");
        assert!(state.in_flight().is_empty());
    }
}
