//! Phase state and the complete-once guard shared by the chime and speech phases.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

/// Where a phase currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhaseState {
    Idle,
    AttemptPrimary,
    AttemptFallback,
    Done,
}

struct Inner<O> {
    state: PhaseState,
    outcome: Option<O>,
}

/// Records the first outcome of a phase; everything after it is ignored.
///
/// Attempts, fallbacks and timers all report through the same guard, so a
/// late event (a timer firing after the phase already finished) cannot resolve
/// the phase a second time.
pub struct PhaseGuard<O> {
    phase: &'static str,
    inner: Mutex<Inner<O>>,
}

impl<O: Copy + Debug> PhaseGuard<O> {
    pub fn new(phase: &'static str) -> Self {
        Self {
            phase,
            inner: Mutex::new(Inner {
                state: PhaseState::Idle,
                outcome: None,
            }),
        }
    }

    pub fn state(&self) -> PhaseState {
        self.lock().state
    }

    /// Move forward to `next`. Backward moves and moves after completion are ignored.
    pub fn advance(&self, next: PhaseState) -> bool {
        let mut inner = self.lock();
        if next <= inner.state || inner.outcome.is_some() {
            return false;
        }
        tracing::trace!(phase = self.phase, from = ?inner.state, to = ?next, "phase transition");
        inner.state = next;
        true
    }

    /// Record the outcome. Returns `false` (and changes nothing) if one was already recorded.
    pub fn complete(&self, outcome: O) -> bool {
        let mut inner = self.lock();
        if let Some(existing) = inner.outcome {
            tracing::trace!(
                phase = self.phase,
                ?existing,
                ignored = ?outcome,
                "phase already complete"
            );
            return false;
        }
        inner.outcome = Some(outcome);
        inner.state = PhaseState::Done;
        true
    }

    pub fn outcome(&self) -> Option<O> {
        self.lock().outcome
    }

    pub fn is_complete(&self) -> bool {
        self.lock().outcome.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<O>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
