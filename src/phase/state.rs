//! Shared controller state: current phase and phase timing.

use std::sync::atomic::{AtomicU8, Ordering};

use super::{PhaseId, PhaseTimer};

/// The only mutable shared state in the agent.
///
/// The current phase is an atomic so detector loops can snapshot it
/// without contending with an in-flight transition, which holds the state
/// machine's critical section for the full yellow interphase. Mutation
/// happens exclusively inside that critical section.
#[derive(Debug)]
pub struct ControllerState {
    current_phase: AtomicU8,
    timer: PhaseTimer,
}

impl ControllerState {
    /// Creates the state positioned at the initial phase, timer running.
    #[must_use]
    pub fn new(initial: PhaseId) -> Self {
        Self {
            current_phase: AtomicU8::new(initial.0),
            timer: PhaseTimer::new(),
        }
    }

    /// The phase currently recorded as active.
    #[must_use]
    pub fn current_phase(&self) -> PhaseId {
        PhaseId(self.current_phase.load(Ordering::SeqCst))
    }

    /// Records a new current phase. Does not touch the timer: green dwell
    /// and yellow interphase duration are tracked independently.
    pub(crate) fn set_phase(&self, phase: PhaseId) {
        self.current_phase.store(phase.0, Ordering::SeqCst);
    }

    /// Whole seconds the timer has been running since its last restart.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.timer.elapsed_secs()
    }

    /// Restarts the dwell timer, marking the start of a new green phase.
    pub(crate) fn restart_timer(&self) {
        self.timer.restart();
    }
}
