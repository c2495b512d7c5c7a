//! The phase state machine and its transition protocol.
//!
//! `request_transition` runs the entire read-decide-send-wait-send-update
//! sequence under one async critical section held across the yellow wait,
//! so concurrent detector connections can never double-fire an interphase
//! or race the minimum-green timer. Callers that arrive mid-transition
//! block on the lock and then reevaluate against the now-current phase.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::schema::{SendFailurePolicy, TimingConfig};
use crate::controller::CommandChannel;
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

use super::plan::PhasePlan;
use super::state::ControllerState;
use super::PhaseId;

/// Why a transition request was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The machine is mid-interphase or on an unknown phase.
    CurrentNotGreen {
        /// Phase recorded as current when the request was evaluated.
        current: PhaseId,
    },
    /// The requested target is not a green phase.
    TargetNotGreen {
        /// The offending target.
        target: PhaseId,
    },
    /// The target equals the current phase; holding is not a transition.
    SamePhase {
        /// The phase being held.
        current: PhaseId,
    },
    /// The current green has not met its minimum dwell time.
    MinGreenUnmet {
        /// Seconds the current green has been held.
        elapsed_secs: u64,
        /// Configured minimum green seconds.
        required_secs: u64,
    },
    /// The yellow command could not be delivered and the send-failure
    /// policy is `hold`.
    CommandFailed {
        /// The interphase whose command failed.
        phase: PhaseId,
    },
    /// The transition table has no interphase for the current green.
    NoInterphase {
        /// The green phase being left.
        current: PhaseId,
    },
}

impl RejectReason {
    /// Stable label for metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::CurrentNotGreen { .. } => "current_not_green",
            Self::TargetNotGreen { .. } => "target_not_green",
            Self::SamePhase { .. } => "same_phase",
            Self::MinGreenUnmet { .. } => "min_green_unmet",
            Self::CommandFailed { .. } => "command_failed",
            Self::NoInterphase { .. } => "no_interphase",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurrentNotGreen { current } => {
                write!(f, "current phase {current} is not green")
            }
            Self::TargetNotGreen { target } => {
                write!(f, "target phase {target} is not green")
            }
            Self::SamePhase { current } => write!(f, "already on phase {current}"),
            Self::MinGreenUnmet {
                elapsed_secs,
                required_secs,
            } => write!(
                f,
                "minimum green unmet ({elapsed_secs}/{required_secs}s)"
            ),
            Self::CommandFailed { phase } => {
                write!(f, "interphase command for phase {phase} failed")
            }
            Self::NoInterphase { current } => {
                write!(f, "no interphase mapping for green phase {current}")
            }
        }
    }
}

/// Result of a transition request.
///
/// Rejections are ordinary outcomes, never errors; nothing propagates
/// past the machine as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The full yellow-then-green sequence ran to completion.
    Completed {
        /// Green phase that was left.
        from: PhaseId,
        /// Interphase that was interposed.
        via: PhaseId,
        /// Green phase now active.
        to: PhaseId,
    },
    /// The request was a logged no-op.
    Rejected(RejectReason),
}

/// Lock-free snapshot of the machine while it sits on a green phase.
#[derive(Debug, Clone, Copy)]
pub struct GreenSnapshot {
    /// The active green phase.
    pub phase: PhaseId,
    /// Its position in the green sequence (one-hot index).
    pub green_index: usize,
    /// Whole seconds the green has been held.
    pub elapsed_secs: u64,
    /// Whether the dwell has exceeded the minimum green time.
    pub min_green_satisfied: bool,
}

/// Owns the controller state and sequences every phase change through the
/// mandatory yellow interphase.
pub struct PhaseStateMachine {
    plan: Arc<PhasePlan>,
    state: ControllerState,
    channel: Arc<dyn CommandChannel>,
    events: Arc<EventEmitter>,
    min_green_secs: u64,
    yellow_duration: Duration,
    on_send_failure: SendFailurePolicy,
    /// Guards the entire transition sequence, including the yellow wait.
    transition_lock: Mutex<()>,
}

impl PhaseStateMachine {
    /// Creates a machine positioned at the plan's initial phase.
    #[must_use]
    pub fn new(
        plan: Arc<PhasePlan>,
        channel: Arc<dyn CommandChannel>,
        timing: &TimingConfig,
        on_send_failure: SendFailurePolicy,
        events: Arc<EventEmitter>,
    ) -> Self {
        let state = ControllerState::new(plan.initial_phase());
        metrics::set_current_phase(plan.initial_phase());
        Self {
            plan,
            state,
            channel,
            events,
            min_green_secs: timing.min_green_secs,
            yellow_duration: Duration::from_secs(timing.yellow_secs),
            on_send_failure,
            transition_lock: Mutex::new(()),
        }
    }

    /// The phase currently recorded as active.
    #[must_use]
    pub fn current_phase(&self) -> PhaseId {
        self.state.current_phase()
    }

    /// Whole seconds the current dwell timer has been running.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.state.elapsed_secs()
    }

    /// The phase plan this machine sequences.
    #[must_use]
    pub fn plan(&self) -> &Arc<PhasePlan> {
        &self.plan
    }

    /// Snapshots phase and dwell without touching the transition lock.
    ///
    /// Returns `None` while an interphase is active; interphases are never
    /// decision points.
    #[must_use]
    pub fn green_snapshot(&self) -> Option<GreenSnapshot> {
        let phase = self.state.current_phase();
        let green_index = self.plan.green_index(phase)?;
        let elapsed_secs = self.state.elapsed_secs();
        Some(GreenSnapshot {
            phase,
            green_index,
            elapsed_secs,
            min_green_satisfied: elapsed_secs > self.min_green_secs,
        })
    }

    /// Requests a change of the active green phase.
    ///
    /// The whole sequence runs under one critical section: evaluate the
    /// guards, command the interphase, dwell for the yellow duration,
    /// command the target green, restart the dwell timer. Later callers
    /// block until the in-flight transition completes and then reevaluate
    /// from the updated phase.
    pub async fn request_transition(&self, target: PhaseId) -> TransitionOutcome {
        let _guard = self.transition_lock.lock().await;

        let current = self.state.current_phase();
        if !self.plan.is_green(current) {
            return self.reject(RejectReason::CurrentNotGreen { current }, target);
        }
        if !self.plan.is_green(target) {
            return self.reject(RejectReason::TargetNotGreen { target }, target);
        }
        if target == current {
            return self.reject(RejectReason::SamePhase { current }, target);
        }

        let elapsed_secs = self.state.elapsed_secs();
        if elapsed_secs < self.min_green_secs {
            return self.reject(
                RejectReason::MinGreenUnmet {
                    elapsed_secs,
                    required_secs: self.min_green_secs,
                },
                target,
            );
        }

        let Some(yellow) = self.plan.yellow_of(current) else {
            return self.reject(RejectReason::NoInterphase { current }, target);
        };

        if let Err(e) = self.channel.send(yellow).await {
            warn!(phase = %yellow, error = %e, "interphase command send failed");
            metrics::record_command_failure("yellow");
            self.events.emit(&Event::CommandSendFailed {
                timestamp: Utc::now(),
                phase: yellow,
                error: e.to_string(),
            });
            if self.on_send_failure == SendFailurePolicy::Hold {
                return self.reject(RejectReason::CommandFailed { phase: yellow }, target);
            }
        }

        // Dwell timer intentionally keeps running: interphase duration is
        // tracked by the sleep below, not by the green dwell timer.
        self.state.set_phase(yellow);
        metrics::set_current_phase(yellow);
        info!(from = %current, via = %yellow, to = %target, "entering yellow interphase");

        tokio::time::sleep(self.yellow_duration).await;

        if let Err(e) = self.channel.send(target).await {
            // There is no safe rollback out of yellow; the logical phase
            // advances and the next health check reconciles.
            warn!(phase = %target, error = %e, "green command send failed");
            metrics::record_command_failure("green");
            self.events.emit(&Event::CommandSendFailed {
                timestamp: Utc::now(),
                phase: target,
                error: e.to_string(),
            });
        }

        self.state.set_phase(target);
        self.state.restart_timer();
        metrics::set_current_phase(target);
        metrics::record_phase_transition(current, target);
        self.events.emit(&Event::PhaseEntered {
            timestamp: Utc::now(),
            phase: target,
            from: current,
            via: yellow,
        });
        info!(from = %current, to = %target, "phase transition complete");

        TransitionOutcome::Completed {
            from: current,
            via: yellow,
            to: target,
        }
    }

    fn reject(&self, reason: RejectReason, target: PhaseId) -> TransitionOutcome {
        debug!(%target, %reason, "transition rejected");
        metrics::record_transition_rejected(reason.as_label());
        // Holding the current phase is the steady state, not an event.
        if !matches!(reason, RejectReason::SamePhase { .. }) {
            self.events.emit(&Event::TransitionRejected {
                timestamp: Utc::now(),
                target,
                reason: reason.to_string(),
            });
        }
        TransitionOutcome::Rejected(reason)
    }
}

impl std::fmt::Debug for PhaseStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseStateMachine")
            .field("current_phase", &self.state.current_phase())
            .field("min_green_secs", &self.min_green_secs)
            .field("yellow_duration", &self.yellow_duration)
            .finish_non_exhaustive()
    }
}
