//! Phase domain: identifiers, the validated phase plan, timing, and the
//! transition state machine.

pub mod machine;
pub mod plan;
pub mod state;
pub mod timer;

pub use machine::{PhaseStateMachine, RejectReason, TransitionOutcome};
pub use plan::PhasePlan;
pub use state::ControllerState;
pub use timer::PhaseTimer;

use serde::{Deserialize, Serialize};

/// Identifier for one discrete signal phase.
///
/// A phase is one combination of lamp colors across all lanes. Whether an
/// id names a green phase or a yellow interphase is decided by the
/// [`PhasePlan`], not by the id itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseId(pub u8);

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PhaseId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Whether a phase is an active right-of-way state or a transient interphase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    /// Eligible as a decision target.
    Green,
    /// Mandatory transient state entered when leaving a green phase;
    /// never a decision target.
    Yellow,
}
