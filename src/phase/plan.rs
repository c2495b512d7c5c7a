//! The validated, immutable phase plan for one intersection.
//!
//! Construction enforces every table invariant up front; the rest of the
//! agent can then look phases up without re-checking consistency.

use indexmap::IndexMap;

use crate::config::schema::IntersectionConfig;
use crate::error::PhaseError;

use super::{PhaseId, PhaseKind};

/// Immutable phase tables: ordered green sequence, green-to-yellow
/// transition table, and per-phase lamp commands.
///
/// Invariants established at construction:
/// - the green sequence is non-empty and duplicate-free
/// - the initial phase is green
/// - every green phase maps to exactly one yellow interphase
/// - no transition table key is a yellow phase, and no mapping lands on
///   a green phase
/// - every phase in either table has a lamp command, and all lamp
///   commands have the same lane count
#[derive(Debug, Clone)]
pub struct PhasePlan {
    initial: PhaseId,
    greens: Vec<PhaseId>,
    yellow_of: IndexMap<PhaseId, PhaseId>,
    lamps: IndexMap<PhaseId, String>,
    lamp_len: usize,
}

impl PhasePlan {
    /// Builds a plan from raw tables, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`PhaseError`] describing the first inconsistency found.
    pub fn new(
        initial: PhaseId,
        greens: Vec<PhaseId>,
        yellow_of: IndexMap<PhaseId, PhaseId>,
        lamps: IndexMap<PhaseId, String>,
    ) -> Result<Self, PhaseError> {
        if greens.is_empty() {
            return Err(PhaseError::EmptyGreens);
        }
        for (i, green) in greens.iter().enumerate() {
            if greens[..i].contains(green) {
                return Err(PhaseError::DuplicateGreen(*green));
            }
        }
        if !greens.contains(&initial) {
            return Err(PhaseError::InitialNotGreen(initial));
        }

        for green in &greens {
            let yellow = yellow_of
                .get(green)
                .ok_or(PhaseError::MissingYellow(*green))?;
            if greens.contains(yellow) {
                return Err(PhaseError::YellowTargetIsGreen {
                    green: *green,
                    target: *yellow,
                });
            }
        }
        for key in yellow_of.keys() {
            if !greens.contains(key) {
                return Err(PhaseError::NonGreenTransitionKey(*key));
            }
        }

        let lamp_len = lamps
            .values()
            .next()
            .map_or(0, String::len);
        for green in &greens {
            if !lamps.contains_key(green) {
                return Err(PhaseError::MissingLamp(*green));
            }
        }
        for yellow in yellow_of.values() {
            if !lamps.contains_key(yellow) {
                return Err(PhaseError::MissingLamp(*yellow));
            }
        }
        for (phase, lamp) in &lamps {
            if lamp.len() != lamp_len {
                return Err(PhaseError::LampLengthMismatch {
                    phase: *phase,
                    got: lamp.len(),
                    expected: lamp_len,
                });
            }
        }

        Ok(Self {
            initial,
            greens,
            yellow_of,
            lamps,
            lamp_len,
        })
    }

    /// Builds a plan from the intersection section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`PhaseError`] if the configured tables are inconsistent.
    pub fn from_config(config: &IntersectionConfig) -> Result<Self, PhaseError> {
        Self::new(
            config.initial_phase,
            config.green_sequence.clone(),
            config.yellow_of.clone(),
            config.lamps.clone(),
        )
    }

    /// The configured initial (green) phase.
    #[must_use]
    pub const fn initial_phase(&self) -> PhaseId {
        self.initial
    }

    /// The ordered green-phase sequence.
    #[must_use]
    pub fn greens(&self) -> &[PhaseId] {
        &self.greens
    }

    /// Number of green phases.
    #[must_use]
    pub fn green_count(&self) -> usize {
        self.greens.len()
    }

    /// Whether `phase` is a green phase.
    #[must_use]
    pub fn is_green(&self, phase: PhaseId) -> bool {
        self.greens.contains(&phase)
    }

    /// Position of `phase` within the green sequence, if it is green.
    #[must_use]
    pub fn green_index(&self, phase: PhaseId) -> Option<usize> {
        self.greens.iter().position(|g| *g == phase)
    }

    /// Classifies a phase, or `None` for an id outside the plan.
    #[must_use]
    pub fn kind_of(&self, phase: PhaseId) -> Option<PhaseKind> {
        if self.is_green(phase) {
            Some(PhaseKind::Green)
        } else if self.lamps.contains_key(&phase) {
            Some(PhaseKind::Yellow)
        } else {
            None
        }
    }

    /// The yellow interphase entered when leaving `green`.
    #[must_use]
    pub fn yellow_of(&self, green: PhaseId) -> Option<PhaseId> {
        self.yellow_of.get(&green).copied()
    }

    /// The lamp command string for `phase`.
    #[must_use]
    pub fn lamp(&self, phase: PhaseId) -> Option<&str> {
        self.lamps.get(&phase).map(String::as_str)
    }

    /// Lane count shared by every lamp command.
    #[must_use]
    pub const fn lamp_len(&self) -> usize {
        self.lamp_len
    }
}
