use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fitness returned for any failed evaluation.
///
/// An optimizer minimizing energy always ranks it last, hence a failed
/// candidate is never reported as best unless every candidate failed.
pub const FAILURE_FITNESS: f64 = f64::INFINITY;

/// Returns true when the given fitness is the failure sentinel
/// (or anything else than a finite value).
pub fn is_failure(fitness: f64) -> bool {
    !fitness.is_finite()
}

/// A candidate mission: the positions of the two intermediate waypoints,
/// each one expressed as a coordinate within \[0, 1\].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of the first waypoint
    pub waypoint1: f64,
    /// Position of the second waypoint
    pub waypoint2: f64,
}

impl Candidate {
    /// Constructor
    pub fn new(waypoint1: f64, waypoint2: f64) -> Self {
        Candidate {
            waypoint1,
            waypoint2,
        }
    }

    /// Build a candidate from the first two components of `x`,
    /// returns `None` when `x` holds less than two values.
    pub fn from_slice(x: &[f64]) -> Option<Self> {
        match x {
            [w1, w2, ..] => Some(Candidate::new(*w1, *w2)),
            _ => None,
        }
    }

    /// Coordinates as an array `[waypoint1, waypoint2]`
    pub fn to_array(&self) -> [f64; 2] {
        [self.waypoint1, self.waypoint2]
    }

    /// True if both coordinates lie within \[0, 1\]
    pub fn is_in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.waypoint1) && (0.0..=1.0).contains(&self.waypoint2)
    }

    /// Candidate with both coordinates clamped to \[0, 1\]
    pub fn clamped(&self) -> Self {
        Candidate::new(self.waypoint1.clamp(0., 1.), self.waypoint2.clamp(0., 1.))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.waypoint1, self.waypoint2)
    }
}

impl From<[f64; 2]> for Candidate {
    fn from(x: [f64; 2]) -> Self {
        Candidate::new(x[0], x[1])
    }
}

/// Tag identifying why an evaluation failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCause {
    /// The agent could not be started
    Launch,
    /// The agent terminated with an error status
    AgentExit,
    /// The agent succeeded but the run artifact never showed up
    ArtifactTimeout,
    /// The run artifact exists but could not be read
    ArtifactRead,
    /// The run artifact does not contain the energy consumption line
    PatternNotFound,
    /// The energy value could not be parsed as a finite non-negative number
    InvalidValue,
    /// The candidate is outside the unit square and was rejected
    OutOfRange,
    /// Failure reported by a stub evaluator not giving any detail
    Unclassified,
}

impl FailureCause {
    /// Short stable name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCause::Launch => "launch",
            FailureCause::AgentExit => "agent_exit",
            FailureCause::ArtifactTimeout => "artifact_timeout",
            FailureCause::ArtifactRead => "artifact_read",
            FailureCause::PatternNotFound => "pattern_not_found",
            FailureCause::InvalidValue => "invalid_value",
            FailureCause::OutOfRange => "out_of_range",
            FailureCause::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one evaluation: the value handed to the optimizer
/// plus what is needed to tell a genuine result from a broken measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalRecord {
    /// The candidate actually evaluated (after range policy)
    pub candidate: Candidate,
    /// Energy consumption or [`FAILURE_FITNESS`]
    pub fitness: f64,
    /// Failure tag, `None` when the evaluation succeeded
    pub cause: Option<FailureCause>,
    /// Wall-clock time spent evaluating
    pub elapsed: Duration,
}

impl EvalRecord {
    /// True when the evaluation produced an energy value
    pub fn is_success(&self) -> bool {
        self.cause.is_none()
    }
}
