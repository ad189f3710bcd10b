use crate::errors::{Result, TuneError};
use ndarray::{array, Array2};
use serde::{Deserialize, Serialize};
use ubtune_eval::Candidate;

/// Names of the two searched parameters
pub const PARAMETER_NAMES: [&str; 2] = ["waypoint1", "waypoint2"];

/// The search space: two independent real parameters,
/// each one bounded by \[lower, upper\] within \[0, 1\].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// `[lower, upper]` bounds of waypoint1 and waypoint2
    pub bounds: [[f64; 2]; 2],
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace {
            bounds: [[0., 1.], [0., 1.]],
        }
    }
}

impl SearchSpace {
    /// Constructor given bounds of both waypoints
    pub fn new(waypoint1: [f64; 2], waypoint2: [f64; 2]) -> Self {
        SearchSpace {
            bounds: [waypoint1, waypoint2],
        }
    }

    /// Bounds as a (2, 2) matrix \[\[lower, upper\], ...\] as expected by egobox
    pub fn xlimits(&self) -> Array2<f64> {
        let [b1, b2] = self.bounds;
        array![[b1[0], b1[1]], [b2[0], b2[1]]]
    }

    /// Whether the candidate lies within the space
    pub fn contains(&self, candidate: &Candidate) -> bool {
        candidate
            .to_array()
            .iter()
            .zip(self.bounds.iter())
            .all(|(x, [lo, up])| (*lo..=*up).contains(x))
    }

    /// Candidate projected onto the space
    pub fn clip(&self, candidate: &Candidate) -> Candidate {
        let [b1, b2] = self.bounds;
        Candidate::new(
            candidate.waypoint1.clamp(b1[0], b1[1]),
            candidate.waypoint2.clamp(b2[0], b2[1]),
        )
    }

    /// Validates bounds: ordered, finite and within \[0, 1\]
    pub fn check(&self) -> Result<()> {
        for (name, [lo, up]) in PARAMETER_NAMES.iter().zip(self.bounds.iter()) {
            if !(lo.is_finite() && up.is_finite()) || lo >= up {
                return Err(TuneError::InvalidConfigError(format!(
                    "{name} bounds [{lo}, {up}] should be finite with lower < upper"
                )));
            }
            if *lo < 0. || *up > 1. {
                return Err(TuneError::InvalidConfigError(format!(
                    "{name} bounds [{lo}, {up}] should lie within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}
