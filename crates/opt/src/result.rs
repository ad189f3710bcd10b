use crate::history::SearchHistory;
use std::fmt;
use ubtune_eval::{is_failure, Candidate};

/// Outcome of a tuning run
#[derive(Clone, Debug, PartialEq)]
pub struct TuneResult {
    /// Best waypoint positions, earliest evaluated in case of ties
    pub x_opt: Candidate,
    /// Energy at `x_opt`, the failure sentinel when every evaluation failed
    pub y_opt: f64,
    /// Every evaluation of the run, in order
    pub history: SearchHistory,
    /// Number of failed evaluations
    pub n_failures: usize,
}

impl TuneResult {
    /// Result summarizing the given history, `None` when it is empty
    pub fn from_history(history: SearchHistory) -> Option<Self> {
        let best = *history.best()?;
        let n_failures = history.n_failures();
        Some(TuneResult {
            x_opt: best.candidate,
            y_opt: best.fitness,
            history,
            n_failures,
        })
    }

    /// True if at least one evaluation succeeded
    pub fn is_feasible(&self) -> bool {
        !is_failure(self.y_opt)
    }

    /// Number of evaluations performed
    pub fn n_evals(&self) -> usize {
        self.history.len()
    }
}

impl fmt::Display for TuneResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_feasible() {
            writeln!(f, "Best waypoint positions: {}", self.x_opt)?;
            write!(f, "Minimum energy consumption: {} kWh", self.y_opt)
        } else {
            write!(
                f,
                "No successful evaluation: all {} agent runs failed, no energy minimum found",
                self.n_evals()
            )
        }
    }
}
