//! Adaptation of a candidate evaluator to the rows of design matrices
//! handled by the surrogate-based optimizer.
use ndarray::ArrayView1;
use std::cell::Cell;
use std::time::Duration;
use ubtune_eval::{Candidate, EvalRecord, Evaluate, FailureCause, FAILURE_FITNESS};

/// Objective function `[w1, w2] -> energy` backed by an evaluator.
/// It counts evaluator calls.
pub struct Objective<'a, E: Evaluate> {
    evaluator: &'a E,
    n_evals: Cell<usize>,
}

impl<'a, E: Evaluate> Objective<'a, E> {
    /// Wraps the given evaluator
    pub fn new(evaluator: &'a E) -> Self {
        Objective {
            evaluator,
            n_evals: Cell::new(0),
        }
    }

    /// Number of evaluator calls so far
    pub fn n_evals(&self) -> usize {
        self.n_evals.get()
    }

    /// Evaluates one point given as `[w1, w2]`.
    /// A point without two coordinates is a failure and is not forwarded.
    pub fn eval_record(&self, x: &ArrayView1<f64>) -> EvalRecord {
        let coords = x.to_vec();
        match Candidate::from_slice(&coords) {
            Some(candidate) => {
                self.n_evals.set(self.n_evals.get() + 1);
                self.evaluator.evaluate_record(candidate)
            }
            None => EvalRecord {
                candidate: Candidate::new(
                    coords.first().copied().unwrap_or(f64::NAN),
                    f64::NAN,
                ),
                fitness: FAILURE_FITNESS,
                cause: Some(FailureCause::OutOfRange),
                elapsed: Duration::ZERO,
            },
        }
    }
}
