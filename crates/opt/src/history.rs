use ndarray::{Array2, Axis};
use ubtune_eval::{is_failure, Candidate, EvalRecord, FailureCause};

/// An evaluated candidate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    /// The evaluated candidate
    pub candidate: Candidate,
    /// Energy consumption or failure sentinel
    pub fitness: f64,
    /// Why the evaluation failed, if so
    pub cause: Option<FailureCause>,
}

impl Observation {
    /// True if the evaluation failed
    pub fn is_failure(&self) -> bool {
        is_failure(self.fitness)
    }
}

impl From<EvalRecord> for Observation {
    fn from(record: EvalRecord) -> Self {
        Observation {
            candidate: record.candidate,
            fitness: record.fitness,
            cause: record.cause,
        }
    }
}

/// Ordered sequence of observations, in evaluation order.
/// Observations are only appended, never modified.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchHistory {
    observations: Vec<Observation>,
}

impl SearchHistory {
    /// Empty history
    pub fn new() -> Self {
        SearchHistory::default()
    }

    /// Appends an observation
    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation)
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True if nothing was evaluated yet
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations in evaluation order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of failed evaluations
    pub fn n_failures(&self) -> usize {
        self.observations.iter().filter(|o| o.is_failure()).count()
    }

    /// Index of the observation with the lowest fitness,
    /// the earliest one in case of ties.
    pub fn best_index(&self) -> Option<usize> {
        self.observations
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, o)| match best {
                Some((_, fbest)) if fbest <= o.fitness || o.fitness.is_nan() => best,
                _ => Some((i, o.fitness)),
            })
            .map(|(i, _)| i)
    }

    /// Observation with the lowest fitness, the earliest one in case of ties
    pub fn best(&self) -> Option<&Observation> {
        self.best_index().map(|i| &self.observations[i])
    }

    /// Lowest and highest successful fitness values
    pub fn fitness_range(&self) -> Option<(f64, f64)> {
        self.observations
            .iter()
            .filter(|o| !o.is_failure())
            .fold(None, |range, o| match range {
                None => Some((o.fitness, o.fitness)),
                Some((lo, up)) => Some((lo.min(o.fitness), up.max(o.fitness))),
            })
    }

    /// Finite value standing for failures in the surrogate training data:
    /// worse than any success by at least the spread of successes (or 1).
    /// `None` when no evaluation succeeded.
    pub fn derived_failure_penalty(&self) -> Option<f64> {
        self.fitness_range()
            .map(|(best, worst)| worst + (worst - best).max(1.))
    }

    /// Evaluated points as a (n, 2) matrix
    pub fn x_data(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.len(), 2));
        for (mut row, o) in x.axis_iter_mut(Axis(0)).zip(self.observations.iter()) {
            row[0] = o.candidate.waypoint1;
            row[1] = o.candidate.waypoint2;
        }
        x
    }

    /// Fitness values as a (n, 1) matrix where failures are replaced by `penalty`
    pub fn y_data(&self, penalty: f64) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), 1), |(i, _)| {
            let o = &self.observations[i];
            if o.is_failure() {
                penalty
            } else {
                o.fitness
            }
        })
    }

    /// History as a (n, 3) matrix of rows \[waypoint1, waypoint2, fitness\],
    /// failures being kept as `inf`
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), 3), |(i, j)| {
            let o = &self.observations[i];
            match j {
                0 => o.candidate.waypoint1,
                1 => o.candidate.waypoint2,
                _ => o.fitness,
            }
        })
    }
}
