//! Sequential surrogate-based tuning of the waypoint positions.
//!
//! The run goes as follows:
//! * a seeded Latin hypercube design of `min(n_initial, budget)` points is evaluated,
//! * until the budget is exhausted, the egobox optimizer used as an ask-and-tell service
//!   suggests the next candidate given the whole history (failed evaluations being
//!   replaced by a finite penalty), the candidate is evaluated and appended to the history,
//! * the best observation is reported.
//!
//! The evaluator is called exactly `budget` times. When no evaluation succeeded yet or when
//! the surrogate cannot propose anything, the next candidate is drawn uniformly at random
//! from a generator seeded from the configured seed so that runs stay reproducible.
//!
//! ```no_run
//! # use ubtune_eval::Candidate;
//! # use ubtune_opt::{Tuner, TunerConfig};
//! let stub = |c: Candidate| (c.waypoint1 - 0.3).powi(2) + (c.waypoint2 - 0.7).powi(2);
//! let res = Tuner::new(TunerConfig::default().budget(20).seed(42))
//!     .expect("tuner configured")
//!     .minimize(&stub)
//!     .expect("tuning done");
//! println!("{res}");
//! ```
use crate::config::TunerConfig;
use crate::errors::{Result, TuneError};
use crate::history::{Observation, SearchHistory};
use crate::objective::Objective;
use crate::persistence::{save_config, save_history};
use crate::result::TuneResult;
use crate::space::SearchSpace;
use egobox_doe::{Lhs, LhsKind, SamplingMethod};
use egobox_ego::EgorServiceBuilder;
use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use std::panic::{self, AssertUnwindSafe};
use ubtune_eval::{Candidate, Evaluate};

/// Waypoint tuner minimizing the energy returned by an evaluator
#[derive(Clone, Debug)]
pub struct Tuner {
    config: TunerConfig,
}

impl Tuner {
    /// Tuner with the given (validated) configuration
    pub fn new(config: TunerConfig) -> Result<Self> {
        Ok(Tuner {
            config: config.check()?,
        })
    }

    /// The tuner configuration
    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Runs the tuning loop against the given evaluator
    pub fn minimize<E: Evaluate>(&self, evaluator: &E) -> Result<TuneResult> {
        let config = &self.config;
        let space = config.get_space();
        let budget = config.get_budget();
        let seed = config.get_seed();

        if let Some(outdir) = config.get_outdir() {
            save_config(outdir, config)?;
        }

        let xlimits = space.xlimits();
        let objective = Objective::new(evaluator);
        let mut history = SearchHistory::new();

        let n_initial = config.get_n_initial().min(budget);
        info!("Evaluate initial design of {n_initial} points (budget={budget}, seed={seed})");
        if n_initial > 0 {
            let doe = Lhs::new(&xlimits)
                .kind(LhsKind::Optimized)
                .with_rng(Xoshiro256Plus::seed_from_u64(seed))
                .sample(n_initial);
            for x in doe.rows() {
                observe(&objective, space, &mut history, &x);
            }
        }

        let egor = EgorServiceBuilder::optimize()
            .configure(|conf| conf.infill_strategy(config.get_infill().strategy()).seed(seed))
            .min_within(&xlimits);
        let mut rng = Xoshiro256Plus::seed_from_u64(seed.wrapping_add(1));

        for iter in n_initial..budget {
            let penalty = config
                .get_failure_penalty()
                .or_else(|| history.derived_failure_penalty());
            let suggested = penalty.and_then(|penalty| {
                let x_data = history.x_data();
                let y_data = history.y_data(penalty);
                match panic::catch_unwind(AssertUnwindSafe(|| egor.suggest(&x_data, &y_data))) {
                    Ok(x) => first_finite_row(&x),
                    Err(_) => {
                        warn!("Surrogate suggestion failed at iteration {}", iter + 1);
                        None
                    }
                }
            });
            let x = match suggested {
                Some(x) => x,
                None => {
                    debug!("Draw random candidate at iteration {}", iter + 1);
                    random_point(space, &mut rng)
                }
            };
            observe(&objective, space, &mut history, &x.view());
            if let Some(best) = history.best() {
                info!(
                    "Iteration {}/{budget}: best energy so far {} at {}",
                    iter + 1,
                    best.fitness,
                    best.candidate
                );
            }
        }
        debug_assert_eq!(budget, objective.n_evals());

        if let Some(outdir) = config.get_outdir() {
            save_history(outdir, &history)?;
        }

        let res = TuneResult::from_history(history).ok_or_else(|| {
            TuneError::InvalidConfigError("no evaluation performed".to_string())
        })?;
        if res.is_feasible() {
            info!(
                "Tuning done: {} evaluations ({} failed), best energy {} at {}",
                res.n_evals(),
                res.n_failures,
                res.y_opt,
                res.x_opt
            );
        } else {
            warn!("Tuning done: all {} evaluations failed", res.n_evals());
        }
        Ok(res)
    }
}

/// Minimizes the energy over the given space with default settings
/// apart from the evaluation budget and the seed
pub fn optimize<E: Evaluate>(
    space: SearchSpace,
    evaluator: &E,
    budget: usize,
    seed: u64,
) -> Result<TuneResult> {
    let config = TunerConfig::default()
        .space(space)
        .budget(budget)
        .seed(seed);
    Tuner::new(config)?.minimize(evaluator)
}

/// Evaluates the point projected onto the space and records it
fn observe<E: Evaluate>(
    objective: &Objective<E>,
    space: &SearchSpace,
    history: &mut SearchHistory,
    x: &ArrayView1<f64>,
) {
    let candidate = space.clip(&Candidate::new(x[0], x[1]));
    let x = Array1::from(candidate.to_array().to_vec());
    let record = objective.eval_record(&x.view());
    debug!(
        "Evaluation #{}: {} -> {}",
        history.len() + 1,
        record.candidate,
        record.fitness
    );
    history.push(Observation::from(record));
}

fn first_finite_row(x: &Array2<f64>) -> Option<Array1<f64>> {
    x.rows()
        .into_iter()
        .find(|row| row.len() >= 2 && row.iter().all(|v| v.is_finite()))
        .map(|row| row.to_owned())
}

/// Uniform random point within the space bounds
fn random_point(space: &SearchSpace, rng: &mut Xoshiro256Plus) -> Array1<f64> {
    let u = Array1::random_using(2, Uniform::new(0., 1.), rng);
    let [b1, b2] = space.bounds;
    Array1::from(vec![
        b1[0] + u[0] * (b1[1] - b1[0]),
        b2[0] + u[1] * (b2[1] - b2[0]),
    ])
}
