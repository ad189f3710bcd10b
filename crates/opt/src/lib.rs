//! This library tunes the positions of the two intermediate waypoints of a UAV
//! mission so as to minimize the energy consumption reported by the agent
//! simulation, within a fixed budget of (expensive) evaluations.
//!
//! The optimization is a sequential Bayesian optimization: after a space-filling
//! initial design, a Gaussian process surrogate of the energy is fitted on every
//! observation and an acquisition criterion (Expected Improvement by default)
//! selects the next candidate. The surrogate and the infill criterion optimization
//! are provided by [egobox](https://docs.rs/egobox-ego) used as an ask-and-tell service.
//!
//! Evaluations never stop the run: failed ones come back as the `+inf` failure
//! sentinel, stay as such in the [`SearchHistory`] and are replaced by a finite
//! penalty worse than any success when fitting the surrogate.
//!
//! # Example
//!
//! ```no_run
//! use ubtune_opt::{Tuner, TunerConfig, SearchSpace};
//! use ubtune_eval::{EvalConfig, Evaluator};
//!
//! let evaluator = Evaluator::new(EvalConfig::default()).expect("evaluator configured");
//! let res = Tuner::new(
//!     TunerConfig::default()
//!         .space(SearchSpace::default())
//!         .budget(30)
//!         .n_initial(10)
//!         .seed(42)
//!         .outdir("./results"),
//! )
//! .expect("tuner configured")
//! .minimize(&evaluator)
//! .expect("tuning done");
//! println!("{res}");
//! ```
//!
//! Results are saved in the output directory when one is set: the configuration
//! as `ubtune_config.json` and the evaluation history as `ubtune_history.npy`
//! (rows `[waypoint1, waypoint2, fitness]`).
//!
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod config;
mod errors;
mod history;
mod objective;
mod persistence;
mod result;
mod space;
mod tuner;

pub use config::*;
pub use errors::*;
pub use history::*;
pub use objective::*;
pub use persistence::*;
pub use result::*;
pub use space::*;
pub use tuner::*;

pub use ubtune_eval::{Candidate, Evaluate, FailureCause, FAILURE_FITNESS, UBTUNE_LOG};
