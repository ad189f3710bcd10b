//! This library turns one run of the external UAV agent simulation into a
//! well-defined objective value usable by a black-box optimizer.
//!
//! The agent is an opaque program launched with two waypoint coordinates.
//! Upon completion it (eventually) writes a mission log containing a line like
//! `Total energy consumption: 42.5 kWh`. The [`Evaluator`] launches the agent,
//! waits for the log to show up, extracts the energy value and returns it.
//!
//! The evaluation is *total*: whatever goes wrong (launch failure, non-zero exit,
//! missing log, unexpected content, I/O error), [`Evaluate::evaluate`] returns a
//! number, either a finite non-negative energy or the [`FAILURE_FITNESS`] sentinel
//! (`+inf`). The cause of a failure is not lost: it is logged and reported as a
//! [`FailureCause`] tag by [`Evaluate::evaluate_record`].
//!
//! # Example
//!
//! ```no_run
//! use ubtune_eval::{Candidate, EvalConfig, Evaluate, Evaluator};
//!
//! let config = EvalConfig::default()
//!     .agent_dir("/opt/ub-anc/build-agent")
//!     .artifact("/opt/ub-anc/mission_log.txt")
//!     .wait_time_ms(500)
//!     .max_retries(10);
//! let evaluator = Evaluator::new(config).expect("evaluator configured");
//! let energy = evaluator.evaluate(Candidate::new(0.3, 0.7));
//! println!("energy = {energy}");
//! ```
//!
//! # Testing with stubs
//!
//! The launcher, the artifact and the way the evaluator waits are traits
//! ([`AgentLauncher`], [`ArtifactSource`], [`Sleeper`]) so that the evaluation
//! protocol can be exercised without the real simulation. Any closure
//! `Fn(Candidate) -> f64` is also an [`Evaluate`] implementation.
//!
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod agent;
mod artifact;
mod config;
mod energy;
mod errors;
mod evaluator;
mod types;

pub use agent::*;
pub use artifact::*;
pub use config::*;
pub use energy::*;
pub use errors::*;
pub use evaluator::*;
pub use types::*;

/// Environment variable used to set the log level of ubtune binaries
pub const UBTUNE_LOG: &str = "UBTUNE_LOG";
