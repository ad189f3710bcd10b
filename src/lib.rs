//! `ubtune` tunes the two intermediate waypoints of a UAV mission so as to minimize
//! the energy consumption measured by running the agent simulation.
//!
//! This crate is a facade re-exporting:
//! * [`eval`]: evaluation of a candidate by running the external agent,
//! * [`opt`]: the fixed-budget Bayesian optimization driver,
//!
//! and provides [`RunConfig`] gathering both configurations, as loaded by the
//! `ubtune` binary from a JSON file.
//!
//! ```no_run
//! use ubtune::{RunConfig, eval::Evaluator, opt::Tuner};
//!
//! let config = RunConfig::from_file("ubtune.json").expect("configuration loaded");
//! let evaluator = Evaluator::new(config.eval).expect("evaluator configured");
//! let res = Tuner::new(config.tuner)
//!     .expect("tuner configured")
//!     .minimize(&evaluator)
//!     .expect("tuning done");
//! println!("{res}");
//! ```
//!
//! A configuration file only lists values differing from defaults, for instance:
//!
//! ```json
//! {
//!   "eval": { "agent_dir": "/opt/ub-anc/build-agent", "wait_time_ms": 5000 },
//!   "tuner": { "budget": 40, "seed": 0, "outdir": "./history" }
//! }
//! ```
#![warn(missing_docs)]

pub use ubtune_eval as eval;
pub use ubtune_opt as opt;

use serde::{Deserialize, Serialize};
use std::path::Path;
use ubtune_eval::EvalConfig;
use ubtune_opt::{Result, TunerConfig};

/// Configuration of a whole tuning run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Agent evaluation settings
    pub eval: EvalConfig,
    /// Optimization settings
    pub tuner: TunerConfig,
}

impl RunConfig {
    /// Loads a JSON configuration file, missing values being defaulted
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
