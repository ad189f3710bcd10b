//! Tuner configuration
use crate::errors::{Result, TuneError};
use crate::space::SearchSpace;
use egobox_ego::InfillStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default total number of agent evaluations
pub const DEFAULT_BUDGET: usize = 30;
/// Default number of initial space-filling points
pub const DEFAULT_N_INITIAL: usize = 10;
/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Acquisition criterion used to select the next candidate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Infill {
    /// Expected Improvement
    #[default]
    EI,
    /// Log of Expected Improvement
    LogEI,
    /// Locating the regional extreme
    WB2,
    /// Scaled WB2
    WB2S,
}

impl Infill {
    /// Corresponding egobox infill strategy
    pub fn strategy(&self) -> InfillStrategy {
        match self {
            Infill::EI => InfillStrategy::EI,
            Infill::LogEI => InfillStrategy::LogEI,
            Infill::WB2 => InfillStrategy::WB2,
            Infill::WB2S => InfillStrategy::WB2S,
        }
    }
}

impl FromStr for Infill {
    type Err = TuneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ei" => Ok(Infill::EI),
            "logei" => Ok(Infill::LogEI),
            "wb2" => Ok(Infill::WB2),
            "wb2s" => Ok(Infill::WB2S),
            _ => Err(TuneError::InvalidConfigError(format!(
                "unknown infill criterion '{s}' (expected one of ei, logei, wb2, wb2s)"
            ))),
        }
    }
}

/// Tuner parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Total number of agent evaluations, initial design included
    pub(crate) budget: usize,
    /// Number of initial Latin hypercube points
    pub(crate) n_initial: usize,
    /// Random seed used for the initial design, the surrogate and fallbacks
    pub(crate) seed: u64,
    /// Bounds of the searched waypoints
    pub(crate) space: SearchSpace,
    /// Acquisition criterion
    pub(crate) infill: Infill,
    /// Value standing for failed evaluations when fitting the surrogate,
    /// derived from successful values when not set
    pub(crate) failure_penalty: Option<f64>,
    /// Directory where configuration and history are saved
    pub(crate) outdir: Option<String>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        TunerConfig {
            budget: DEFAULT_BUDGET,
            n_initial: DEFAULT_N_INITIAL,
            seed: DEFAULT_SEED,
            space: SearchSpace::default(),
            infill: Infill::default(),
            failure_penalty: None,
            outdir: None,
        }
    }
}

impl TunerConfig {
    /// Sets the total number of evaluations
    pub fn budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the initial design size, truncated to the budget at run time
    pub fn n_initial(mut self, n_initial: usize) -> Self {
        self.n_initial = n_initial;
        self
    }

    /// Sets the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the search space
    pub fn space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Sets the acquisition criterion
    pub fn infill(mut self, infill: Infill) -> Self {
        self.infill = infill;
        self
    }

    /// Sets a fixed failure penalty
    pub fn failure_penalty(mut self, penalty: f64) -> Self {
        self.failure_penalty = Some(penalty);
        self
    }

    /// Sets the directory where results are saved
    pub fn outdir(mut self, outdir: impl Into<String>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    /// Disables saving of results
    pub fn no_outdir(mut self) -> Self {
        self.outdir = None;
        self
    }

    /// Total number of evaluations
    pub fn get_budget(&self) -> usize {
        self.budget
    }

    /// Initial design size as configured
    pub fn get_n_initial(&self) -> usize {
        self.n_initial
    }

    /// Random seed
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Search space
    pub fn get_space(&self) -> &SearchSpace {
        &self.space
    }

    /// Acquisition criterion
    pub fn get_infill(&self) -> Infill {
        self.infill
    }

    /// Fixed failure penalty if any
    pub fn get_failure_penalty(&self) -> Option<f64> {
        self.failure_penalty
    }

    /// Output directory if any
    pub fn get_outdir(&self) -> Option<&str> {
        self.outdir.as_deref()
    }

    /// Validates the configuration
    pub fn check(self) -> Result<Self> {
        if self.budget == 0 {
            return Err(TuneError::InvalidConfigError(
                "budget should be at least 1".to_string(),
            ));
        }
        self.space.check()?;
        if let Some(penalty) = self.failure_penalty {
            if !penalty.is_finite() {
                return Err(TuneError::InvalidConfigError(format!(
                    "failure penalty should be finite, got {penalty}"
                )));
            }
        }
        Ok(self)
    }
}
