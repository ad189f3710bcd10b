//! Saving of tuning runs: the configuration as JSON before the run
//! and the evaluation history as a numpy array at the end.
use crate::config::TunerConfig;
use crate::errors::{Result, TuneError};
use crate::history::{Observation, SearchHistory};
use log::info;
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use std::fs;
use std::path::{Path, PathBuf};
use ubtune_eval::{is_failure, Candidate, FailureCause};

/// Configuration filename
pub const CONFIG_FILE: &str = "ubtune_config.json";
/// History filename, rows being \[waypoint1, waypoint2, fitness\]
pub const HISTORY_FILE: &str = "ubtune_history.npy";

/// Writes the tuner configuration in `outdir`, created if needed
pub fn save_config<P: AsRef<Path>>(outdir: P, config: &TunerConfig) -> Result<PathBuf> {
    fs::create_dir_all(&outdir)?;
    let path = outdir.as_ref().join(CONFIG_FILE);
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    info!("Save configuration in {path:?}");
    Ok(path)
}

/// Reads back a saved tuner configuration
pub fn load_config<P: AsRef<Path>>(outdir: P) -> Result<TunerConfig> {
    let content = fs::read_to_string(outdir.as_ref().join(CONFIG_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes the evaluation history in `outdir`, created if needed
pub fn save_history<P: AsRef<Path>>(outdir: P, history: &SearchHistory) -> Result<PathBuf> {
    fs::create_dir_all(&outdir)?;
    let path = outdir.as_ref().join(HISTORY_FILE);
    write_npy(&path, &history.to_array())?;
    info!("Save history ({} evaluations) in {path:?}", history.len());
    Ok(path)
}

/// Reads back a saved evaluation history.
/// Failure causes are not saved, failures are tagged as unclassified.
pub fn load_history<P: AsRef<Path>>(outdir: P) -> Result<SearchHistory> {
    let data: Array2<f64> = read_npy(outdir.as_ref().join(HISTORY_FILE))?;
    if data.ncols() != 3 {
        return Err(TuneError::InvalidConfigError(format!(
            "history should have 3 columns [waypoint1, waypoint2, fitness], got {}",
            data.ncols()
        )));
    }
    let mut history = SearchHistory::new();
    for row in data.rows() {
        let fitness = row[2];
        history.push(Observation {
            candidate: Candidate::new(row[0], row[1]),
            fitness,
            cause: is_failure(fitness).then_some(FailureCause::Unclassified),
        });
    }
    Ok(history)
}
