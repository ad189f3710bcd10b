//! Evaluation configuration.
use crate::errors::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory (relative to home) where the agent launch script lives
pub const DEFAULT_AGENT_DIR: &str = "ub-anc/build-agent";
/// Default agent launch script (relative to the agent directory)
pub const DEFAULT_AGENT_SCRIPT: &str = "./build-agent.sh";
/// Default run artifact (relative to home)
pub const DEFAULT_ARTIFACT: &str = "mission_log.txt";
/// Default time between two artifact existence checks
pub const DEFAULT_WAIT_TIME_MS: u64 = 10_000;
/// Default number of artifact existence checks
pub const DEFAULT_MAX_RETRIES: usize = 6;

/// What to do with a candidate lying outside the unit square
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePolicy {
    /// Coordinates are clamped to \[0, 1\] (a warning is logged)
    #[default]
    Clip,
    /// The evaluation fails with [`FailureCause::OutOfRange`](crate::FailureCause::OutOfRange)
    Reject,
}

/// How to consider a run artifact already present before the agent launch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StalePolicy {
    /// An artifact created or modified by the current run is waited for.
    /// When the polling window ends with the artifact unchanged, as with a
    /// deterministic agent rewriting the same log, that artifact is taken
    /// and a warning is logged.
    #[default]
    PreferFresh,
    /// Only an artifact created or modified by the current run is taken into account,
    /// an unchanged artifact ends in [`FailureCause::ArtifactTimeout`](crate::FailureCause::ArtifactTimeout).
    RequireFresh,
    /// Any existing artifact is taken as the result of the current run
    Accept,
}

/// Configuration of the agent evaluation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Directory the agent is launched from
    pub(crate) agent_dir: PathBuf,
    /// Agent launch script, relative paths are resolved against `agent_dir`
    pub(crate) script: PathBuf,
    /// Run artifact written by the agent
    pub(crate) artifact: PathBuf,
    /// Time to wait between two artifact existence checks (in ms)
    pub(crate) wait_time_ms: u64,
    /// Number of artifact existence checks before giving up
    pub(crate) max_retries: usize,
    /// Out of range candidate handling
    pub(crate) range_policy: RangePolicy,
    /// Pre-existing artifact handling
    pub(crate) stale_policy: StalePolicy,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Default for EvalConfig {
    fn default() -> Self {
        let home = home_dir();
        EvalConfig {
            agent_dir: home.join(DEFAULT_AGENT_DIR),
            script: PathBuf::from(DEFAULT_AGENT_SCRIPT),
            artifact: home.join(DEFAULT_ARTIFACT),
            wait_time_ms: DEFAULT_WAIT_TIME_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            range_policy: RangePolicy::default(),
            stale_policy: StalePolicy::default(),
        }
    }
}

impl EvalConfig {
    /// Sets the directory the agent is launched from
    pub fn agent_dir(mut self, agent_dir: impl Into<PathBuf>) -> Self {
        self.agent_dir = agent_dir.into();
        self
    }

    /// Sets the agent launch script
    pub fn script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = script.into();
        self
    }

    /// Sets the run artifact location
    pub fn artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = artifact.into();
        self
    }

    /// Sets the time between two artifact existence checks
    pub fn wait_time_ms(mut self, wait_time_ms: u64) -> Self {
        self.wait_time_ms = wait_time_ms;
        self
    }

    /// Sets the number of artifact existence checks
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the out of range candidate policy
    pub fn range_policy(mut self, range_policy: RangePolicy) -> Self {
        self.range_policy = range_policy;
        self
    }

    /// Sets the pre-existing artifact policy
    pub fn stale_policy(mut self, stale_policy: StalePolicy) -> Self {
        self.stale_policy = stale_policy;
        self
    }

    /// Directory the agent is launched from
    pub fn get_agent_dir(&self) -> &Path {
        &self.agent_dir
    }

    /// Agent launch script as given, relative paths being resolved against agent_dir
    pub fn script_path(&self) -> PathBuf {
        if self.script.is_absolute() {
            self.script.clone()
        } else {
            self.agent_dir.join(&self.script)
        }
    }

    /// Run artifact location
    pub fn get_artifact(&self) -> &Path {
        &self.artifact
    }

    /// Time between two artifact existence checks
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }

    /// Number of artifact existence checks
    pub fn get_max_retries(&self) -> usize {
        self.max_retries
    }

    /// Out of range candidate policy
    pub fn get_range_policy(&self) -> RangePolicy {
        self.range_policy
    }

    /// Pre-existing artifact policy
    pub fn get_stale_policy(&self) -> StalePolicy {
        self.stale_policy
    }

    /// Validates the configuration
    pub fn check(self) -> Result<Self> {
        if self.max_retries == 0 {
            return Err(EvalError::InvalidConfig(
                "max_retries should be at least 1".to_string(),
            ));
        }
        if self.script.as_os_str().is_empty() {
            return Err(EvalError::InvalidConfig(
                "agent script should be specified".to_string(),
            ));
        }
        if self.artifact.as_os_str().is_empty() {
            return Err(EvalError::InvalidConfig(
                "artifact path should be specified".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EvalConfig::default();
        assert_eq!(Duration::from_secs(10), config.wait_time());
        assert_eq!(6, config.get_max_retries());
        assert!(config.get_agent_dir().ends_with("ub-anc/build-agent"));
        assert!(config.script_path().ends_with("build-agent.sh"));
        assert!(config.get_artifact().ends_with("mission_log.txt"));
        assert_eq!(RangePolicy::Clip, config.get_range_policy());
        assert_eq!(StalePolicy::PreferFresh, config.get_stale_policy());
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_script_path_resolution() {
        let config = EvalConfig::default()
            .agent_dir("/opt/agent")
            .script("run.sh");
        assert_eq!(PathBuf::from("/opt/agent/run.sh"), config.script_path());
        let config = config.script("/usr/local/bin/agent");
        assert_eq!(PathBuf::from("/usr/local/bin/agent"), config.script_path());
    }

    #[test]
    fn test_invalid_config() {
        assert!(EvalConfig::default().max_retries(0).check().is_err());
        assert!(EvalConfig::default().script("").check().is_err());
    }

    #[test]
    fn test_config_json_partial() {
        let json = r#"{"wait_time_ms": 250, "range_policy": "Reject", "stale_policy": "RequireFresh"}"#;
        let config: EvalConfig = serde_json::from_str(json).expect("config parsed");
        assert_eq!(Duration::from_millis(250), config.wait_time());
        assert_eq!(RangePolicy::Reject, config.get_range_policy());
        assert_eq!(StalePolicy::RequireFresh, config.get_stale_policy());
        assert_eq!(DEFAULT_MAX_RETRIES, config.get_max_retries());
    }
}
