use crate::errors::{EvalError, Result};
use crate::types::Candidate;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// An interface to run the external agent for a given candidate.
///
/// `launch` blocks until the agent terminates and succeeds
/// only when the agent reported a successful run.
pub trait AgentLauncher {
    /// Runs the agent with the candidate waypoints
    fn launch(&self, candidate: &Candidate) -> Result<()>;
}

impl<F> AgentLauncher for F
where
    F: Fn(&Candidate) -> Result<()>,
{
    fn launch(&self, candidate: &Candidate) -> Result<()> {
        self(candidate)
    }
}

/// The agent launch script invoked as `<script> <waypoint1> <waypoint2>`
/// from a given working directory.
///
/// The working directory is passed to the child process only,
/// the current directory of the calling process is left untouched.
#[derive(Clone, Debug)]
pub struct ScriptAgent {
    script: PathBuf,
    workdir: PathBuf,
}

impl ScriptAgent {
    /// Constructor given the script and the directory to run it from
    pub fn new(script: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        ScriptAgent {
            script: script.into(),
            workdir: workdir.into(),
        }
    }

    /// The launch script
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// The working directory of the agent process
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self, candidate: &Candidate) -> Command {
        let mut cmd = Command::new(&self.script);
        cmd.arg(format_coordinate(candidate.waypoint1))
            .arg(format_coordinate(candidate.waypoint2))
            .current_dir(&self.workdir);
        cmd
    }
}

/// Shortest representation keeping a decimal point (`1.0`, `0.25`)
fn format_coordinate(x: f64) -> String {
    format!("{x:?}")
}

fn describe(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

impl AgentLauncher for ScriptAgent {
    fn launch(&self, candidate: &Candidate) -> Result<()> {
        debug!(
            "Launch {:?} {} {} in {:?}",
            self.script, candidate.waypoint1, candidate.waypoint2, self.workdir
        );
        let status = self
            .command(candidate)
            .status()
            .map_err(EvalError::Launch)?;
        if status.success() {
            Ok(())
        } else {
            Err(EvalError::AgentExit(describe(&status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        let agent = ScriptAgent::new("./build-agent.sh", "/tmp");
        let cmd = agent.command(&Candidate::new(0.25, 1.0));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(vec!["0.25".to_string(), "1.0".to_string()], args);
        assert_eq!(Some(Path::new("/tmp")), cmd.get_current_dir());
    }

    #[test]
    fn test_missing_script_is_launch_error() {
        let agent = ScriptAgent::new("/nonexistent/ubtune/agent.sh", ".");
        let err = agent.launch(&Candidate::new(0.5, 0.5)).unwrap_err();
        assert!(matches!(err, EvalError::Launch(_)));
    }
}
