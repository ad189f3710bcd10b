use crate::agent::{AgentLauncher, ScriptAgent};
use crate::artifact::{
    ArtifactSnapshot, ArtifactSource, FileArtifact, Poller, Sleeper, ThreadSleeper,
};
use crate::config::{EvalConfig, RangePolicy, StalePolicy};
use crate::energy::parse_energy;
use crate::errors::{EvalError, Result};
use crate::types::{Candidate, EvalRecord, FailureCause, FAILURE_FITNESS};
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic during evaluation".to_string()
    }
}

/// A total objective function over candidates: it always returns a number,
/// an energy consumption or the [`FAILURE_FITNESS`] sentinel.
pub trait Evaluate {
    /// Evaluates the candidate
    fn evaluate(&self, candidate: Candidate) -> f64 {
        self.evaluate_record(candidate).fitness
    }

    /// Evaluates the candidate and reports why it failed if so
    fn evaluate_record(&self, candidate: Candidate) -> EvalRecord;
}

/// Any `Fn(Candidate) -> f64` is a (stub) evaluator: a non finite value is
/// reported as an unclassified failure.
impl<F> Evaluate for F
where
    F: Fn(Candidate) -> f64,
{
    fn evaluate_record(&self, candidate: Candidate) -> EvalRecord {
        let start = Instant::now();
        let value = self(candidate);
        let (fitness, cause) = if value.is_finite() {
            (value, None)
        } else {
            (FAILURE_FITNESS, Some(FailureCause::Unclassified))
        };
        EvalRecord {
            candidate,
            fitness,
            cause,
            elapsed: start.elapsed(),
        }
    }
}

/// Evaluation of a candidate by running the external agent:
/// launch, wait for the run artifact, extract the energy consumption.
pub struct Evaluator<L = ScriptAgent, A = FileArtifact, S = ThreadSleeper> {
    config: EvalConfig,
    launcher: L,
    artifact: A,
    sleeper: S,
}

impl Evaluator {
    /// Evaluator running the agent script and reading the artifact file
    /// specified by the given configuration
    pub fn new(config: EvalConfig) -> Result<Self> {
        let config = config.check()?;
        let launcher = ScriptAgent::new(config.script_path(), config.get_agent_dir());
        let artifact = FileArtifact::new(config.get_artifact());
        Ok(Evaluator {
            config,
            launcher,
            artifact,
            sleeper: ThreadSleeper,
        })
    }
}

impl<L: AgentLauncher, A: ArtifactSource, S: Sleeper> Evaluator<L, A, S> {
    /// Evaluator with custom agent, artifact and sleeper
    pub fn with_parts(config: EvalConfig, launcher: L, artifact: A, sleeper: S) -> Result<Self> {
        Ok(Evaluator {
            config: config.check()?,
            launcher,
            artifact,
            sleeper,
        })
    }

    /// Evaluation configuration
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Candidate to be evaluated regarding the range policy
    fn admit(&self, candidate: Candidate) -> Result<Candidate> {
        if candidate.waypoint1.is_nan() || candidate.waypoint2.is_nan() {
            return Err(EvalError::OutOfRange(candidate.to_string()));
        }
        if candidate.is_in_unit_square() {
            return Ok(candidate);
        }
        match self.config.get_range_policy() {
            RangePolicy::Clip => {
                let clamped = candidate.clamped();
                warn!("Candidate {} out of [0, 1], clipped to {}", candidate, clamped);
                Ok(clamped)
            }
            RangePolicy::Reject => Err(EvalError::OutOfRange(candidate.to_string())),
        }
    }

    /// Fallible evaluation: the energy consumption of the agent run for the
    /// given candidate or the reason why it is not available.
    ///
    /// Unless the policy is [`StalePolicy::Accept`], the artifact is fingerprinted
    /// once before the launch to tell the output of this run from a previous one.
    /// That fingerprint is taken even if the agent then fails. It is not one of
    /// the `max_retries` checks: a failing agent stops the evaluation before
    /// any of them and before any wait.
    pub fn try_evaluate(&self, candidate: &Candidate) -> Result<f64> {
        let policy = self.config.get_stale_policy();
        let before = match policy {
            StalePolicy::Accept => ArtifactSnapshot::missing(),
            StalePolicy::PreferFresh | StalePolicy::RequireFresh => self.artifact.snapshot(),
        };
        self.launcher.launch(candidate)?;
        self.collect_energy(&before, policy)
    }

    /// Polls the artifact until it holds the energy of the current run.
    ///
    /// An available artifact without the energy line is looked at again on the
    /// remaining checks as the agent may still be writing it.
    fn collect_energy(&self, before: &ArtifactSnapshot, policy: StalePolicy) -> Result<f64> {
        let poller = Poller::new(self.config.wait_time(), self.config.get_max_retries());
        let path = self.artifact.path();
        let mut incomplete = None;
        let mut unchanged = false;

        let found = poller.poll(&self.sleeper, |attempt| {
            let current = self.artifact.snapshot();
            let available = match policy {
                StalePolicy::Accept => current.exists,
                StalePolicy::PreferFresh | StalePolicy::RequireFresh => {
                    current.is_fresh_since(before)
                }
            };
            if !available {
                unchanged = current.exists;
                debug!(
                    "Artifact {:?} not available (attempt {}/{})",
                    path,
                    attempt,
                    poller.max_retries()
                );
                return None;
            }
            match self.read_energy(before) {
                Err(err @ EvalError::PatternNotFound(_)) => {
                    debug!(
                        "No energy in {:?} yet (attempt {}/{})",
                        path,
                        attempt,
                        poller.max_retries()
                    );
                    incomplete = Some(err);
                    None
                }
                res => Some(res),
            }
        });

        match (found, incomplete) {
            (Some(res), _) => res,
            (None, Some(err)) => Err(err),
            (None, None) if unchanged && policy == StalePolicy::PreferFresh => {
                warn!(
                    "Artifact {:?} unchanged by the run after {} checks, taken as is",
                    path,
                    poller.max_retries()
                );
                self.read_energy(before)
            }
            (None, None) => Err(EvalError::ArtifactTimeout {
                path: path.to_path_buf(),
                attempts: poller.max_retries(),
            }),
        }
    }

    /// Energy found in the part of the artifact written by the current run
    fn read_energy(&self, before: &ArtifactSnapshot) -> Result<f64> {
        let content = self.artifact.read()?;
        let fresh = before.new_content(&content);
        debug!(
            "Parse {} of {} bytes from {:?}",
            fresh.len(),
            content.len(),
            self.artifact.path()
        );
        parse_energy(&String::from_utf8_lossy(fresh))
    }
}

impl<L: AgentLauncher, A: ArtifactSource, S: Sleeper> Evaluate for Evaluator<L, A, S> {
    fn evaluate_record(&self, candidate: Candidate) -> EvalRecord {
        let start = Instant::now();
        let (candidate, outcome) = match self.admit(candidate) {
            Ok(admitted) => {
                let run = AssertUnwindSafe(|| self.try_evaluate(&admitted));
                let outcome = panic::catch_unwind(run)
                    .unwrap_or_else(|payload| Err(EvalError::Unexpected(panic_message(&*payload))));
                (admitted, outcome)
            }
            Err(err) => (candidate, Err(err)),
        };
        let elapsed = start.elapsed();
        match outcome {
            Ok(energy) => {
                info!(
                    "Evaluation at {} => energy = {} ({:.1?})",
                    candidate, energy, elapsed
                );
                EvalRecord {
                    candidate,
                    fitness: energy,
                    cause: None,
                    elapsed,
                }
            }
            Err(err) => {
                let cause = err.cause();
                warn!(
                    "Evaluation at {} failed [cause={}]: {} ({:.1?})",
                    candidate, cause, err, elapsed
                );
                EvalRecord {
                    candidate,
                    fitness: FAILURE_FITNESS,
                    cause: Some(cause),
                    elapsed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use std::time::Duration;

    /// In-memory artifact the stub agent writes to
    #[derive(Default)]
    struct MemArtifact {
        content: RefCell<Option<String>>,
        checks: Cell<usize>,
    }

    impl ArtifactSource for &MemArtifact {
        fn path(&self) -> &Path {
            Path::new("mem://mission_log.txt")
        }
        fn snapshot(&self) -> ArtifactSnapshot {
            self.checks.set(self.checks.get() + 1);
            match self.content.borrow().as_ref() {
                // no modification time, as with a coarse-grained file system
                Some(c) => ArtifactSnapshot::of_content(c.as_bytes(), None),
                None => ArtifactSnapshot::missing(),
            }
        }
        fn read(&self) -> Result<Vec<u8>> {
            match self.content.borrow().as_ref() {
                Some(c) => Ok(c.as_bytes().to_vec()),
                None => Err(EvalError::ArtifactRead(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "missing",
                ))),
            }
        }
    }

    #[derive(Default)]
    struct CountingSleeper(Cell<usize>);

    impl Sleeper for CountingSleeper {
        fn sleep(&self, _duration: Duration) {
            self.0.set(self.0.get() + 1)
        }
    }

    fn config() -> EvalConfig {
        EvalConfig::default().wait_time_ms(1).max_retries(6)
    }

    #[test]
    fn test_failing_agent_only_fingerprints_artifact_before_launch() {
        let artifact = MemArtifact::default();
        let sleeper = CountingSleeper::default();
        let agent = |_: &Candidate| -> Result<()> {
            Err(EvalError::AgentExit("exit code 1".to_string()))
        };
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();

        let record = evaluator.evaluate_record(Candidate::new(0.2, 0.4));
        assert_eq!(FAILURE_FITNESS, record.fitness);
        assert_eq!(Some(FailureCause::AgentExit), record.cause);
        // the pre-launch fingerprint, no polling check and no wait
        assert_eq!(1, artifact.checks.get());
        assert_eq!(0, sleeper.0.get());

        let evaluator = Evaluator::with_parts(
            config().stale_policy(StalePolicy::Accept),
            agent,
            &artifact,
            &sleeper,
        )
        .unwrap();
        assert_eq!(FAILURE_FITNESS, evaluator.evaluate(Candidate::new(0.2, 0.4)));
        // no existence check at all
        assert_eq!(1, artifact.checks.get());
        assert_eq!(0, sleeper.0.get());
    }

    #[test]
    fn test_missing_artifact_timeout() {
        let artifact = MemArtifact::default();
        let sleeper = CountingSleeper::default();
        let agent = |_: &Candidate| -> Result<()> { Ok(()) };
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();

        let record = evaluator.evaluate_record(Candidate::new(0.2, 0.4));
        assert_eq!(FAILURE_FITNESS, record.fitness);
        assert_eq!(Some(FailureCause::ArtifactTimeout), record.cause);
        // pre-launch snapshot + max_retries polling checks
        assert_eq!(1 + 6, artifact.checks.get());
        assert_eq!(5, sleeper.0.get());
    }

    #[test]
    fn test_energy_extracted() {
        let artifact = MemArtifact::default();
        let agent = |c: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() = Some(format!(
                "waypoints {} {}\n...Total energy consumption: 42.5 kWh...",
                c.waypoint1, c.waypoint2
            ));
            Ok(())
        };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        assert_eq!(42.5, evaluator.evaluate(Candidate::new(0.3, 0.7)));
        // idempotent with a deterministic agent rewriting the same log
        assert_eq!(42.5, evaluator.evaluate(Candidate::new(0.3, 0.7)));
    }

    #[test]
    fn test_identical_log_taken_after_polling_window() {
        let artifact = MemArtifact::default();
        let sleeper = CountingSleeper::default();
        let agent = |_: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() = Some("Total energy consumption: 42.5 kWh\n".to_string());
            Ok(())
        };
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();
        assert_eq!(42.5, evaluator.evaluate(Candidate::new(0.3, 0.7)));
        assert_eq!(1 + 1, artifact.checks.get());
        assert_eq!(0, sleeper.0.get());

        let record = evaluator.evaluate_record(Candidate::new(0.3, 0.7));
        assert_eq!(42.5, record.fitness);
        assert_eq!(None, record.cause);
        // the whole window is spent waiting for a change
        assert_eq!(2 + 1 + 6, artifact.checks.get());
        assert_eq!(5, sleeper.0.get());
    }

    #[test]
    fn test_pattern_not_found() {
        let artifact = MemArtifact::default();
        let agent = |_: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() = Some("Mission starts...\n".to_string());
            Ok(())
        };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        let record = evaluator.evaluate_record(Candidate::new(0.3, 0.7));
        assert_eq!(FAILURE_FITNESS, record.fitness);
        assert_eq!(Some(FailureCause::PatternNotFound), record.cause);
    }

    #[test]
    fn test_log_completed_on_later_check() {
        /// Completes the mission log on its first wait
        struct WriterSleeper<'a>(&'a MemArtifact, Cell<usize>);
        impl Sleeper for WriterSleeper<'_> {
            fn sleep(&self, _duration: Duration) {
                self.1.set(self.1.get() + 1);
                if let Some(c) = self.0.content.borrow_mut().as_mut() {
                    c.push_str("Total energy consumption: 7.25 kWh\n");
                }
            }
        }

        let artifact = MemArtifact::default();
        let agent = |_: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() = Some("Mission starts...\n".to_string());
            Ok(())
        };
        let sleeper = WriterSleeper(&artifact, Cell::new(0));
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();
        let record = evaluator.evaluate_record(Candidate::new(0.3, 0.7));
        assert_eq!(7.25, record.fitness);
        assert_eq!(1, sleeper.1.get());
        assert_eq!(1 + 2, artifact.checks.get());
    }

    #[test]
    fn test_overwritten_longer_log() {
        let artifact = MemArtifact::default();
        *artifact.content.borrow_mut() = Some("Total energy consumption: 1.0\n".to_string());
        let agent = |_: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() =
                Some("Total energy consumption: 250.75 kWh\n".to_string());
            Ok(())
        };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        assert_eq!(250.75, evaluator.evaluate(Candidate::new(0.5, 0.5)));
    }

    #[test]
    fn test_overwritten_same_size_log() {
        let artifact = MemArtifact::default();
        *artifact.content.borrow_mut() = Some("Total energy consumption: 1.0\n".to_string());
        let sleeper = CountingSleeper::default();
        let agent = |_: &Candidate| -> Result<()> {
            *artifact.content.borrow_mut() = Some("Total energy consumption: 9.0\n".to_string());
            Ok(())
        };
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();
        assert_eq!(9.0, evaluator.evaluate(Candidate::new(0.5, 0.5)));
        assert_eq!(0, sleeper.0.get());
    }

    #[test]
    fn test_stale_artifact_policies() {
        let artifact = MemArtifact::default();
        *artifact.content.borrow_mut() = Some("Total energy consumption: 1.0\n".to_string());
        let sleeper = CountingSleeper::default();
        // agent succeeds but writes nothing
        let agent = |_: &Candidate| -> Result<()> { Ok(()) };
        let evaluator = Evaluator::with_parts(
            config().stale_policy(StalePolicy::RequireFresh),
            agent,
            &artifact,
            &sleeper,
        )
        .unwrap();
        assert_eq!(
            Some(FailureCause::ArtifactTimeout),
            evaluator.evaluate_record(Candidate::new(0.5, 0.5)).cause
        );
        assert_eq!(5, sleeper.0.get());

        // taken only once the polling window is over
        let evaluator = Evaluator::with_parts(config(), agent, &artifact, &sleeper).unwrap();
        assert_eq!(1.0, evaluator.evaluate(Candidate::new(0.5, 0.5)));
        assert_eq!(5 + 5, sleeper.0.get());

        let evaluator = Evaluator::with_parts(
            config().stale_policy(StalePolicy::Accept),
            agent,
            &artifact,
            &sleeper,
        )
        .unwrap();
        assert_eq!(1.0, evaluator.evaluate(Candidate::new(0.5, 0.5)));
        assert_eq!(5 + 5, sleeper.0.get());
    }

    #[test]
    fn test_appended_log_parsed_from_previous_end() {
        let artifact = MemArtifact::default();
        *artifact.content.borrow_mut() = Some("Total energy consumption: 1.0\n".to_string());
        let agent = |_: &Candidate| -> Result<()> {
            if let Some(c) = artifact.content.borrow_mut().as_mut() {
                c.push_str("Mission starts...\nTotal energy consumption: 2.5\n");
            }
            Ok(())
        };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        assert_eq!(2.5, evaluator.evaluate(Candidate::new(0.5, 0.5)));
    }

    #[test]
    fn test_range_policy() {
        let artifact = MemArtifact::default();
        let seen = RefCell::new(vec![]);
        let agent = |c: &Candidate| -> Result<()> {
            seen.borrow_mut().push(*c);
            *artifact.content.borrow_mut() = Some("Total energy consumption: 5".to_string());
            Ok(())
        };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        let record = evaluator.evaluate_record(Candidate::new(1.2, -0.1));
        assert_eq!(Candidate::new(1.0, 0.0), record.candidate);
        assert_eq!(5.0, record.fitness);
        assert_eq!(vec![Candidate::new(1.0, 0.0)], *seen.borrow());

        let evaluator = Evaluator::with_parts(
            config().range_policy(RangePolicy::Reject),
            agent,
            &artifact,
            CountingSleeper::default(),
        )
        .unwrap();
        let record = evaluator.evaluate_record(Candidate::new(1.2, -0.1));
        assert_eq!(Some(FailureCause::OutOfRange), record.cause);
        let record = evaluator.evaluate_record(Candidate::new(f64::NAN, 0.5));
        assert_eq!(Some(FailureCause::OutOfRange), record.cause);
        assert_eq!(1, seen.borrow().len());
    }

    #[test]
    fn test_panicking_agent_is_absorbed() {
        let artifact = MemArtifact::default();
        let agent = |_: &Candidate| -> Result<()> { panic!("agent stub exploded") };
        let evaluator =
            Evaluator::with_parts(config(), agent, &artifact, CountingSleeper::default()).unwrap();
        let record = evaluator.evaluate_record(Candidate::new(0.1, 0.1));
        assert_eq!(FAILURE_FITNESS, record.fitness);
        assert_eq!(Some(FailureCause::Unclassified), record.cause);
    }

    #[test]
    fn test_closure_evaluator() {
        let f = |c: Candidate| {
            if c.waypoint1 > 0.5 {
                f64::NAN
            } else {
                c.waypoint1 + c.waypoint2
            }
        };
        assert_eq!(0.5, f.evaluate(Candidate::new(0.25, 0.25)));
        let record = f.evaluate_record(Candidate::new(0.75, 0.25));
        assert_eq!(FAILURE_FITNESS, record.fitness);
        assert_eq!(Some(FailureCause::Unclassified), record.cause);
    }
}
