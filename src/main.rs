use clap::Parser;
use env_logger::{Builder, Env};
use std::path::PathBuf;
use ubtune::eval::{Evaluator, RangePolicy, StalePolicy, UBTUNE_LOG};
use ubtune::opt::{Infill, SearchSpace, TuneError, Tuner};
use ubtune::RunConfig;

fn parse_infill(s: &str) -> Result<Infill, String> {
    s.parse().map_err(|e: TuneError| e.to_string())
}

/// Tune the UAV mission waypoints to minimize the energy consumption
/// reported by the agent simulation.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file ({"eval": {...}, "tuner": {...}}), overridden by options
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory the agent is launched from [default: ~/ub-anc/build-agent]
    #[arg(long)]
    agent_dir: Option<PathBuf>,
    /// Agent launch script, relative to the agent directory [default: ./build-agent.sh]
    #[arg(long)]
    script: Option<PathBuf>,
    /// Mission log written by the agent [default: ~/mission_log.txt]
    #[arg(long)]
    artifact: Option<PathBuf>,
    /// Wait between two checks of the mission log in milliseconds [default: 10000]
    #[arg(long)]
    wait_time_ms: Option<u64>,
    /// Number of checks of the mission log [default: 6]
    #[arg(long)]
    max_retries: Option<usize>,
    /// Take a mission log left by a previous run as the result of the current one
    #[arg(long, conflicts_with = "require_fresh")]
    accept_stale: bool,
    /// Fail runs leaving the mission log unchanged instead of taking it after the wait
    #[arg(long)]
    require_fresh: bool,
    /// Fail candidates outside the unit square instead of clipping them
    #[arg(long)]
    reject_out_of_range: bool,
    /// Total number of agent runs [default: 30]
    #[arg(short, long)]
    budget: Option<usize>,
    /// Number of initial space-filling runs [default: 10]
    #[arg(short, long)]
    n_initial: Option<usize>,
    /// Random seed [default: 42]
    #[arg(short, long)]
    seed: Option<u64>,
    /// Acquisition criterion: ei, logei, wb2 or wb2s [default: ei]
    #[arg(long, value_parser = parse_infill)]
    infill: Option<Infill>,
    /// Bounds of waypoint1 as LOWER UPPER [default: 0 1]
    #[arg(long, num_args = 2, value_names = ["LOWER", "UPPER"])]
    waypoint1: Option<Vec<f64>>,
    /// Bounds of waypoint2 as LOWER UPPER [default: 0 1]
    #[arg(long, num_args = 2, value_names = ["LOWER", "UPPER"])]
    waypoint2: Option<Vec<f64>>,
    /// Energy standing for failed runs when fitting the surrogate [default: derived]
    #[arg(long)]
    failure_penalty: Option<f64>,
    /// Directory where configuration and history are saved
    #[arg(short, long)]
    outdir: Option<String>,
}

impl Args {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let RunConfig {
            mut eval,
            mut tuner,
        } = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(agent_dir) = &self.agent_dir {
            eval = eval.agent_dir(agent_dir);
        }
        if let Some(script) = &self.script {
            eval = eval.script(script);
        }
        if let Some(artifact) = &self.artifact {
            eval = eval.artifact(artifact);
        }
        if let Some(wait_time_ms) = self.wait_time_ms {
            eval = eval.wait_time_ms(wait_time_ms);
        }
        if let Some(max_retries) = self.max_retries {
            eval = eval.max_retries(max_retries);
        }
        if self.accept_stale {
            eval = eval.stale_policy(StalePolicy::Accept);
        }
        if self.require_fresh {
            eval = eval.stale_policy(StalePolicy::RequireFresh);
        }
        if self.reject_out_of_range {
            eval = eval.range_policy(RangePolicy::Reject);
        }

        if let Some(budget) = self.budget {
            tuner = tuner.budget(budget);
        }
        if let Some(n_initial) = self.n_initial {
            tuner = tuner.n_initial(n_initial);
        }
        if let Some(seed) = self.seed {
            tuner = tuner.seed(seed);
        }
        if let Some(infill) = self.infill {
            tuner = tuner.infill(infill);
        }
        if self.waypoint1.is_some() || self.waypoint2.is_some() {
            let [b1, b2] = tuner.get_space().bounds;
            tuner = tuner.space(SearchSpace::new(
                bounds_or(&self.waypoint1, b1),
                bounds_or(&self.waypoint2, b2),
            ));
        }
        if let Some(penalty) = self.failure_penalty {
            tuner = tuner.failure_penalty(penalty);
        }
        if let Some(outdir) = &self.outdir {
            tuner = tuner.outdir(outdir.as_str());
        }
        Ok(RunConfig { eval, tuner })
    }
}

fn bounds_or(values: &Option<Vec<f64>>, default: [f64; 2]) -> [f64; 2] {
    match values.as_deref() {
        Some([lo, up]) => [*lo, *up],
        _ => default,
    }
}

fn main() -> anyhow::Result<()> {
    let env = Env::new().filter_or(UBTUNE_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let args = Args::parse();
    let RunConfig { eval, tuner } = args.run_config()?;
    log::debug!("Evaluation configuration: {eval:?}");
    log::debug!("Tuner configuration: {tuner:?}");

    let evaluator = Evaluator::new(eval)?;
    let res = Tuner::new(tuner)?.minimize(&evaluator)?;

    println!("{res}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "ubtune",
            "--budget",
            "12",
            "--infill",
            "wb2",
            "--waypoint2",
            "0.2",
            "0.6",
            "--accept-stale",
            "--wait-time-ms",
            "100",
        ]);
        let config = args.run_config().expect("valid configuration");
        assert_eq!(12, config.tuner.get_budget());
        assert_eq!(Infill::WB2, config.tuner.get_infill());
        assert_eq!([[0., 1.], [0.2, 0.6]], config.tuner.get_space().bounds);
        assert_eq!(StalePolicy::Accept, config.eval.get_stale_policy());
        assert_eq!(100, config.eval.wait_time().as_millis());
        assert_eq!(RangePolicy::Clip, config.eval.get_range_policy());
    }

    #[test]
    fn test_stale_policy_flags() {
        let args = Args::parse_from(["ubtune", "--require-fresh"]);
        let config = args.run_config().expect("valid configuration");
        assert_eq!(StalePolicy::RequireFresh, config.eval.get_stale_policy());
        let config = Args::parse_from(["ubtune"]).run_config().unwrap();
        assert_eq!(StalePolicy::PreferFresh, config.eval.get_stale_policy());
        assert!(Args::try_parse_from(["ubtune", "--require-fresh", "--accept-stale"]).is_err());
    }

    #[test]
    fn test_bad_infill() {
        assert!(Args::try_parse_from(["ubtune", "--infill", "ucb"]).is_err());
    }
}
