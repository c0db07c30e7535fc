use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use jnd_core::TaskKind;

/// Adaptive AXB staircase for prosodic just-noticeable differences
#[derive(Parser, Debug)]
#[command(name = "jnd", version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON file overriding any part of the default configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the experiment with a participant at the terminal
    Run(RunArgs),

    /// Run the experiment against a simulated listener
    Simulate(SimulateArgs),

    /// Verify stimulus directories and create output directories
    Check,

    /// Recompute reversals and threshold from a trial log
    Estimate(EstimateArgs),

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Participant id, used in every file name
    #[arg(short, long)]
    pub subject: String,

    /// Seed for task order and AXB layout (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Command that plays a WAV file given as its last argument
    #[arg(long, default_value = default_player())]
    pub player: String,

    /// Restrict the experiment to these tasks
    #[arg(short, long, value_delimiter = ',')]
    pub tasks: Vec<TaskKind>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(short, long, default_value = "sim")]
    pub subject: String,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Listener threshold as a fraction of each task's initial difference
    #[arg(long, default_value_t = 0.2)]
    pub jnd_fraction: f64,

    /// Psychometric spread as a fraction of the initial difference
    #[arg(long, default_value_t = 0.05)]
    pub spread: f64,

    /// Probability of a random answer
    #[arg(long, default_value_t = 0.02)]
    pub lapse: f64,

    /// Nominal recording length in milliseconds
    #[arg(long, default_value_t = 800)]
    pub recording_ms: u64,

    #[arg(short, long, value_delimiter = ',')]
    pub tasks: Vec<TaskKind>,
}

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Trial log written by `jnd run`
    pub log: PathBuf,

    /// Number of final reversals to average (configured window if omitted)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Also render the staircase to this PNG
    #[arg(long)]
    pub plot: Option<PathBuf>,
}

fn default_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else {
        "aplay -q"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_task_list() {
        let cli = Cli::try_parse_from(["jnd", "run", "-s", "s01", "--tasks", "pitch,FL"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.subject, "s01");
        assert_eq!(
            args.tasks,
            vec![TaskKind::Pitch, TaskKind::FinalLengthening]
        );
        assert_eq!(args.seed, None);
    }

    #[test]
    fn config_is_global() {
        let cli =
            Cli::try_parse_from(["jnd", "simulate", "--config", "jnd.json", "--seed", "7"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("jnd.json")));
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.jnd_fraction, 0.2);
    }

    #[test]
    fn unknown_task_is_rejected() {
        assert!(Cli::try_parse_from(["jnd", "run", "-s", "s01", "-t", "loudness"]).is_err());
    }

    #[test]
    fn estimate_takes_a_log_path() {
        let cli = Cli::try_parse_from(["jnd", "estimate", "run.csv", "-w", "4"]).unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.log, PathBuf::from("run.csv"));
        assert_eq!(args.window, Some(4));
        assert_eq!(args.plot, None);
    }
}
