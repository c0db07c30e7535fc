use std::io;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use jnd_core::TaskKind;
use jnd_experiment::{
    Collaborators, CsvLogFactory, ExperimentConfig, FsStimulusStore, Participant, RunSummary,
    SessionOutcome, SessionRunner, SilentPlayer, SimulatedListener, VirtualStimulusStore,
    check_setup, read_trial_log,
};
use jnd_render::PlotStyle;
use jnd_timing::{HighPrecisionTimer, Timer, VirtualClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::cli::{Cli, Command, EstimateArgs, RunArgs, SimulateArgs};
use crate::player::CommandPlayer;
use crate::report::{FileReporter, save_plot};
use crate::terminal::TerminalPresenter;

pub struct App {
    cli: Cli,
    config: ExperimentConfig,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        Ok(Self { cli, config })
    }

    pub fn run(self) -> Result<()> {
        match &self.cli.command {
            Command::Run(args) => self.run_experiment(args),
            Command::Simulate(args) => self.simulate(args),
            Command::Check => self.check(),
            Command::Estimate(args) => self.estimate(args),
            Command::Config => {
                println!("{}", serde_json::to_string_pretty(&self.config)?);
                Ok(())
            }
        }
    }

    fn run_experiment(&self, args: &RunArgs) -> Result<()> {
        let config = restrict(&self.config, &args.tasks)?;
        let report = check_setup(&config, &FsStimulusStore)?;
        if !report.missing_recordings.is_empty() {
            bail!(
                "{} baseline or starting recordings are missing, run `jnd check`",
                report.missing_recordings.len()
            );
        }

        let participant = Participant::now(&args.subject)?;
        let seed = args.seed.unwrap_or_else(|| rand::rng().random());
        info!(subject = %participant.subject, seed, "starting session");

        let timer = HighPrecisionTimer::new();
        let mut player = CommandPlayer::new(&args.player, timer.clone())?;
        let mut presenter = TerminalPresenter::new(io::stdin().lock(), io::stdout());
        let mut logs = CsvLogFactory::new(&config.paths.output_dir);
        let mut reporter = FileReporter::new(&config.paths.plot_dir);

        let outcomes = SessionRunner::new(
            &config,
            participant,
            timer,
            StdRng::seed_from_u64(seed),
            Collaborators {
                store: &FsStimulusStore,
                player: &mut player,
                presenter: &mut presenter,
                logs: &mut logs,
                reporter: &mut reporter,
            },
        )
        .run_experiment()?;
        print_outcomes(&outcomes, |_| None);
        Ok(())
    }

    fn simulate(&self, args: &SimulateArgs) -> Result<()> {
        let config = restrict(&self.config, &args.tasks)?;
        let participant = Participant::now(&args.subject)?;
        let seed = args.seed.unwrap_or_else(|| rand::rng().random());
        info!(subject = %participant.subject, seed, "starting simulation");

        let clock = VirtualClock::new();
        let mut player = SilentPlayer::new(clock.clone(), Duration::from_millis(args.recording_ms));
        let mut listener = SimulatedListener::from_config(
            &config,
            args.jnd_fraction,
            args.spread,
            args.lapse,
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )?;
        let truth: Vec<(TaskKind, Option<f64>)> = config
            .task_kinds()
            .into_iter()
            .map(|task| (task, listener.jnd(task)))
            .collect();
        let mut logs = CsvLogFactory::new(&config.paths.output_dir);
        let mut reporter = FileReporter::new(&config.paths.plot_dir);

        let outcomes = SessionRunner::new(
            &config,
            participant,
            clock.clone(),
            StdRng::seed_from_u64(seed),
            Collaborators {
                store: &VirtualStimulusStore,
                player: &mut player,
                presenter: &mut listener,
                logs: &mut logs,
                reporter: &mut reporter,
            },
        )
        .run_experiment()?;

        print_outcomes(&outcomes, |task| {
            truth.iter().find(|(t, _)| *t == task).and_then(|(_, jnd)| *jnd)
        });
        info!(
            simulated = ?Duration::from_nanos(clock.now()),
            "simulation finished"
        );
        Ok(())
    }

    fn check(&self) -> Result<()> {
        let report = check_setup(&self.config, &FsStimulusStore)?;
        for (task, dir) in &report.stimulus_dirs {
            println!("{:>6}  {}", task.id(), dir.display());
        }
        for dir in &report.created {
            println!("created {}", dir.display());
        }
        for (task, missing) in &report.missing_recordings {
            println!("{:>6}  MISSING {missing}", task.id());
        }
        if !report.missing_recordings.is_empty() {
            bail!("{} recordings missing", report.missing_recordings.len());
        }
        println!("setup ok");
        Ok(())
    }

    fn estimate(&self, args: &EstimateArgs) -> Result<()> {
        let records = read_trial_log(&args.log)?;
        let window = args.window.unwrap_or(self.config.threshold_window);
        let summary =
            RunSummary::from_records(&records, self.config.staircase.reversal_grammar, window)
                .with_context(|| format!("estimating from {}", args.log.display()))?;
        if summary.threshold.is_none() {
            warn!(log = %args.log.display(), "no reversals in log");
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
        if let Some(path) = &args.plot {
            save_plot(&summary, &PlotStyle::default(), path)?;
            info!(plot = %path.display(), "written");
        }
        Ok(())
    }
}

/// Drops the tasks not listed; an empty list keeps all of them.
fn restrict(config: &ExperimentConfig, tasks: &[TaskKind]) -> Result<ExperimentConfig> {
    let mut config = config.clone();
    if tasks.is_empty() {
        return Ok(config);
    }
    for task in tasks {
        config.task(*task)?;
    }
    config.tasks.retain(|t| tasks.contains(&t.task));
    Ok(config)
}

fn print_outcomes(outcomes: &[SessionOutcome], truth: impl Fn(TaskKind) -> Option<f64>) {
    println!(
        "{:<6} {:>4} {:>7} {:>9}  {:<30} {:>10} {:>10} {:>10}",
        "task", "run", "trials", "reversals", "stop", "mean", "median", "true"
    );
    for outcome in outcomes {
        let key = outcome.key;
        let (mean, median) = outcome
            .threshold()
            .map(|t| (format!("{:.4}", t.mean), format!("{:.4}", t.median)))
            .unwrap_or_else(|| ("-".into(), "-".into()));
        let true_jnd = truth(key.task).map_or_else(|| "-".into(), |j| format!("{j:.4}"));
        println!(
            "{:<6} {:>4} {:>7} {:>9}  {:<30} {:>10} {:>10} {:>10}",
            key.task.id(),
            key.run,
            outcome.trials.len(),
            outcome.reversals().len(),
            outcome.stop_reason.to_string(),
            mean,
            median,
            true_jnd
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn restrict_keeps_requested_tasks_in_config_order() {
        let config = ExperimentConfig::default();
        let only = restrict(&config, &[TaskKind::Pause, TaskKind::Pitch]).unwrap();
        assert_eq!(only.task_kinds().len(), 2);
        assert!(only.task(TaskKind::FinalLengthening).is_err());

        let all = restrict(&config, &[]).unwrap();
        assert_eq!(all.task_kinds(), config.task_kinds());
    }
}
