use std::collections::HashMap;
use std::time::Duration;

use jnd_core::{JndError, Result, StimulusId, TaskKind};
use jnd_timing::Timer;
use rand::Rng;
use tracing::debug;

use crate::config::ExperimentConfig;
use crate::session::{AudioPlayer, ChoicePrompt, Notice, Presenter};

/// Psychometric parameters of one task.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Psychometric {
    jnd: f64,
    slope: f64,
}

/// Artificial participant for dry runs.
///
/// Answers correctly with probability `0.5 + 0.5 * logistic(slope * (d - jnd))`,
/// mixed with pure guessing at the lapse rate.
pub struct SimulatedListener<R: Rng> {
    rng: R,
    tasks: HashMap<TaskKind, Psychometric>,
    lapse: f64,
}

impl<R: Rng> SimulatedListener<R> {
    /// `jnd_fraction` and `spread` are relative to each task's initial
    /// difference.
    pub fn from_config(
        config: &ExperimentConfig,
        jnd_fraction: f64,
        spread: f64,
        lapse: f64,
        rng: R,
    ) -> Result<Self> {
        if !(jnd_fraction > 0.0 && spread > 0.0 && (0.0..=1.0).contains(&lapse)) {
            return Err(JndError::configuration(format!(
                "simulated listener needs positive jnd and spread and a lapse rate in [0, 1], \
                 got {jnd_fraction}, {spread}, {lapse}"
            )));
        }
        let tasks = config
            .tasks
            .iter()
            .map(|task| {
                let psychometric = Psychometric {
                    jnd: jnd_fraction * task.initial_difference,
                    slope: 1.0 / (spread * task.initial_difference),
                };
                (task.task, psychometric)
            })
            .collect();
        Ok(Self { rng, tasks, lapse })
    }

    pub fn p_correct(&self, task: TaskKind, difference: f64) -> f64 {
        let Some(p) = self.tasks.get(&task) else {
            return 0.5;
        };
        let logistic = 1.0 / (1.0 + (-p.slope * (difference - p.jnd)).exp());
        let detected = 0.5 + 0.5 * logistic;
        self.lapse * 0.5 + (1.0 - self.lapse) * detected
    }

    /// Absolute threshold the listener was built with.
    pub fn jnd(&self, task: TaskKind) -> Option<f64> {
        self.tasks.get(&task).map(|p| p.jnd)
    }
}

impl<R: Rng> Presenter for SimulatedListener<R> {
    fn show(&mut self, notice: &Notice) -> Result<()> {
        debug!(?notice, "simulated listener skips notice");
        Ok(())
    }

    fn choose(&mut self, prompt: &ChoicePrompt<'_>) -> Result<String> {
        let p = self.p_correct(prompt.task, prompt.difference);
        let side = if self.rng.random_bool(p.clamp(0.0, 1.0)) {
            prompt.triple.correct_side
        } else {
            prompt.triple.correct_side.opposite()
        };
        Ok(side.as_str().to_string())
    }

    fn feedback(&mut self, _correct: bool) -> Result<()> {
        Ok(())
    }
}

/// Player that only lets the nominal recording length pass on its clock.
#[derive(Debug, Clone)]
pub struct SilentPlayer<T: Timer> {
    timer: T,
    nominal: Duration,
}

impl<T: Timer> SilentPlayer<T> {
    pub fn new(timer: T, nominal: Duration) -> Self {
        Self { timer, nominal }
    }
}

impl<T: Timer> AudioPlayer for SilentPlayer<T> {
    fn play_and_wait(&mut self, _stimulus: &StimulusId) -> Result<Duration> {
        self.timer.sleep(self.nominal);
        Ok(self.nominal)
    }
}
