use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jnd_core::{JndError, Result, TaskKind};
use serde::{Deserialize, Serialize};

use crate::reversal::ReversalGrammar;
use crate::step::StepSizeTable;
use crate::threshold::DEFAULT_WINDOW;

/// Per-task calibration: baseline recording, starting difference, stimulus
/// naming and step sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub task: TaskKind,
    /// File name stem of the recordings, e.g. `nelli_ch_rise`
    pub stim_prefix: String,
    pub baseline: f64,
    /// Starting difference, also the ceiling of the clamped variant
    pub initial_difference: f64,
    /// Decimals in stimulus file names. Pitch recordings exist at 1 decimal,
    /// so neighbouring differences can share a recording.
    pub stimulus_decimals: u32,
    /// Decimals the difference is rounded to after every step
    pub difference_decimals: u32,
    pub steps: StepSizeTable,
}

impl TaskConfig {
    pub fn pitch() -> Self {
        Self {
            task: TaskKind::Pitch,
            stim_prefix: "nelli_ch_rise".into(),
            baseline: 0.002,
            initial_difference: 13.110,
            stimulus_decimals: 1,
            difference_decimals: 3,
            steps: StepSizeTable::pitch(),
        }
    }

    pub fn pause() -> Self {
        Self {
            task: TaskKind::Pause,
            stim_prefix: "lilli_lisa_ch_pause".into(),
            baseline: 0.000,
            initial_difference: 0.550,
            stimulus_decimals: 3,
            difference_decimals: 3,
            steps: StepSizeTable::pause(),
        }
    }

    pub fn final_lengthening() -> Self {
        Self {
            task: TaskKind::FinalLengthening,
            stim_prefix: "mimmi_ch_FL".into(),
            baseline: 0.0000,
            initial_difference: 0.1638,
            stimulus_decimals: 4,
            difference_decimals: 4,
            steps: StepSizeTable::final_lengthening(),
        }
    }

    pub fn defaults_for(task: TaskKind) -> Self {
        match task {
            TaskKind::Pitch => Self::pitch(),
            TaskKind::FinalLengthening => Self::final_lengthening(),
            TaskKind::Pause => Self::pause(),
        }
    }

    /// Directory holding this task's recordings.
    pub fn stimulus_dir(&self, stimuli_root: &Path) -> PathBuf {
        stimuli_root.join(format!("audio-{}", self.task.id()))
    }

    /// Path prefix the formatted difference value is appended to.
    pub fn path_prefix(&self, stimuli_root: &Path) -> PathBuf {
        self.stimulus_dir(stimuli_root).join(&self.stim_prefix)
    }

    pub fn validate(&self) -> Result<()> {
        let task = self.task;
        if self.stim_prefix.trim().is_empty() {
            return Err(JndError::configuration(format!(
                "task {task}: stimulus prefix is empty"
            )));
        }
        if !self.baseline.is_finite() {
            return Err(JndError::configuration(format!(
                "task {task}: baseline {} is not a number",
                self.baseline
            )));
        }
        if !(self.initial_difference.is_finite() && self.initial_difference > 0.0) {
            return Err(JndError::configuration(format!(
                "task {task}: initial difference must be positive, got {}",
                self.initial_difference
            )));
        }
        if self.stimulus_decimals > 6 || self.difference_decimals > 6 {
            return Err(JndError::configuration(format!(
                "task {task}: at most 6 decimals are supported"
            )));
        }
        self.steps
            .validate()
            .map_err(|e| JndError::configuration(format!("task {task}: {e}")))
    }
}

/// Selects the reversal grammar and ceiling behaviour of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseVariant {
    pub reversal_grammar: ReversalGrammar,
    /// An incorrect response at the initial difference leaves it unchanged
    pub clamp_at_ceiling: bool,
}

impl Default for StaircaseVariant {
    fn default() -> Self {
        Self {
            reversal_grammar: ReversalGrammar::DirectionPattern,
            clamp_at_ceiling: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopLimits {
    /// Number of trials a run presents at most
    pub max_trials: usize,
    /// The session ends once the reversal count exceeds this
    pub max_reversals: u32,
}

impl Default for StopLimits {
    fn default() -> Self {
        Self {
            max_trials: 120,
            max_reversals: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub required_correct: usize,
    pub max_trials: usize,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            required_correct: 4,
            max_trials: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialTiming {
    /// Gap after A and after X
    pub inter_stimulus_ms: u64,
    /// Gap after B before the choice is shown
    pub response_delay_ms: u64,
    pub inter_trial_ms: u64,
}

impl Default for TrialTiming {
    fn default() -> Self {
        Self {
            inter_stimulus_ms: 1000,
            response_delay_ms: 200,
            inter_trial_ms: 1000,
        }
    }
}

impl TrialTiming {
    pub fn inter_stimulus(&self) -> Duration {
        Duration::from_millis(self.inter_stimulus_ms)
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    pub fn inter_trial(&self) -> Duration {
        Duration::from_millis(self.inter_trial_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub stimuli_root: PathBuf,
    pub output_dir: PathBuf,
    pub plot_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            stimuli_root: PathBuf::from("audio"),
            output_dir: PathBuf::from("results"),
            plot_dir: PathBuf::from("plots"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub tasks: Vec<TaskConfig>,
    /// Trial runs per task, each with a fresh staircase
    pub runs: u32,
    pub limits: StopLimits,
    /// Number of final reversals averaged into the threshold
    pub threshold_window: usize,
    pub staircase: StaircaseVariant,
    pub practice: PracticeConfig,
    pub timing: TrialTiming,
    pub paths: Paths,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            tasks: TaskKind::ALL
                .into_iter()
                .map(TaskConfig::defaults_for)
                .collect(),
            runs: 2,
            limits: StopLimits::default(),
            threshold_window: DEFAULT_WINDOW,
            staircase: StaircaseVariant::default(),
            practice: PracticeConfig::default(),
            timing: TrialTiming::default(),
            paths: Paths::default(),
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON override file. Omitted fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            JndError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            JndError::configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(JndError::configuration("no tasks configured"));
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.task) {
                return Err(JndError::configuration(format!(
                    "task {} is configured twice",
                    task.task
                )));
            }
            task.validate()?;
        }
        if self.runs == 0 {
            return Err(JndError::configuration("at least one run per task is required"));
        }
        if self.threshold_window == 0 {
            return Err(JndError::configuration("threshold window must not be empty"));
        }
        if self.limits.max_trials == 0 {
            return Err(JndError::configuration("max_trials must be positive"));
        }
        if self.practice.required_correct == 0
            || self.practice.max_trials < self.practice.required_correct
        {
            return Err(JndError::configuration(format!(
                "practice needs {} correct responses within {} trials",
                self.practice.required_correct, self.practice.max_trials
            )));
        }
        Ok(())
    }

    pub fn task(&self, kind: TaskKind) -> Result<&TaskConfig> {
        self.tasks
            .iter()
            .find(|task| task.task == kind)
            .ok_or_else(|| JndError::configuration(format!("no configuration for task {kind}")))
    }

    pub fn task_kinds(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(|task| task.task).collect()
    }

    pub fn step_size(&self, kind: TaskKind, difference: f64) -> Result<f64> {
        Ok(self.task(kind)?.steps.step_size(difference))
    }
}
