use std::fmt;

use jnd_core::{Direction, StaircasePhase, TaskKind};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{StaircaseVariant, StopLimits, TaskConfig};
use crate::reversal::{ReversalRecord, ReversalTracker};
use crate::step::StepSizeTable;

/// Mutable state of one staircase run. Changes exactly once per trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaircaseState {
    pub difference: f64,
    /// Direction of the most recent step
    pub direction: Direction,
    pub phase: StaircasePhase,
    /// Correct responses since the last downward step while tracking
    pub correct_streak: u32,
    /// Trials completed so far
    pub trial_index: usize,
}

/// Outcome of scoring one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub trial: usize,
    pub correct: bool,
    pub direction: Direction,
    pub difference_before: f64,
    pub difference_after: f64,
    pub step_size: f64,
    pub reversal: bool,
    /// Reversal count including this trial
    pub reversals: u32,
    /// Phase the response was scored in
    pub phase: StaircasePhase,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxTrials,
    MaxReversals,
    /// Test and baseline resolve to the same recording
    StimuliConverged,
    PracticeComplete,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::MaxTrials => "trial limit reached",
            StopReason::MaxReversals => "reversal limit exceeded",
            StopReason::StimuliConverged => "test stimulus equals baseline",
            StopReason::PracticeComplete => "practice criterion met",
        })
    }
}

/// Rounds to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Adaptive 1-down-1-up / 2-down-1-up staircase over a stimulus difference.
#[derive(Debug, Clone)]
pub struct StaircaseController {
    task: TaskKind,
    baseline: f64,
    ceiling: f64,
    decimals: u32,
    steps: StepSizeTable,
    variant: StaircaseVariant,
    state: StaircaseState,
    reversals: ReversalTracker,
}

impl StaircaseController {
    pub fn new(task: &TaskConfig, variant: StaircaseVariant) -> Self {
        Self {
            task: task.task,
            baseline: task.baseline,
            ceiling: task.initial_difference,
            decimals: task.difference_decimals,
            steps: task.steps.clone(),
            variant,
            state: StaircaseState {
                difference: task.initial_difference,
                direction: Direction::None,
                phase: StaircasePhase::Searching,
                correct_streak: 0,
                trial_index: 0,
            },
            reversals: ReversalTracker::new(variant.reversal_grammar),
        }
    }

    /// Scores one response and moves the difference.
    pub fn apply(&mut self, correct: bool) -> Step {
        let trial = self.state.trial_index;
        let phase = self.state.phase;
        let before = self.state.difference;
        let step_size = self.steps.step_size(before);

        let (direction, after) = if correct {
            match phase {
                StaircasePhase::Searching => (Direction::Down, before - step_size),
                StaircasePhase::Tracking => {
                    self.state.correct_streak += 1;
                    if self.state.correct_streak >= phase.correct_needed() {
                        self.state.correct_streak = 0;
                        (Direction::Down, before - step_size)
                    } else {
                        (Direction::None, before)
                    }
                }
            }
        } else {
            if let Some(next) = phase.next() {
                info!(
                    task = %self.task,
                    trial = trial + 1,
                    difference = before,
                    "first error, switching to 2-down-1-up"
                );
                self.state.phase = next;
            }
            self.state.correct_streak = 0;
            if self.at_ceiling(before) {
                (Direction::None, before)
            } else if self.variant.clamp_at_ceiling {
                (Direction::Up, (before + step_size).min(self.ceiling))
            } else {
                (Direction::Up, before + step_size)
            }
        };

        let after = round_to(after, self.decimals).max(0.0);
        let (reversal, reversals) = self.reversals.update(trial, correct, direction, before);

        self.state.difference = after;
        self.state.direction = direction;
        self.state.trial_index += 1;

        Step {
            trial,
            correct,
            direction,
            difference_before: before,
            difference_after: after,
            step_size,
            reversal,
            reversals,
            phase,
        }
    }

    fn at_ceiling(&self, difference: f64) -> bool {
        let half_unit = 0.5 * 10f64.powi(-(self.decimals as i32));
        self.variant.clamp_at_ceiling && difference >= self.ceiling - half_unit
    }

    /// Trial or reversal limit reached. Stimulus convergence is decided by
    /// the caller, which owns the resolved recordings.
    ///
    /// `max_trials` counts the trials a run may present, so a run of 120
    /// presents exactly 120. `max_reversals` is a ceiling the count must
    /// exceed, so the run ends on the 15th reversal of 14.
    pub fn stop_reason(&self, limits: &StopLimits) -> Option<StopReason> {
        if self.state.trial_index >= limits.max_trials {
            Some(StopReason::MaxTrials)
        } else if self.reversals.count() > limits.max_reversals {
            Some(StopReason::MaxReversals)
        } else {
            None
        }
    }

    pub fn difference(&self) -> f64 {
        self.state.difference
    }

    pub fn phase(&self) -> StaircasePhase {
        self.state.phase
    }

    pub fn trial_index(&self) -> usize {
        self.state.trial_index
    }

    /// Stimulus value of the test recording at the current difference.
    pub fn test_value(&self) -> f64 {
        self.baseline + self.state.difference
    }

    pub fn reversal_count(&self) -> u32 {
        self.reversals.count()
    }

    pub fn reversal_records(&self) -> &[ReversalRecord] {
        self.reversals.records()
    }
}
