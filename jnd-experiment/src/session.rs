use std::fmt;
use std::time::Duration;

use jnd_core::{Result, SessionKind, Side, StimulusId, TaskKind};
use jnd_timing::Timer;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::config::{ExperimentConfig, StopLimits};
use crate::log::TrialLogFactory;
use crate::participant::Participant;
use crate::resolver::{StimulusResolver, StimulusStore};
use crate::reversal::ReversalRecord;
use crate::sequencer::{AxbTriple, TrialSequencer};
use crate::state::{StaircaseController, StopReason};
use crate::summary::RunSummary;
use crate::threshold::ThresholdEstimate;
use crate::trial::{Trial, TrialTimestamps};

/// Identifies one staircase block: practice is run 0, trial runs count from 1.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub task: TaskKind,
    pub kind: SessionKind,
    pub run: u32,
}

impl SessionKey {
    pub fn practice(task: TaskKind) -> Self {
        Self {
            task,
            kind: SessionKind::Practice,
            run: 0,
        }
    }

    pub fn trial(task: TaskKind, run: u32) -> Self {
        Self {
            task,
            kind: SessionKind::Trial,
            run,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SessionKind::Practice => write!(f, "{} practice", self.task),
            SessionKind::Trial => write!(f, "{} run {}", self.task, self.run),
        }
    }
}

/// Plays a recording and returns once it has finished.
pub trait AudioPlayer {
    fn play_and_wait(&mut self, stimulus: &StimulusId) -> Result<Duration>;
}

/// Messages shown between blocks. Wording is up to the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Instructions { task: TaskKind, kind: SessionKind },
    RunBreak { task: TaskKind, completed: u32, total: u32 },
    TaskBreak { completed: usize, total: usize },
    Finished,
}

/// What the participant is asked to judge.
#[derive(Debug, Clone, Copy)]
pub struct ChoicePrompt<'t> {
    pub task: TaskKind,
    pub kind: SessionKind,
    /// One-based
    pub trial: usize,
    pub difference: f64,
    pub triple: &'t AxbTriple,
}

/// Screen and keyboard side of the experiment.
pub trait Presenter {
    fn show(&mut self, notice: &Notice) -> Result<()>;

    /// Waits for the participant and returns the name of the key pressed.
    fn choose(&mut self, prompt: &ChoicePrompt<'_>) -> Result<String>;

    /// Only called during practice.
    fn feedback(&mut self, correct: bool) -> Result<()>;
}

/// Receives the summary of every finished trial run.
pub trait RunReporter {
    fn report(&mut self, summary: &RunSummary) -> Result<()>;
}

/// External services a session calls into.
pub struct Collaborators<'a> {
    pub store: &'a dyn StimulusStore,
    pub player: &'a mut dyn AudioPlayer,
    pub presenter: &'a mut dyn Presenter,
    pub logs: &'a mut dyn TrialLogFactory,
    pub reporter: &'a mut dyn RunReporter,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub key: SessionKey,
    pub stop_reason: StopReason,
    pub trials: Vec<Trial>,
    pub summary: RunSummary,
}

impl SessionOutcome {
    pub fn reversals(&self) -> &[ReversalRecord] {
        &self.summary.reversals
    }

    pub fn threshold(&self) -> Option<&ThresholdEstimate> {
        self.summary.threshold.as_ref()
    }
}

/// Drives practice and trial blocks of one participant, one trial at a time.
pub struct SessionRunner<'a, T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    config: &'a ExperimentConfig,
    participant: Participant,
    timer: T,
    sequencer: TrialSequencer<R>,
    io: Collaborators<'a>,
}

impl<'a, T, R> SessionRunner<'a, T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(
        config: &'a ExperimentConfig,
        participant: Participant,
        timer: T,
        rng: R,
        io: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            participant,
            timer,
            sequencer: TrialSequencer::new(rng),
            io,
        }
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    /// Practice block with feedback, ends after enough correct responses.
    pub fn run_practice(&mut self, task: TaskKind) -> Result<SessionOutcome> {
        self.run_session(SessionKey::practice(task))
    }

    /// One trial run with a fresh staircase; the summary goes to the reporter.
    pub fn run_trials(&mut self, task: TaskKind, run: u32) -> Result<SessionOutcome> {
        let outcome = self.run_session(SessionKey::trial(task, run))?;
        self.io.reporter.report(&outcome.summary)?;
        Ok(outcome)
    }

    /// Practice followed by all trial runs of one task.
    pub fn run_task(&mut self, task: TaskKind) -> Result<Vec<SessionOutcome>> {
        let runs = self.config.runs;
        let mut outcomes = Vec::with_capacity(runs as usize + 1);

        self.io.presenter.show(&Notice::Instructions {
            task,
            kind: SessionKind::Practice,
        })?;
        outcomes.push(self.run_practice(task)?);

        self.io.presenter.show(&Notice::Instructions {
            task,
            kind: SessionKind::Trial,
        })?;
        for run in 1..=runs {
            outcomes.push(self.run_trials(task, run)?);
            if run < runs {
                self.io.presenter.show(&Notice::RunBreak {
                    task,
                    completed: run,
                    total: runs,
                })?;
            }
        }
        Ok(outcomes)
    }

    /// Every configured task in a shuffled order.
    pub fn run_experiment(&mut self) -> Result<Vec<SessionOutcome>> {
        let order = self.task_order();
        info!(
            subject = %self.participant.subject,
            order = ?order.iter().map(TaskKind::id).collect::<Vec<_>>(),
            "experiment started"
        );
        let mut outcomes = Vec::new();
        for (done, task) in order.iter().enumerate() {
            outcomes.extend(self.run_task(*task)?);
            if done + 1 < order.len() {
                self.io.presenter.show(&Notice::TaskBreak {
                    completed: done + 1,
                    total: order.len(),
                })?;
            }
        }
        self.io.presenter.show(&Notice::Finished)?;
        Ok(outcomes)
    }

    pub fn task_order(&mut self) -> Vec<TaskKind> {
        let mut order = self.config.task_kinds();
        order.shuffle(self.sequencer.rng_mut());
        order
    }

    fn limits(&self, kind: SessionKind) -> StopLimits {
        match kind {
            SessionKind::Practice => StopLimits {
                max_trials: self.config.practice.max_trials,
                ..self.config.limits
            },
            SessionKind::Trial => self.config.limits,
        }
    }

    fn run_session(&mut self, key: SessionKey) -> Result<SessionOutcome> {
        let config = self.config;
        let task = config.task(key.task)?;
        let resolver = StimulusResolver::new(self.io.store, &config.paths.stimuli_root, task);
        let baseline = resolver.resolve(task.baseline)?;

        let mut staircase = StaircaseController::new(task, config.staircase);
        let limits = self.limits(key.kind);
        let mut log = self.io.logs.open(&self.participant, &key)?;
        let origin = self.timer.now();
        let mut trials: Vec<Trial> = Vec::new();

        info!(session = %key, difference = staircase.difference(), "session started");

        let stop_reason = loop {
            if key.kind.is_practice()
                && trials.iter().filter(|t| t.correct).count() >= config.practice.required_correct
            {
                break StopReason::PracticeComplete;
            }
            if let Some(reason) = staircase.stop_reason(&limits) {
                break reason;
            }
            let test = resolver.resolve(staircase.test_value())?;
            if test == baseline {
                break StopReason::StimuliConverged;
            }

            let trial = self.run_trial(key, origin, &mut staircase, &baseline, &test)?;
            log.append(&trial.to_record(&self.participant, &key))?;
            self.timer.sleep(config.timing.inter_trial());
            trials.push(trial);
        };

        let summary = RunSummary::from_session(
            &self.participant,
            &key,
            stop_reason,
            &trials,
            staircase.reversal_records(),
            config.threshold_window,
        );
        match &summary.threshold {
            Some(threshold) => info!(
                session = %key,
                %stop_reason,
                trials = trials.len(),
                reversals = staircase.reversal_count(),
                mean = threshold.mean,
                median = threshold.median,
                "session finished"
            ),
            None => info!(
                session = %key,
                %stop_reason,
                trials = trials.len(),
                "session finished without reversals"
            ),
        }

        Ok(SessionOutcome {
            key,
            stop_reason,
            trials,
            summary,
        })
    }

    fn run_trial(
        &mut self,
        key: SessionKey,
        origin: u64,
        staircase: &mut StaircaseController,
        baseline: &StimulusId,
        test: &StimulusId,
    ) -> Result<Trial> {
        let timing = self.config.timing;
        let index = staircase.trial_index();
        let start = self.timer.now();
        let triple = self.sequencer.next_triple(baseline, test);

        let [a, x, b] = triple.playback_order();
        self.io.player.play_and_wait(a)?;
        self.timer.sleep(timing.inter_stimulus());
        self.io.player.play_and_wait(x)?;
        self.timer.sleep(timing.inter_stimulus());
        self.io.player.play_and_wait(b)?;
        self.timer.sleep(timing.response_delay());

        let key_name = self.io.presenter.choose(&ChoicePrompt {
            task: key.task,
            kind: key.kind,
            trial: index + 1,
            difference: staircase.difference(),
            triple: &triple,
        })?;
        let choice = Side::from_key(&key_name)?;
        let correct = choice == triple.correct_side;
        if key.kind.is_practice() {
            self.io.presenter.feedback(correct)?;
        }

        let step = staircase.apply(correct);
        let end = self.timer.now();
        debug!(
            session = %key,
            trial = index + 1,
            correct,
            difference = step.difference_before,
            next = step.difference_after,
            direction = %step.direction,
            reversals = step.reversals,
            "trial scored"
        );

        Ok(Trial {
            index,
            triple,
            choice,
            correct,
            step,
            timestamps: TrialTimestamps {
                start: start.saturating_sub(origin),
                end: end.saturating_sub(origin),
            },
        })
    }
}
