#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use jnd_core::{Result, StimulusId, TrialRecord};
use jnd_experiment::{
    AudioPlayer, ChoicePrompt, Collaborators, ExperimentConfig, Notice, Participant, Presenter,
    RunReporter, RunSummary, SessionKey, SessionRunner, StimulusStore, TrialLogFactory,
    TrialSink,
};
use jnd_timing::{Timer, VirtualClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub const RECORDING: Duration = Duration::from_millis(500);

pub fn participant() -> Participant {
    Participant {
        subject: "s01".into(),
        date: "2024-03-28".into(),
        clock: "10h15".into(),
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Correct,
    Incorrect,
    Key(&'static str),
}

/// Answers from a script, then with a fixed default.
#[derive(Debug)]
pub struct ScriptedPresenter {
    script: VecDeque<Answer>,
    default: Answer,
    pub notices: Vec<Notice>,
    pub feedback: Vec<bool>,
    /// `(trial, difference)` of every prompt
    pub prompts: Vec<(usize, f64)>,
}

impl ScriptedPresenter {
    pub fn new(script: impl IntoIterator<Item = Answer>, default: Answer) -> Self {
        Self {
            script: script.into_iter().collect(),
            default,
            notices: Vec::new(),
            feedback: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub fn always(answer: Answer) -> Self {
        Self::new([], answer)
    }
}

impl Presenter for ScriptedPresenter {
    fn show(&mut self, notice: &Notice) -> Result<()> {
        self.notices.push(notice.clone());
        Ok(())
    }

    fn choose(&mut self, prompt: &ChoicePrompt<'_>) -> Result<String> {
        self.prompts.push((prompt.trial, prompt.difference));
        let answer = self.script.pop_front().unwrap_or_else(|| self.default.clone());
        let key = match answer {
            Answer::Correct => prompt.triple.correct_side.as_str(),
            Answer::Incorrect => prompt.triple.correct_side.opposite().as_str(),
            Answer::Key(key) => key,
        };
        Ok(key.to_string())
    }

    fn feedback(&mut self, correct: bool) -> Result<()> {
        self.feedback.push(correct);
        Ok(())
    }
}

/// Player that advances a virtual clock and remembers what it played.
pub struct RecordingPlayer {
    clock: VirtualClock,
    length: Duration,
    pub played: Vec<StimulusId>,
}

impl RecordingPlayer {
    pub fn new(clock: VirtualClock, length: Duration) -> Self {
        Self {
            clock,
            length,
            played: Vec::new(),
        }
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play_and_wait(&mut self, stimulus: &StimulusId) -> Result<Duration> {
        self.played.push(stimulus.clone());
        self.clock.sleep(self.length);
        Ok(self.length)
    }
}

type Shared = Rc<RefCell<HashMap<SessionKey, Vec<TrialRecord>>>>;

/// Keeps every session's rows in memory.
#[derive(Default)]
pub struct MemoryLogs {
    rows: Shared,
}

impl MemoryLogs {
    pub fn rows(&self, key: &SessionKey) -> Vec<TrialRecord> {
        self.rows.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn opened(&self, key: &SessionKey) -> bool {
        self.rows.borrow().contains_key(key)
    }
}

struct MemorySink {
    rows: Shared,
    key: SessionKey,
}

impl TrialSink for MemorySink {
    fn append(&mut self, record: &TrialRecord) -> Result<()> {
        self.rows
            .borrow_mut()
            .entry(self.key)
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

impl TrialLogFactory for MemoryLogs {
    fn open(&mut self, _: &Participant, key: &SessionKey) -> Result<Box<dyn TrialSink>> {
        self.rows.borrow_mut().insert(*key, Vec::new());
        Ok(Box::new(MemorySink {
            rows: Rc::clone(&self.rows),
            key: *key,
        }))
    }
}

#[derive(Default)]
pub struct CollectingReporter {
    pub summaries: Vec<RunSummary>,
}

impl RunReporter for CollectingReporter {
    fn report(&mut self, summary: &RunSummary) -> Result<()> {
        self.summaries.push(summary.clone());
        Ok(())
    }
}

/// Owns the collaborators so they can be inspected after a runner is done.
pub struct Harness {
    pub clock: VirtualClock,
    pub player: RecordingPlayer,
    pub presenter: ScriptedPresenter,
    pub logs: MemoryLogs,
    pub reporter: CollectingReporter,
}

impl Harness {
    pub fn new(presenter: ScriptedPresenter) -> Self {
        let clock = VirtualClock::new();
        Self {
            player: RecordingPlayer::new(clock.clone(), RECORDING),
            clock,
            presenter,
            logs: MemoryLogs::default(),
            reporter: CollectingReporter::default(),
        }
    }

    pub fn run<T>(
        &mut self,
        config: &ExperimentConfig,
        store: &dyn StimulusStore,
        f: impl FnOnce(&mut SessionRunner<'_, VirtualClock, StdRng>) -> Result<T>,
    ) -> Result<T> {
        let mut runner = SessionRunner::new(
            config,
            participant(),
            self.clock.clone(),
            StdRng::seed_from_u64(42),
            Collaborators {
                store,
                player: &mut self.player,
                presenter: &mut self.presenter,
                logs: &mut self.logs,
                reporter: &mut self.reporter,
            },
        );
        f(&mut runner)
    }
}
