//! Adaptive staircase for prosodic just-noticeable-difference estimation.
//!
//! A session alternates between the [`sequencer`] (which recording goes where
//! in the AXB triple), the external playback and response collaborators, and
//! the [`state`] controller that moves the stimulus difference. Reversals are
//! counted by [`reversal`] and reduced to a threshold by [`threshold`].

pub mod config;
pub mod listener;
pub mod log;
pub mod participant;
pub mod resolver;
pub mod reversal;
pub mod sequencer;
pub mod session;
pub mod setup;
pub mod state;
pub mod step;
pub mod summary;
pub mod threshold;
pub mod trial;

pub use config::{
    ExperimentConfig, Paths, PracticeConfig, StaircaseVariant, StopLimits, TaskConfig,
    TrialTiming,
};
pub use listener::{SilentPlayer, SimulatedListener};
pub use log::{
    CsvLogFactory, CsvTrialLog, TrialLogFactory, TrialSink, read_trial_log, read_trial_records,
};
pub use participant::Participant;
pub use resolver::{
    FsStimulusStore, MemoryStimulusStore, StimulusResolver, StimulusStore, VirtualStimulusStore,
    format_value,
};
pub use reversal::{ReversalGrammar, ReversalRecord, ReversalTracker};
pub use sequencer::{AxbTriple, TrialSequencer};
pub use session::{
    AudioPlayer, ChoicePrompt, Collaborators, Notice, Presenter, RunReporter, SessionKey,
    SessionOutcome, SessionRunner,
};
pub use setup::{SetupReport, check_setup};
pub use state::{StaircaseController, StaircaseState, Step, StopReason, round_to};
pub use step::{StepBand, StepSizeTable};
pub use summary::RunSummary;
pub use threshold::{ThresholdEstimate, estimate};
pub use trial::{Trial, TrialTimestamps};
