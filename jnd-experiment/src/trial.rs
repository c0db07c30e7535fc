use jnd_core::{Side, TrialRecord};

use crate::participant::Participant;
use crate::sequencer::AxbTriple;
use crate::session::SessionKey;
use crate::state::Step;

/// Nanoseconds since the session clock started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialTimestamps {
    pub start: u64,
    pub end: u64,
}

impl TrialTimestamps {
    pub fn duration_ns(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// One completed AXB trial, immutable once scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    /// Zero-based position in the session
    pub index: usize,
    pub triple: AxbTriple,
    pub choice: Side,
    pub correct: bool,
    pub step: Step,
    pub timestamps: TrialTimestamps,
}

fn seconds(ns: u64) -> f64 {
    ns as f64 / 1e9
}

impl Trial {
    pub fn to_record(&self, participant: &Participant, key: &SessionKey) -> TrialRecord {
        TrialRecord {
            subject: participant.subject.clone(),
            date: participant.date.clone(),
            task: key.task,
            session_type: key.kind,
            run: key.run,
            trial: self.index + 1,
            start_time: seconds(self.timestamps.start),
            end_time: seconds(self.timestamps.end),
            duration: seconds(self.timestamps.duration_ns()),
            recording_a: self.triple.a.file_name().to_string(),
            recording_x: self.triple.x.file_name().to_string(),
            recording_b: self.triple.b.file_name().to_string(),
            response: self.choice,
            correct: self.correct,
            difference: self.step.difference_before,
            step_size: self.step.step_size,
            reversals: self.step.reversals,
            direction: self.step.direction,
        }
    }
}
