use jnd_core::{JndError, Result, SessionKind, TaskKind, TrialRecord};
use serde::{Deserialize, Serialize};

use crate::participant::Participant;
use crate::reversal::{ReversalGrammar, ReversalRecord, ReversalTracker};
use crate::session::SessionKey;
use crate::state::StopReason;
use crate::threshold::{ThresholdEstimate, estimate};
use crate::trial::Trial;

/// Everything needed to report and plot one staircase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub subject: String,
    pub date: String,
    pub task: TaskKind,
    pub session_type: SessionKind,
    pub run: u32,
    /// `None` when rebuilt from a log, which does not record why it ended
    pub stop_reason: Option<StopReason>,
    pub trials: usize,
    /// Difference each trial was presented at
    pub differences: Vec<f64>,
    pub correct: Vec<bool>,
    pub reversals: Vec<ReversalRecord>,
    pub threshold: Option<ThresholdEstimate>,
}

impl RunSummary {
    pub fn from_session(
        participant: &Participant,
        key: &SessionKey,
        stop_reason: StopReason,
        trials: &[Trial],
        reversals: &[ReversalRecord],
        window: usize,
    ) -> Self {
        let differences: Vec<f64> = reversals.iter().map(|r| r.difference).collect();
        Self {
            subject: participant.subject.clone(),
            date: participant.date.clone(),
            task: key.task,
            session_type: key.kind,
            run: key.run,
            stop_reason: Some(stop_reason),
            trials: trials.len(),
            differences: trials.iter().map(|t| t.step.difference_before).collect(),
            correct: trials.iter().map(|t| t.correct).collect(),
            reversals: reversals.to_vec(),
            threshold: estimate(&differences, window),
        }
    }

    /// Rebuilds a summary from a persisted log by replaying its responses
    /// and directions through `grammar`.
    pub fn from_records(
        records: &[TrialRecord],
        grammar: ReversalGrammar,
        window: usize,
    ) -> Result<Self> {
        let Some(first) = records.first() else {
            return Err(JndError::configuration("trial log has no rows"));
        };
        let mut tracker = ReversalTracker::new(grammar);
        for (index, record) in records.iter().enumerate() {
            tracker.update(index, record.correct, record.direction, record.difference);
        }
        Ok(Self {
            subject: first.subject.clone(),
            date: first.date.clone(),
            task: first.task,
            session_type: first.session_type,
            run: first.run,
            stop_reason: None,
            trials: records.len(),
            differences: records.iter().map(|r| r.difference).collect(),
            correct: records.iter().map(|r| r.correct).collect(),
            reversals: tracker.records().to_vec(),
            threshold: estimate(&tracker.differences(), window),
        })
    }

    /// Zero-based indices of the reversing trials.
    pub fn reversal_trials(&self) -> Vec<usize> {
        self.reversals.iter().map(|r| r.trial).collect()
    }

    /// `{subject}_{date}_{task}_{run}`, the stem of the plot and JSON files.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}_{}", self.subject, self.date, self.task, self.run)
    }
}
