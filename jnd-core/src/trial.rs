use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::JndError;
use crate::phase::SessionKind;
use crate::task::TaskKind;

/// Response side. Left marks the first recording as the odd one out, right
/// the third.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Maps a key name delivered by the response collaborator.
    pub fn from_key(key: &str) -> Result<Self, JndError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(JndError::InvalidResponse {
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staircase move made after a trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

impl Direction {
    /// `None` is a plateau: the difference stayed where it was.
    pub fn is_move(&self) -> bool {
        !matches!(self, Direction::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column order and names of the per-trial log, as existing analysis scripts
/// read them.
pub const CSV_HEADER: [&str; 18] = [
    "subject",
    "date",
    "task",
    "session_type",
    "run",
    "trial",
    "start_time",
    "end_time",
    "duration",
    "recording_A",
    "recording_X",
    "recording_B",
    "response",
    "correct",
    "difference",
    "step_size",
    "reversals",
    "direction",
];

/// One persisted row of the trial log. Field order matches [`CSV_HEADER`].
///
/// Times are seconds since the start of the session; `difference` is the
/// difference the trial was presented at and `reversals` the count after
/// the trial was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub subject: String,
    pub date: String,
    pub task: TaskKind,
    pub session_type: SessionKind,
    pub run: u32,
    pub trial: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    #[serde(rename = "recording_A")]
    pub recording_a: String,
    #[serde(rename = "recording_X")]
    pub recording_x: String,
    #[serde(rename = "recording_B")]
    pub recording_b: String,
    pub response: Side,
    pub correct: bool,
    pub difference: f64,
    pub step_size: f64,
    pub reversals: u32,
    pub direction: Direction,
}
