use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule set the staircase is following.
///
/// The staircase starts in `Searching` (1-down-1-up) and moves to `Tracking`
/// (2-down-1-up) on the first incorrect response. There is no way back.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaircasePhase {
    #[default]
    Searching,
    Tracking,
}

impl StaircasePhase {
    /// Consecutive correct responses needed before the difference goes down.
    pub fn correct_needed(&self) -> u32 {
        match self {
            StaircasePhase::Searching => 1,
            StaircasePhase::Tracking => 2,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            StaircasePhase::Searching => Some(StaircasePhase::Tracking),
            StaircasePhase::Tracking => None,
        }
    }
}

/// Kind of block a staircase runs in.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Practice,
    Trial,
}

impl SessionKind {
    pub fn is_practice(&self) -> bool {
        matches!(self, SessionKind::Practice)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Practice => "practice",
            SessionKind::Trial => "trial",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
