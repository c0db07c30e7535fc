use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JndError;

/// Prosodic cue whose threshold is measured.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    /// f0 rise from the first to the second syllable
    #[serde(rename = "pitch")]
    Pitch,
    /// Final lengthening of the second vowel
    #[serde(rename = "FL")]
    FinalLengthening,
    /// Pause between two coordinated names
    #[serde(rename = "pause")]
    Pause,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [
        TaskKind::Pitch,
        TaskKind::FinalLengthening,
        TaskKind::Pause,
    ];

    /// Identifier used in file names, logs and configuration.
    pub fn id(&self) -> &'static str {
        match self {
            TaskKind::Pitch => "pitch",
            TaskKind::FinalLengthening => "FL",
            TaskKind::Pause => "pause",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TaskKind {
    type Err = JndError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|task| task.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JndError::configuration(format!("no configuration for task {s:?}")))
    }
}
