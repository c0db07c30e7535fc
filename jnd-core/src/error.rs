use thiserror::Error;

use crate::task::TaskKind;

pub type Result<T, E = JndError> = std::result::Result<T, E>;

/// Errors raised while configuring or running a staircase session.
///
/// None of these are retried: a missing stimulus or a bad configuration is a
/// setup defect, so every variant aborts the session it occurs in.
#[derive(Debug, Error)]
pub enum JndError {
    /// Invalid or incomplete configuration, reported at startup
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No recording exists for the requested difference value
    #[error("no stimulus found for task {task} at value {value}: {path}")]
    StimulusNotFound {
        task: TaskKind,
        value: f64,
        path: String,
    },

    /// The response collaborator delivered something other than left/right
    #[error("invalid response {key:?}, expected 'left' or 'right'")]
    InvalidResponse { key: String },

    /// The playback collaborator could not play a recording
    #[error("failed to play {stimulus}: {reason}")]
    Playback { stimulus: String, reason: String },

    /// Writing or reading a trial log, summary or plot failed
    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JndError {
    pub fn configuration(message: impl Into<String>) -> Self {
        JndError::Configuration(message.into())
    }

    pub fn persistence(
        what: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        JndError::Persistence {
            what: what.into(),
            source: source.into(),
        }
    }

    /// Fatal to the whole run rather than a single trial.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            JndError::Configuration(_) | JndError::StimulusNotFound { .. }
        )
    }
}
