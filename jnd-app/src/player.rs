use std::process::{Command, Stdio};
use std::time::Duration;

use jnd_core::{JndError, Result, StimulusId};
use jnd_experiment::AudioPlayer;
use jnd_timing::Timer;
use tracing::debug;

/// Plays recordings through an external command such as `aplay` and blocks
/// until it exits.
#[derive(Debug, Clone)]
pub struct CommandPlayer<T: Timer> {
    program: String,
    args: Vec<String>,
    timer: T,
}

impl<T: Timer> CommandPlayer<T> {
    /// `command` is split on whitespace; the recording path is appended.
    pub fn new(command: &str, timer: T) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| JndError::configuration("player command is empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
            timer,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl<T: Timer> AudioPlayer for CommandPlayer<T> {
    fn play_and_wait(&mut self, stimulus: &StimulusId) -> Result<Duration> {
        let started = self.timer.now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(stimulus.as_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| JndError::Playback {
                stimulus: stimulus.to_string(),
                reason: format!("cannot start {}: {e}", self.program),
            })?;
        if !output.status.success() {
            return Err(JndError::Playback {
                stimulus: stimulus.to_string(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        let elapsed = self.timer.elapsed(started);
        debug!(stimulus = stimulus.file_name(), ?elapsed, "played");
        Ok(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jnd_timing::HighPrecisionTimer;

    #[test]
    fn splits_program_and_arguments() {
        let player = CommandPlayer::new("aplay -q", HighPrecisionTimer::new()).unwrap();
        assert_eq!(player.program(), "aplay");
        assert_eq!(player.args, vec!["-q".to_string()]);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandPlayer::new("  ", HighPrecisionTimer::new()).is_err());
    }

    #[test]
    fn missing_program_is_a_playback_error() {
        let mut player =
            CommandPlayer::new("jnd-no-such-player", HighPrecisionTimer::new()).unwrap();
        let err = player
            .play_and_wait(&StimulusId::new("audio/audio-pitch/x.wav"))
            .unwrap_err();
        assert!(matches!(err, JndError::Playback { .. }));
    }
}
