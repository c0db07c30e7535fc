use std::fs;
use std::path::PathBuf;

use jnd_core::{JndError, Result, TaskKind};
use tracing::{info, warn};

use crate::config::ExperimentConfig;
use crate::resolver::{StimulusResolver, StimulusStore};

/// Result of a successful setup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub stimulus_dirs: Vec<(TaskKind, PathBuf)>,
    /// Output and plot directories that did not exist and were created
    pub created: Vec<PathBuf>,
    /// Tasks whose baseline or starting recording could not be found
    pub missing_recordings: Vec<(TaskKind, String)>,
}

/// Verifies the stimulus tree and prepares the output directories.
///
/// A missing stimuli root or task directory is a configuration error. Missing
/// baseline or starting recordings are only reported, the session itself
/// aborts on them.
pub fn check_setup(config: &ExperimentConfig, store: &dyn StimulusStore) -> Result<SetupReport> {
    let root = &config.paths.stimuli_root;
    if !root.is_dir() {
        return Err(JndError::configuration(format!(
            "stimuli directory {} does not exist, check paths.stimuli_root",
            root.display()
        )));
    }

    let mut report = SetupReport {
        stimulus_dirs: Vec::new(),
        created: Vec::new(),
        missing_recordings: Vec::new(),
    };
    for task in &config.tasks {
        let dir = task.stimulus_dir(root);
        if !dir.is_dir() {
            return Err(JndError::configuration(format!(
                "no stimulus directory for task {} at {}, create it or remove the task",
                task.task,
                dir.display()
            )));
        }
        report.stimulus_dirs.push((task.task, dir));

        let resolver = StimulusResolver::new(store, root, task);
        let start = task.baseline + task.initial_difference;
        for value in [task.baseline, start] {
            if let Err(err) = resolver.resolve(value) {
                warn!(task = %task.task, "{err}");
                report.missing_recordings.push((task.task, err.to_string()));
            }
        }
    }

    for dir in [&config.paths.output_dir, &config.paths.plot_dir] {
        if !dir.is_dir() {
            fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "created");
            report.created.push(dir.clone());
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Paths;
    use crate::resolver::FsStimulusStore;
    use std::path::Path;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jnd-setup-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config_in(base: &Path) -> ExperimentConfig {
        ExperimentConfig {
            paths: Paths {
                stimuli_root: base.join("audio"),
                output_dir: base.join("results"),
                plot_dir: base.join("plots"),
            },
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let base = scratch("no-root");
        let err = check_setup(&config_in(&base), &FsStimulusStore).unwrap_err();
        assert!(matches!(err, JndError::Configuration(_)));
    }

    #[test]
    fn missing_task_dir_is_a_configuration_error() {
        let base = scratch("no-task");
        fs::create_dir_all(base.join("audio").join("audio-pitch")).unwrap();
        let err = check_setup(&config_in(&base), &FsStimulusStore).unwrap_err();
        assert!(err.to_string().contains("audio-"));
    }

    #[test]
    fn creates_output_dirs_and_reports_missing_recordings() {
        let base = scratch("ok");
        for task in ["pitch", "FL", "pause"] {
            fs::create_dir_all(base.join("audio").join(format!("audio-{task}"))).unwrap();
        }
        fs::write(base.join("audio/audio-pause/lilli_lisa_ch_pause_0_000.wav"), b"").unwrap();
        fs::write(base.join("audio/audio-pause/lilli_lisa_ch_pause_0_550.wav"), b"").unwrap();

        let config = config_in(&base);
        let report = check_setup(&config, &FsStimulusStore).unwrap();
        assert_eq!(report.stimulus_dirs.len(), 3);
        assert_eq!(report.created.len(), 2);
        assert!(config.paths.output_dir.is_dir());
        assert!(config.paths.plot_dir.is_dir());
        assert_eq!(report.missing_recordings.len(), 4);
        assert!(report.missing_recordings.iter().all(|(task, _)| *task != TaskKind::Pause));

        let again = check_setup(&config, &FsStimulusStore).unwrap();
        assert!(again.created.is_empty());
        fs::remove_dir_all(&base).unwrap();
    }
}
