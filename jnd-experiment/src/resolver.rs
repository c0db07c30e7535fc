use std::collections::HashSet;
use std::path::{Path, PathBuf};

use jnd_core::{JndError, Result, StimulusId, TaskKind};

use crate::config::TaskConfig;

/// Storage collaborator answering whether a recording exists.
pub trait StimulusStore {
    fn exists(&self, path: &Path) -> bool;
}

/// Recordings on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStimulusStore;

impl StimulusStore for FsStimulusStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Store that has every recording. Used for simulated sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualStimulusStore;

impl StimulusStore for VirtualStimulusStore {
    fn exists(&self, _path: &Path) -> bool {
        true
    }
}

/// Fixed set of known recordings.
#[derive(Debug, Clone, Default)]
pub struct MemoryStimulusStore {
    paths: HashSet<PathBuf>,
}

impl MemoryStimulusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for MemoryStimulusStore {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl StimulusStore for MemoryStimulusStore {
    fn exists(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}

/// Fixed-width file name suffix for a stimulus value: `0.05` at 3 decimals
/// becomes `0_050`. Values that round to zero never carry a sign.
pub fn format_value(value: f64, decimals: u32) -> String {
    let formatted = format!("{:.*}", decimals as usize, value);
    let formatted = match formatted.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => unsigned.to_string(),
        _ => formatted,
    };
    formatted.replace('.', "_")
}

/// Maps a stimulus value of one task to the recording that encodes it.
pub struct StimulusResolver<'s> {
    store: &'s dyn StimulusStore,
    prefix: PathBuf,
    task: TaskKind,
    decimals: u32,
}

impl<'s> StimulusResolver<'s> {
    pub fn new(store: &'s dyn StimulusStore, stimuli_root: &Path, task: &TaskConfig) -> Self {
        Self {
            store,
            prefix: task.path_prefix(stimuli_root),
            task: task.task,
            decimals: task.stimulus_decimals,
        }
    }

    /// Path the recording for `value` is expected at, checked or not.
    pub fn path_for(&self, value: f64) -> PathBuf {
        let mut name = self.prefix.as_os_str().to_owned();
        name.push(format!("_{}.wav", format_value(value, self.decimals)));
        PathBuf::from(name)
    }

    pub fn resolve(&self, value: f64) -> Result<StimulusId> {
        let path = self.path_for(value);
        if !self.store.exists(&path) {
            return Err(JndError::StimulusNotFound {
                task: self.task,
                value,
                path: path.display().to_string(),
            });
        }
        Ok(StimulusId::from_path(&path))
    }
}
