use std::fmt;
use std::path::Path;

pub use string_cache::DefaultAtom as Atom;

/// Canonical identifier of a stimulus recording: its resolved path.
///
/// Interned, because the same two or three recordings are compared and cloned
/// on every trial of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StimulusId(Atom);

impl StimulusId {
    pub fn new(path: &str) -> Self {
        StimulusId(Atom::from(path))
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(self.as_str())
    }

    /// Final path component, used in trial logs.
    pub fn file_name(&self) -> &str {
        self.as_path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.as_str())
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
