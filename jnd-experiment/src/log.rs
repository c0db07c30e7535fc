use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use jnd_core::{CSV_HEADER, JndError, Result, SessionKind, TrialRecord};
use tracing::info;

use crate::participant::Participant;
use crate::session::SessionKey;

/// Append-only destination of one session's trial records.
pub trait TrialSink {
    /// Appends and flushes one record. It must be durable before the next
    /// trial starts.
    fn append(&mut self, record: &TrialRecord) -> Result<()>;
}

/// Opens one sink per session.
pub trait TrialLogFactory {
    fn open(
        &mut self,
        participant: &Participant,
        key: &SessionKey,
    ) -> Result<Box<dyn TrialSink>>;
}

/// CSV trial log with a fixed header.
pub struct CsvTrialLog<W: Write> {
    writer: csv::Writer<W>,
    what: String,
}

impl<W: Write> CsvTrialLog<W> {
    /// Writes the header immediately, so even an aborted session leaves a
    /// well-formed file.
    pub fn new(inner: W, what: impl Into<String>) -> Result<Self> {
        let what = what.into();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| JndError::persistence(what.clone(), e))?;
        writer
            .flush()
            .map_err(|e| JndError::persistence(what.clone(), e))?;
        Ok(Self { writer, what })
    }

    pub fn into_inner(self) -> Result<W> {
        let what = self.what;
        self.writer
            .into_inner()
            .map_err(|e| JndError::persistence(what, e.into_error()))
    }
}

impl<W: Write> TrialSink for CsvTrialLog<W> {
    fn append(&mut self, record: &TrialRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| JndError::persistence(self.what.clone(), e))?;
        self.writer
            .flush()
            .map_err(|e| JndError::persistence(self.what.clone(), e))
    }
}

/// File whose `flush` also forces the data to disk.
struct DurableFile(File);

impl Write for DurableFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.sync_data()
    }
}

/// Writes `JND_{task}_{subject}_{date}_{clock}_{practice|run_N}.csv` files
/// into one output directory.
#[derive(Debug, Clone)]
pub struct CsvLogFactory {
    dir: PathBuf,
}

impl CsvLogFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(participant: &Participant, key: &SessionKey) -> String {
        let session = match key.kind {
            SessionKind::Practice => "practice".to_string(),
            SessionKind::Trial => format!("run_{}", key.run),
        };
        format!(
            "JND_{}_{}_{}_{}_{}.csv",
            key.task, participant.subject, participant.date, participant.clock, session
        )
    }

    pub fn path_for(&self, participant: &Participant, key: &SessionKey) -> PathBuf {
        self.dir.join(Self::file_name(participant, key))
    }
}

impl TrialLogFactory for CsvLogFactory {
    fn open(
        &mut self,
        participant: &Participant,
        key: &SessionKey,
    ) -> Result<Box<dyn TrialSink>> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(participant, key);
        let what = path.display().to_string();
        // never overwrite the log of an earlier session
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| JndError::persistence(what.clone(), e))?;
        info!(path = %what, "trial log opened");
        Ok(Box::new(CsvTrialLog::new(DurableFile(file), what)?))
    }
}

/// Parses a trial log written by [`CsvTrialLog`].
pub fn read_trial_records<R: Read>(reader: R) -> Result<Vec<TrialRecord>> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .collect::<std::result::Result<Vec<TrialRecord>, _>>()
        .map_err(|e| JndError::persistence("trial log", e))
}

pub fn read_trial_log(path: &Path) -> Result<Vec<TrialRecord>> {
    let file = File::open(path).map_err(|e| JndError::persistence(path.display().to_string(), e))?;
    read_trial_records(file)
}
