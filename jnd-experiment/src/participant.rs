use chrono::{Local, NaiveDateTime};
use jnd_core::{JndError, Result};
use serde::{Deserialize, Serialize};

/// Who is being tested and when the session started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub subject: String,
    /// `yyyy-mm-dd`
    pub date: String,
    /// `HHhMM`, distinguishes sessions of one subject on the same day
    pub clock: String,
}

impl Participant {
    pub fn new(subject: impl Into<String>, started: NaiveDateTime) -> Result<Self> {
        let participant = Self {
            subject: subject.into().trim().to_string(),
            date: started.format("%Y-%m-%d").to_string(),
            clock: started.format("%Hh%M").to_string(),
        };
        participant.validate()?;
        Ok(participant)
    }

    pub fn now(subject: impl Into<String>) -> Result<Self> {
        Self::new(subject, Local::now().naive_local())
    }

    /// The subject id ends up in file names, so it must be a single plain
    /// path component.
    pub fn validate(&self) -> Result<()> {
        if self.subject.is_empty() {
            return Err(JndError::configuration("subject id is empty"));
        }
        let bad = |c: char| c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '.');
        if self.subject.chars().any(bad) {
            return Err(JndError::configuration(format!(
                "subject id {:?} may not contain whitespace, dots or path separators",
                self.subject
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 28)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .unwrap()
    }

    #[test]
    fn formats_date_and_clock() {
        let participant = Participant::new(" s07 ", started()).unwrap();
        assert_eq!(participant.subject, "s07");
        assert_eq!(participant.date, "2024-03-28");
        assert_eq!(participant.clock, "09h05");
    }

    #[test]
    fn rejects_unusable_subject_ids() {
        assert!(Participant::new("", started()).is_err());
        assert!(Participant::new("../s07", started()).is_err());
        assert!(Participant::new("s 07", started()).is_err());
    }
}
