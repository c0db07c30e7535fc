pub mod error;
pub mod phase;
pub mod stimulus;
pub mod task;
pub mod trial;

pub use error::{JndError, Result};
pub use phase::{SessionKind, StaircasePhase};
pub use stimulus::StimulusId;
pub use task::TaskKind;
pub use trial::{CSV_HEADER, Direction, Side, TrialRecord};
