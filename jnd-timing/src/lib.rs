pub mod timer;

pub use timer::{HighPrecisionTimer, Timer, VirtualClock};
