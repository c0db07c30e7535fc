use jnd_core::{JndError, Result};
use serde::{Deserialize, Serialize};

/// Differences up to `upper` (inclusive) move by `step`. The last band of a
/// table has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBand {
    pub upper: Option<f64>,
    pub step: f64,
}

/// Calibrated step sizes of one task, ordered smallest bound first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSizeTable {
    bands: Vec<StepBand>,
}

impl StepSizeTable {
    pub fn new(bands: Vec<StepBand>) -> Result<Self> {
        let table = Self { bands };
        table.validate()?;
        Ok(table)
    }

    /// Builds a table from `(upper, step)` pairs plus the catch-all step.
    fn from_bounds(bounded: &[(f64, f64)], catch_all: f64) -> Self {
        let bands = bounded
            .iter()
            .map(|&(upper, step)| StepBand {
                upper: Some(upper),
                step,
            })
            .chain(std::iter::once(StepBand {
                upper: None,
                step: catch_all,
            }))
            .collect();
        Self { bands }
    }

    pub fn pitch() -> Self {
        Self::from_bounds(
            &[(0.242, 0.005), (0.362, 0.010), (1.262, 0.075), (4.862, 0.300)],
            0.750,
        )
    }

    pub fn pause() -> Self {
        Self::from_bounds(&[(0.075, 0.001), (0.150, 0.005), (0.250, 0.010)], 0.030)
    }

    pub fn final_lengthening() -> Self {
        Self::from_bounds(
            &[(0.0168, 0.0003), (0.0456, 0.0018), (0.0888, 0.0036)],
            0.0075,
        )
    }

    pub fn bands(&self) -> &[StepBand] {
        &self.bands
    }

    /// Step for the band `difference` falls in.
    pub fn step_size(&self, difference: f64) -> f64 {
        self.bands
            .iter()
            .find(|band| band.upper.is_none_or(|upper| difference <= upper))
            .map(|band| band.step)
            .unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        let Some((last, bounded)) = self.bands.split_last() else {
            return Err(JndError::configuration("step-size table has no bands"));
        };
        if last.upper.is_some() {
            return Err(JndError::configuration(
                "last step-size band must have no upper bound",
            ));
        }
        let mut previous: Option<&StepBand> = None;
        for band in bounded {
            let Some(upper) = band.upper else {
                return Err(JndError::configuration(
                    "only the last step-size band may omit its upper bound",
                ));
            };
            if let Some(prev) = previous {
                if prev.upper.is_some_and(|p| upper <= p) {
                    return Err(JndError::configuration(format!(
                        "step-size bounds must increase, {upper} follows {:?}",
                        prev.upper
                    )));
                }
                if band.step < prev.step {
                    return Err(JndError::configuration(format!(
                        "step {} is smaller than the step {} of a lower band",
                        band.step, prev.step
                    )));
                }
            }
            previous = Some(band);
        }
        for band in &self.bands {
            if !band.step.is_finite() || band.step < 0.0 {
                return Err(JndError::configuration(format!(
                    "invalid step size {}",
                    band.step
                )));
            }
        }
        if previous.is_some_and(|prev| last.step < prev.step) {
            return Err(JndError::configuration(
                "catch-all step is smaller than a bounded step",
            ));
        }
        Ok(())
    }
}
