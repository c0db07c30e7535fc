use serde::{Deserialize, Serialize};

/// Number of final reversals averaged when nothing else is configured.
pub const DEFAULT_WINDOW: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEstimate {
    pub mean: f64,
    pub median: f64,
    /// The reversal differences the estimate was computed from
    pub selected: Vec<f64>,
    /// Requested window; `selected` is shorter when fewer reversals exist
    pub window: usize,
}

/// Mean and median of the last `window` reversal differences.
///
/// Returns `None` when there are no reversals or the window is empty.
pub fn estimate(reversals: &[f64], window: usize) -> Option<ThresholdEstimate> {
    if reversals.is_empty() || window == 0 {
        return None;
    }
    let selected = reversals[reversals.len().saturating_sub(window)..].to_vec();
    let mean = selected.iter().sum::<f64>() / selected.len() as f64;

    let mut sorted = selected.clone();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(ThresholdEstimate {
        mean,
        median,
        selected,
        window,
    })
}
