use jnd_core::Direction;
use serde::{Deserialize, Serialize};

/// Rule deciding which trials count as reversals.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalGrammar {
    /// Correct then incorrect, or incorrect-correct-correct
    CorrectnessPattern,
    /// Up after down or down after up, looking back through plateaus
    #[default]
    DirectionPattern,
}

/// Difference at which the staircase reversed.
#[derive(Copy, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalRecord {
    /// Zero-based trial index
    pub trial: usize,
    /// Difference the reversing trial was presented at
    pub difference: f64,
}

/// Reversal test over the response history, current trial last.
///
/// The session is treated as if it were preceded by a correct response, so an
/// incorrect first trial is a reversal.
pub fn correctness_reversal(history: &[bool]) -> bool {
    matches!(history, [false] | [.., true, false] | [.., false, true, true])
}

/// Reversal test over the direction history, current trial last.
pub fn direction_reversal(history: &[Direction]) -> bool {
    let Some((current, earlier)) = history.split_last() else {
        return false;
    };
    if !current.is_move() {
        return false;
    }
    earlier
        .iter()
        .rev()
        .find(|direction| direction.is_move())
        .is_some_and(|previous| previous != current)
}

/// Counts reversals of one staircase run.
#[derive(Debug, Clone, Default)]
pub struct ReversalTracker {
    grammar: ReversalGrammar,
    corrects: Vec<bool>,
    directions: Vec<Direction>,
    records: Vec<ReversalRecord>,
}

impl ReversalTracker {
    pub fn new(grammar: ReversalGrammar) -> Self {
        Self {
            grammar,
            ..Self::default()
        }
    }

    /// Appends one scored trial and returns whether it reversed the staircase
    /// together with the running count.
    ///
    /// An incorrect response that left the difference in place (clamped at
    /// the ceiling) never counts, whatever the grammar.
    pub fn update(
        &mut self,
        trial: usize,
        correct: bool,
        direction: Direction,
        difference: f64,
    ) -> (bool, u32) {
        self.corrects.push(correct);
        self.directions.push(direction);

        let clamped = !correct && !direction.is_move();
        let reversal = !clamped
            && match self.grammar {
                ReversalGrammar::CorrectnessPattern => correctness_reversal(&self.corrects),
                ReversalGrammar::DirectionPattern => direction_reversal(&self.directions),
            };
        if reversal {
            self.records.push(ReversalRecord { trial, difference });
        }
        (reversal, self.count())
    }

    pub fn count(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn records(&self) -> &[ReversalRecord] {
        &self.records
    }

    /// Reversal differences in trial order, the input of the threshold.
    pub fn differences(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.difference).collect()
    }
}
