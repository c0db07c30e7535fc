use std::collections::VecDeque;

use jnd_core::{Side, StimulusId};
use rand::Rng;
use tracing::warn;

const MAX_RESAMPLES: usize = 100;

/// Recordings of one AXB trial in playback order.
///
/// `x` always repeats one of its neighbours; `correct_side` points at the
/// other one, the odd one out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxbTriple {
    pub a: StimulusId,
    pub x: StimulusId,
    pub b: StimulusId,
    pub correct_side: Side,
}

impl AxbTriple {
    pub fn odd_one(&self) -> &StimulusId {
        match self.correct_side {
            Side::Left => &self.a,
            Side::Right => &self.b,
        }
    }

    pub fn playback_order(&self) -> [&StimulusId; 3] {
        [&self.a, &self.x, &self.b]
    }
}

/// Draws AXB triples such that no answer side occurs three times in a row.
pub struct TrialSequencer<R: Rng> {
    rng: R,
    recent: VecDeque<Side>,
}

impl<R: Rng> TrialSequencer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            recent: VecDeque::with_capacity(2),
        }
    }

    pub fn next_triple(&mut self, baseline: &StimulusId, test: &StimulusId) -> AxbTriple {
        let (a, b) = if self.rng.random_bool(0.5) {
            (baseline.clone(), test.clone())
        } else {
            (test.clone(), baseline.clone())
        };

        let side = self.draw_side();
        let x = match side {
            Side::Left => b.clone(),
            Side::Right => a.clone(),
        };

        if self.recent.len() == 2 {
            self.recent.pop_front();
        }
        self.recent.push_back(side);

        AxbTriple {
            a,
            x,
            b,
            correct_side: side,
        }
    }

    fn draw_side(&mut self) -> Side {
        let Some(repeated) = self.repeated_side() else {
            return self.random_side();
        };
        for _ in 0..MAX_RESAMPLES {
            let side = self.random_side();
            if side != repeated {
                return side;
            }
        }
        warn!(
            side = %repeated,
            attempts = MAX_RESAMPLES,
            "resampling kept repeating the answer side, forcing the opposite"
        );
        repeated.opposite()
    }

    /// Side of the last two trials if they agree.
    fn repeated_side(&self) -> Option<Side> {
        match (self.recent.front(), self.recent.back()) {
            (Some(first), Some(second)) if self.recent.len() == 2 && first == second => {
                Some(*first)
            }
            _ => None,
        }
    }

    fn random_side(&mut self) -> Side {
        if self.rng.random_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids() -> (StimulusId, StimulusId) {
        (
            StimulusId::new("audio/audio-pitch/nelli_ch_rise_0_0.wav"),
            StimulusId::new("audio/audio-pitch/nelli_ch_rise_13_1.wav"),
        )
    }

    #[test]
    fn x_repeats_the_other_recording() {
        let (baseline, test) = ids();
        let mut sequencer = TrialSequencer::new(StdRng::seed_from_u64(7));
        for _ in 0..200 {
            let triple = sequencer.next_triple(&baseline, &test);
            assert_ne!(triple.a, triple.b);
            assert!(triple.a == baseline || triple.b == baseline);
            assert_ne!(&triple.x, triple.odd_one());
            let other = match triple.correct_side {
                Side::Left => &triple.b,
                Side::Right => &triple.a,
            };
            assert_eq!(&triple.x, other);
        }
    }

    #[test]
    fn no_side_three_times_in_a_row() {
        let (baseline, test) = ids();
        let mut sequencer = TrialSequencer::new(StdRng::seed_from_u64(2024));
        let sides: Vec<Side> = (0..10_000)
            .map(|_| sequencer.next_triple(&baseline, &test).correct_side)
            .collect();
        for window in sides.windows(3) {
            assert!(
                !(window[0] == window[1] && window[1] == window[2]),
                "run of three {:?}",
                window[0]
            );
        }
        let left = sides.iter().filter(|&&side| side == Side::Left).count();
        assert!((4_500..=5_500).contains(&left), "left chosen {left} times");
    }

    /// Always yields zero bits, so every coin flip lands the same way.
    struct Stuck;

    impl rand::RngCore for Stuck {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0)
        }
    }

    #[test]
    fn constant_rng_falls_back_to_opposite_side() {
        let (baseline, test) = ids();
        let mut sequencer = TrialSequencer::new(Stuck);
        let sides: Vec<Side> = (0..9)
            .map(|_| sequencer.next_triple(&baseline, &test).correct_side)
            .collect();
        for window in sides.windows(3) {
            assert!(!(window[0] == window[1] && window[1] == window[2]));
        }
    }
}
