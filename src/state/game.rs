use std::time::SystemTime;

use rand::{Rng, seq::IndexedRandom};

use crate::dao::models::{SpectrumPairEntity, TurnEntity};

/// Lowest value on the dial.
pub const DIAL_MIN: i32 = 1;
/// Highest value on the dial.
pub const DIAL_MAX: i32 = 24;
/// Middle of the dial, used when a player runs out of time.
pub const DIAL_MIDPOINT: i32 = 12;

/// Source of randomness and time for a lifecycle operation.
///
/// Operations take a dealer instead of reaching for a global RNG or clock so
/// the engine stays a pure function of its inputs.
pub struct Dealer<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
    spectrum_pairs: &'a [SpectrumPairEntity],
    now: SystemTime,
}

impl<'a, R: Rng + ?Sized> Dealer<'a, R> {
    /// Dealer drawing from `rng` and `spectrum_pairs`, stamping writes with `now`.
    pub fn new(rng: &'a mut R, spectrum_pairs: &'a [SpectrumPairEntity], now: SystemTime) -> Self {
        Self {
            rng,
            spectrum_pairs,
            now,
        }
    }

    /// Timestamp applied to every write of the operation.
    pub fn now(&self) -> SystemTime {
        self.now
    }

    /// Draw a fresh target uniformly from the dial for `describer_id`.
    pub fn deal_turn(&mut self, describer_id: &str) -> TurnEntity {
        let target = self.rng.random_range(DIAL_MIN..=DIAL_MAX);
        let spectrum_pair = self.spectrum_pairs.choose(&mut *self.rng).cloned();

        TurnEntity {
            target,
            describer_id: describer_id.to_owned(),
            spectrum_pair,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn targets_stay_on_the_dial() {
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = vec![SpectrumPairEntity {
            left: "Cold".into(),
            right: "Hot".into(),
        }];
        let mut dealer = Dealer::new(&mut rng, &pairs, SystemTime::now());

        for _ in 0..500 {
            let turn = dealer.deal_turn("host");
            assert!((DIAL_MIN..=DIAL_MAX).contains(&turn.target));
            assert_eq!(turn.describer_id, "host");
            assert_eq!(turn.spectrum_pair.as_ref(), pairs.first());
        }
    }

    #[test]
    fn no_configured_pairs_means_unlabelled_dial() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dealer = Dealer::new(&mut rng, &[], SystemTime::now());
        assert!(dealer.deal_turn("host").spectrum_pair.is_none());
    }
}
