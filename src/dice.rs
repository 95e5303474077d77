use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error;

/// The outcome of a dice roll: the total plus every die that was thrown.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Roll {
  total: u32,
  values: Vec<u32>,
}

impl Roll {
  #[must_use]
  pub fn new(values: Vec<u32>) -> Self {
    Roll {
      total: values.iter().sum(),
      values,
    }
  }

  /// A roll whose total counts only some of the dice thrown.
  #[must_use]
  pub fn with_total(total: u32, values: Vec<u32>) -> Self {
    Roll { total, values }
  }

  #[must_use]
  pub fn total(&self) -> u32 {
    self.total
  }

  #[must_use]
  pub fn values(&self) -> &[u32] {
    &self.values
  }

  /// Sum of the `keep` lowest dice.
  #[must_use]
  pub fn lowest(&self, keep: usize) -> u32 {
    let mut sorted = self.values.clone();
    sorted.sort_unstable();
    sorted.iter().take(keep).sum()
  }
}

/// The random source consumed by the rules core.  Every roll goes through an explicitly passed `&mut dyn Dice` so a
/// seeded source replays identically.
#[cfg_attr(test, mockall::automock)]
pub trait Dice {
  fn roll_dice(&mut self, count: u32, faces: u32) -> Roll;

  /// Roll `count` dice and total only the best `keep` of them.
  fn roll_keep_best(&mut self, count: u32, faces: u32, keep: u32) -> Roll;

  /// Uniform value in `0..bound`.
  fn uniform_int(&mut self, bound: u32) -> u32;
}

pub struct RandomSource {
  rng: StdRng,
}

impl RandomSource {
  #[must_use]
  pub fn seeded(seed: u64) -> Self {
    RandomSource {
      rng: StdRng::seed_from_u64(seed),
    }
  }

  #[must_use]
  pub fn from_entropy() -> Self {
    RandomSource {
      rng: StdRng::from_entropy(),
    }
  }

  fn die(&mut self, faces: u32) -> u32 {
    if faces == 0 {
      error!("(Dice.die) Asked to roll a zero sided die.");
      return 0;
    }
    self.rng.gen_range(1..=faces)
  }
}

impl Dice for RandomSource {
  fn roll_dice(&mut self, count: u32, faces: u32) -> Roll {
    Roll::new((0..count).map(|_| self.die(faces)).collect())
  }

  fn roll_keep_best(&mut self, count: u32, faces: u32, keep: u32) -> Roll {
    let values: Vec<u32> = (0..count).map(|_| self.die(faces)).collect();
    let mut sorted = values.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let total = sorted.iter().take(keep as usize).sum();
    Roll::with_total(total, values)
  }

  fn uniform_int(&mut self, bound: u32) -> u32 {
    if bound == 0 {
      return 0;
    }
    self.rng.gen_range(0..bound)
  }
}

pub fn d6(dice: &mut dyn Dice) -> u32 {
  dice.roll_dice(1, 6).total()
}

pub fn two_d6(dice: &mut dyn Dice) -> Roll {
  dice.roll_dice(2, 6)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test_log::test]
  fn test_seeded_rolls_replay() {
    let mut first = RandomSource::seeded(0x5eed);
    let mut second = RandomSource::seeded(0x5eed);
    for _ in 0..20 {
      assert_eq!(first.roll_dice(2, 6), second.roll_dice(2, 6));
    }
  }

  #[test_log::test]
  fn test_roll_bounds() {
    let mut dice = RandomSource::seeded(7);
    for _ in 0..200 {
      let roll = two_d6(&mut dice);
      assert!((2..=12).contains(&roll.total()));
      assert_eq!(roll.values().len(), 2);
      assert!(dice.uniform_int(3) < 3);
    }
    assert_eq!(dice.uniform_int(0), 0);
  }

  #[test_log::test]
  fn test_keep_best() {
    let mut dice = RandomSource::seeded(11);
    for _ in 0..50 {
      let roll = dice.roll_keep_best(3, 6, 2);
      assert_eq!(roll.values().len(), 3);
      let lowest = *roll.values().iter().min().unwrap();
      assert_eq!(roll.total(), roll.values().iter().sum::<u32>() - lowest);
    }
  }

  #[test]
  fn test_lowest() {
    let roll = Roll::new(vec![6, 2, 4]);
    assert_eq!(roll.total(), 12);
    assert_eq!(roll.lowest(2), 6);
  }
}
