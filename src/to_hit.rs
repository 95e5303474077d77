use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::Display;

use crate::damage_tables::TWO_D6_AT_LEAST;
use crate::hex::Coords;
use crate::rules_tables::RangeBracket;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Terminal {
  Impossible,
  AutomaticFail,
  AutomaticSuccess,
}

impl Terminal {
  #[must_use]
  pub fn is_failure(self) -> bool {
    matches!(self, Terminal::Impossible | Terminal::AutomaticFail)
  }

  fn rank(self) -> u8 {
    match self {
      Terminal::AutomaticSuccess => 0,
      Terminal::AutomaticFail => 1,
      Terminal::Impossible => 2,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TerminalState {
  pub kind: Terminal,
  pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum HitTable {
  #[default]
  Normal,
  Swarm,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum AttackSide {
  #[default]
  Front,
  Rear,
  Left,
  Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Cover {
  #[default]
  None,
  Partial,
  HullDown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
  pub value: i32,
  pub reason: String,
}

/// The number a 2d6 roll must meet or beat, built up as a base plus a list of explained modifiers.  Rule outcomes
/// that make the roll moot (impossible shots, automatic hits) are carried as a terminal state instead.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TargetNumber {
  base: i32,
  base_reason: String,
  modifiers: Vec<Modifier>,
  terminal: Option<TerminalState>,
  pub hit_table: HitTable,
  pub side: AttackSide,
  pub cover: Cover,
  pub range: Option<RangeBracket>,
  /// Aim point of an artillery shot leading a moving target.
  pub aim_point: Option<Coords>,
}

impl TargetNumber {
  #[must_use]
  pub fn new(base: i32, reason: &str) -> Self {
    TargetNumber {
      base,
      base_reason: reason.to_string(),
      modifiers: vec![],
      terminal: None,
      hit_table: HitTable::Normal,
      side: AttackSide::Front,
      cover: Cover::None,
      range: None,
      aim_point: None,
    }
  }

  /// An empty set of modifiers, used by stages that contribute to a larger target number.
  #[must_use]
  pub fn empty() -> Self {
    TargetNumber::new(0, "")
  }

  /// A target number that is already decided.
  #[must_use]
  pub fn terminal(kind: Terminal, reason: &str) -> Self {
    let mut target = TargetNumber::empty();
    target.set_terminal(kind, reason);
    target
  }

  pub fn add_modifier(&mut self, value: i32, reason: &str) {
    if value != 0 {
      self.modifiers.push(Modifier {
        value,
        reason: reason.to_string(),
      });
    }
  }

  /// Record a terminal outcome.  Impossible outranks an automatic failure, which outranks an automatic success;
  /// between equals the first one recorded wins.
  pub fn set_terminal(&mut self, kind: Terminal, reason: &str) {
    let replace = match &self.terminal {
      None => true,
      Some(current) => kind.rank() > current.kind.rank(),
    };
    if replace {
      self.terminal = Some(TerminalState {
        kind,
        reason: reason.to_string(),
      });
    }
  }

  /// Fold the modifiers and any terminal of `other` into this target number.
  pub fn append(&mut self, other: TargetNumber) {
    self.modifiers.extend(other.modifiers);
    if let Some(terminal) = other.terminal {
      self.set_terminal(terminal.kind, &terminal.reason);
    }
    if other.range.is_some() {
      self.range = other.range;
    }
    if other.aim_point.is_some() {
      self.aim_point = other.aim_point;
    }
    if other.cover != Cover::None {
      self.cover = other.cover;
    }
    if other.hit_table != HitTable::Normal {
      self.hit_table = other.hit_table;
    }
  }

  #[must_use]
  pub fn terminal_state(&self) -> Option<&TerminalState> {
    self.terminal.as_ref()
  }

  #[must_use]
  pub fn is_impossible(&self) -> bool {
    self.terminal.as_ref().is_some_and(|t| t.kind == Terminal::Impossible)
  }

  #[must_use]
  pub fn is_decided(&self) -> bool {
    self.terminal.is_some()
  }

  #[must_use]
  pub fn modifiers(&self) -> &[Modifier] {
    &self.modifiers
  }

  #[must_use]
  pub fn base(&self) -> i32 {
    self.base
  }

  /// Base plus every modifier, ignoring any terminal state.
  #[must_use]
  pub fn value(&self) -> i32 {
    self.base + self.modifiers.iter().map(|m| m.value).sum::<i32>()
  }

  /// Probability that a 2d6 attack roll succeeds.
  #[must_use]
  pub fn hit_chance(&self) -> f64 {
    match self.terminal.as_ref().map(|t| t.kind) {
      Some(Terminal::Impossible | Terminal::AutomaticFail) => 0.0,
      Some(Terminal::AutomaticSuccess) => 1.0,
      None => odds_at_least(self.value()),
    }
  }

  /// True if a 2d6 total of `roll` hits.
  #[must_use]
  pub fn hits(&self, roll: u32) -> bool {
    match self.terminal.as_ref().map(|t| t.kind) {
      Some(Terminal::Impossible | Terminal::AutomaticFail) => false,
      Some(Terminal::AutomaticSuccess) => true,
      None => i64::from(roll) >= i64::from(self.value()),
    }
  }
}

/// Chance of rolling at least `target` on 2d6.
#[must_use]
pub fn odds_at_least(target: i32) -> f64 {
  match usize::try_from(target) {
    Err(_) => 1.0,
    Ok(n) if n >= TWO_D6_AT_LEAST.len() => 0.0,
    Ok(n) => f64::from(TWO_D6_AT_LEAST[n]) / 36.0,
  }
}

impl fmt::Display for TargetNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(terminal) = &self.terminal {
      return write!(f, "{} ({})", terminal.kind, terminal.reason);
    }
    write!(f, "{} = {} ({})", self.value(), self.base, self.base_reason)?;
    for modifier in &self.modifiers {
      write!(f, " {:+} ({})", modifier.value, modifier.reason)?;
    }
    Ok(())
  }
}
