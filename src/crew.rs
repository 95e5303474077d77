use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub enum Skills {
  Gunnery,
  Piloting,
  Sensors,
}

/// Special pilot abilities that alter attack or detection rolls.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Ability {
  Sniper,
  JumpingJack,
  MultiTasker,
  ForwardObserver,
  SensorGeek,
  EagleEyes,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Crew {
  #[serde(default = "default_gunnery")]
  gunnery: u8,
  #[serde(default = "default_piloting")]
  piloting: u8,
  // Without a dedicated sensor operator the pilot runs the sensors.
  #[serde(default)]
  sensors: Option<u8>,
  #[serde(default)]
  pub abilities: BTreeSet<Ability>,
  /// Vehicles and large craft with separate gunners ignore secondary target penalties.
  #[serde(default)]
  pub dedicated_gunner: bool,
  #[serde(default)]
  pub unconscious: bool,
}

fn default_gunnery() -> u8 {
  4
}

fn default_piloting() -> u8 {
  5
}

impl Crew {
  #[must_use]
  pub fn new(gunnery: u8, piloting: u8) -> Crew {
    Crew {
      gunnery,
      piloting,
      sensors: None,
      abilities: BTreeSet::new(),
      dedicated_gunner: false,
      unconscious: false,
    }
  }

  #[must_use]
  pub fn get_skill(&self, skill: Skills) -> u8 {
    match skill {
      Skills::Gunnery => self.gunnery,
      Skills::Piloting => self.piloting,
      Skills::Sensors => self.sensors.unwrap_or(self.piloting),
    }
  }

  #[must_use]
  pub fn get_gunnery(&self) -> u8 {
    self.gunnery
  }

  #[must_use]
  pub fn get_piloting(&self) -> u8 {
    self.piloting
  }

  pub fn set_skill(&mut self, skill: Skills, value: u8) {
    match skill {
      Skills::Gunnery => self.gunnery = value,
      Skills::Piloting => self.piloting = value,
      Skills::Sensors => self.sensors = Some(value),
    }
  }

  #[must_use]
  pub fn has_ability(&self, ability: Ability) -> bool {
    self.abilities.contains(&ability)
  }

  #[must_use]
  pub fn with_ability(mut self, ability: Ability) -> Crew {
    self.abilities.insert(ability);
    self
  }
}

impl Default for Crew {
  fn default() -> Self {
    Crew::new(default_gunnery(), default_piloting())
  }
}
