use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::conditions::{Light, Weather, Wind};
use crate::unit::MoveKind;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum RangeBracket {
  Short,
  Medium,
  Long,
  Extreme,
  LineOfSight,
  OutOfRange,
}

pub const BRACKETS_IN_ORDER: [RangeBracket; 5] = [
  RangeBracket::Short,
  RangeBracket::Medium,
  RangeBracket::Long,
  RangeBracket::Extreme,
  RangeBracket::LineOfSight,
];

// Index by RangeBracket: Short, Medium, Long, Extreme, LineOfSight
pub const RANGE_MOD: [i32; 5] = [0, 2, 4, 6, 8];

// Infantry small arms: same hex, then within 1x, 2x and 3x the weapon's range value.
pub const INFANTRY_RANGE_MOD: [i32; 4] = [-2, 0, 2, 4];

// Index by RangeBracket.  Standard, null-signature and chameleon systems share one table.
pub const STEALTH_MOD: [i32; 5] = [0, 1, 2, 2, 2];
pub const VOID_SIGNATURE_MOD: [i32; 5] = [1, 2, 3, 3, 3];

// Index by woods density (none, light, heavy, ultra-heavy).
pub const WOODS_MOD: [i32; 4] = [0, 1, 2, 3];

// Index by smoke density (none, light, heavy).
pub const SMOKE_MOD: [i32; 3] = [0, 1, 2];

// Index by Light: Day, Dusk, FullMoon, Moonless, PitchBlack
pub const LIGHT_MOD: [i32; 5] = [0, 1, 2, 3, 4];

// Upper bound of hexes moved and the matching target movement modifier.
const TARGET_MOVEMENT_BANDS: [(u32, i32); 6] = [(2, 0), (4, 1), (6, 2), (9, 3), (17, 4), (24, 5)];

// Lower bound of heat and the matching attacker modifier, hottest first.
const HEAT_BANDS: [(u32, i32); 4] = [(24, 4), (17, 3), (13, 2), (8, 1)];

// Upper bound of distance in hexes and the turns an artillery shell takes to land.
const ARTILLERY_FLIGHT_BANDS: [(u32, u32); 4] = [(17, 0), (136, 1), (255, 2), (357, 3)];

pub const MAX_GHOST_TARGET_MOD: i32 = 4;
pub const IMMOBILE_TARGET_MOD: i32 = -4;
pub const HEX_TARGET_MOD: i32 = -4;
pub const JUMPED_TARGET_MOD: i32 = 1;
pub const INDUSTRIAL_TARGET_MOD: i32 = 1;
pub const STUCK_TARGET_MOD: i32 = -2;

#[must_use]
pub fn range_mod(bracket: RangeBracket) -> i32 {
  match bracket {
    RangeBracket::OutOfRange => 0,
    _ => RANGE_MOD[bracket as usize],
  }
}

#[must_use]
pub fn target_movement_mod(hexes: u32, expanded: bool) -> i32 {
  TARGET_MOVEMENT_BANDS
    .iter()
    .find(|(top, _)| hexes <= *top)
    .map_or(if expanded { 7 } else { 6 }, |(_, modifier)| *modifier)
}

#[must_use]
pub fn attacker_movement_mod(kind: MoveKind, jumping_jack: bool) -> i32 {
  match kind {
    MoveKind::None | MoveKind::Sprint => 0,
    MoveKind::Walk => 1,
    MoveKind::Run | MoveKind::Skid => 2,
    MoveKind::Jump if jumping_jack => 1,
    MoveKind::Jump => 3,
  }
}

#[must_use]
pub fn heat_mod(heat: u32) -> i32 {
  HEAT_BANDS
    .iter()
    .find(|(bottom, _)| heat >= *bottom)
    .map_or(0, |(_, modifier)| *modifier)
}

#[must_use]
pub fn artillery_flight_turns(distance: u32) -> u32 {
  ARTILLERY_FLIGHT_BANDS
    .iter()
    .find(|(top, _)| distance <= *top)
    .map_or(4, |(_, turns)| *turns)
}

#[must_use]
pub fn light_mod(light: Light) -> i32 {
  LIGHT_MOD[light as usize]
}

#[must_use]
pub fn weather_mod(weather: Weather) -> i32 {
  match weather {
    Weather::ModerateRain | Weather::HeavyRain | Weather::HeavySnow => 1,
    Weather::Blizzard => 2,
    _ => 0,
  }
}

/// Wind modifier for missile and ballistic fire respectively.
#[must_use]
pub fn wind_mod(wind: Wind) -> (i32, i32) {
  match wind {
    Wind::Calm | Wind::LightGale | Wind::ModerateGale => (0, 0),
    Wind::StrongGale => (1, 0),
    Wind::Storm => (2, 1),
    Wind::Tornado => (3, 3),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_target_movement_bands() {
    let expected = [
      (0, 0),
      (2, 0),
      (3, 1),
      (4, 1),
      (5, 2),
      (6, 2),
      (7, 3),
      (9, 3),
      (10, 4),
      (17, 4),
      (18, 5),
      (24, 5),
      (25, 6),
      (40, 6),
    ];
    for (hexes, modifier) in expected {
      assert_eq!(target_movement_mod(hexes, false), modifier, "{hexes} hexes");
    }
    assert_eq!(target_movement_mod(25, true), 7);
    assert_eq!(target_movement_mod(24, true), 5);
  }

  #[test]
  fn test_heat_and_movement() {
    assert_eq!(heat_mod(0), 0);
    assert_eq!(heat_mod(7), 0);
    assert_eq!(heat_mod(8), 1);
    assert_eq!(heat_mod(13), 2);
    assert_eq!(heat_mod(17), 3);
    assert_eq!(heat_mod(30), 4);

    assert_eq!(attacker_movement_mod(MoveKind::Walk, false), 1);
    assert_eq!(attacker_movement_mod(MoveKind::Skid, false), 2);
    assert_eq!(attacker_movement_mod(MoveKind::Jump, false), 3);
    assert_eq!(attacker_movement_mod(MoveKind::Jump, true), 1);
  }

  #[test]
  fn test_range_mods_are_monotone() {
    let mods: Vec<i32> = BRACKETS_IN_ORDER.iter().map(|b| range_mod(*b)).collect();
    assert!(mods.windows(2).all(|w| w[0] <= w[1]));
    assert!(INFANTRY_RANGE_MOD.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn test_artillery_flight_turns() {
    assert_eq!(artillery_flight_turns(10), 0);
    assert_eq!(artillery_flight_turns(17), 0);
    assert_eq!(artillery_flight_turns(18), 1);
    assert_eq!(artillery_flight_turns(200), 2);
    assert_eq!(artillery_flight_turns(300), 3);
    assert_eq!(artillery_flight_turns(400), 4);
  }
}
