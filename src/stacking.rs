//! Hex stacking limits and displacement (units pushed out of a hex by charges, falls or skids).
use crate::dice::{d6, Dice};
use crate::error::RulesError;
use crate::game::GameState;
use crate::hex::Coords;
use crate::terrain::{Board, Hex, TerrainKind};
use crate::unit::{MovementMode, Unit, UnitId};
use crate::{debug, trace};

/// Most units that may share a hex at overlapping elevations.
pub const STACKING_CAP: usize = 4;

// Scan order for displacement: straight on, then 60 and 120 degrees to either side.
const DISPLACEMENT_OFFSETS: [u8; 5] = [0, 1, 5, 2, 4];

/// Outcome of the deterministic part of a stacking check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackingCheck {
  Clear,
  Blocked(UnitId),
  /// Over the cap with two friendly occupants; a roll decides which of them blocks.
  TieBreak(UnitId, UnitId),
}

impl StackingCheck {
  /// The occupant found first, used where no roll is made.
  #[must_use]
  pub fn first_found(self) -> Option<UnitId> {
    match self {
      StackingCheck::Clear => None,
      StackingCheck::Blocked(id) | StackingCheck::TieBreak(id, _) => Some(id),
    }
  }
}

fn is_mech_or_small_craft(unit: &Unit) -> bool {
  unit.is_mech() || unit.is_small_craft()
}

fn grappled_together(a: &Unit, b: &Unit) -> bool {
  a.state.grappled_with == Some(b.id) && b.state.grappled_with == Some(a.id)
}

// Lowest and highest level the unit occupies when standing in `hex`.
fn elevation_band(unit: &Unit, hex: &Hex) -> (i32, i32) {
  let low = hex.surface() + unit.elevation;
  (low, low + unit.height())
}

/// Occupants of `destination` that count against `moving` when it enters, in id order.
fn relevant_occupants<'a>(game: &'a GameState, moving: &'a Unit, destination: Coords, transport: Option<UnitId>) -> Vec<&'a Unit> {
  let Some(hex) = game.hex(destination) else {
    return vec![];
  };
  let (low, high) = elevation_band(moving, hex);
  game
    .units_at(destination)
    .filter(|occupant| {
      occupant.id != moving.id
        && !occupant.is_airborne()
        && !occupant.state.mid_dfa
        && Some(occupant.id) != transport
        && Some(occupant.id) != moving.state.towing
    })
    .filter(|occupant| {
      let (other_low, other_high) = elevation_band(occupant, hex);
      low <= other_high && other_low <= high
    })
    .collect()
}

/// Deterministic stacking check for `moving` entering `destination`, optionally loading into `transport`.
#[must_use]
pub fn check_stacking(game: &GameState, moving: &Unit, destination: Coords, transport: Option<UnitId>) -> StackingCheck {
  if moving.is_airborne() {
    return StackingCheck::Clear;
  }
  let occupants = relevant_occupants(game, moving, destination, transport);

  for occupant in &occupants {
    if is_mech_or_small_craft(moving) && is_mech_or_small_craft(occupant) && !grappled_together(moving, occupant) {
      trace!("(Stacking.check_stacking) {} cannot share a hex with {}.", moving.name, occupant.name);
      return StackingCheck::Blocked(occupant.id);
    }
    if (moving.super_heavy && !occupant.is_infantry()) || (occupant.super_heavy && !moving.is_infantry()) {
      trace!("(Stacking.check_stacking) Super-heavy exclusion between {} and {}.", moving.name, occupant.name);
      return StackingCheck::Blocked(occupant.id);
    }
  }

  if occupants.len() + 1 > STACKING_CAP {
    let friendly: Vec<&&Unit> = occupants.iter().filter(|occupant| !occupant.is_enemy(moving)).collect();
    return match friendly.as_slice() {
      [first, second, ..] => StackingCheck::TieBreak(first.id, second.id),
      _ => StackingCheck::Blocked(occupants[0].id),
    };
  }
  StackingCheck::Clear
}

/// The occupant that stops `moving` from entering `destination`, if any.  A tie between two friendly occupants is
/// settled by a d6: above 3 keeps the first.
pub fn stacking_violation(
  game: &GameState, moving: &Unit, destination: Coords, transport: Option<UnitId>, dice: &mut dyn Dice,
) -> Option<UnitId> {
  match check_stacking(game, moving, destination, transport) {
    StackingCheck::Clear => None,
    StackingCheck::Blocked(id) => Some(id),
    StackingCheck::TieBreak(first, second) => {
      let roll = d6(dice);
      debug!("(Stacking.stacking_violation) Tie between {} and {} rolled {}.", first, second, roll);
      Some(if roll > 3 { first } else { second })
    }
  }
}

// Tracked and wheeled units may be pushed into water even though they cannot drive into it.
fn displacement_prohibition(unit: &Unit, hex: &Hex) -> Option<&'static str> {
  if matches!(unit.movement_mode, MovementMode::Tracked | MovementMode::Wheeled) && hex.water_depth() > 0 {
    let dry = Hex::new(
      hex.elevation,
      hex.terrains.iter().copied().filter(|t| t.kind != TerrainKind::Water).collect(),
    );
    return unit.location_prohibition(&dry);
  }
  unit.location_prohibition(hex)
}

/// True if `unit` can be displaced from `from` into the adjacent hex `to`.  Occupants of `to` that would have to make
/// room are pushed on in the same direction and must be displaceable in turn.
///
/// # Errors
/// Returns `RulesError::NotAdjacent` if the hexes are not neighbors.
pub fn is_valid_displacement(game: &GameState, unit: &Unit, from: Coords, to: Coords) -> Result<bool, RulesError> {
  let direction = from.adjacent_direction(to)?;

  let Some(to_hex) = game.board.hex_at(to) else {
    return Ok(game.options.push_off_board);
  };
  if let Some(reason) = displacement_prohibition(unit, to_hex) {
    trace!("(Stacking.is_valid_displacement) {} cannot be displaced to {}: {}.", unit.name, to, reason);
    return Ok(false);
  }
  if let Some(from_hex) = game.board.hex_at(from) {
    let rise = to_hex.surface() - from_hex.surface();
    if rise > unit.max_elevation_change() {
      trace!("(Stacking.is_valid_displacement) {} cannot climb {} levels into {}.", unit.name, rise, to);
      return Ok(false);
    }
  }

  match check_stacking(game, unit, to, None).first_found() {
    None => Ok(true),
    Some(blocker_id) => {
      let blocker = game.unit(blocker_id)?;
      is_valid_displacement(game, blocker, to, to.translated(direction))
    }
  }
}

/// Where `unit` ends up when displaced out of `from` heading `direction`.  The first valid hex at the same elevation
/// without friendly occupants wins, otherwise the highest valid hex.
///
/// # Errors
/// Returns `RulesError::InvalidDirection` if `direction` is not 0 through 5.
pub fn preferred_displacement(game: &GameState, unit: &Unit, from: Coords, direction: u8) -> Result<Option<Coords>, RulesError> {
  if direction >= 6 {
    return Err(RulesError::InvalidDirection(direction));
  }
  let from_level = game.hex(from).map(Hex::surface);

  let mut highest: Option<(Coords, i32)> = None;
  for offset in DISPLACEMENT_OFFSETS {
    let candidate = from.translated((direction + offset) % 6);
    if !is_valid_displacement(game, unit, from, candidate)? {
      continue;
    }
    let level = game.hex(candidate).map(Hex::surface);
    let has_friends = game
      .units_at(candidate)
      .any(|other| other.id != unit.id && !other.is_enemy(unit));
    if level.is_some() && level == from_level && !has_friends {
      debug!("(Stacking.preferred_displacement) {} displaced level into {}.", unit.name, candidate);
      return Ok(Some(candidate));
    }
    let level = level.unwrap_or(i32::MIN);
    if highest.map_or(true, |(_, best)| level > best) {
      highest = Some((candidate, level));
    }
  }
  debug!("(Stacking.preferred_displacement) {} displaced to {:?}.", unit.name, highest.map(|(c, _)| c));
  Ok(highest.map(|(coords, _)| coords))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dice::{MockDice, Roll};
  use crate::terrain::{HexMap, Terrain};
  use crate::unit::UnitCategory;

  fn infantry(id: UnitId, owner: u32, at: Coords) -> Unit {
    Unit::new(id, "Platoon", owner, UnitCategory::Infantry, MovementMode::InfantryLeg).at(at, 0)
  }

  fn mech(id: UnitId, owner: u32, at: Coords) -> Unit {
    Unit::new(id, "Mech", owner, UnitCategory::Mech, MovementMode::Biped).at(at, 0)
  }

  fn no_dice() -> MockDice {
    let mut dice = MockDice::new();
    dice.expect_roll_dice().never();
    dice
  }

  #[test_log::test]
  fn test_mechs_cannot_share() {
    let mut game = GameState::new(HexMap::new(10, 10));
    let target = Coords::new(4, 4);
    game.add_unit(mech(1, 0, target));
    let moving = mech(2, 1, Coords::new(4, 5));
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut no_dice()), Some(1));

    // Grappled mechs may share.
    game.unit_mut(1).unwrap().state.grappled_with = Some(2);
    let mut moving = moving;
    moving.state.grappled_with = Some(1);
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut no_dice()), None);
  }

  #[test_log::test]
  fn test_super_heavy_excludes_all_but_infantry() {
    let mut game = GameState::new(HexMap::new(10, 10));
    let target = Coords::new(4, 4);
    game.add_unit(infantry(1, 0, target));
    let mut tank = Unit::new(2, "Ontos", 0, UnitCategory::Tank, MovementMode::Tracked).at(Coords::new(4, 5), 0);
    tank.super_heavy = true;
    assert_eq!(check_stacking(&game, &tank, target, None), StackingCheck::Clear);

    game.add_unit(Unit::new(3, "Vedette", 1, UnitCategory::Tank, MovementMode::Wheeled).at(target, 0));
    assert_eq!(check_stacking(&game, &tank, target, None), StackingCheck::Blocked(3));

    // And the other way around.
    let mut game = GameState::new(HexMap::new(10, 10));
    tank.position = Some(target);
    game.add_unit(tank);
    let vedette = Unit::new(3, "Vedette", 1, UnitCategory::Tank, MovementMode::Wheeled).at(Coords::new(4, 5), 0);
    assert_eq!(check_stacking(&game, &vedette, target, None), StackingCheck::Blocked(2));
  }

  #[test_log::test]
  fn test_stacking_cap() {
    let target = Coords::new(4, 4);
    let mut game = GameState::new(HexMap::new(10, 10));
    for id in 1..=3 {
      game.add_unit(infantry(id, 0, target));
    }
    let moving = infantry(10, 1, Coords::new(4, 5));
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut no_dice()), None);

    game.add_unit(infantry(4, 0, target));
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut no_dice()), Some(1));
  }

  #[test_log::test]
  fn test_tie_break_roll() {
    let target = Coords::new(4, 4);
    let mut game = GameState::new(HexMap::new(10, 10));
    for id in 1..=4 {
      game.add_unit(infantry(id, 0, target));
    }
    let moving = infantry(10, 0, Coords::new(4, 5));
    assert_eq!(check_stacking(&game, &moving, target, None), StackingCheck::TieBreak(1, 2));

    let mut high = MockDice::new();
    high.expect_roll_dice().times(1).returning(|_, _| Roll::new(vec![5]));
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut high), Some(1));

    let mut low = MockDice::new();
    low.expect_roll_dice().times(1).returning(|_, _| Roll::new(vec![3]));
    assert_eq!(stacking_violation(&game, &moving, target, None, &mut low), Some(2));
  }

  #[test_log::test]
  fn test_exemptions() {
    let target = Coords::new(4, 4);
    let mut game = GameState::new(HexMap::new(10, 10));
    let mut jumper = mech(1, 0, target);
    jumper.state.mid_dfa = true;
    game.add_unit(jumper);
    let mut vtol = Unit::new(2, "Warrior", 0, UnitCategory::Vtol, MovementMode::Vtol).at(target, 0);
    vtol.elevation = 3;
    game.add_unit(vtol);
    game.add_unit(mech(3, 0, target));

    let moving = mech(10, 1, Coords::new(4, 5));
    // The mid-DFA mech and the airborne VTOL are skipped; the standing mech blocks.
    assert_eq!(check_stacking(&game, &moving, target, None), StackingCheck::Blocked(3));
    // Loading into the occupant as transport is fine.
    assert_eq!(check_stacking(&game, &moving, target, Some(3)), StackingCheck::Clear);
  }

  #[test_log::test]
  fn test_five_deep_mixed() {
    let target = Coords::new(4, 4);
    let mut game = GameState::new(HexMap::new(10, 10));
    game.add_unit(infantry(1, 0, target));
    game.add_unit(infantry(2, 1, target));
    game.add_unit(Unit::new(3, "Elemental", 0, UnitCategory::BattleArmor, MovementMode::InfantryJump).at(target, 0));
    game.add_unit(Unit::new(4, "Savannah Master", 1, UnitCategory::Tank, MovementMode::Hover).at(target, 0));
    let moving = infantry(5, 1, Coords::new(4, 3));
    assert_eq!(check_stacking(&game, &moving, target, None).first_found(), Some(2));
  }

  #[test_log::test]
  fn test_displacement_validity() {
    let mut board = HexMap::new(10, 10);
    board.set_elevation(Coords::new(4, 3), 3);
    board.add_terrain(Coords::new(5, 4), Terrain::new(TerrainKind::Water, 2));
    board.add_terrain(Coords::new(3, 4), Terrain::new(TerrainKind::Woods, 1));
    let game = GameState::new(board);
    let from = Coords::new(4, 4);

    let tank = Unit::new(1, "Striker", 0, UnitCategory::Tank, MovementMode::Wheeled).at(from, 0);
    // Cliff too high.
    assert!(!is_valid_displacement(&game, &tank, from, Coords::new(4, 3)).unwrap());
    // Wheeled units may be pushed into water but not into woods.
    assert!(is_valid_displacement(&game, &tank, from, Coords::new(5, 4)).unwrap());
    assert!(!is_valid_displacement(&game, &tank, from, Coords::new(3, 4)).unwrap());
    assert!(matches!(
      is_valid_displacement(&game, &tank, from, Coords::new(4, 7)),
      Err(RulesError::NotAdjacent(_, _))
    ));
  }

  #[test_log::test]
  fn test_off_board_push() {
    let mut game = GameState::new(HexMap::new(10, 10));
    let edge = Coords::new(4, 0);
    let unit = mech(1, 0, edge);
    assert!(!is_valid_displacement(&game, &unit, edge, edge.translated(0)).unwrap());
    game.options.push_off_board = true;
    assert!(is_valid_displacement(&game, &unit, edge, edge.translated(0)).unwrap());
  }

  #[test_log::test]
  fn test_cascade() {
    let mut board = HexMap::new(10, 10);
    let from = Coords::new(4, 6);
    let middle = from.translated(0);
    let beyond = middle.translated(0);
    board.set_elevation(beyond, 5);
    let mut game = GameState::new(board);
    game.add_unit(mech(2, 1, middle));
    let pushed = mech(1, 0, from);
    // The occupant would be pushed up a cliff.
    assert!(!is_valid_displacement(&game, &pushed, from, middle).unwrap());
    game.board.set_elevation(beyond, 0);
    assert!(is_valid_displacement(&game, &pushed, from, middle).unwrap());
  }

  #[test_log::test]
  fn test_preferred_displacement() {
    let mut board = HexMap::new(10, 10);
    let from = Coords::new(4, 4);
    board.set_elevation(from.translated(0), 1);
    let mut game = GameState::new(board);
    let unit = mech(1, 0, from);

    // Straight ahead is a level higher; the first level hex clockwise wins.
    assert_eq!(preferred_displacement(&game, &unit, from, 0).unwrap(), Some(from.translated(1)));

    // Friendly infantry in that hex pushes the choice on to the other side.
    game.add_unit(infantry(2, 0, from.translated(1)));
    assert_eq!(preferred_displacement(&game, &unit, from, 0).unwrap(), Some(from.translated(5)));

    assert!(matches!(
      preferred_displacement(&game, &unit, from, 6),
      Err(RulesError::InvalidDirection(6))
    ));
  }

  #[test_log::test]
  fn test_preferred_displacement_highest() {
    let mut board = HexMap::new(10, 10);
    let from = Coords::new(4, 4);
    for dir in 0..6 {
      board.set_elevation(from.translated(dir), -1);
    }
    board.set_elevation(from.translated(2), 1);
    let game = GameState::new(board);
    let unit = mech(1, 0, from);
    assert_eq!(preferred_displacement(&game, &unit, from, 0).unwrap(), Some(from.translated(2)));
  }
}
