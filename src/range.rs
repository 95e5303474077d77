//! Range resolution: which range table applies, the bracket the target falls in and the modifiers that come with it.
use crate::combat::AttackContext;
use crate::crew::Ability;
use crate::options::GameOptions;
use crate::rules_tables::{range_mod, RangeBracket, INFANTRY_RANGE_MOD};
use crate::spotting::find_c3_spotter;
use crate::terrain::Board;
use crate::to_hit::{TargetNumber, Terminal};
use crate::weapon::{RangeTable, WeaponFlag};
use crate::{debug, trace};

/// The range table in force for this attack: replacement ammo first, then the underwater or capital table when the
/// situation calls for one.
#[must_use]
pub fn range_table(ctx: &AttackContext) -> RangeTable {
  let profile = &ctx.weapon.profile;
  if let Some(table) = ctx.ammo.and_then(|bin| bin.range_override) {
    return table;
  }
  if ctx.attacker_underwater() {
    if let Some(table) = profile.underwater_ranges {
      return table;
    }
  }
  if ctx.game.board.is_space() {
    if let Some(table) = profile.capital_ranges {
      return table;
    }
  }
  profile.ranges
}

/// Bracket for `distance` on `table`.  Extreme and line-of-sight brackets only exist when their options are on.
#[must_use]
pub fn bracket_for(table: &RangeTable, distance: u32, options: &GameOptions) -> RangeBracket {
  if distance <= table.short {
    RangeBracket::Short
  } else if distance <= table.medium {
    RangeBracket::Medium
  } else if distance <= table.long {
    RangeBracket::Long
  } else if options.extreme_range && table.extreme > table.long && distance <= table.extreme {
    RangeBracket::Extreme
  } else if options.los_range {
    RangeBracket::LineOfSight
  } else {
    RangeBracket::OutOfRange
  }
}

/// Bracket and modifier for infantry small arms, which use multiples of a single range value.
#[must_use]
pub fn infantry_bracket(range_value: u32, distance: u32) -> (RangeBracket, i32) {
  if distance == 0 {
    return (RangeBracket::Short, INFANTRY_RANGE_MOD[0]);
  }
  if range_value == 0 {
    return (RangeBracket::OutOfRange, 0);
  }
  match distance.div_ceil(range_value) {
    1 => (RangeBracket::Short, INFANTRY_RANGE_MOD[1]),
    2 => (RangeBracket::Medium, INFANTRY_RANGE_MOD[2]),
    3 => (RangeBracket::Long, INFANTRY_RANGE_MOD[3]),
    _ => (RangeBracket::OutOfRange, 0),
  }
}

fn ignores_minimum_range(ctx: &AttackContext) -> bool {
  let weapon = ctx.weapon;
  (weapon.profile.has_flag(WeaponFlag::Ppc) && weapon.state.inhibitor_off) || weapon.state.hot_loaded
}

/// Modifier for firing inside a weapon's minimum range.
#[must_use]
pub fn minimum_range_mod(ctx: &AttackContext, table: &RangeTable, distance: u32) -> i32 {
  if table.minimum == 0 || distance > table.minimum || !ctx.is_ground_to_ground() || ignores_minimum_range(ctx) {
    return 0;
  }
  i32::try_from(table.minimum - distance + 1).unwrap_or(i32::MAX)
}

/// Resolve range for the attack.  The returned stage carries the bracket in `range`; an attack out of range (or
/// beyond what damaged head sensors allow) comes back Impossible.
#[must_use]
pub fn resolve_range(ctx: &AttackContext) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let distance = ctx.distance();
  let profile = &ctx.weapon.profile;

  if let (true, Some(range_value)) = (profile.is_infantry_weapon(), profile.infantry_range) {
    let (bracket, modifier) = infantry_bracket(range_value, distance);
    stage.range = Some(bracket);
    if bracket == RangeBracket::OutOfRange {
      stage.set_terminal(Terminal::Impossible, "target out of range");
    } else {
      stage.add_modifier(modifier, &format!("infantry range {distance}"));
    }
    return stage;
  }

  let table = range_table(ctx);
  let mut bracket = bracket_for(&table, distance, &ctx.game.options);

  if !ctx.indirect && ctx.attacker.equipment.c3.is_some() {
    if let Some(target) = ctx.target {
      let spotter = find_c3_spotter(ctx);
      if spotter.id != ctx.attacker.id {
        let spotter_distance = spotter.position.map_or(u32::MAX, |p| p.distance(ctx.target_position));
        let spotter_bracket = bracket_for(&table, spotter_distance, &ctx.game.options);
        trace!(
          "(Range.resolve_range) C3 spotter {} is {} hexes from {} ({}).",
          spotter.name,
          spotter_distance,
          target.name,
          spotter_bracket
        );
        if bracket != RangeBracket::OutOfRange && spotter_bracket < bracket {
          bracket = spotter_bracket;
        }
      }
    }
  }
  stage.range = Some(bracket);

  if bracket == RangeBracket::OutOfRange {
    stage.set_terminal(Terminal::Impossible, "target out of range");
    return stage;
  }
  if ctx.attacker.is_protomech()
    && ctx.attacker.criticals.head_sensors
    && matches!(bracket, RangeBracket::Long | RangeBracket::Extreme | RangeBracket::LineOfSight)
  {
    stage.set_terminal(Terminal::Impossible, "head sensors destroyed");
    return stage;
  }

  let mut modifier = range_mod(bracket);
  if ctx.attacker.crew.has_ability(Ability::Sniper) {
    modifier /= 2;
  }
  stage.add_modifier(modifier, &format!("{} range", bracket.to_string().to_lowercase()));
  stage.add_modifier(minimum_range_mod(ctx, &table, distance), "minimum range");

  debug!(
    "(Range.resolve_range) {} at {} hexes: {} bracket ({:?}).",
    profile.name,
    distance,
    bracket,
    stage.modifiers()
  );
  stage
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::config_test_catalog;
  use crate::combat::{AttackContext, TargetRef};
  use crate::game::GameState;
  use crate::hex::Coords;
  use crate::terrain::{HexMap, Terrain, TerrainKind};
  use crate::unit::{C3Node, MovementMode, Unit, UnitCategory};
  use crate::weapon::{AmmoBin, AmmoFamily, Location, MountedWeapon, Munition};

  fn shooter(id: u32, weapon: &str, at: Coords) -> Unit {
    let mut unit = Unit::new(id, "Shooter", 0, UnitCategory::Mech, MovementMode::Biped).at(at, 3);
    unit.weapons.push(MountedWeapon::from_catalog(weapon, Location::CenterTorso).unwrap());
    unit
  }

  fn target(id: u32, at: Coords) -> Unit {
    Unit::new(id, "Target", 1, UnitCategory::Mech, MovementMode::Biped).at(at, 0)
  }

  fn game_with(units: Vec<Unit>) -> GameState {
    let mut game = GameState::new(HexMap::new(40, 40));
    for unit in units {
      game.add_unit(unit);
    }
    game
  }

  fn modifier_total(stage: &TargetNumber) -> i32 {
    stage.modifiers().iter().map(|m| m.value).sum()
  }

  #[test_log::test]
  fn test_bracket_for() {
    let table = RangeTable::new(0, 3, 6, 9, 12);
    let mut options = GameOptions::default();
    assert_eq!(bracket_for(&table, 0, &options), RangeBracket::Short);
    assert_eq!(bracket_for(&table, 3, &options), RangeBracket::Short);
    assert_eq!(bracket_for(&table, 4, &options), RangeBracket::Medium);
    assert_eq!(bracket_for(&table, 9, &options), RangeBracket::Long);
    assert_eq!(bracket_for(&table, 10, &options), RangeBracket::OutOfRange);
    options.extreme_range = true;
    assert_eq!(bracket_for(&table, 12, &options), RangeBracket::Extreme);
    assert_eq!(bracket_for(&table, 13, &options), RangeBracket::OutOfRange);
    options.los_range = true;
    assert_eq!(bracket_for(&table, 40, &options), RangeBracket::LineOfSight);
  }

  #[test_log::test]
  fn test_penalty_monotone_in_distance() {
    let table = RangeTable::new(0, 3, 6, 9, 12);
    let options = GameOptions {
      extreme_range: true,
      los_range: true,
      ..GameOptions::default()
    };
    let mods: Vec<i32> = (0..20).map(|d| range_mod(bracket_for(&table, d, &options))).collect();
    assert!(mods.windows(2).all(|pair| pair[0] <= pair[1]));
  }

  #[test_log::test]
  fn test_infantry_bracket() {
    assert_eq!(infantry_bracket(1, 0), (RangeBracket::Short, -2));
    assert_eq!(infantry_bracket(1, 1), (RangeBracket::Short, 0));
    assert_eq!(infantry_bracket(2, 3), (RangeBracket::Medium, 2));
    assert_eq!(infantry_bracket(2, 6), (RangeBracket::Long, 4));
    assert_eq!(infantry_bracket(2, 7).0, RangeBracket::OutOfRange);
    assert_eq!(infantry_bracket(0, 1).0, RangeBracket::OutOfRange);
  }

  #[test_log::test]
  fn test_medium_range() {
    config_test_catalog();
    let game = game_with(vec![shooter(1, "Medium Laser", Coords::new(5, 5)), target(2, Coords::new(5, 9))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    let stage = resolve_range(&ctx);
    assert_eq!(stage.range, Some(RangeBracket::Medium));
    assert_eq!(modifier_total(&stage), 2);
    assert!(!stage.is_decided());
  }

  #[test_log::test]
  fn test_out_of_range() {
    config_test_catalog();
    let game = game_with(vec![shooter(1, "Medium Laser", Coords::new(5, 5)), target(2, Coords::new(5, 20))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    let stage = resolve_range(&ctx);
    assert!(stage.is_impossible());
    assert_eq!(stage.range, Some(RangeBracket::OutOfRange));
  }

  #[test_log::test]
  fn test_minimum_range() {
    config_test_catalog();
    let mut game = game_with(vec![shooter(1, "PPC", Coords::new(5, 5)), target(2, Coords::new(5, 6))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    // Minimum 3 at distance 1.
    assert_eq!(modifier_total(&resolve_range(&ctx)), 3);

    game.unit_mut(1).unwrap().weapons[0].state.inhibitor_off = true;
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    assert_eq!(modifier_total(&resolve_range(&ctx)), 0);
  }

  #[test_log::test]
  fn test_minimum_range_ground_only() {
    config_test_catalog();
    let mut vtol = target(2, Coords::new(5, 6));
    vtol.category = UnitCategory::Vtol;
    vtol.movement_mode = MovementMode::Vtol;
    vtol.elevation = 2;
    let game = game_with(vec![shooter(1, "AC/5", Coords::new(5, 5)), vtol]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    assert_eq!(modifier_total(&resolve_range(&ctx)), 0);
  }

  #[test_log::test]
  fn test_sniper_halves() {
    config_test_catalog();
    let mut sniper = shooter(1, "Large Laser", Coords::new(5, 5));
    sniper.crew = sniper.crew.with_ability(Ability::Sniper);
    let game = game_with(vec![sniper, target(2, Coords::new(5, 18))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    let stage = resolve_range(&ctx);
    assert_eq!(stage.range, Some(RangeBracket::Long));
    assert_eq!(modifier_total(&stage), 2);
  }

  #[test_log::test]
  fn test_ammo_range_override() {
    config_test_catalog();
    let mut unit = shooter(1, "LRM 10", Coords::new(5, 5));
    let mut bin = AmmoBin::new(AmmoFamily::Lrm, Munition::Standard, 12);
    bin.range_override = Some(RangeTable::new(0, 3, 6, 9, 12));
    unit.ammo.push(bin);
    unit.weapons[0].ammo_bin = Some(0);
    let game = game_with(vec![unit, target(2, Coords::new(5, 7))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    // No minimum range left and distance 2 is short.
    let stage = resolve_range(&ctx);
    assert_eq!(stage.range, Some(RangeBracket::Short));
    assert_eq!(modifier_total(&stage), 0);
  }

  #[test_log::test]
  fn test_underwater_table() {
    config_test_catalog();
    let mut board = HexMap::new(20, 20);
    board.add_terrain(Coords::new(5, 5), Terrain::new(TerrainKind::Water, 3));
    board.add_terrain(Coords::new(5, 10), Terrain::new(TerrainKind::Water, 3));
    let mut game = GameState::new(board);
    let mut diver = shooter(1, "Medium Laser", Coords::new(5, 5));
    diver.elevation = -3;
    game.add_unit(diver);
    let mut other = target(2, Coords::new(5, 10));
    other.elevation = -3;
    game.add_unit(other);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    // Underwater medium laser reaches only 6 hexes, long at 5.
    assert_eq!(resolve_range(&ctx).range, Some(RangeBracket::Long));
  }

  #[test_log::test]
  fn test_head_sensors() {
    config_test_catalog();
    let mut proto = shooter(1, "Large Laser", Coords::new(5, 5));
    proto.category = UnitCategory::ProtoMech;
    proto.criticals.head_sensors = true;
    let game = game_with(vec![proto, target(2, Coords::new(5, 18))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    assert!(resolve_range(&ctx).is_impossible());
  }

  #[test_log::test]
  fn test_c3_takes_better_bracket() {
    config_test_catalog();
    let mut attacker = shooter(1, "Large Laser", Coords::new(5, 5));
    attacker.equipment.c3 = Some(C3Node {
      network: 1,
      links: vec![3],
    });
    let mut spotter = Unit::new(3, "Spotter", 0, UnitCategory::Mech, MovementMode::Biped).at(Coords::new(5, 16), 0);
    spotter.equipment.c3 = Some(C3Node {
      network: 1,
      links: vec![1],
    });
    let game = game_with(vec![attacker, spotter, target(2, Coords::new(5, 18))]);
    let ctx = AttackContext::new(&game, 1, 0, TargetRef::Unit(2), false).unwrap();
    let stage = resolve_range(&ctx);
    assert_eq!(stage.range, Some(RangeBracket::Short));
  }
}
