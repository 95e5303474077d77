//! Line of sight, visual range and sensor detection.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::dice::{two_d6, Dice};
use crate::ecm;
use crate::game::GameState;
use crate::hex::Coords;
use crate::terrain::{Board, Hex, TerrainKind};
use crate::to_hit::{Cover, TargetNumber};
use crate::unit::{Stealth, Unit, UnitId, ALTITUDE_CEILING};
use crate::{debug, info};

// Woods, jungle and smoke points along a sightline at which it is blocked.
const BLOCKING_FOLIAGE_POINTS: u32 = 3;
const SENSOR_ECM_PER_SUITE: i32 = 2;
const MAX_SENSOR_ECM_MOD: i32 = 4;
const SENSOR_RANGE_STEPS: u32 = 10;

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibilityResult {
  pub clear: bool,
  pub light_woods: u32,
  pub heavy_woods: u32,
  pub ultra_woods: u32,
  pub light_smoke: u32,
  pub heavy_smoke: u32,
  pub blocked_by: Option<String>,
  pub cover: Cover,
  pub intervening: Vec<Coords>,
}

impl VisibilityResult {
  fn blocked(reason: &str) -> Self {
    VisibilityResult {
      clear: false,
      blocked_by: Some(reason.to_string()),
      ..VisibilityResult::default()
    }
  }

  fn open() -> Self {
    VisibilityResult {
      clear: true,
      ..VisibilityResult::default()
    }
  }

  /// Woods and smoke weighted by density.
  #[must_use]
  pub fn foliage_points(&self) -> u32 {
    self.light_woods + 2 * self.heavy_woods + 3 * self.ultra_woods + self.light_smoke + 2 * self.heavy_smoke
  }

  /// Modifier from intervening woods and jungle.
  #[must_use]
  pub fn woods_mod(&self) -> i32 {
    i32::try_from(self.light_woods + 2 * self.heavy_woods + 3 * self.ultra_woods).unwrap_or(i32::MAX)
  }

  /// Modifier from intervening smoke.
  #[must_use]
  pub fn smoke_mod(&self) -> i32 {
    i32::try_from(self.light_smoke + 2 * self.heavy_smoke).unwrap_or(i32::MAX)
  }
}

// What one intervening hex contributes to a sightline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HexEffect {
  blocking: Option<&'static str>,
  woods: Option<u8>,
  smoke: Option<u8>,
  partial_cover: bool,
}

impl HexEffect {
  fn points(&self) -> u32 {
    u32::from(self.woods.unwrap_or(0)) + u32::from(self.smoke.unwrap_or(0))
  }

  // Worse for the observer: blocked beats unblocked, then more foliage.
  fn worse(self, other: HexEffect) -> HexEffect {
    match (self.blocking.is_some(), other.blocking.is_some()) {
      (true, _) => self,
      (false, true) => other,
      (false, false) if other.points() > self.points() || (other.partial_cover && !self.partial_cover) => other,
      _ => self,
    }
  }
}

/// Level of the top of `unit`, where it is seen from and looks from.
fn sight_level(game: &GameState, unit: &Unit) -> Option<i32> {
  game.unit_level(unit).map(|level| level + unit.height())
}

fn hex_effect(hex: &Hex, line_level: f64, adjacent_to_target: bool, target_base: i32) -> HexEffect {
  let mut effect = HexEffect::default();
  let solid_top = hex.elevation + i32::from(hex.building_height());
  if f64::from(solid_top) > line_level {
    effect.blocking = Some(if hex.contains(TerrainKind::Building) {
      "building"
    } else {
      "terrain"
    });
    return effect;
  }
  let foliage_top = match hex.foliage() {
    Some(3) => hex.elevation + 3,
    Some(_) => hex.elevation + 2,
    None => i32::MIN,
  };
  if f64::from(foliage_top) > line_level {
    effect.woods = hex.foliage();
  }
  if hex.contains(TerrainKind::Smoke) && f64::from(hex.elevation + 2) > line_level {
    effect.smoke = hex.level_of(TerrainKind::Smoke);
  }
  effect.partial_cover = adjacent_to_target && solid_top == target_base + 1;
  effect
}

/// Trace the sightline between two points at the given levels.  `target_base` is the level the target stands on,
/// used to find partial cover next to it.
#[must_use]
pub fn trace_sightline(game: &GameState, from: Coords, from_level: i32, to: Coords, to_level: i32, target_base: i32) -> VisibilityResult {
  let line = from.line_to(to);
  let steps = line.len().saturating_sub(1);
  let mut result = VisibilityResult::open();
  if steps < 2 {
    return result;
  }

  for (index, step) in line.iter().enumerate().take(steps).skip(1) {
    // Steps are at most the map diameter.
    #[allow(clippy::cast_precision_loss)]
    let fraction = index as f64 / steps as f64;
    let line_level = f64::from(from_level) + f64::from(to_level - from_level) * fraction;

    let effect_of = |coords: Coords| -> HexEffect {
      match game.board.hex_at(coords) {
        Some(hex) => hex_effect(hex, line_level, coords.is_adjacent(to), target_base),
        None => HexEffect::default(),
      }
    };
    result.intervening.push(step.primary);
    let mut effect = effect_of(step.primary);
    if let Some(alternate) = step.alternate {
      result.intervening.push(alternate);
      effect = effect.worse(effect_of(alternate));
    }

    if let Some(reason) = effect.blocking {
      result.clear = false;
      result.blocked_by = Some(format!("{reason} at {}", step.primary));
      return result;
    }
    match effect.woods {
      Some(1) => result.light_woods += 1,
      Some(2) => result.heavy_woods += 1,
      Some(level) if level >= 3 => result.ultra_woods += 1,
      _ => {}
    }
    match effect.smoke {
      Some(1) => result.light_smoke += 1,
      Some(level) if level >= 2 => result.heavy_smoke += 1,
      _ => {}
    }
    if effect.partial_cover {
      result.cover = Cover::Partial;
    }
  }

  if result.foliage_points() >= BLOCKING_FOLIAGE_POINTS {
    result.clear = false;
    result.blocked_by = Some("intervening woods and smoke".to_string());
  }
  result
}

/// Line of sight between two units.
#[must_use]
pub fn line_of_sight(game: &GameState, observer: &Unit, target: &Unit) -> VisibilityResult {
  let (Some(from), Some(to)) = (observer.position, target.position) else {
    return VisibilityResult::blocked("not on board");
  };
  // Terrain never blocks sight to or from the air.
  if observer.is_airborne_aero() || target.is_airborne_aero() || game.board.is_space() {
    return VisibilityResult::open();
  }
  let (Some(from_level), Some(to_level), Some(target_base)) =
    (sight_level(game, observer), sight_level(game, target), game.unit_level(target))
  else {
    return VisibilityResult::blocked("not on board");
  };
  let result = trace_sightline(game, from, from_level, to, to_level, target_base);
  debug!(
    "(Visibility.line_of_sight) {} -> {}: clear {}, woods {}/{}/{}, smoke {}/{}, cover {}.",
    observer.name,
    target.name,
    result.clear,
    result.light_woods,
    result.heavy_woods,
    result.ultra_woods,
    result.light_smoke,
    result.heavy_smoke,
    result.cover
  );
  result
}

/// Line of sight from a unit to a hex.
#[must_use]
pub fn line_of_sight_to_hex(game: &GameState, observer: &Unit, target: Coords) -> VisibilityResult {
  let Some(from) = observer.position else {
    return VisibilityResult::blocked("not on board");
  };
  if observer.is_airborne_aero() || game.board.is_space() {
    return VisibilityResult::open();
  }
  let (Some(from_level), Some(hex)) = (sight_level(game, observer), game.hex(target)) else {
    return VisibilityResult::blocked("not on board");
  };
  trace_sightline(game, from, from_level, target, hex.surface(), hex.surface())
}

/// Distance between two units, measured from the nearest hex of an airborne unit's flight path when exactly one of
/// them is in the air.
#[must_use]
pub fn effective_distance(observer: &Unit, target: &Unit) -> Option<u32> {
  let from = observer.position?;
  let to = target.position?;
  let distance = match (observer.is_airborne_aero(), target.is_airborne_aero()) {
    (true, false) => observer.closest_flight_path_hex(to)?.distance(to),
    (false, true) => target.closest_flight_path_hex(from)?.distance(from),
    _ => from.distance(to),
  };
  Some(distance)
}

/// True if `target` is within the observer's unaided visual range.
#[must_use]
pub fn in_visual_range(game: &GameState, observer: &Unit, target: &Unit, visibility: &VisibilityResult) -> bool {
  let Some(target_position) = target.position else {
    return false;
  };
  if observer.is_airborne_aero() && observer.altitude > ALTITUDE_CEILING && target.is_ground() {
    return observer.flight_path.contains(&target_position)
      || target.secondary_positions.iter().any(|hex| observer.flight_path.contains(hex));
  }
  let Some(distance) = effective_distance(observer, target) else {
    return false;
  };

  let mut range = game.conditions.visual_range(target.state.illuminated);
  let smoke = visibility.light_smoke + 2 * visibility.heavy_smoke;
  range = range.saturating_sub(smoke).max(1);

  let stealthy = target.has_active_stealth();
  if stealthy && (target.equipment.stealth == Stealth::NullSignature || target.is_camouflaged()) {
    range = (range / 4).max(1);
  } else if stealthy || target.is_camouflaged() {
    range = (range / 2).max(1);
  }
  distance <= range
}

/// True if `target` is inside the observer's maximum sensor range.
#[must_use]
pub fn in_sensor_range(observer: &Unit, target: &Unit) -> bool {
  let Some(sensor) = observer.equipment.sensor else {
    return false;
  };
  if !target.is_eligible() {
    return false;
  }
  effective_distance(observer, target).is_some_and(|distance| distance <= sensor.max_range)
}

/// Number the observer needs on 2d6 to pick up `target` on sensors, or `None` if no check is possible.
#[must_use]
pub fn sensor_check(game: &GameState, observer: &Unit, target: &Unit) -> Option<TargetNumber> {
  let sensor = observer.equipment.sensor?;
  if sensor.max_range == 0 || !in_sensor_range(observer, target) || !observer.is_enemy(target) {
    return None;
  }
  let distance = effective_distance(observer, target)?;
  let (from, to) = (observer.position?, target.position?);

  let mut check = TargetNumber::new(i32::from(observer.crew.get_skill(crate::crew::Skills::Sensors)), "sensor skill");
  let steps = distance * SENSOR_RANGE_STEPS / sensor.max_range;
  check.add_modifier(i32::try_from(steps).unwrap_or(i32::MAX), "range");

  let jamming = ecm::net_enemy_ecm_between(game, observer.owner, from, to);
  let jamming = i32::try_from(jamming).unwrap_or(i32::MAX).saturating_mul(SENSOR_ECM_PER_SUITE);
  check.add_modifier(jamming.min(MAX_SENSOR_ECM_MOD), "enemy ECM");

  if game.options.sensor_shadow {
    let shadows = game
      .friends_of(target)
      .filter(|unit| unit.is_large_craft() && unit.position.is_some_and(|p| p.distance(to) <= 1))
      .count();
    check.add_modifier(i32::try_from(shadows).unwrap_or(i32::MAX), "sensor shadow");
  }
  if sensor.active_probe {
    check.add_modifier(-1, "active probe");
  }
  if observer.crew.has_ability(crate::crew::Ability::SensorGeek) {
    check.add_modifier(-2, "sensor geek");
  }
  if observer.crew.has_ability(crate::crew::Ability::EagleEyes) {
    check.add_modifier(-1, "eagle eyes");
  }
  Some(check)
}

/// Roll a sensor check.  No roll is made when no check is possible.
pub fn detect(game: &GameState, observer: &Unit, target: &Unit, dice: &mut dyn Dice) -> bool {
  let Some(check) = sensor_check(game, observer, target) else {
    return false;
  };
  let roll = two_d6(dice);
  let detected = check.hits(roll.total());
  debug!(
    "(Visibility.detect) {} sensor check on {}: needs {}, rolled {} -> {}.",
    observer.name,
    target.name,
    check,
    roll.total(),
    detected
  );
  detected
}

/// True if the observer can see `target`, by eye or, when `use_sensors` is set, through an existing sensor contact.
#[must_use]
pub fn can_see(game: &GameState, observer: &Unit, target: &Unit, use_sensors: bool) -> bool {
  if !observer.is_enemy(target) {
    return true;
  }
  if !target.is_eligible() || observer.position.is_none() {
    return false;
  }
  let visibility = line_of_sight(game, observer, target);
  if visibility.clear && in_visual_range(game, observer, target, &visibility) {
    return true;
  }
  use_sensors && observer.sensor_contacts.contains(&target.id)
}

/// Refresh every unit's sensor contacts and firing solutions.  All checks are worked out against the unchanged
/// snapshot first and written back afterwards, so roll order follows unit id order and then target id order.
pub fn update_sensor_contacts(game: &mut GameState, dice: &mut dyn Dice) {
  let mut updates: Vec<(UnitId, BTreeSet<UnitId>, BTreeSet<UnitId>)> = vec![];

  for observer in game.units.values() {
    if !observer.is_eligible() {
      updates.push((observer.id, BTreeSet::new(), BTreeSet::new()));
      continue;
    }
    let mut contacts = BTreeSet::new();
    let mut solutions = BTreeSet::new();
    for target in game.enemies_of(observer) {
      let in_range = in_sensor_range(observer, target);
      let contact = if observer.sensor_contacts.contains(&target.id) && in_range {
        true
      } else {
        in_range && detect(game, observer, target, dice)
      };
      if contact {
        contacts.insert(target.id);
      }

      let close_contact = contact
        && observer.equipment.sensor.is_some_and(|sensor| {
          effective_distance(observer, target).is_some_and(|distance| distance <= sensor.max_range / 2)
        });
      if close_contact || can_see(game, observer, target, false) {
        solutions.insert(target.id);
      }
    }
    updates.push((observer.id, contacts, solutions));
  }

  for (id, contacts, solutions) in updates {
    if let Some(unit) = game.units.get_mut(&id) {
      if unit.sensor_contacts != contacts {
        info!(
          "(Visibility.update_sensor_contacts) {} now has contacts {:?} and firing solutions {:?}.",
          unit.name, contacts, solutions
        );
      }
      unit.sensor_contacts = contacts;
      unit.firing_solutions = solutions;
    }
  }
}
