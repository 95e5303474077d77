use crate::game::GameState;
use crate::hex::Coords;
use crate::rules_tables::MAX_GHOST_TARGET_MOD;
use crate::trace;
use crate::unit::Unit;

/// Radius of an ECM bubble in hexes.
pub const ECM_RANGE: u32 = 6;

fn within_bubble(unit: &Unit, coords: Coords) -> bool {
  unit.position.is_some_and(|position| position.distance(coords) <= ECM_RANGE)
}

/// Enemy ECM strength at `coords` left over after `owner`'s own ECM and ECCM cancel what they can.
#[must_use]
pub fn net_enemy_ecm(game: &GameState, owner: u32, coords: Coords) -> u32 {
  let (enemy, friendly) = game
    .units
    .values()
    .filter(|unit| unit.is_eligible() && within_bubble(unit, coords))
    .fold((0, 0), |(enemy, friendly), unit| {
      if unit.owner == owner {
        let counter = if unit.has_active_ecm() || unit.has_active_eccm() {
          unit.ecm_strength()
        } else {
          0
        };
        (enemy, friendly + counter)
      } else if unit.has_active_ecm() {
        (enemy + unit.ecm_strength(), friendly)
      } else {
        (enemy, friendly)
      }
    });
  let net = enemy.saturating_sub(friendly);
  trace!(
    "(Ecm.net_enemy_ecm) At {} for side {}: enemy {}, friendly {}, net {}.",
    coords,
    owner,
    enemy,
    friendly,
    net
  );
  net
}

/// True if `owner`'s electronics at `coords` are jammed.
#[must_use]
pub fn is_affected(game: &GameState, owner: u32, coords: Coords) -> bool {
  net_enemy_ecm(game, owner, coords) > 0
}

/// Strongest net enemy ECM anywhere on the line from `from` to `to`, endpoints included.
#[must_use]
pub fn net_enemy_ecm_between(game: &GameState, owner: u32, from: Coords, to: Coords) -> u32 {
  from
    .line_to(to)
    .iter()
    .flat_map(|step| std::iter::once(step.primary).chain(step.alternate))
    .map(|coords| net_enemy_ecm(game, owner, coords))
    .max()
    .unwrap_or(0)
}

/// True if enemy ECM covers any hex between `from` and `to`.
#[must_use]
pub fn is_affected_between(game: &GameState, owner: u32, from: Coords, to: Coords) -> bool {
  net_enemy_ecm_between(game, owner, from, to) > 0
}

/// To-hit penalty from enemy ghost targets around `attacker`.
#[must_use]
pub fn ghost_target_mod(game: &GameState, attacker: &Unit) -> i32 {
  if !game.options.ghost_targets {
    return 0;
  }
  let Some(position) = attacker.position else {
    return 0;
  };
  let strength: u32 = game
    .enemies_of(attacker)
    .filter(|unit| within_bubble(unit, position))
    .filter_map(|unit| unit.equipment.ecm)
    .filter(|ecm| ecm.active && !ecm.eccm)
    .map(|ecm| ecm.ghost_strength)
    .sum();
  i32::try_from(strength).unwrap_or(i32::MAX).min(MAX_GHOST_TARGET_MOD)
}
