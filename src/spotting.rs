//! Derived queries for attacks that rely on other units: indirect-fire spotters, C3 networks and artillery lead.
use std::collections::BTreeSet;

use crate::combat::AttackContext;
use crate::crew::Ability;
use crate::ecm;
use crate::game::GameState;
use crate::hex::Coords;
use crate::rules_tables::artillery_flight_turns;
use crate::terrain::Board;
use crate::unit::{Unit, UnitId};
use crate::visibility::line_of_sight;
use crate::{debug, trace};

/// Modifier a spotter adds to an indirect attack on `target`, or `None` if it cannot see the target.
#[must_use]
pub fn spotter_modifier(game: &GameState, spotter: &Unit, target: &Unit) -> Option<i32> {
  let sight = line_of_sight(game, spotter, target);
  if !sight.clear {
    return None;
  }
  let attacking = spotter.state.attacking && !spotter.crew.has_ability(Ability::ForwardObserver);
  Some(sight.woods_mod() + sight.smoke_mod() + i32::from(attacking))
}

/// The friendly unit spotting `target` for `attacker` with the lowest modifier, along with that modifier.  Ties keep
/// the unit found first in id order.
#[must_use]
pub fn best_spotter<'a>(game: &'a GameState, attacker: &'a Unit, target: &Unit) -> Option<(&'a Unit, i32)> {
  let best = game
    .friends_of(attacker)
    .filter(|unit| unit.state.spotting == Some(target.id))
    .filter_map(|unit| spotter_modifier(game, unit, target).map(|modifier| (unit, modifier)))
    .min_by_key(|(_, modifier)| *modifier);
  debug!(
    "(Spotting.best_spotter) Best spotter for {} on {}: {:?}.",
    attacker.name,
    target.name,
    best.map(|(unit, modifier)| (unit.name.as_str(), modifier))
  );
  best
}

fn networked(unit: &Unit, network: u32) -> bool {
  unit.is_eligible() && unit.equipment.c3.as_ref().is_some_and(|node| node.network == network)
}

fn linked(a: &Unit, b: &Unit) -> bool {
  let listed = |from: &Unit, to: &Unit| from.equipment.c3.as_ref().is_some_and(|node| node.links.contains(&to.id));
  listed(a, b) || listed(b, a)
}

// Depth-first search over C3 links from `from` back to `goal`, skipping links cut by enemy ECM.
fn relay_reaches(game: &GameState, from: &Unit, goal: UnitId, network: u32, visited: &mut BTreeSet<UnitId>) -> bool {
  if from.id == goal {
    return true;
  }
  visited.insert(from.id);
  let Some(from_position) = from.position else {
    return false;
  };
  for next in game.units.values() {
    if visited.contains(&next.id) || !networked(next, network) || !linked(from, next) {
      continue;
    }
    let Some(next_position) = next.position else {
      continue;
    };
    if ecm::is_affected_between(game, from.owner, from_position, next_position) {
      trace!("(Spotting.relay_reaches) C3 link {} -> {} jammed.", from.name, next.name);
      continue;
    }
    if relay_reaches(game, next, goal, network, visited) {
      return true;
    }
  }
  false
}

/// The networked unit whose range to the target the attacker may borrow: the nearest C3 partner with a clear line
/// of sight and an unjammed chain of links back to the attacker.  Falls back to the attacker itself.
#[must_use]
pub fn find_c3_spotter<'a>(ctx: &AttackContext<'a>) -> &'a Unit {
  let attacker = ctx.attacker;
  let (Some(node), Some(target), Some(attacker_position)) = (attacker.equipment.c3.as_ref(), ctx.target, attacker.position)
  else {
    return attacker;
  };
  let game = ctx.game;
  if ecm::is_affected(game, attacker.owner, attacker_position) {
    debug!("(Spotting.find_c3_spotter) {} is jammed and off the C3 network.", attacker.name);
    return attacker;
  }

  let mut candidates: Vec<&Unit> = game
    .friends_of(attacker)
    .filter(|unit| networked(unit, node.network))
    .filter(|unit| line_of_sight(game, unit, target).clear)
    .collect();
  candidates.sort_by_key(|unit| unit.position.map_or(u32::MAX, |p| p.distance(ctx.target_position)));

  for candidate in candidates {
    let mut visited = BTreeSet::new();
    if relay_reaches(game, candidate, attacker.id, node.network, &mut visited) {
      debug!("(Spotting.find_c3_spotter) {} spots {} for {}.", candidate.name, target.name, attacker.name);
      return candidate;
    }
  }
  attacker
}

/// Where an artillery shot fired from `attacker_position` should land to meet `target` when the shell arrives.
/// Moving targets are projected along their last displacement; stationary ones along their facing at walking speed.
/// An aim point off the board is pulled back toward the target.
#[must_use]
pub fn artillery_lead(game: &GameState, attacker_position: Coords, target: &Unit) -> Option<Coords> {
  let position = target.position?;
  let turns = artillery_flight_turns(attacker_position.distance(position));
  if turns == 0 {
    return Some(position);
  }
  let turns = i32::try_from(turns).unwrap_or(i32::MAX);
  let aim = match target.last_position {
    Some(previous) if previous != position => position.projected(previous, turns),
    _ => position.translated_n(target.facing, i32::try_from(target.walk_mp).unwrap_or(0).saturating_mul(turns)),
  };
  let aim = if game.board.contains(aim) {
    aim
  } else {
    aim
      .line_to(position)
      .iter()
      .map(|step| step.primary)
      .find(|hex| game.board.contains(*hex))
      .unwrap_or(position)
  };
  debug!(
    "(Spotting.artillery_lead) Leading {} at {} by {} turns: aim at {}.",
    target.name,
    position,
    turns,
    aim
  );
  Some(aim)
}
