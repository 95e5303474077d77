//! Damage resolution: cluster table lookups, expected and rolled damage, conversion to infantry casualties and
//! ammunition choice.
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::combat::{compute_to_hit, AttackContext, TargetRef};
use crate::damage_tables::{
  cluster_row, guidance_cluster_mod, guidance_damage_mult, AMS_CLUSTER_MOD, AMS_DAMAGE_MULT, ARMOR_PIERCING_PREFERENCE,
  AVERAGE_ROLL, CLUSTER_PREFERENCE, HOT_TARGET_HEAT, INFERNO_PREFERENCE, LOW_ARMOR_FRACTION, NARC_CLUSTER_MOD,
  NARC_DAMAGE_MULT, NARC_PREFERENCE,
};
use crate::dice::{two_d6, Dice};
use crate::ecm;
use crate::error::RulesError;
use crate::game::GameState;
use crate::rules_tables::RangeBracket;
use crate::to_hit::TargetNumber;
use crate::unit::{Unit, UnitCategory, UnitId};
use crate::weapon::{
  AmmoBin, AmmoFamily, DamageFormula, FireMode, InfantryDamageClass, MountedWeapon, Munition, SpecialAttack,
  WeaponFlag, WeaponProfile,
};
use crate::{debug, error, info};

// Largest row in the cluster table, and the largest of the contiguous rows below it.
const LARGEST_RACK: u32 = 40;
const LARGEST_CONTIGUOUS_RACK: u32 = 30;

/// Number of missiles or shots that hit for a rack of `rack_size` on a cluster roll of `roll` adjusted by `modifier`.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` if the table has nothing for `rack_size`.
pub fn resolve_cluster_hits(rack_size: u32, roll: u32, modifier: i32) -> Result<u32, RulesError> {
  cluster_hits(rack_size, roll, modifier, false)
}

/// As [`resolve_cluster_hits`], but with advanced AMS a modified roll below 2 means nothing hits.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` if the table has nothing for `rack_size`.
pub fn cluster_hits(rack_size: u32, roll: u32, modifier: i32, advanced_ams: bool) -> Result<u32, RulesError> {
  if rack_size == 0 {
    return Err(RulesError::ClusterTableMiss(0));
  }
  let modified = i64::from(roll) + i64::from(modifier);
  if advanced_ams && modified < 2 {
    debug!("(Damage.cluster_hits) Modified roll {} stopped every missile.", modified);
    return Ok(0);
  }
  // Clamped into 2..=12 so the conversion cannot fail.
  let column = u32::try_from(modified.clamp(2, 12)).unwrap_or(2);
  table_hits(rack_size, column)
}

fn table_hits(rack_size: u32, roll: u32) -> Result<u32, RulesError> {
  match rack_size {
    0 => Err(RulesError::ClusterTableMiss(0)),
    1 => Ok(1),
    size if size > LARGEST_RACK => Ok(table_hits(LARGEST_RACK, roll)? + table_hits(size - LARGEST_RACK, roll)?),
    size if size > LARGEST_CONTIGUOUS_RACK && size < LARGEST_RACK => {
      Ok(table_hits(LARGEST_CONTIGUOUS_RACK, roll)? + table_hits(size - LARGEST_CONTIGUOUS_RACK, roll)?)
    }
    size => cluster_row(size)
      .map(|row| row[roll as usize - 1])
      .ok_or(RulesError::ClusterTableMiss(size)),
  }
}

/// Hits for an average cluster roll.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` if the table has nothing for `rack_size`.
pub fn cluster_average(rack_size: u32) -> Result<f64, RulesError> {
  Ok(f64::from(resolve_cluster_hits(rack_size, AVERAGE_ROLL, 0)?))
}

fn per_range_index(bracket: RangeBracket) -> usize {
  match bracket {
    RangeBracket::Short => 0,
    RangeBracket::Medium => 1,
    RangeBracket::Long => 2,
    RangeBracket::Extreme | RangeBracket::LineOfSight | RangeBracket::OutOfRange => 3,
  }
}

/// Abstracted damage of a weapon at `bracket`, with clusters taken at the average roll.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` for a cluster weapon with no usable rack size.
pub fn battle_force_damage(profile: &WeaponProfile, bracket: RangeBracket) -> Result<f64, RulesError> {
  if bracket == RangeBracket::OutOfRange {
    return Ok(0.0);
  }
  let damage = match profile.damage {
    DamageFormula::Fixed(damage) => f64::from(damage),
    DamageFormula::PerRange(table) => f64::from(table[per_range_index(bracket)]),
    DamageFormula::Cluster(per_missile) => cluster_average(profile.rack_size)? * f64::from(per_missile),
    DamageFormula::Variable | DamageFormula::Special(SpecialAttack::Artillery) => f64::from(profile.rack_size),
    DamageFormula::Special(SpecialAttack::Narc | SpecialAttack::Tag) => 0.0,
  };
  Ok(damage)
}

/// True if the weapon is firing more than one shot this turn and risks jamming.
#[must_use]
pub fn spins_up(weapon: &MountedWeapon) -> bool {
  match weapon.mode {
    FireMode::Single => false,
    FireMode::Double => weapon.profile.has_flag(WeaponFlag::Ultra),
    FireMode::Rotary(_) => weapon.profile.has_flag(WeaponFlag::Rotary) && weapon.mode.shots() > 1,
  }
}

/// True if a natural attack roll of `natural_roll` jams a weapon firing in `mode`.
#[must_use]
pub fn spin_up_jams(mode: FireMode, natural_roll: u32) -> bool {
  let jam_on = match mode {
    FireMode::Single => return false,
    FireMode::Double => 2,
    FireMode::Rotary(_) => match mode.shots() {
      1 => return false,
      2 | 3 => 2,
      4 | 5 => 3,
      _ => 4,
    },
  };
  natural_roll <= jam_on
}

/// Cluster roll modifier and expected-damage multiplier from guidance, NARC beacons and anti-missile systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterBonus {
  pub modifier: i32,
  pub multiplier: f64,
}

/// Usable anti-missile systems on `target`.
#[must_use]
pub fn intercepting_ams(target: &Unit) -> u32 {
  let count = target
    .weapons
    .iter()
    .filter(|weapon| weapon.profile.has_flag(WeaponFlag::Ams) && weapon.is_usable())
    .count();
  u32::try_from(count).unwrap_or(u32::MAX)
}

#[must_use]
pub fn cluster_bonus(ctx: &AttackContext) -> ClusterBonus {
  let mut bonus = ClusterBonus {
    modifier: 0,
    multiplier: 1.0,
  };
  let profile = &ctx.weapon.profile;
  if !profile.is_missile() {
    return bonus;
  }
  if let Some(guidance) = ctx.weapon.guidance {
    if ecm::is_affected_between(ctx.game, ctx.attacker.owner, ctx.attacker_position(), ctx.target_position) {
      debug!("(Damage.cluster_bonus) {} guidance jammed by ECM.", guidance);
    } else {
      bonus.modifier += guidance_cluster_mod(guidance);
      bonus.multiplier *= guidance_damage_mult(guidance);
    }
  }
  if let Some(target) = ctx.target {
    if target.state.narc_tagged && ctx.munition() == Munition::NarcCapable {
      bonus.modifier += NARC_CLUSTER_MOD;
      bonus.multiplier *= NARC_DAMAGE_MULT;
    }
    let ams = intercepting_ams(target);
    if ams > 0 {
      bonus.modifier += AMS_CLUSTER_MOD;
      bonus.multiplier *= (0..ams).fold(1.0, |mult, _| mult * AMS_DAMAGE_MULT);
    }
  }
  bonus
}

fn lbx_cluster(ctx: &AttackContext) -> bool {
  ctx.weapon.profile.has_flag(WeaponFlag::Lbx) && ctx.munition() == Munition::Cluster
}

/// What a hit does to conventional infantry, before the conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfantryDamageInput {
  pub damage: u32,
  pub class: InfantryDamageClass,
  /// Hits scored, multiplying burst damage.
  pub hits: u32,
  pub attacker_is_infantry: bool,
  pub target_mechanized: bool,
  pub target_in_open: bool,
  pub margin_of_success: i32,
  /// The target's shooting strength; no attack kills more troopers than this.
  pub troopers: u32,
}

// Works in tenths of a trooper so every class rounds up once, at the end.
fn convert_infantry_damage(input: &InfantryDamageInput, burst_total: u32) -> u32 {
  let damage = input.damage;
  let burst = matches!(input.class, InfantryDamageClass::Burst(_));
  let margin = input.margin_of_success.max(0).unsigned_abs();
  let mut tenths = match input.class {
    InfantryDamageClass::DirectFire => damage,
    InfantryDamageClass::ClusterBallistic => damage + 10,
    InfantryDamageClass::Pulse => damage + 20,
    InfantryDamageClass::ClusterMissile => damage * 2 + margin * 10,
    InfantryDamageClass::AreaEffect => damage * 20,
    InfantryDamageClass::Burst(_) => burst_total * input.hits.max(1) * 10,
  };
  if !input.attacker_is_infantry && input.target_mechanized {
    tenths = if burst { tenths / 2 } else { tenths * 2 };
  }
  if input.target_in_open {
    tenths *= 2;
  }
  let mut casualties = tenths.div_ceil(10);
  if input.margin_of_success >= 0 {
    casualties = casualties.max(1);
  }
  casualties.min(input.troopers)
}

/// Troopers of a conventional infantry unit taken out by a hit.  Burst weapons roll their dice.
pub fn infantry_damage_conversion(input: &InfantryDamageInput, dice: &mut dyn Dice) -> u32 {
  let burst_total = match input.class {
    InfantryDamageClass::Burst(count) => dice.roll_dice(count, 6).total(),
    _ => 0,
  };
  let casualties = convert_infantry_damage(input, burst_total);
  debug!(
    "(Damage.infantry_damage_conversion) {} damage as {:?} -> {} casualties.",
    input.damage,
    input.class,
    casualties
  );
  casualties
}

/// Casualties for an average burst roll.
#[must_use]
pub fn expected_infantry_damage(input: &InfantryDamageInput) -> u32 {
  let burst_total = match input.class {
    InfantryDamageClass::Burst(count) => count * 7 / 2,
    _ => 0,
  };
  convert_infantry_damage(input, burst_total)
}

fn infantry_input(ctx: &AttackContext, target: &Unit, damage: u32, hits: u32, margin: i32) -> InfantryDamageInput {
  InfantryDamageInput {
    damage,
    class: ctx.weapon.profile.infantry_class,
    hits,
    attacker_is_infantry: ctx.attacker.is_infantry(),
    target_mechanized: target.is_mechanized_infantry(),
    target_in_open: ctx.target_hex().is_some_and(crate::terrain::Hex::is_open),
    margin_of_success: margin,
    troopers: target.troopers,
  }
}

fn average_damage(ctx: &AttackContext, bracket: RangeBracket) -> Result<f64, RulesError> {
  let weapon = ctx.weapon;
  let profile = &weapon.profile;
  let damage = match profile.damage {
    DamageFormula::Fixed(damage) => {
      let damage = f64::from(weapon.dialed_damage(damage));
      if spins_up(weapon) {
        cluster_average(weapon.mode.shots())? * damage
      } else if lbx_cluster(ctx) {
        cluster_average(profile.rack_size)?
      } else {
        damage
      }
    }
    DamageFormula::PerRange(table) => f64::from(weapon.dialed_damage(table[per_range_index(bracket)])),
    DamageFormula::Cluster(per_missile) => {
      let hits = if profile.has_flag(WeaponFlag::Streak) {
        f64::from(profile.rack_size)
      } else {
        cluster_average(profile.rack_size)? * cluster_bonus(ctx).multiplier
      };
      hits * f64::from(weapon.dialed_damage(per_missile))
    }
    DamageFormula::Variable | DamageFormula::Special(SpecialAttack::Artillery) => f64::from(profile.rack_size),
    DamageFormula::Special(SpecialAttack::Narc | SpecialAttack::Tag) => 0.0,
  };
  Ok(damage)
}

/// Expected damage of the attack: average damage on a hit times the chance to hit, or just the average damage when
/// `assume_hit` is set.  An impossible attack does nothing either way.  Never rolls.
#[must_use]
pub fn expected_damage(ctx: &AttackContext, to_hit: &TargetNumber, assume_hit: bool) -> f64 {
  if to_hit.is_impossible() {
    return 0.0;
  }
  let chance = if assume_hit { 1.0 } else { to_hit.hit_chance() };
  let bracket = to_hit.range.unwrap_or(RangeBracket::Short);
  let damage = match average_damage(ctx, bracket) {
    Ok(damage) => damage,
    Err(e) => {
      error!("(Damage.expected_damage) Cannot work out damage for {}: {}", ctx.weapon.profile.name, e);
      return 0.0;
    }
  };
  let damage = match ctx.target {
    Some(target) if target.is_conventional_infantry() => {
      // Whole points of damage only; fractions from multipliers are dropped.
      #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
      let whole = damage.max(0.0) as u32;
      f64::from(expected_infantry_damage(&infantry_input(ctx, target, whole, 1, 0)))
    }
    _ => damage,
  };
  chance * damage
}

/// Damage dealt by a hit.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DamageOutcome {
  /// Missiles, pellets or shots that struck.
  pub hits: u32,
  pub cluster_roll: Option<u32>,
  pub damage: u32,
  /// Troopers taken out, for conventional infantry targets.
  pub casualties: Option<u32>,
}

/// Roll the damage of an attack that hit with a margin of success of `margin`.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` for a cluster weapon with no usable rack size.
pub fn resolve_damage(
  ctx: &AttackContext, to_hit: &TargetNumber, margin: i32, dice: &mut dyn Dice,
) -> Result<DamageOutcome, RulesError> {
  let weapon = ctx.weapon;
  let profile = &weapon.profile;
  let advanced_ams = ctx.game.options.advanced_ams;
  let mut outcome = DamageOutcome {
    hits: 1,
    cluster_roll: None,
    damage: 0,
    casualties: None,
  };

  match profile.damage {
    DamageFormula::Fixed(damage) => {
      let damage = weapon.dialed_damage(damage);
      if spins_up(weapon) {
        let roll = two_d6(dice).total();
        outcome.cluster_roll = Some(roll);
        outcome.hits = cluster_hits(weapon.mode.shots(), roll, 0, false)?;
        outcome.damage = damage * outcome.hits;
      } else if lbx_cluster(ctx) {
        let roll = two_d6(dice).total();
        outcome.cluster_roll = Some(roll);
        outcome.hits = cluster_hits(profile.rack_size, roll, 0, false)?;
        outcome.damage = outcome.hits;
      } else {
        outcome.damage = damage;
      }
    }
    DamageFormula::PerRange(table) => {
      let bracket = to_hit.range.unwrap_or(RangeBracket::Short);
      outcome.damage = weapon.dialed_damage(table[per_range_index(bracket)]);
    }
    DamageFormula::Cluster(per_missile) => {
      if profile.has_flag(WeaponFlag::Streak) {
        outcome.hits = profile.rack_size;
      } else {
        let roll = if weapon.state.hot_loaded {
          dice.roll_dice(3, 6).lowest(2)
        } else {
          two_d6(dice).total()
        };
        outcome.cluster_roll = Some(roll);
        outcome.hits = cluster_hits(profile.rack_size, roll, cluster_bonus(ctx).modifier, advanced_ams)?;
      }
      outcome.damage = outcome.hits * weapon.dialed_damage(per_missile);
    }
    DamageFormula::Variable | DamageFormula::Special(SpecialAttack::Artillery) => {
      outcome.damage = profile.rack_size;
    }
    DamageFormula::Special(SpecialAttack::Narc | SpecialAttack::Tag) => {}
  }

  if let Some(target) = ctx.target.filter(|target| target.is_conventional_infantry()) {
    let input = infantry_input(ctx, target, outcome.damage, outcome.hits, margin);
    outcome.casualties = Some(infantry_damage_conversion(&input, dice));
  }
  debug!(
    "(Damage.resolve_damage) {} hits with {} of {}: {} damage.",
    profile.name,
    outcome.hits,
    profile.rack_size.max(1),
    outcome.damage
  );
  Ok(outcome)
}

/// How much better a munition suits `target` than standard ammunition.
#[must_use]
pub fn ammo_preference(bin: &AmmoBin, target: Option<&Unit>) -> f64 {
  let Some(target) = target else {
    return 1.0;
  };
  let mut preference = 1.0;
  match bin.munition {
    Munition::Cluster
      if target.is_infantry()
        || target.category == UnitCategory::Vtol
        || target.armor_fraction() <= LOW_ARMOR_FRACTION =>
    {
      preference *= CLUSTER_PREFERENCE;
    }
    Munition::ArmorPiercing if target.is_mech() || target.is_vehicle() => preference *= ARMOR_PIERCING_PREFERENCE,
    Munition::Inferno => {
      if target.heat >= HOT_TARGET_HEAT {
        preference *= INFERNO_PREFERENCE;
      }
      if target.is_infantry() {
        preference *= INFERNO_PREFERENCE;
      }
    }
    _ => {}
  }
  if bin.family == AmmoFamily::Narc || bin.munition.is_beacon() {
    preference *= if target.state.narc_tagged { 0.0 } else { NARC_PREFERENCE };
  }
  preference
}

/// Value of firing `ctx`'s weapon with the ammunition in `bin`.  Minefield munitions are never scored.  NARC-capable
/// missiles only pay off against a tagged target, so otherwise they score the same as standard ammunition and
/// `select_ammo` keeps whichever bin comes first.
#[must_use]
pub fn score_ammo_choice(ctx: &AttackContext, bin: &AmmoBin) -> Option<f64> {
  if bin.munition.is_minefield() || !bin.feeds(&ctx.weapon.profile) {
    return None;
  }
  let loaded = ctx.with_ammo(bin);
  let to_hit = compute_to_hit(&loaded);
  let base = match ctx.weapon.profile.damage {
    DamageFormula::Special(SpecialAttack::Narc) => to_hit.hit_chance(),
    _ => expected_damage(&loaded, &to_hit, false),
  };
  Some(base * ammo_preference(bin, ctx.target))
}

/// Load the best-scoring compatible ammunition into the weapon.  Returns the bin chosen, if any could be.
///
/// # Errors
/// Returns an error if the attacker, weapon or target does not exist.
pub fn select_ammo(
  game: &mut GameState, attacker_id: UnitId, weapon_index: usize, target: TargetRef,
) -> Result<Option<usize>, RulesError> {
  let choice = {
    let ctx = AttackContext::new(game, attacker_id, weapon_index, target, false)?;
    let mut best: Option<(usize, f64)> = None;
    for (index, bin) in ctx.attacker.ammo.iter().enumerate() {
      if let Some(score) = score_ammo_choice(&ctx, bin) {
        debug!("(Damage.select_ammo) Bin {} ({}) scores {:.3}.", index, bin.munition, score);
        if best.map_or(true, |(_, top)| score > top) {
          best = Some((index, score));
        }
      }
    }
    best.map(|(index, _)| index)
  };
  if let Some(index) = choice {
    let attacker = game.unit_mut(attacker_id)?;
    info!(
      "(Damage.select_ammo) {} loads bin {} into weapon {}.",
      attacker.name,
      index,
      weapon_index
    );
    if let Some(weapon) = attacker.weapons.get_mut(weapon_index) {
      weapon.ammo_bin = Some(index);
    }
  }
  Ok(choice)
}
