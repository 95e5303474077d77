//! Weapon attacks: the context an attack is evaluated in, the to-hit pipeline and attack resolution.
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::arc::{attack_side, front_unit_by_rule, is_in_arc, resolve_front_unit, weapon_arc, weapon_facing, FiringArc};
use crate::crew::Ability;
use crate::damage::{resolve_damage, spin_up_jams, spins_up, DamageOutcome};
use crate::dice::{two_d6, Dice, Roll};
use crate::ecm::ghost_target_mod;
use crate::error::RulesError;
use crate::game::GameState;
use crate::hex::Coords;
use crate::range::resolve_range;
use crate::rules_tables::{
  attacker_movement_mod, heat_mod, light_mod, target_movement_mod, weather_mod, wind_mod, RangeBracket,
  HEX_TARGET_MOD, IMMOBILE_TARGET_MOD, INDUSTRIAL_TARGET_MOD, JUMPED_TARGET_MOD, SMOKE_MOD, STEALTH_MOD, STUCK_TARGET_MOD,
  VOID_SIGNATURE_MOD, WOODS_MOD,
};
use crate::spotting::{artillery_lead, best_spotter};
use crate::terrain::{Board, Hex, TerrainKind};
use crate::to_hit::{AttackSide, Cover, HitTable, TargetNumber, Terminal};
use crate::unit::{Actuator, MoveKind, Stealth, Unit, UnitId};
use crate::visibility::{can_see, effective_distance, line_of_sight, line_of_sight_to_hex, VisibilityResult};
use crate::weapon::{AmmoBin, Location, MountedWeapon, Munition, WeaponCategory, WeaponFlag};
use crate::{debug, info};

// Altitude difference beyond which units in the same hex cannot engage each other.
const DEAD_ZONE_ALTITUDE: i32 = 2;
const INDIRECT_FIRE_MOD: i32 = 1;
const INDIRECT_ARTILLERY_MOD: i32 = 7;
const DIRECT_ARTILLERY_MOD: i32 = 4;
const TARGETING_COMPUTER_MOD: i32 = -1;
const MAX_PRECISION_BONUS: i32 = 2;
// Bearings between two craft sharing a space hex.
const DEAD_AHEAD: u32 = 0;
const DEAD_ASTERN: u32 = 180;

/// What an attack is aimed at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
  Unit(UnitId),
  Hex(Coords),
}

/// Everything one weapon attack is evaluated against.  Built fresh for each query and never changed.
#[derive(Debug, Clone, Copy)]
pub struct AttackContext<'a> {
  pub game: &'a GameState,
  pub attacker: &'a Unit,
  /// The target unit; `None` for attacks on a hex.
  pub target: Option<&'a Unit>,
  pub target_position: Coords,
  pub weapon_index: usize,
  pub weapon: &'a MountedWeapon,
  pub ammo: Option<&'a AmmoBin>,
  pub indirect: bool,
  /// Which of attacker and target is in front when they share a space hex and the rules left it to a coin flip.
  pub front_unit: Option<UnitId>,
}

impl<'a> AttackContext<'a> {
  /// Look up the attacker, weapon, loaded ammo and target.
  ///
  /// # Errors
  /// Returns an error for unknown units, weapon or ammo indices, ammo that cannot feed the weapon, or an attacker or
  /// target unit that is not on the board.
  pub fn new(
    game: &'a GameState, attacker_id: UnitId, weapon_index: usize, target: TargetRef, indirect: bool,
  ) -> Result<Self, RulesError> {
    let attacker = game.unit(attacker_id)?;
    attacker.require_position()?;
    let weapon = attacker.weapons.get(weapon_index).ok_or(RulesError::UnknownWeapon {
      unit: attacker_id,
      index: weapon_index,
    })?;
    let ammo = match weapon.ammo_bin {
      None => None,
      Some(bin_index) => {
        let bin = attacker.ammo.get(bin_index).ok_or(RulesError::UnknownAmmo {
          unit: attacker_id,
          index: bin_index,
        })?;
        if weapon.profile.ammo != Some(bin.family) {
          return Err(RulesError::IncompatibleAmmo {
            unit: attacker_id,
            weapon: weapon_index,
            bin: bin_index,
          });
        }
        Some(bin)
      }
    };
    let (target, target_position) = match target {
      TargetRef::Unit(id) => {
        let unit = game.unit(id)?;
        (Some(unit), unit.require_position()?)
      }
      TargetRef::Hex(coords) => (None, coords),
    };
    Ok(AttackContext {
      game,
      attacker,
      target,
      target_position,
      weapon_index,
      weapon,
      ammo,
      indirect,
      front_unit: None,
    })
  }

  /// Flip the coin for who is in front when attacker and target share a space hex and the rules cannot tell.  Any
  /// other attack is returned as it is.
  #[must_use]
  pub fn with_front_resolved(self, dice: &mut dyn Dice) -> AttackContext<'a> {
    match self.target {
      Some(target) if self.front_unit.is_none() && self.shares_space_hex(target) => AttackContext {
        front_unit: Some(resolve_front_unit(self.attacker, target, dice)),
        ..self
      },
      _ => self,
    }
  }

  fn shares_space_hex(&self, target: &Unit) -> bool {
    self.game.board.is_space() && self.attacker.id != target.id && self.attacker.position == target.position
  }

  /// The unit in front when attacker and target share a space hex.  `None` for any other attack, or while a coin
  /// flip is still owed.
  #[must_use]
  pub fn same_hex_front(&self) -> Option<UnitId> {
    let target = self.target.filter(|target| self.shares_space_hex(target))?;
    self.front_unit.or_else(|| front_unit_by_rule(self.attacker, target))
  }

  /// The same attack fired with the ammunition in `bin`.
  #[must_use]
  pub fn with_ammo(&self, bin: &'a AmmoBin) -> AttackContext<'a> {
    AttackContext {
      ammo: Some(bin),
      ..*self
    }
  }

  #[must_use]
  pub fn target_ref(&self) -> TargetRef {
    self.target.map_or(TargetRef::Hex(self.target_position), |unit| TargetRef::Unit(unit.id))
  }

  /// Attacker position; checked on construction.
  #[must_use]
  pub fn attacker_position(&self) -> Coords {
    self.attacker.position.unwrap_or_default()
  }

  #[must_use]
  pub fn munition(&self) -> Munition {
    self.ammo.map_or(Munition::Standard, |bin| bin.munition)
  }

  #[must_use]
  pub fn attacker_hex(&self) -> Option<&'a Hex> {
    self.game.hex(self.attacker_position())
  }

  #[must_use]
  pub fn target_hex(&self) -> Option<&'a Hex> {
    self.game.hex(self.target_position)
  }

  #[must_use]
  pub fn attacker_underwater(&self) -> bool {
    self.attacker_hex().is_some_and(|hex| self.attacker.is_submerged(hex))
  }

  #[must_use]
  pub fn target_underwater(&self) -> bool {
    match (self.target, self.target_hex()) {
      (Some(target), Some(hex)) => target.is_submerged(hex),
      _ => false,
    }
  }

  #[must_use]
  pub fn is_ground_to_ground(&self) -> bool {
    self.attacker.is_ground() && self.target.map_or(true, Unit::is_ground)
  }

  /// Position the target is measured from: the nearest hex of an airborne target's flight path for ground attackers.
  #[must_use]
  pub fn target_reference_hexes(&self) -> Vec<Coords> {
    match self.target {
      Some(target) if target.is_airborne_aero() && !self.attacker.is_airborne_aero() => target
        .closest_flight_path_hex(self.attacker_position())
        .into_iter()
        .collect(),
      Some(target) => target.positions(),
      None => vec![self.target_position],
    }
  }

  /// Range in hexes.  Airborne aerospace units are measured from their flight path when the other party is on the
  /// ground; air-to-air range adds the altitude difference.
  #[must_use]
  pub fn distance(&self) -> u32 {
    let from = self.attacker_position();
    let to = self.target_position;
    match self.target {
      Some(target) if self.attacker.is_airborne_aero() && target.is_airborne_aero() => {
        from.distance(to) + (self.attacker.altitude - target.altitude).unsigned_abs()
      }
      Some(target) => effective_distance(self.attacker, target).unwrap_or_else(|| from.distance(to)),
      None if self.attacker.is_airborne_aero() => {
        self.attacker.closest_flight_path_hex(to).map_or(from.distance(to), |hex| hex.distance(to))
      }
      None => from.distance(to),
    }
  }

  fn sightline(&self) -> VisibilityResult {
    match self.target {
      Some(target) => line_of_sight(self.game, self.attacker, target),
      None => line_of_sight_to_hex(self.game, self.attacker, self.target_position),
    }
  }
}

fn flight_level(unit: &Unit) -> i32 {
  if unit.is_aero() {
    unit.altitude
  } else {
    unit.elevation
  }
}

/// Weapon, crew and target conditions that rule the attack out before anything else is considered.
fn attack_preconditions(ctx: &AttackContext) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let attacker = ctx.attacker;
  let weapon = ctx.weapon;

  if weapon.state.destroyed {
    stage.set_terminal(Terminal::Impossible, "weapon destroyed");
  }
  if weapon.state.jammed {
    stage.set_terminal(Terminal::Impossible, "weapon jammed");
  }
  if weapon.profile.ammo.is_some() && ctx.ammo.map_or(true, |bin| bin.shots == 0) {
    stage.set_terminal(Terminal::Impossible, "no ammunition");
  }
  if attacker.state.shutdown {
    stage.set_terminal(Terminal::Impossible, "attacker shut down");
  }
  if attacker.crew.unconscious {
    stage.set_terminal(Terminal::Impossible, "crew unconscious");
  }
  if attacker.criticals.location_destroyed(weapon.location) {
    stage.set_terminal(Terminal::Impossible, "weapon location destroyed");
  }

  if let Some(target) = ctx.target {
    if target.id == attacker.id {
      stage.set_terminal(Terminal::Impossible, "cannot attack itself");
    }
    if !target.is_eligible() {
      stage.set_terminal(Terminal::Impossible, "target not on the battlefield");
    }
  }

  if let Some(swarmed) = attacker.state.swarming {
    if ctx.target.is_some_and(|target| target.id == swarmed) {
      stage.set_terminal(Terminal::AutomaticSuccess, "swarming the target");
      stage.hit_table = HitTable::Swarm;
    } else {
      stage.set_terminal(Terminal::Impossible, "swarming another unit");
    }
  }
  stage
}

/// Rules that make the shot impossible outright: underwater mismatches, zero range, the airborne dead zone, arcs,
/// line of sight, detection and the requirements of indirect fire.
fn impossibility_checks(ctx: &AttackContext, sight: &VisibilityResult) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let attacker = ctx.attacker;
  let profile = &ctx.weapon.profile;
  let game = ctx.game;

  if ctx.attacker_underwater() && !profile.fires_underwater() {
    stage.set_terminal(Terminal::Impossible, "weapon cannot fire underwater");
  }
  if ctx.target.is_some() && ctx.attacker_underwater() != ctx.target_underwater() {
    stage.set_terminal(Terminal::Impossible, "cannot fire across the water surface");
  }
  if ctx.target.is_some()
    && ctx.is_ground_to_ground()
    && ctx.distance() == 0
    && !game.board.is_space()
    && !(profile.is_infantry_weapon() || attacker.is_infantry())
  {
    stage.set_terminal(Terminal::Impossible, "only infantry attack at zero range");
  }
  if let Some(target) = ctx.target {
    if attacker.is_airborne()
      && target.is_airborne()
      && attacker.position == target.position
      && (flight_level(attacker) - flight_level(target)).abs() > DEAD_ZONE_ALTITUDE
    {
      stage.set_terminal(Terminal::Impossible, "target in the airborne dead zone");
    }
  }

  let facing = weapon_facing(attacker, ctx.weapon);
  let arc = weapon_arc(attacker, ctx.weapon);
  // The rear craft of a shared space hex sees the front one dead ahead.
  let in_arc = match ctx.same_hex_front() {
    Some(front) => arc.sector().contains(if front == attacker.id { DEAD_ASTERN } else { DEAD_AHEAD }),
    None => is_in_arc(ctx.attacker_position(), facing, &ctx.target_reference_hexes(), arc),
  };
  if !in_arc {
    stage.set_terminal(Terminal::Impossible, &format!("target not in {arc} arc"));
  }

  if ctx.indirect {
    if !profile.has_flag(WeaponFlag::IndirectCapable) && !profile.is_artillery() {
      stage.set_terminal(Terminal::Impossible, "weapon cannot fire indirectly");
    }
    if let Some(target) = ctx.target {
      if !profile.is_artillery() {
        if sight.clear && !game.options.indirect_with_los {
          stage.set_terminal(Terminal::Impossible, "indirect fire with line of sight");
        }
        if best_spotter(game, attacker, target).is_none() {
          stage.set_terminal(Terminal::Impossible, "no spotter for indirect fire");
        }
      }
    }
  } else if !sight.clear {
    let reason = format!("no line of sight: {}", sight.blocked_by.as_deref().unwrap_or("blocked"));
    stage.set_terminal(Terminal::Impossible, &reason);
  }

  if let Some(target) = ctx.target {
    if game.options.double_blind
      && attacker.is_enemy(target)
      && !can_see(game, attacker, target, true)
      && !attacker.firing_solutions.contains(&target.id)
    {
      stage.set_terminal(Terminal::Impossible, "target not detected");
    }
  }
  stage
}

fn move_reason(kind: MoveKind) -> &'static str {
  match kind {
    MoveKind::None => "attacker stationary",
    MoveKind::Walk => "attacker walked",
    MoveKind::Run => "attacker ran",
    MoveKind::Skid => "attacker skidded",
    MoveKind::Jump => "attacker jumped",
    MoveKind::Sprint => "attacker sprinted",
  }
}

fn prone_restrictions(ctx: &AttackContext, stage: &mut TargetNumber) {
  let attacker = ctx.attacker;
  let location = ctx.weapon.location;
  if attacker.is_quad() {
    let legs_lost = [
      Location::LeftLeg,
      Location::RightLeg,
      Location::FrontLeftLeg,
      Location::FrontRightLeg,
    ]
    .iter()
    .any(|leg| attacker.criticals.location_destroyed(*leg));
    if legs_lost {
      stage.set_terminal(Terminal::Impossible, "prone quad with a leg destroyed");
    }
  } else if attacker.is_mech() {
    if location.is_leg() {
      stage.set_terminal(Terminal::Impossible, "prone: leg weapons cannot fire");
    }
    let propping_arm = match location {
      Location::LeftArm => Some(Location::RightArm),
      Location::RightArm => Some(Location::LeftArm),
      _ => None,
    };
    if propping_arm.is_some_and(|arm| attacker.criticals.location_destroyed(arm)) {
      stage.set_terminal(Terminal::Impossible, "prone: no arm to prop on");
    }
  }
  stage.add_modifier(2, "attacker prone");
}

/// Movement, damage, heat, terrain and environment on the attacker's side.
fn attacker_modifiers(ctx: &AttackContext) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let attacker = ctx.attacker;
  let profile = &ctx.weapon.profile;
  let game = ctx.game;

  let movement = attacker.movement.kind;
  if movement == MoveKind::Sprint {
    stage.set_terminal(Terminal::AutomaticFail, "attacker sprinted");
  } else {
    let jumping_jack = attacker.crew.has_ability(Ability::JumpingJack);
    stage.add_modifier(attacker_movement_mod(movement, jumping_jack), move_reason(movement));
  }

  if attacker.state.prone {
    prone_restrictions(ctx, &mut stage);
  }

  match attacker.criticals.sensor_hits {
    0 => {}
    1 => stage.add_modifier(2, "sensor damage"),
    _ => stage.set_terminal(Terminal::Impossible, "sensors destroyed"),
  }

  let location = ctx.weapon.location;
  if location.is_arm() {
    if attacker.criticals.actuator_hit(location, Actuator::Shoulder) {
      stage.add_modifier(4, "shoulder actuator destroyed");
    } else {
      if attacker.criticals.actuator_hit(location, Actuator::UpperArm) {
        stage.add_modifier(1, "upper arm actuator destroyed");
      }
      if attacker.criticals.actuator_hit(location, Actuator::LowerArm) {
        stage.add_modifier(1, "lower arm actuator destroyed");
      }
    }
  }

  stage.add_modifier(heat_mod(attacker.heat), "attacker heat");

  if let Some(hex) = ctx.attacker_hex() {
    if attacker.is_mech() && location.is_leg() && hex.water_depth() == 1 && !ctx.attacker_underwater() {
      stage.set_terminal(Terminal::Impossible, "leg weapons underwater");
    }
  }

  // Light, weather and wind.
  let conditions = &game.conditions;
  let target_lit = ctx.target.is_some_and(|target| target.state.illuminated);
  if !target_lit && !game.board.is_space() {
    let mut darkness = light_mod(conditions.light);
    if profile.is_energy() && darkness > 0 {
      darkness -= 1;
    }
    stage.add_modifier(darkness, &format!("{} light", conditions.light));
  }
  if !ctx.attacker_underwater() {
    stage.add_modifier(weather_mod(conditions.weather), &conditions.weather.to_string());
    let (missile, ballistic) = wind_mod(conditions.wind);
    match profile.category {
      WeaponCategory::Missile => stage.add_modifier(missile, "wind"),
      WeaponCategory::Ballistic => stage.add_modifier(ballistic, "wind"),
      _ => {}
    }
  }
  stage
}

fn stealth_mod(target: &Unit, bracket: RangeBracket) -> i32 {
  if !target.has_active_stealth() || bracket == RangeBracket::OutOfRange {
    return 0;
  }
  match target.equipment.stealth {
    Stealth::None => 0,
    Stealth::Void => VOID_SIGNATURE_MOD[bracket as usize],
    Stealth::Standard | Stealth::NullSignature | Stealth::Chameleon => STEALTH_MOD[bracket as usize],
  }
}

fn is_secondary_target(attacker: &Unit, target: &Unit) -> bool {
  attacker.state.primary_target.is_some_and(|primary| primary != target.id)
}

/// Movement, terrain, posture and concealment of the target.  Also settles cover and the side being hit.
fn target_modifiers(ctx: &AttackContext, sight: &VisibilityResult, bracket: RangeBracket) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let attacker = ctx.attacker;
  let game = ctx.game;

  let Some(target) = ctx.target else {
    stage.add_modifier(HEX_TARGET_MOD, "targeting a hex");
    return stage;
  };

  let hexes_moved = target.movement.hexes;
  if target.state.immobile || target.state.shutdown {
    stage.add_modifier(IMMOBILE_TARGET_MOD, "immobile target");
  } else {
    let moved = target_movement_mod(hexes_moved, game.options.expanded_movement_bands);
    stage.add_modifier(moved, &format!("target moved {hexes_moved} hexes"));
    if target.movement.kind == MoveKind::Jump {
      stage.add_modifier(JUMPED_TARGET_MOD, "target jumped");
    }
  }

  if target.state.prone {
    if ctx.distance() <= 1 {
      stage.add_modifier(-2, "prone target adjacent");
    } else {
      stage.add_modifier(1, "prone target");
    }
  }

  // Indirect fire looks through the spotter's eyes instead.
  if !ctx.indirect {
    stage.add_modifier(sight.woods_mod(), "intervening woods");
    stage.add_modifier(sight.smoke_mod(), "intervening smoke");
  }

  let mut cover = sight.cover;
  if let Some(hex) = ctx.target_hex() {
    if target.is_ground() {
      if let Some(density) = hex.foliage() {
        if game.options.woods_cover && target.is_mech() {
          cover = Cover::Partial;
        } else {
          stage.add_modifier(WOODS_MOD[usize::from(density.min(3))], "target in woods");
        }
      }
      if let Some(density) = hex.level_of(TerrainKind::Smoke) {
        stage.add_modifier(SMOKE_MOD[usize::from(density.min(2))], "target in smoke");
      }
      if hex.level_of(TerrainKind::Industrial).is_some() {
        stage.add_modifier(INDUSTRIAL_TARGET_MOD, "target in industrial zone");
      }
      if target.is_mech() && hex.water_depth() == 1 && target.elevation == 0 {
        cover = Cover::Partial;
      }
    }
  }
  if target.state.stuck {
    stage.add_modifier(STUCK_TARGET_MOD, "target stuck in swamp");
  }
  if target.state.hull_down {
    stage.add_modifier(2, "target hull down");
    stage.cover = Cover::HullDown;
  } else if cover == Cover::Partial && target.is_mech() {
    stage.add_modifier(1, "partial cover");
    stage.cover = Cover::Partial;
  }

  if target.is_airborne() && !attacker.is_airborne() {
    stage.add_modifier(1, "target airborne");
  }
  if target.is_battle_armor() {
    stage.add_modifier(1, "battle armor target");
  }

  if is_secondary_target(attacker, target) && !attacker.is_large_craft() && !attacker.crew.dedicated_gunner {
    let in_front = is_in_arc(
      ctx.attacker_position(),
      attacker.weapon_facing(),
      &target.positions(),
      FiringArc::Forward,
    );
    let mut secondary = if in_front { 1 } else { 2 };
    if attacker.crew.has_ability(Ability::MultiTasker) {
      secondary -= 1;
    }
    stage.add_modifier(secondary, "secondary target");
  }

  stage.add_modifier(stealth_mod(target, bracket), &format!("{} stealth", target.equipment.stealth));
  if target.equipment.mimetic {
    let hidden = 3 - i32::try_from(hexes_moved.min(3)).unwrap_or(3);
    stage.add_modifier(hidden, "mimetic armor");
  } else if target.equipment.camouflage && hexes_moved == 0 {
    stage.add_modifier(1, "camouflaged target");
  }

  if let Some(target_position) = target.position {
    stage.side = attack_side(target_position, target.facing, ctx.attacker_position());
  }
  if let Some(front) = ctx.same_hex_front() {
    stage.side = if front == target.id { AttackSide::Rear } else { AttackSide::Front };
  }
  stage
}

/// Spotting for indirect fire and the extra difficulty of artillery, plus the aim point of a leading artillery shot.
fn indirect_modifiers(ctx: &AttackContext) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let profile = &ctx.weapon.profile;

  if profile.is_artillery() {
    if ctx.indirect {
      stage.add_modifier(INDIRECT_ARTILLERY_MOD, "indirect artillery");
      stage.aim_point = ctx
        .target
        .and_then(|target| artillery_lead(ctx.game, ctx.attacker_position(), target))
        .or(Some(ctx.target_position));
    } else {
      stage.add_modifier(DIRECT_ARTILLERY_MOD, "direct artillery");
    }
    return stage;
  }

  if ctx.indirect {
    stage.add_modifier(INDIRECT_FIRE_MOD, "indirect fire");
    if let Some((spotter, modifier)) = ctx.target.and_then(|target| best_spotter(ctx.game, ctx.attacker, target)) {
      stage.add_modifier(modifier, &format!("spotted by {}", spotter.name));
    }
  }
  stage
}

/// The weapon's own modifier, ammunition, targeting computers and ghost targets.
fn equipment_modifiers(ctx: &AttackContext) -> TargetNumber {
  let mut stage = TargetNumber::empty();
  let attacker = ctx.attacker;
  let profile = &ctx.weapon.profile;

  stage.add_modifier(profile.to_hit_mod, "weapon");

  let munition = ctx.munition();
  match munition {
    Munition::Cluster => stage.add_modifier(-1, "cluster ammo"),
    Munition::ArmorPiercing => stage.add_modifier(1, "armor-piercing ammo"),
    Munition::Precision => {
      if let Some(target) = ctx.target.filter(|target| !target.state.immobile) {
        let moved = target_movement_mod(target.movement.hexes, ctx.game.options.expanded_movement_bands);
        stage.add_modifier(-moved.min(MAX_PRECISION_BONUS), "precision ammo");
      }
    }
    _ => {}
  }

  if attacker.equipment.targeting_computer
    && !profile.is_missile()
    && !profile.is_artillery()
    && !ctx.indirect
    && munition != Munition::Cluster
  {
    stage.add_modifier(TARGETING_COMPUTER_MOD, "targeting computer");
  }

  stage.add_modifier(ghost_target_mod(ctx.game, attacker), "ghost targets");
  stage
}

/// Work out the number the attacker needs on 2d6 to hit.  Never rolls and never changes the game.
#[must_use]
pub fn compute_to_hit(ctx: &AttackContext) -> TargetNumber {
  let mut to_hit = TargetNumber::new(i32::from(ctx.attacker.crew.get_gunnery()), "gunnery skill");
  to_hit.append(attack_preconditions(ctx));

  let range = resolve_range(ctx);
  let bracket = range.range.unwrap_or(RangeBracket::OutOfRange);
  to_hit.append(range);

  let sight = ctx.sightline();
  to_hit.append(impossibility_checks(ctx, &sight));
  to_hit.append(attacker_modifiers(ctx));
  let target_stage = target_modifiers(ctx, &sight, bracket);
  to_hit.side = target_stage.side;
  to_hit.cover = target_stage.cover;
  to_hit.append(target_stage);
  to_hit.append(indirect_modifiers(ctx));
  to_hit.append(equipment_modifiers(ctx));

  debug!(
    "(Combat.compute_to_hit) {} firing {} at {:?}: {}",
    ctx.attacker.name,
    ctx.weapon.profile.name,
    ctx.target_ref(),
    to_hit
  );
  to_hit
}

/// Result of rolling one weapon attack.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
  pub attacker: UnitId,
  pub weapon: String,
  pub target: TargetRef,
  pub to_hit: TargetNumber,
  pub roll: Option<Roll>,
  pub hit: bool,
  pub margin_of_success: Option<i32>,
  /// The weapon jammed spinning up; the attack fails.
  pub jammed: bool,
  pub damage: Option<DamageOutcome>,
  pub message: String,
}

/// Roll the attack described by `ctx` against `to_hit`.  Nothing in the game changes; jams and damage are reported
/// for the caller to apply.
///
/// # Errors
/// Returns `RulesError::ClusterTableMiss` if a cluster weapon has no usable rack size.
pub fn resolve_attack(ctx: &AttackContext, to_hit: &TargetNumber, dice: &mut dyn Dice) -> Result<AttackReport, RulesError> {
  let mut report = AttackReport {
    attacker: ctx.attacker.id,
    weapon: ctx.weapon.profile.name.clone(),
    target: ctx.target_ref(),
    to_hit: to_hit.clone(),
    roll: None,
    hit: false,
    margin_of_success: None,
    jammed: false,
    damage: None,
    message: String::new(),
  };

  match to_hit.terminal_state() {
    Some(terminal) if terminal.kind.is_failure() => {
      report.message = format!("{}'s {} cannot hit: {}.", ctx.attacker.name, report.weapon, terminal.reason);
      debug!("(Combat.resolve_attack) {}", report.message);
      return Ok(report);
    }
    Some(terminal) => {
      report.hit = true;
      report.margin_of_success = Some(0);
      report.message = format!("{}'s {} hits automatically: {}.", ctx.attacker.name, report.weapon, terminal.reason);
    }
    None => {
      let roll = two_d6(dice);
      let total = roll.total();
      let margin = i32::try_from(total).unwrap_or(i32::MAX) - to_hit.value();
      report.jammed = spins_up(ctx.weapon) && spin_up_jams(ctx.weapon.mode, total);
      report.hit = !report.jammed && to_hit.hits(total);
      report.margin_of_success = Some(margin);
      report.roll = Some(roll);
      report.message = if report.jammed {
        format!("{}'s {} jams on a roll of {}.", ctx.attacker.name, report.weapon, total)
      } else if report.hit {
        format!("{}'s {} hits needing {} with {}.", ctx.attacker.name, report.weapon, to_hit.value(), total)
      } else {
        format!("{}'s {} misses needing {} with {}.", ctx.attacker.name, report.weapon, to_hit.value(), total)
      };
    }
  }

  if report.hit {
    let margin = report.margin_of_success.unwrap_or(0);
    let outcome = resolve_damage(ctx, to_hit, margin, dice)?;
    report.message = format!("{} {} damage.", report.message, outcome.damage);
    report.damage = Some(outcome);
  }
  info!("(Combat.resolve_attack) {}", report.message);
  Ok(report)
}
