use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::Display;

use crate::crew::Crew;
use crate::error::RulesError;
use crate::hex::Coords;
use crate::terrain::{Hex, TerrainKind};
use crate::weapon::{AmmoBin, Location, MountedWeapon};

pub type UnitId = u32;

/// Altitude above which an airborne aerospace unit only sees ground units under its flight path.
pub const ALTITUDE_CEILING: i32 = 8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnitCategory {
  Mech,
  ProtoMech,
  Tank,
  Vtol,
  Infantry,
  BattleArmor,
  AeroFighter,
  SmallCraft,
  DropShip,
  WarShip,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MovementMode {
  Biped,
  Quad,
  Tracked,
  Wheeled,
  Hover,
  Vtol,
  Naval,
  Submarine,
  InfantryLeg,
  InfantryJump,
  InfantryMotorized,
  InfantryMechanized,
  Aerodyne,
  Spheroid,
}

/// What the unit did with its movement this turn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum MoveKind {
  #[default]
  None,
  Walk,
  Run,
  Skid,
  Jump,
  Sprint,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Movement {
  #[serde(default)]
  pub kind: MoveKind,
  #[serde(default)]
  pub hexes: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EcmKind {
  Standard,
  /// Counts as two standard suites.
  Angel,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ecm {
  pub kind: EcmKind,
  #[serde(default = "default_true")]
  pub active: bool,
  /// Running as counter-countermeasures; cancels enemy ECM but jams nothing.
  #[serde(default)]
  pub eccm: bool,
  /// Strength of ghost targets generated, if running in that mode.
  #[serde(default)]
  pub ghost_strength: u32,
}

fn default_true() -> bool {
  true
}

impl Ecm {
  #[must_use]
  pub fn strength(&self) -> u32 {
    if !self.active {
      return 0;
    }
    match self.kind {
      EcmKind::Standard => 1,
      EcmKind::Angel => 2,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Stealth {
  #[default]
  None,
  Standard,
  NullSignature,
  Void,
  Chameleon,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct C3Node {
  pub network: u32,
  /// Units this node relays directly to.
  #[serde(default)]
  pub links: Vec<UnitId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sensor {
  pub max_range: u32,
  #[serde(default)]
  pub active_probe: bool,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Equipment {
  pub ecm: Option<Ecm>,
  pub sensor: Option<Sensor>,
  #[serde(default)]
  pub stealth: Stealth,
  #[serde(default)]
  pub stealth_active: bool,
  #[serde(default)]
  pub camouflage: bool,
  #[serde(default)]
  pub mimetic: bool,
  pub c3: Option<C3Node>,
  #[serde(default)]
  pub targeting_computer: bool,
  #[serde(default)]
  pub searchlight: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Actuator {
  Shoulder,
  UpperArm,
  LowerArm,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CriticalDamage {
  #[serde(default)]
  pub sensor_hits: u8,
  #[serde(default)]
  pub actuators: BTreeSet<(Location, Actuator)>,
  #[serde(default)]
  pub destroyed_locations: BTreeSet<Location>,
  /// Protomech head sensors.
  #[serde(default)]
  pub head_sensors: bool,
}

impl CriticalDamage {
  #[must_use]
  pub fn actuator_hit(&self, location: Location, actuator: Actuator) -> bool {
    self.actuators.contains(&(location, actuator))
  }

  #[must_use]
  pub fn location_destroyed(&self, location: Location) -> bool {
    self.destroyed_locations.contains(&location)
  }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct UnitState {
  #[serde(default)]
  pub destroyed: bool,
  #[serde(default)]
  pub shutdown: bool,
  #[serde(default)]
  pub prone: bool,
  #[serde(default)]
  pub immobile: bool,
  #[serde(default)]
  pub hull_down: bool,
  #[serde(default)]
  pub stuck: bool,
  #[serde(default)]
  pub mid_dfa: bool,
  #[serde(default)]
  pub illuminated: bool,
  #[serde(default)]
  pub narc_tagged: bool,
  /// Declared an attack this turn (spotters that also attack are penalized).
  #[serde(default)]
  pub attacking: bool,
  /// Carried inside this unit.
  pub transported_by: Option<UnitId>,
  pub towing: Option<UnitId>,
  pub spotting: Option<UnitId>,
  pub grappled_with: Option<UnitId>,
  pub swarming: Option<UnitId>,
  /// Primary target of this turn's attacks, if one was declared.
  pub primary_target: Option<UnitId>,
}

/// Snapshot of everything the rules core needs to know about one unit.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Unit {
  pub id: UnitId,
  pub name: String,
  pub owner: u32,
  pub category: UnitCategory,
  pub movement_mode: MovementMode,
  #[serde(default)]
  pub super_heavy: bool,
  pub position: Option<Coords>,
  #[serde(default)]
  pub secondary_positions: Vec<Coords>,
  #[serde(default)]
  pub facing: u8,
  /// Torso twist or turret facing, if different from the hull.
  pub secondary_facing: Option<u8>,
  /// Levels above the hex surface (negative when submerged).
  #[serde(default)]
  pub elevation: i32,
  /// Altitude of aerospace units; 0 means grounded.
  #[serde(default)]
  pub altitude: i32,
  #[serde(default)]
  pub movement: Movement,
  #[serde(default)]
  pub walk_mp: u32,
  #[serde(default)]
  pub armor: u32,
  #[serde(default)]
  pub original_armor: u32,
  #[serde(default)]
  pub structure: u32,
  #[serde(default)]
  pub heat: u32,
  #[serde(default)]
  pub crew: Crew,
  #[serde(default)]
  pub weapons: Vec<MountedWeapon>,
  #[serde(default)]
  pub ammo: Vec<AmmoBin>,
  #[serde(default)]
  pub equipment: Equipment,
  #[serde(default)]
  pub state: UnitState,
  #[serde(default)]
  pub criticals: CriticalDamage,
  /// Surviving troopers of conventional infantry; their shooting strength.
  #[serde(default)]
  pub troopers: u32,
  #[serde(default)]
  pub sensor_contacts: BTreeSet<UnitId>,
  #[serde(default)]
  pub firing_solutions: BTreeSet<UnitId>,
  /// Hexes an airborne aerospace unit flew over this turn.
  #[serde(default)]
  pub flight_path: Vec<Coords>,
  #[serde(default)]
  pub velocity: u32,
  /// Position at the start of this turn's movement.
  pub last_position: Option<Coords>,
}

impl Unit {
  #[must_use]
  pub fn new(id: UnitId, name: &str, owner: u32, category: UnitCategory, movement_mode: MovementMode) -> Self {
    Unit {
      id,
      name: name.to_string(),
      owner,
      category,
      movement_mode,
      super_heavy: false,
      position: None,
      secondary_positions: vec![],
      facing: 0,
      secondary_facing: None,
      elevation: 0,
      altitude: 0,
      movement: Movement::default(),
      walk_mp: 4,
      armor: 100,
      original_armor: 100,
      structure: 50,
      heat: 0,
      crew: Crew::default(),
      weapons: vec![],
      ammo: vec![],
      equipment: Equipment::default(),
      state: UnitState::default(),
      criticals: CriticalDamage::default(),
      troopers: 0,
      sensor_contacts: BTreeSet::new(),
      firing_solutions: BTreeSet::new(),
      flight_path: vec![],
      velocity: 0,
      last_position: None,
    }
  }

  #[must_use]
  pub fn at(mut self, position: Coords, facing: u8) -> Self {
    self.position = Some(position);
    self.facing = facing % 6;
    self
  }

  /// Current position.
  ///
  /// # Errors
  /// Returns `RulesError::NotOnBoard` if the unit has no position.
  pub fn require_position(&self) -> Result<Coords, RulesError> {
    self.position.ok_or(RulesError::NotOnBoard(self.id))
  }

  /// Every hex the unit occupies.
  #[must_use]
  pub fn positions(&self) -> Vec<Coords> {
    self.position.into_iter().chain(self.secondary_positions.iter().copied()).collect()
  }

  /// Hex of this turn's flight path nearest to `from`, or the current position if the unit did not fly.
  #[must_use]
  pub fn closest_flight_path_hex(&self, from: Coords) -> Option<Coords> {
    self
      .flight_path
      .iter()
      .copied()
      .min_by_key(|hex| hex.distance(from))
      .or(self.position)
  }

  /// Facing used for weapon arcs: torso twist or turret if set.
  #[must_use]
  pub fn weapon_facing(&self) -> u8 {
    self.secondary_facing.unwrap_or(self.facing)
  }

  #[must_use]
  pub fn is_enemy(&self, other: &Unit) -> bool {
    self.owner != other.owner
  }

  #[must_use]
  pub fn is_mech(&self) -> bool {
    self.category == UnitCategory::Mech
  }

  #[must_use]
  pub fn is_protomech(&self) -> bool {
    self.category == UnitCategory::ProtoMech
  }

  #[must_use]
  pub fn is_vehicle(&self) -> bool {
    matches!(self.category, UnitCategory::Tank | UnitCategory::Vtol)
  }

  #[must_use]
  pub fn is_conventional_infantry(&self) -> bool {
    self.category == UnitCategory::Infantry
  }

  #[must_use]
  pub fn is_battle_armor(&self) -> bool {
    self.category == UnitCategory::BattleArmor
  }

  #[must_use]
  pub fn is_infantry(&self) -> bool {
    self.is_conventional_infantry() || self.is_battle_armor()
  }

  #[must_use]
  pub fn is_mechanized_infantry(&self) -> bool {
    self.is_conventional_infantry() && self.movement_mode == MovementMode::InfantryMechanized
  }

  #[must_use]
  pub fn is_aero(&self) -> bool {
    matches!(
      self.category,
      UnitCategory::AeroFighter | UnitCategory::SmallCraft | UnitCategory::DropShip | UnitCategory::WarShip
    )
  }

  #[must_use]
  pub fn is_large_craft(&self) -> bool {
    matches!(self.category, UnitCategory::DropShip | UnitCategory::WarShip)
  }

  #[must_use]
  pub fn is_small_craft(&self) -> bool {
    self.category == UnitCategory::SmallCraft
  }

  #[must_use]
  pub fn is_quad(&self) -> bool {
    self.movement_mode == MovementMode::Quad
  }

  #[must_use]
  pub fn is_airborne(&self) -> bool {
    (self.is_aero() && self.altitude > 0) || (self.category == UnitCategory::Vtol && self.elevation > 0)
  }

  #[must_use]
  pub fn is_airborne_aero(&self) -> bool {
    self.is_aero() && self.altitude > 0
  }

  /// Ground units and grounded aerospace units.
  #[must_use]
  pub fn is_ground(&self) -> bool {
    !self.is_airborne()
  }

  #[must_use]
  pub fn is_submerged(&self, hex: &Hex) -> bool {
    hex.water_depth() > 0 && self.elevation + self.height() < 0
  }

  /// Class used to order aerospace units sharing a space hex; smaller classes are in front.
  #[must_use]
  pub fn craft_class(&self) -> u8 {
    match self.category {
      UnitCategory::SmallCraft => 1,
      UnitCategory::DropShip => 2,
      UnitCategory::WarShip => 3,
      _ => 0,
    }
  }

  /// Units still taking part in the battle on the map.
  #[must_use]
  pub fn is_eligible(&self) -> bool {
    !self.state.destroyed && self.state.transported_by.is_none() && self.position.is_some()
  }

  /// Extra levels the unit stands above its base level.
  #[must_use]
  pub fn height(&self) -> i32 {
    match self.category {
      UnitCategory::Mech => 1,
      UnitCategory::SmallCraft | UnitCategory::DropShip if self.altitude == 0 => 1,
      _ => 0,
    }
  }

  #[must_use]
  pub fn max_elevation_change(&self) -> i32 {
    match self.movement_mode {
      MovementMode::Biped | MovementMode::Quad => 2,
      MovementMode::Tracked
      | MovementMode::Wheeled
      | MovementMode::Hover
      | MovementMode::InfantryLeg
      | MovementMode::InfantryJump
      | MovementMode::InfantryMotorized
      | MovementMode::InfantryMechanized => 1,
      MovementMode::Vtol | MovementMode::Aerodyne | MovementMode::Spheroid => i32::MAX,
      MovementMode::Naval | MovementMode::Submarine => 0,
    }
  }

  #[must_use]
  pub fn has_active_ecm(&self) -> bool {
    self.equipment.ecm.is_some_and(|ecm| ecm.strength() > 0 && !ecm.eccm)
  }

  #[must_use]
  pub fn has_active_eccm(&self) -> bool {
    self.equipment.ecm.is_some_and(|ecm| ecm.active && ecm.eccm)
  }

  #[must_use]
  pub fn ecm_strength(&self) -> u32 {
    self.equipment.ecm.map_or(0, |ecm| ecm.strength())
  }

  #[must_use]
  pub fn has_active_stealth(&self) -> bool {
    self.equipment.stealth != Stealth::None && self.equipment.stealth_active
  }

  #[must_use]
  pub fn is_camouflaged(&self) -> bool {
    self.equipment.camouflage || self.equipment.mimetic
  }

  /// Fraction of original armor remaining.
  #[must_use]
  pub fn armor_fraction(&self) -> f64 {
    if self.original_armor == 0 {
      return 1.0;
    }
    f64::from(self.armor) / f64::from(self.original_armor)
  }

  /// Why `hex` cannot hold this unit, if it cannot.
  #[must_use]
  pub fn location_prohibition(&self, hex: &Hex) -> Option<&'static str> {
    let depth = hex.water_depth();
    match self.movement_mode {
      MovementMode::Wheeled => {
        if hex.foliage().is_some() {
          Some("wheeled units cannot enter woods or jungle")
        } else if hex.contains(TerrainKind::Rough) || hex.contains(TerrainKind::Rubble) {
          Some("wheeled units cannot enter rough or rubble")
        } else if depth > 0 {
          Some("wheeled units cannot enter water")
        } else if hex.contains(TerrainKind::Building) {
          Some("wheeled units cannot enter buildings")
        } else {
          None
        }
      }
      MovementMode::Tracked => {
        if hex.foliage().is_some_and(|level| level >= 2) || hex.contains(TerrainKind::Jungle) {
          Some("tracked units cannot enter heavy woods or jungle")
        } else if depth > 0 {
          Some("tracked units cannot enter water")
        } else if hex.contains(TerrainKind::Building) {
          Some("tracked units cannot enter buildings")
        } else {
          None
        }
      }
      MovementMode::Hover => {
        if hex.foliage().is_some() {
          Some("hover units cannot enter woods or jungle")
        } else if hex.contains(TerrainKind::Building) {
          Some("hover units cannot enter buildings")
        } else {
          None
        }
      }
      MovementMode::Naval | MovementMode::Submarine => (depth == 0).then_some("naval units need water"),
      MovementMode::InfantryMechanized | MovementMode::InfantryMotorized => {
        (depth > 0).then_some("motorized infantry cannot enter water")
      }
      MovementMode::InfantryLeg | MovementMode::InfantryJump => {
        (depth > 1).then_some("infantry cannot enter deep water")
      }
      MovementMode::Biped
      | MovementMode::Quad
      | MovementMode::Vtol
      | MovementMode::Aerodyne
      | MovementMode::Spheroid => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::terrain::Terrain;

  #[test]
  fn test_capabilities() {
    let mech = Unit::new(1, "Atlas", 0, UnitCategory::Mech, MovementMode::Biped);
    assert!(mech.is_mech() && mech.is_ground() && !mech.is_infantry());
    assert_eq!(mech.height(), 1);
    assert_eq!(mech.max_elevation_change(), 2);

    let mut fighter = Unit::new(2, "Sparrowhawk", 1, UnitCategory::AeroFighter, MovementMode::Aerodyne);
    assert!(fighter.is_aero() && !fighter.is_airborne());
    fighter.altitude = 5;
    assert!(fighter.is_airborne_aero());

    let foot = Unit::new(3, "Foot Platoon", 1, UnitCategory::Infantry, MovementMode::InfantryMechanized);
    assert!(foot.is_mechanized_infantry());
    assert!(foot.is_enemy(&mech));
  }

  #[test]
  fn test_eligibility_and_positions() {
    let mut tank = Unit::new(4, "Demolisher", 0, UnitCategory::Tank, MovementMode::Tracked);
    assert!(!tank.is_eligible());
    assert!(matches!(tank.require_position(), Err(RulesError::NotOnBoard(4))));

    tank = tank.at(Coords::new(2, 2), 8);
    assert_eq!(tank.facing, 2);
    assert!(tank.is_eligible());
    tank.secondary_positions.push(Coords::new(2, 3));
    assert_eq!(tank.positions(), vec![Coords::new(2, 2), Coords::new(2, 3)]);

    tank.state.transported_by = Some(9);
    assert!(!tank.is_eligible());
  }

  #[test]
  fn test_location_prohibition() {
    let woods = Hex::new(0, vec![Terrain::new(TerrainKind::Woods, 1)]);
    let water = Hex::new(0, vec![Terrain::new(TerrainKind::Water, 2)]);

    let wheeled = Unit::new(1, "Striker", 0, UnitCategory::Tank, MovementMode::Wheeled);
    assert!(wheeled.location_prohibition(&woods).is_some());
    assert!(wheeled.location_prohibition(&Hex::default()).is_none());

    let tracked = Unit::new(2, "Bulldog", 0, UnitCategory::Tank, MovementMode::Tracked);
    assert!(tracked.location_prohibition(&woods).is_none());
    assert!(tracked.location_prohibition(&water).is_some());

    let mech = Unit::new(3, "Hunchback", 0, UnitCategory::Mech, MovementMode::Biped);
    assert!(mech.location_prohibition(&water).is_none());

    let boat = Unit::new(4, "Hydrofoil", 0, UnitCategory::Tank, MovementMode::Naval);
    assert!(boat.location_prohibition(&Hex::default()).is_some());
    assert!(boat.location_prohibition(&water).is_none());
  }

  #[test]
  fn test_ecm_strength() {
    let mut unit = Unit::new(1, "Raven", 0, UnitCategory::Mech, MovementMode::Biped);
    assert!(!unit.has_active_ecm());
    unit.equipment.ecm = Some(Ecm {
      kind: EcmKind::Angel,
      active: true,
      eccm: false,
      ghost_strength: 0,
    });
    assert!(unit.has_active_ecm());
    assert_eq!(unit.ecm_strength(), 2);
    unit.equipment.ecm = Some(Ecm {
      kind: EcmKind::Standard,
      active: true,
      eccm: true,
      ghost_strength: 0,
    });
    assert!(!unit.has_active_ecm());
    assert!(unit.has_active_eccm());
  }
}
