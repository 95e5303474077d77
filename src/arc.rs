use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::dice::Dice;
use crate::hex::Coords;
use crate::to_hit::AttackSide;
use crate::unit::{Unit, UnitId};
use crate::weapon::{Location, MountedWeapon};
use crate::{debug, trace};

/// Named firing sectors, measured clockwise from the firing unit's facing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FiringArc {
  FullCircle,
  Forward,
  LeftArm,
  RightArm,
  Rear,
  LeftSide,
  RightSide,
  MainGun,
  North,
  East,
  West,
  Turret,
  Nose,
  LeftWing,
  RightWing,
  LeftWingAft,
  RightWingAft,
  Aft,
  LeftSphere,
  RightSphere,
  LeftSphereAft,
  RightSphereAft,
  LeftBroadside,
  RightBroadside,
  LeftSphereGround,
  RightSphereGround,
  VglFront,
  VglRightFront,
  VglRightRear,
  VglRear,
  VglLeftRear,
  VglLeftFront,
  NoseWpl,
  LeftWingWpl,
  RightWingWpl,
  AftWpl,
  LeftBroadsideWpl,
  RightBroadsideWpl,
  Hexside0,
  Hexside1,
  Hexside2,
  Hexside3,
  Hexside4,
  Hexside5,
}

/// Angular bounds of a sector in degrees.  When `low > high` the sector wraps through north.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
  pub low: u32,
  pub low_inclusive: bool,
  pub high: u32,
  pub high_inclusive: bool,
}

const fn sector(low: u32, low_inclusive: bool, high: u32, high_inclusive: bool) -> Sector {
  Sector {
    low,
    low_inclusive,
    high,
    high_inclusive,
  }
}

// Index by FiringArc.  Edges are kept exactly as the published arc diagrams draw them, including the places where
// neighboring sectors disagree on which one owns a boundary bearing.
pub const ARC_SECTORS: [Sector; 44] = [
  sector(0, true, 359, true),    // FullCircle
  sector(300, true, 60, true),   // Forward
  sector(240, true, 60, true),   // LeftArm
  sector(300, true, 120, true),  // RightArm
  sector(120, false, 240, false), // Rear
  sector(240, true, 300, false), // LeftSide
  sector(60, false, 120, true),  // RightSide
  sector(240, true, 120, true),  // MainGun
  sector(270, true, 30, true),   // North
  sector(30, true, 150, true),   // East
  sector(150, true, 270, true),  // West
  sector(0, true, 359, true),    // Turret
  sector(300, false, 60, false), // Nose
  sector(300, false, 0, true),   // LeftWing
  sector(0, true, 60, false),    // RightWing
  sector(180, true, 240, false), // LeftWingAft
  sector(120, false, 180, true), // RightWingAft
  sector(120, false, 240, false), // Aft
  sector(240, false, 360, false), // LeftSphere
  sector(0, true, 120, false),   // RightSphere
  sector(180, false, 300, false), // LeftSphereAft
  sector(60, false, 180, false), // RightSphereAft
  sector(240, true, 300, true),  // LeftBroadside
  sector(60, true, 120, true),   // RightBroadside
  sector(180, true, 360, false), // LeftSphereGround
  sector(0, true, 180, false),   // RightSphereGround
  sector(270, true, 90, true),   // VglFront
  sector(330, true, 150, true),  // VglRightFront
  sector(30, true, 210, true),   // VglRightRear
  sector(90, true, 270, true),   // VglRear
  sector(150, true, 330, true),  // VglLeftRear
  sector(210, true, 30, true),   // VglLeftFront
  sector(240, false, 120, false), // NoseWpl
  sector(240, false, 60, true),  // LeftWingWpl
  sector(300, true, 120, false), // RightWingWpl
  sector(60, false, 300, false), // AftWpl
  sector(180, true, 360, false), // LeftBroadsideWpl
  sector(0, false, 180, false),  // RightBroadsideWpl
  sector(330, true, 30, false),  // Hexside0
  sector(30, true, 90, false),   // Hexside1
  sector(90, true, 150, false),  // Hexside2
  sector(150, true, 210, false), // Hexside3
  sector(210, true, 270, false), // Hexside4
  sector(270, true, 330, false), // Hexside5
];

impl Sector {
  #[must_use]
  pub fn contains(&self, angle: u32) -> bool {
    let above_low = if self.low_inclusive { angle >= self.low } else { angle > self.low };
    let below_high = if self.high_inclusive { angle <= self.high } else { angle < self.high };
    if self.low <= self.high {
      above_low && below_high
    } else {
      above_low || below_high
    }
  }
}

impl FiringArc {
  #[must_use]
  pub fn sector(self) -> Sector {
    ARC_SECTORS[self as usize]
  }
}

/// Bearing from `source` to `target` measured clockwise from `facing`.
#[must_use]
pub fn firing_angle(source: Coords, facing: u8, target: Coords) -> u32 {
  let angle = (source.degree(target) - i32::from(facing % 6) * 60).rem_euclid(360);
  // rem_euclid(360) is never negative.
  u32::try_from(angle).unwrap_or(0)
}

/// True if any of `targets` lies in `arc` as seen from `source` facing `facing`.  A target in the source hex is in
/// every arc.
#[must_use]
pub fn is_in_arc(source: Coords, facing: u8, targets: &[Coords], arc: FiringArc) -> bool {
  let sector = arc.sector();
  targets.iter().any(|&target| {
    if target == source {
      return true;
    }
    let angle = firing_angle(source, facing, target);
    trace!("(Arc.is_in_arc) {} -> {} facing {} has firing angle {} for {}.", source, target, facing, angle, arc);
    sector.contains(angle)
  })
}

/// The arc a mounted weapon fires into.
#[must_use]
pub fn weapon_arc(unit: &Unit, weapon: &MountedWeapon) -> FiringArc {
  if let Some(arc) = weapon.arc {
    return arc;
  }
  if unit.is_infantry() {
    return FiringArc::FullCircle;
  }
  if weapon.rear {
    return if unit.is_aero() { FiringArc::Aft } else { FiringArc::Rear };
  }
  match weapon.location {
    Location::LeftArm => FiringArc::LeftArm,
    Location::RightArm => FiringArc::RightArm,
    Location::LeftSide => FiringArc::LeftSide,
    Location::RightSide => FiringArc::RightSide,
    Location::Rear => FiringArc::Rear,
    Location::Turret => FiringArc::Turret,
    Location::Body => FiringArc::FullCircle,
    Location::Nose => FiringArc::Nose,
    Location::LeftWing => FiringArc::LeftWing,
    Location::RightWing => FiringArc::RightWing,
    Location::Aft => FiringArc::Aft,
    Location::Head
    | Location::CenterTorso
    | Location::LeftTorso
    | Location::RightTorso
    | Location::LeftLeg
    | Location::RightLeg
    | Location::FrontLeftLeg
    | Location::FrontRightLeg
    | Location::Front => FiringArc::Forward,
  }
}

/// Facing a weapon's arc is measured from: legs stay with the hull, everything else follows a torso twist or turret.
#[must_use]
pub fn weapon_facing(unit: &Unit, weapon: &MountedWeapon) -> u8 {
  if weapon.location.is_leg() {
    unit.facing
  } else {
    unit.weapon_facing()
  }
}

/// Which of two aerospace units sharing a space hex is in front, decided by rule alone: the smaller craft class, then
/// the higher velocity.  `None` when the rules leave it to chance.
#[must_use]
pub fn front_unit_by_rule(a: &Unit, b: &Unit) -> Option<UnitId> {
  if a.craft_class() != b.craft_class() {
    return Some(if a.craft_class() < b.craft_class() { a.id } else { b.id });
  }
  if a.velocity != b.velocity {
    return Some(if a.velocity > b.velocity { a.id } else { b.id });
  }
  None
}

/// Which of two aerospace units sharing a space hex is in front, flipping a coin when the rules tie.
pub fn resolve_front_unit(a: &Unit, b: &Unit, dice: &mut dyn Dice) -> UnitId {
  front_unit_by_rule(a, b).unwrap_or_else(|| {
    let front = if dice.uniform_int(2) == 0 { a.id } else { b.id };
    debug!("(Arc.resolve_front_unit) Coin flip puts unit {} in front of the pair {}, {}.", front, a.id, b.id);
    front
  })
}

/// Side of `target` facing the attacker.
#[must_use]
pub fn attack_side(target_position: Coords, target_facing: u8, attacker_position: Coords) -> AttackSide {
  if target_position == attacker_position {
    return AttackSide::Front;
  }
  let angle = firing_angle(target_position, target_facing, attacker_position);
  if FiringArc::Forward.sector().contains(angle) {
    AttackSide::Front
  } else if FiringArc::RightSide.sector().contains(angle) {
    AttackSide::Right
  } else if FiringArc::Rear.sector().contains(angle) {
    AttackSide::Rear
  } else {
    AttackSide::Left
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dice::MockDice;
  use crate::unit::{MovementMode, UnitCategory};

  const ALL_ARCS: [FiringArc; 44] = [
    FiringArc::FullCircle,
    FiringArc::Forward,
    FiringArc::LeftArm,
    FiringArc::RightArm,
    FiringArc::Rear,
    FiringArc::LeftSide,
    FiringArc::RightSide,
    FiringArc::MainGun,
    FiringArc::North,
    FiringArc::East,
    FiringArc::West,
    FiringArc::Turret,
    FiringArc::Nose,
    FiringArc::LeftWing,
    FiringArc::RightWing,
    FiringArc::LeftWingAft,
    FiringArc::RightWingAft,
    FiringArc::Aft,
    FiringArc::LeftSphere,
    FiringArc::RightSphere,
    FiringArc::LeftSphereAft,
    FiringArc::RightSphereAft,
    FiringArc::LeftBroadside,
    FiringArc::RightBroadside,
    FiringArc::LeftSphereGround,
    FiringArc::RightSphereGround,
    FiringArc::VglFront,
    FiringArc::VglRightFront,
    FiringArc::VglRightRear,
    FiringArc::VglRear,
    FiringArc::VglLeftRear,
    FiringArc::VglLeftFront,
    FiringArc::NoseWpl,
    FiringArc::LeftWingWpl,
    FiringArc::RightWingWpl,
    FiringArc::AftWpl,
    FiringArc::LeftBroadsideWpl,
    FiringArc::RightBroadsideWpl,
    FiringArc::Hexside0,
    FiringArc::Hexside1,
    FiringArc::Hexside2,
    FiringArc::Hexside3,
    FiringArc::Hexside4,
    FiringArc::Hexside5,
  ];

  fn targets_around(source: Coords) -> Vec<Coords> {
    (-6..=6)
      .flat_map(|dx| (-6..=6).map(move |dy| Coords::new(source.x + dx, source.y + dy)))
      .filter(|c| *c != source)
      .collect()
  }

  #[test_log::test]
  fn test_full_circle_always_in_arc() {
    let source = Coords::new(10, 10);
    for facing in 0..6 {
      for target in targets_around(source) {
        assert!(is_in_arc(source, facing, &[target], FiringArc::FullCircle));
      }
    }
  }

  #[test_log::test]
  fn test_complementary_arcs_exclusive() {
    let pairs = [
      (FiringArc::VglFront, FiringArc::VglRear, [90, 270]),
      (FiringArc::LeftSphereGround, FiringArc::RightSphereGround, [0, 180]),
      (FiringArc::LeftBroadsideWpl, FiringArc::RightBroadsideWpl, [0, 180]),
    ];
    for source in [Coords::new(10, 10), Coords::new(11, 10)] {
      for facing in 0..6 {
        for target in targets_around(source) {
          let angle = firing_angle(source, facing, target);
          for (a, b, boundaries) in pairs {
            if boundaries.contains(&angle) {
              continue;
            }
            let in_a = is_in_arc(source, facing, &[target], a);
            let in_b = is_in_arc(source, facing, &[target], b);
            assert!(in_a ^ in_b, "{a} / {b} at angle {angle}");
          }
        }
      }
    }
  }

  #[test_log::test]
  fn test_hexsides_partition_circle() {
    for angle in 0..360 {
      let owners = ALL_ARCS[38..].iter().filter(|arc| arc.sector().contains(angle)).count();
      assert_eq!(owners, 1, "angle {angle}");
    }
  }

  #[test_log::test]
  fn test_literal_edges() {
    assert!(FiringArc::Forward.sector().contains(60));
    assert!(!FiringArc::RightSide.sector().contains(60));
    assert!(FiringArc::RightSide.sector().contains(120));
    assert!(!FiringArc::Rear.sector().contains(120));
    assert!(FiringArc::LeftSide.sector().contains(240));
    assert!(!FiringArc::LeftSide.sector().contains(300));
    assert!(FiringArc::LeftWing.sector().contains(0));
    assert!(FiringArc::RightWing.sector().contains(0));
    assert!(!FiringArc::Nose.sector().contains(300));
    assert!(!FiringArc::LeftSphere.sector().contains(240));
  }

  #[test_log::test]
  fn test_same_hex_in_every_arc() {
    let source = Coords::new(3, 3);
    for arc in ALL_ARCS {
      assert!(is_in_arc(source, 2, &[source], arc), "{arc}");
    }
  }

  #[test_log::test]
  fn test_multi_hex_target() {
    let source = Coords::new(5, 5);
    let ahead = source.translated_n(0, 3);
    let behind = source.translated_n(3, 3);
    assert!(!is_in_arc(source, 0, &[behind], FiringArc::Forward));
    assert!(is_in_arc(source, 0, &[behind, ahead], FiringArc::Forward));
  }

  #[test_log::test]
  fn test_attack_side() {
    let target = Coords::new(5, 5);
    assert_eq!(attack_side(target, 0, target.translated_n(0, 2)), AttackSide::Front);
    assert_eq!(attack_side(target, 0, target.translated_n(3, 2)), AttackSide::Rear);
    assert_eq!(attack_side(target, 0, target.translated_n(2, 2)), AttackSide::Right);
    assert_eq!(attack_side(target, 0, target.translated_n(4, 2)), AttackSide::Left);
    assert_eq!(attack_side(target, 3, target.translated_n(0, 2)), AttackSide::Rear);
  }

  #[test_log::test]
  fn test_front_unit() {
    let mut fighter = Unit::new(1, "Stuka", 0, UnitCategory::AeroFighter, MovementMode::Aerodyne);
    let mut dropship = Unit::new(2, "Union", 1, UnitCategory::DropShip, MovementMode::Spheroid);
    assert_eq!(front_unit_by_rule(&fighter, &dropship), Some(1));

    let mut other = Unit::new(3, "Lucifer", 1, UnitCategory::AeroFighter, MovementMode::Aerodyne);
    fighter.velocity = 4;
    other.velocity = 6;
    assert_eq!(front_unit_by_rule(&fighter, &other), Some(3));

    other.velocity = 4;
    assert_eq!(front_unit_by_rule(&fighter, &other), None);
    let mut dice = MockDice::new();
    dice.expect_uniform_int().times(1).returning(|_| 1);
    assert_eq!(resolve_front_unit(&fighter, &other, &mut dice), 3);

    dropship.velocity = 10;
    assert_eq!(front_unit_by_rule(&dropship, &fighter), Some(1));
  }

  #[test_log::test]
  fn test_weapon_arc_by_location() {
    crate::catalog::config_test_catalog();
    let mech = Unit::new(1, "Wolverine", 0, UnitCategory::Mech, MovementMode::Biped);
    let arm = MountedWeapon::from_catalog("Medium Laser", Location::LeftArm).unwrap();
    assert_eq!(weapon_arc(&mech, &arm), FiringArc::LeftArm);
    let mut rear = MountedWeapon::from_catalog("Medium Laser", Location::CenterTorso).unwrap();
    assert_eq!(weapon_arc(&mech, &rear), FiringArc::Forward);
    rear.rear = true;
    assert_eq!(weapon_arc(&mech, &rear), FiringArc::Rear);

    let infantry = Unit::new(2, "Rifles", 0, UnitCategory::Infantry, MovementMode::InfantryLeg);
    let rifle = MountedWeapon::from_catalog("Laser Rifle", Location::Body).unwrap();
    assert_eq!(weapon_arc(&infantry, &rifle), FiringArc::FullCircle);
  }
}
