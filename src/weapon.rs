use std::collections::BTreeSet;
use std::sync::Arc;

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none};
use strum_macros::Display;

use crate::arc::FiringArc;
use crate::catalog;
use crate::error::RulesError;
use crate::rules_tables::RangeBracket;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum WeaponCategory {
  Energy,
  Ballistic,
  Missile,
  Artillery,
  InfantrySmallArms,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum WeaponFlag {
  Pulse,
  Lbx,
  Ultra,
  Rotary,
  Streak,
  Ppc,
  Flamer,
  IndirectCapable,
  Narc,
  Tag,
  Ams,
  /// Uses capital-scale ranges on space maps.
  Capital,
  InfantryWeapon,
}

/// Minimum plus the upper bound (inclusive) of each range bracket, in hexes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeTable {
  #[serde(default)]
  pub minimum: u32,
  pub short: u32,
  pub medium: u32,
  pub long: u32,
  #[serde(default)]
  pub extreme: u32,
}

impl RangeTable {
  #[must_use]
  pub const fn new(minimum: u32, short: u32, medium: u32, long: u32, extreme: u32) -> Self {
    RangeTable {
      minimum,
      short,
      medium,
      long,
      extreme,
    }
  }

  #[must_use]
  pub fn upper_bound(&self, bracket: RangeBracket) -> u32 {
    match bracket {
      RangeBracket::Short => self.short,
      RangeBracket::Medium => self.medium,
      RangeBracket::Long => self.long,
      RangeBracket::Extreme => self.extreme,
      RangeBracket::LineOfSight | RangeBracket::OutOfRange => u32::MAX,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpecialAttack {
  Artillery,
  Narc,
  Tag,
}

/// How a weapon's damage is worked out.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageFormula {
  Fixed(u32),
  /// Damage at short, medium, long and extreme range.
  PerRange([u32; 4]),
  /// Damage per missile or submunition, with the number hitting taken from the cluster table.
  Cluster(u32),
  /// Damage equals the rack size.
  Variable,
  Special(SpecialAttack),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AmmoFamily {
  Autocannon,
  Lbx,
  Ultra,
  Rotary,
  Gauss,
  MachineGun,
  Lrm,
  Srm,
  Mrm,
  Streak,
  Narc,
  Artillery,
  Ams,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Munition {
  #[default]
  Standard,
  Cluster,
  ArmorPiercing,
  Precision,
  Inferno,
  NarcCapable,
  INarcPod,
  Thunder,
}

impl Munition {
  #[must_use]
  pub fn is_minefield(self) -> bool {
    matches!(self, Munition::Thunder)
  }

  /// Beacon pods rather than warheads.
  #[must_use]
  pub fn is_beacon(self) -> bool {
    matches!(self, Munition::INarcPod)
  }
}

/// How damage to conventional infantry is derived from a weapon's standard damage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfantryDamageClass {
  #[default]
  DirectFire,
  ClusterBallistic,
  Pulse,
  ClusterMissile,
  AreaEffect,
  /// Damage replaced by a roll of this many d6 per hitting submunition.
  Burst(u32),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Guidance {
  ArtemisIV,
  ArtemisV,
  Apollo,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Location {
  Head,
  CenterTorso,
  LeftTorso,
  RightTorso,
  LeftArm,
  RightArm,
  LeftLeg,
  RightLeg,
  FrontLeftLeg,
  FrontRightLeg,
  Front,
  LeftSide,
  RightSide,
  Rear,
  Turret,
  Body,
  Nose,
  LeftWing,
  RightWing,
  Aft,
}

impl Location {
  #[must_use]
  pub fn is_arm(self) -> bool {
    matches!(self, Location::LeftArm | Location::RightArm)
  }

  #[must_use]
  pub fn is_leg(self) -> bool {
    matches!(
      self,
      Location::LeftLeg | Location::RightLeg | Location::FrontLeftLeg | Location::FrontRightLeg
    )
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FireMode {
  #[default]
  Single,
  /// Ultra autocannon double rate.
  Double,
  /// Rotary autocannon spun up to this many shots.
  Rotary(u32),
}

impl FireMode {
  #[must_use]
  pub fn shots(self) -> u32 {
    match self {
      FireMode::Single => 1,
      FireMode::Double => 2,
      FireMode::Rotary(shots) => shots.clamp(1, 6),
    }
  }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeaponProfile {
  pub name: String,
  pub category: WeaponCategory,
  #[serde(default)]
  pub flags: BTreeSet<WeaponFlag>,
  pub ranges: RangeTable,
  pub underwater_ranges: Option<RangeTable>,
  pub capital_ranges: Option<RangeTable>,
  pub damage: DamageFormula,
  #[serde(default)]
  pub rack_size: u32,
  pub ammo: Option<AmmoFamily>,
  #[serde(default)]
  pub heat: u32,
  #[serde(default)]
  pub to_hit_mod: i32,
  #[serde(default)]
  pub infantry_class: InfantryDamageClass,
  /// Range value of infantry small arms (0 means same hex only).
  pub infantry_range: Option<u32>,
}

impl WeaponProfile {
  #[must_use]
  pub fn has_flag(&self, flag: WeaponFlag) -> bool {
    self.flags.contains(&flag)
  }

  #[must_use]
  pub fn is_missile(&self) -> bool {
    self.category == WeaponCategory::Missile
  }

  #[must_use]
  pub fn is_energy(&self) -> bool {
    self.category == WeaponCategory::Energy
  }

  #[must_use]
  pub fn is_infantry_weapon(&self) -> bool {
    self.category == WeaponCategory::InfantrySmallArms || self.has_flag(WeaponFlag::InfantryWeapon)
  }

  #[must_use]
  pub fn is_artillery(&self) -> bool {
    self.category == WeaponCategory::Artillery
  }

  #[must_use]
  pub fn fires_underwater(&self) -> bool {
    self.underwater_ranges.is_some()
  }

  #[must_use]
  pub fn uses_cluster_table(&self) -> bool {
    matches!(self.damage, DamageFormula::Cluster(_))
  }
}

serde_with::serde_conv!(
  pub ProfileNameOnly,
  Arc<WeaponProfile>,
  |profile: &Arc<WeaponProfile>| profile.name.clone(),
  |value: String| -> Result<_, RulesError> { catalog::lookup(&value) }
);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct WeaponState {
  #[serde(default)]
  pub destroyed: bool,
  #[serde(default)]
  pub jammed: bool,
  /// PPC field inhibitor switched off, removing the minimum range.
  #[serde(default)]
  pub inhibitor_off: bool,
  #[serde(default)]
  pub hot_loaded: bool,
}

/// A weapon profile mounted at a location on a unit.
#[skip_serializing_none]
#[serde_as]
#[derive(Derivative)]
#[derivative(PartialEq)]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MountedWeapon {
  #[serde_as(as = "ProfileNameOnly")]
  #[derivative(PartialEq(compare_with = "same_profile"))]
  pub profile: Arc<WeaponProfile>,
  pub location: Location,
  #[serde(default)]
  pub rear: bool,
  pub arc: Option<FiringArc>,
  /// Index into the owning unit's ammo bins.
  pub ammo_bin: Option<usize>,
  #[serde(default)]
  pub mode: FireMode,
  #[serde(default)]
  pub dial_down: u32,
  pub guidance: Option<Guidance>,
  #[serde(default)]
  pub state: WeaponState,
}

fn same_profile(a: &Arc<WeaponProfile>, b: &Arc<WeaponProfile>) -> bool {
  a.name == b.name
}

impl MountedWeapon {
  #[must_use]
  pub fn new(profile: Arc<WeaponProfile>, location: Location) -> Self {
    MountedWeapon {
      profile,
      location,
      rear: false,
      arc: None,
      ammo_bin: None,
      mode: FireMode::Single,
      dial_down: 0,
      guidance: None,
      state: WeaponState::default(),
    }
  }

  /// Build a mounted weapon by looking up `name` in the loaded catalog.
  ///
  /// # Errors
  /// Returns `RulesError::UnknownProfile` if the catalog has no such weapon.
  pub fn from_catalog(name: &str, location: Location) -> Result<Self, RulesError> {
    Ok(MountedWeapon::new(catalog::lookup(name)?, location))
  }

  #[must_use]
  pub fn is_usable(&self) -> bool {
    !self.state.destroyed && !self.state.jammed
  }

  /// Damage after dial-down, never below 1.
  #[must_use]
  pub fn dialed_damage(&self, damage: u32) -> u32 {
    if damage == 0 {
      return 0;
    }
    damage.saturating_sub(self.dial_down).max(1)
  }

  #[must_use]
  pub fn dialed_heat(&self) -> u32 {
    self.profile.heat.saturating_sub(self.dial_down)
  }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AmmoBin {
  pub family: AmmoFamily,
  #[serde(default)]
  pub munition: Munition,
  pub shots: u32,
  /// Some munitions change the weapon's range table.
  pub range_override: Option<RangeTable>,
}

impl AmmoBin {
  #[must_use]
  pub fn new(family: AmmoFamily, munition: Munition, shots: u32) -> Self {
    AmmoBin {
      family,
      munition,
      shots,
      range_override: None,
    }
  }

  #[must_use]
  pub fn feeds(&self, profile: &WeaponProfile) -> bool {
    self.shots > 0 && profile.ammo == Some(self.family)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::config_test_catalog;

  #[test]
  fn test_fire_mode_shots() {
    assert_eq!(FireMode::Single.shots(), 1);
    assert_eq!(FireMode::Double.shots(), 2);
    assert_eq!(FireMode::Rotary(4).shots(), 4);
    assert_eq!(FireMode::Rotary(9).shots(), 6);
  }

  #[test]
  fn test_dial_down() {
    config_test_catalog();
    let mut laser = MountedWeapon::from_catalog("Medium Laser", Location::RightArm).unwrap();
    laser.dial_down = 2;
    assert_eq!(laser.dialed_damage(5), 3);
    assert_eq!(laser.dialed_damage(2), 1);
    assert_eq!(laser.dialed_heat(), 1);
  }

  #[test]
  fn test_ammo_feeds() {
    config_test_catalog();
    let lbx = catalog::lookup("LB 10-X AC").unwrap();
    let bin = AmmoBin::new(AmmoFamily::Lbx, Munition::Cluster, 10);
    assert!(bin.feeds(&lbx));
    let empty = AmmoBin::new(AmmoFamily::Lbx, Munition::Standard, 0);
    assert!(!empty.feeds(&lbx));
    let wrong = AmmoBin::new(AmmoFamily::Srm, Munition::Standard, 10);
    assert!(!wrong.feeds(&lbx));
  }

  #[test]
  fn test_mounted_weapon_serializes_by_name() {
    config_test_catalog();
    let laser = MountedWeapon::from_catalog("Medium Laser", Location::LeftTorso).unwrap();
    let json = serde_json::to_value(&laser).unwrap();
    assert_eq!(json["profile"], "Medium Laser");
    let back: MountedWeapon = serde_json::from_value(json).unwrap();
    assert_eq!(back, laser);

    let bad = serde_json::from_str::<MountedWeapon>(r#"{"profile": "Death Ray", "location": "Head"}"#);
    assert!(bad.is_err());
  }
}
