use thiserror::Error;

use crate::hex::Coords;
use crate::unit::UnitId;

/// Faults caused by the caller handing the rules core something it cannot work with.
///
/// Rule outcomes (out of range, blocked line of sight, ...) are never reported through this type; they are
/// terminal states on a [`crate::to_hit::TargetNumber`].
#[derive(Debug, Error)]
pub enum RulesError {
  #[error("unknown unit id {0}")]
  UnknownUnit(UnitId),

  #[error("unit {unit} has no weapon at index {index}")]
  UnknownWeapon { unit: UnitId, index: usize },

  #[error("unit {unit} has no ammo bin at index {index}")]
  UnknownAmmo { unit: UnitId, index: usize },

  #[error("ammo bin {bin} cannot feed weapon {weapon} on unit {unit}")]
  IncompatibleAmmo { unit: UnitId, weapon: usize, bin: usize },

  #[error("unit {0} is not on the board")]
  NotOnBoard(UnitId),

  #[error("{0} and {1} are not adjacent")]
  NotAdjacent(Coords, Coords),

  #[error("invalid hex direction {0}")]
  InvalidDirection(u8),

  #[error("no cluster hits table row for rack size {0}")]
  ClusterTableMiss(u32),

  #[error("weapon profile {0} is not in the catalog")]
  UnknownProfile(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}
