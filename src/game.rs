use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conditions::PlanetaryConditions;
use crate::error::RulesError;
use crate::hex::Coords;
use crate::options::GameOptions;
use crate::terrain::{Board, Hex, HexMap};
use crate::unit::{Unit, UnitId};
use crate::{debug, info};

/// A battlefield snapshot: everything the rules core reads to answer a query.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GameState {
  pub board: HexMap,
  #[serde(default)]
  pub units: BTreeMap<UnitId, Unit>,
  #[serde(default)]
  pub conditions: PlanetaryConditions,
  #[serde(default)]
  pub options: GameOptions,
  #[serde(default)]
  pub round: u32,
}

impl GameState {
  #[must_use]
  pub fn new(board: HexMap) -> Self {
    GameState {
      board,
      ..GameState::default()
    }
  }

  /// Load a scenario snapshot from a JSON file.  The weapon catalog must already be installed.
  ///
  /// # Errors
  /// Returns an error if the file cannot be read, is not valid JSON, or names unknown weapons.
  pub fn load_from_file(file_name: &str) -> Result<GameState, RulesError> {
    let file = std::fs::File::open(file_name)?;
    let reader = std::io::BufReader::new(file);
    let game: GameState = serde_json::from_reader(reader)?;
    info!(
      "(GameState.load_from_file) Loaded scenario {} with {} units on a {}x{} map.",
      file_name,
      game.units.len(),
      game.board.width,
      game.board.height
    );
    Ok(game)
  }

  /// Add a unit, replacing any unit with the same id.
  pub fn add_unit(&mut self, unit: Unit) {
    debug!("(GameState.add_unit) Adding unit {} ({}) at {:?}.", unit.id, unit.name, unit.position);
    self.units.insert(unit.id, unit);
  }

  /// # Errors
  /// Returns `RulesError::UnknownUnit` if no unit has that id.
  pub fn unit(&self, id: UnitId) -> Result<&Unit, RulesError> {
    self.units.get(&id).ok_or(RulesError::UnknownUnit(id))
  }

  /// # Errors
  /// Returns `RulesError::UnknownUnit` if no unit has that id.
  pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, RulesError> {
    self.units.get_mut(&id).ok_or(RulesError::UnknownUnit(id))
  }

  #[must_use]
  pub fn hex(&self, coords: Coords) -> Option<&Hex> {
    self.board.hex_at(coords)
  }

  /// Eligible units with any part in `coords`, in id order.
  pub fn units_at(&self, coords: Coords) -> impl Iterator<Item = &Unit> {
    self
      .units
      .values()
      .filter(move |unit| unit.is_eligible() && unit.positions().contains(&coords))
  }

  /// Eligible units hostile to `unit`, in id order.
  pub fn enemies_of<'a>(&'a self, unit: &'a Unit) -> impl Iterator<Item = &'a Unit> {
    self.units.values().filter(move |other| other.is_eligible() && other.is_enemy(unit))
  }

  /// Eligible units on the same side as `unit`, excluding itself.
  pub fn friends_of<'a>(&'a self, unit: &'a Unit) -> impl Iterator<Item = &'a Unit> {
    self
      .units
      .values()
      .filter(move |other| other.is_eligible() && other.id != unit.id && !other.is_enemy(unit))
  }

  /// Absolute level of the unit's base: hex surface plus the unit's elevation.
  #[must_use]
  pub fn unit_level(&self, unit: &Unit) -> Option<i32> {
    let position = unit.position?;
    let hex = self.hex(position)?;
    Some(hex.surface() + unit.elevation)
  }
}
