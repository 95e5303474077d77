use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::info;

/// Optional rule toggles.  Every toggle defaults to off.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct GameOptions {
  #[serde(default)]
  pub extreme_range: bool,
  #[serde(default)]
  pub los_range: bool,
  #[serde(default)]
  pub double_blind: bool,
  /// Woods and jungle give partial cover instead of adding to the to-hit number.
  #[serde(default)]
  pub woods_cover: bool,
  #[serde(default)]
  pub push_off_board: bool,
  #[serde(default)]
  pub advanced_ams: bool,
  #[serde(default)]
  pub expanded_movement_bands: bool,
  #[serde(default)]
  pub indirect_with_los: bool,
  #[serde(default)]
  pub ghost_targets: bool,
  #[serde(default)]
  pub sensor_shadow: bool,
  /// Sensor checks feed the contact and firing solution sets.
  #[serde(default)]
  pub sensors: bool,
}

impl GameOptions {
  /// Load a set of options from a JSON file.
  ///
  /// # Errors
  /// Returns an error if the file cannot be read or is not valid JSON for `GameOptions`.
  pub fn load_from_file(file_name: &str) -> Result<GameOptions, RulesError> {
    let file = std::fs::File::open(file_name)?;
    let reader = std::io::BufReader::new(file);
    let options: GameOptions = serde_json::from_reader(reader)?;
    info!("(GameOptions.load_from_file) Loaded options from {}: {:?}", file_name, options);
    Ok(options)
  }
}
