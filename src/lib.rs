/// Lib for hexfire
///
/// The tactical rules core: sightlines and sensors, stacking and displacement, firing arcs, the to-hit pipeline and
/// damage resolution.  `main.rs` is a thin command line front end over these modules; integration tests use the
/// crate as a library.
pub mod arc;
pub mod catalog;
pub mod combat;
pub mod conditions;
pub mod crew;
pub mod damage;
pub mod damage_tables;
pub mod dice;
pub mod ecm;
pub mod error;
pub mod game;
pub mod hex;
pub mod options;
pub mod range;
pub mod rules_tables;
pub mod spotting;
pub mod stacking;
pub mod terrain;
pub mod to_hit;
pub mod unit;
pub mod visibility;
pub mod weapon;

#[macro_use]
mod cov_util;


use std::fs;

use crate::error::RulesError;

/// List the JSON files in a scenario directory, sorted by name.
///
/// # Errors
/// Returns `RulesError::Io` if the directory cannot be read.
pub fn list_scenario_files(dir: &str) -> Result<Vec<String>, RulesError> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
      files.push(path.to_string_lossy().into_owned());
    }
  }
  files.sort();
  debug!("(list_scenario_files) Found {} scenarios in {dir}.", files.len());
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_list_scenario_files() {
    let files = list_scenario_files("./data/scenarios").unwrap();
    assert!(!files.is_empty());
    assert!(files.iter().all(|file| file.ends_with(".json")));
    assert!(files.windows(2).all(|pair| pair[0] <= pair[1]));
  }

  #[test]
  fn test_list_missing_dir() {
    assert!(matches!(list_scenario_files("./data/no_such_dir"), Err(RulesError::Io(_))));
  }
}
