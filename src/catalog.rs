//! Process-wide registry of weapon profiles, loaded once from a JSON file.  Mounted weapons store an `Arc` into this
//! registry and serialize only the profile name.
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::RulesError;
use crate::info;
use crate::weapon::WeaponProfile;

pub static WEAPON_CATALOG: OnceCell<HashMap<String, Arc<WeaponProfile>>> = OnceCell::new();

pub const DEFAULT_CATALOG_FILE: &str = "./data/weapon_catalog.json";

/// Read weapon profiles from a JSON array.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn load_catalog_from_file(file_name: &str) -> Result<HashMap<String, Arc<WeaponProfile>>, RulesError> {
  let file = std::fs::File::open(file_name)?;
  let reader = std::io::BufReader::new(file);
  let profiles: Vec<WeaponProfile> = serde_json::from_reader(reader)?;
  let table = profiles
    .into_iter()
    .map(|profile| (profile.name.clone(), Arc::new(profile)))
    .collect();

  Ok(table)
}

/// Install the catalog.  Only the first installation takes effect.
pub fn install_catalog(catalog: HashMap<String, Arc<WeaponProfile>>) {
  let size = catalog.len();
  if WEAPON_CATALOG.set(catalog).is_err() {
    info!("(Catalog.install_catalog) Catalog already installed; ignoring second set of {} profiles.", size);
  } else {
    info!("(Catalog.install_catalog) Installed {} weapon profiles.", size);
  }
}

/// Load the catalog from `file_name` and install it.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn load_and_install(file_name: &str) -> Result<(), RulesError> {
  install_catalog(load_catalog_from_file(file_name)?);
  Ok(())
}

/// Find a weapon profile by name.
///
/// # Errors
/// Returns `RulesError::UnknownProfile` if no catalog is installed or it has no such weapon.
pub fn lookup(name: &str) -> Result<Arc<WeaponProfile>, RulesError> {
  WEAPON_CATALOG
    .get()
    .and_then(|catalog| catalog.get(name))
    .cloned()
    .ok_or_else(|| RulesError::UnknownProfile(name.to_string()))
}

/// Helper designed only for use in tests to install the default catalog.
///
/// # Panics
/// Panics if the default catalog file cannot be loaded.
pub fn config_test_catalog() {
  let catalog = load_catalog_from_file(DEFAULT_CATALOG_FILE).expect("Unable to load weapon catalog file.");
  install_catalog(catalog);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::weapon::{DamageFormula, WeaponCategory, WeaponFlag};

  #[test_log::test]
  fn test_default_catalog() {
    config_test_catalog();
    let laser = lookup("Medium Laser").unwrap();
    assert_eq!(laser.category, WeaponCategory::Energy);
    assert_eq!(laser.damage, DamageFormula::Fixed(5));
    assert_eq!(laser.ranges.medium, 6);

    let lbx = lookup("LB 10-X AC").unwrap();
    assert!(lbx.has_flag(WeaponFlag::Lbx));
    assert_eq!(lbx.rack_size, 10);
  }

  #[test_log::test]
  fn test_unknown_profile() {
    config_test_catalog();
    assert!(matches!(lookup("Death Ray"), Err(RulesError::UnknownProfile(name)) if name == "Death Ray"));
  }

  #[test_log::test]
  fn test_second_install_is_ignored() {
    config_test_catalog();
    install_catalog(HashMap::new());
    assert!(lookup("Medium Laser").is_ok());
  }
}
