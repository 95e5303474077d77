use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Light {
  #[default]
  Day,
  Dusk,
  FullMoon,
  Moonless,
  PitchBlack,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Weather {
  #[default]
  Clear,
  LightRain,
  ModerateRain,
  HeavyRain,
  LightSnow,
  ModerateSnow,
  HeavySnow,
  LightFog,
  HeavyFog,
  Blizzard,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Wind {
  #[default]
  Calm,
  LightGale,
  ModerateGale,
  StrongGale,
  Storm,
  Tornado,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Atmosphere {
  Vacuum,
  Trace,
  Thin,
  #[default]
  Standard,
  High,
  VeryHigh,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PlanetaryConditions {
  #[serde(default)]
  pub light: Light,
  #[serde(default)]
  pub weather: Weather,
  #[serde(default)]
  pub wind: Wind,
  #[serde(default)]
  pub atmosphere: Atmosphere,
  #[serde(default = "default_gravity")]
  pub gravity: f64,
}

fn default_gravity() -> f64 {
  1.0
}

impl Default for PlanetaryConditions {
  fn default() -> Self {
    PlanetaryConditions {
      light: Light::Day,
      weather: Weather::Clear,
      wind: Wind::Calm,
      atmosphere: Atmosphere::Standard,
      gravity: default_gravity(),
    }
  }
}

impl PlanetaryConditions {
  #[must_use]
  pub fn is_dark(&self) -> bool {
    !matches!(self.light, Light::Day | Light::Dusk)
  }

  #[must_use]
  pub fn is_vacuum(&self) -> bool {
    matches!(self.atmosphere, Atmosphere::Vacuum | Atmosphere::Trace)
  }

  /// Maximum unaided visual range in hexes, before smoke and target concealment are taken into account.
  #[must_use]
  pub fn visual_range(&self, target_illuminated: bool) -> u32 {
    let by_light = match (self.light, target_illuminated) {
      (Light::Day, _) => 60,
      (Light::Dusk, _) | (Light::FullMoon, true) => 30,
      (Light::FullMoon, false) => 15,
      (Light::Moonless | Light::PitchBlack, true) => 10,
      (Light::Moonless, false) => 5,
      (Light::PitchBlack, false) => 3,
    };
    let by_weather = match self.weather {
      Weather::Clear => u32::MAX,
      Weather::LightRain | Weather::LightSnow => 30,
      Weather::ModerateRain | Weather::ModerateSnow => 20,
      Weather::LightFog => 15,
      Weather::HeavyRain | Weather::HeavySnow => 12,
      Weather::HeavyFog | Weather::Blizzard => 5,
    };
    by_light.min(by_weather)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_visual_range() {
    let mut conditions = PlanetaryConditions::default();
    assert_eq!(conditions.visual_range(false), 60);

    conditions.light = Light::FullMoon;
    assert_eq!(conditions.visual_range(false), 15);
    assert_eq!(conditions.visual_range(true), 30);

    conditions.light = Light::PitchBlack;
    assert_eq!(conditions.visual_range(false), 3);
    assert_eq!(conditions.visual_range(true), 10);
    assert!(conditions.is_dark());

    conditions.light = Light::Day;
    conditions.weather = Weather::HeavyFog;
    assert_eq!(conditions.visual_range(false), 5);
  }

  #[test]
  fn test_deserialize_defaults() {
    let conditions: PlanetaryConditions = serde_json::from_str(r#"{"light": "Dusk"}"#).unwrap();
    assert_eq!(conditions.light, Light::Dusk);
    assert_eq!(conditions.weather, Weather::Clear);
    approx::assert_relative_eq!(conditions.gravity, 1.0);
    assert!(!conditions.is_vacuum());
  }
}
