use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use strum_macros::Display;

use crate::hex::Coords;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TerrainKind {
  Woods,
  Jungle,
  Smoke,
  Building,
  Water,
  Swamp,
  Industrial,
  Rough,
  Rubble,
  Pavement,
  Fire,
}

/// A single terrain feature of a hex.  The meaning of `level` depends on the kind: woods/jungle 1 = light,
/// 2 = heavy, 3 = ultra-heavy; smoke 1 = light, 2 = heavy; building = height in levels; water = depth;
/// swamp 2 = quicksand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terrain {
  pub kind: TerrainKind,
  #[serde(default = "default_level")]
  pub level: u8,
}

fn default_level() -> u8 {
  1
}

impl Terrain {
  #[must_use]
  pub fn new(kind: TerrainKind, level: u8) -> Self {
    Terrain { kind, level }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Hex {
  #[serde(default)]
  pub elevation: i32,
  #[serde(default)]
  pub terrains: Vec<Terrain>,
}

impl Hex {
  #[must_use]
  pub fn new(elevation: i32, terrains: Vec<Terrain>) -> Self {
    Hex { elevation, terrains }
  }

  #[must_use]
  pub fn level_of(&self, kind: TerrainKind) -> Option<u8> {
    self.terrains.iter().find(|t| t.kind == kind).map(|t| t.level)
  }

  #[must_use]
  pub fn contains(&self, kind: TerrainKind) -> bool {
    self.level_of(kind).is_some()
  }

  /// Woods or jungle density, whichever is present.
  #[must_use]
  pub fn foliage(&self) -> Option<u8> {
    self.level_of(TerrainKind::Woods).or_else(|| self.level_of(TerrainKind::Jungle))
  }

  #[must_use]
  pub fn water_depth(&self) -> u8 {
    self.level_of(TerrainKind::Water).unwrap_or(0)
  }

  #[must_use]
  pub fn building_height(&self) -> u8 {
    self.level_of(TerrainKind::Building).unwrap_or(0)
  }

  /// Level of the ground (or water surface) units stand on.
  #[must_use]
  pub fn surface(&self) -> i32 {
    self.elevation
  }

  /// Lowest level of the hex (bottom of any water).
  #[must_use]
  pub fn floor(&self) -> i32 {
    self.elevation - i32::from(self.water_depth())
  }

  /// Highest level anything in the hex reaches: woods and smoke stand two levels tall (ultra woods three),
  /// buildings their height.
  #[must_use]
  pub fn ceiling(&self) -> i32 {
    let foliage = match self.foliage() {
      Some(3) => 3,
      Some(_) => 2,
      None => 0,
    };
    let smoke = if self.contains(TerrainKind::Smoke) { 2 } else { 0 };
    self.elevation + i32::max(i32::from(self.building_height()), i32::max(foliage, smoke))
  }

  /// True if nothing in the hex provides concealment for infantry.
  #[must_use]
  pub fn is_open(&self) -> bool {
    self.foliage().is_none() && !self.contains(TerrainKind::Building)
  }
}

/// The terrain query service the rules core consumes.
pub trait Board {
  fn hex_at(&self, coords: Coords) -> Option<&Hex>;

  fn contains(&self, coords: Coords) -> bool {
    self.hex_at(coords).is_some()
  }

  /// Space maps have no terrain and use capital-scale arcs and same-hex ordering.
  fn is_space(&self) -> bool {
    false
  }
}

/// Rectangular map of `width` x `height` hexes.  Hexes not listed explicitly are clear ground at elevation 0.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HexMap {
  pub width: i32,
  pub height: i32,
  #[serde(default)]
  pub space: bool,
  #[serde_as(as = "Vec<(_, _)>")]
  #[serde(default)]
  hexes: HashMap<Coords, Hex>,
  #[serde(skip)]
  clear: Hex,
}

impl HexMap {
  #[must_use]
  pub fn new(width: i32, height: i32) -> Self {
    HexMap {
      width,
      height,
      space: false,
      hexes: HashMap::new(),
      clear: Hex::default(),
    }
  }

  #[must_use]
  pub fn new_space(width: i32, height: i32) -> Self {
    HexMap {
      space: true,
      ..HexMap::new(width, height)
    }
  }

  #[must_use]
  pub fn in_bounds(&self, coords: Coords) -> bool {
    coords.x >= 0 && coords.y >= 0 && coords.x < self.width && coords.y < self.height
  }

  /// Replace the hex at `coords`.  Hexes outside the map bounds are ignored.
  pub fn set_hex(&mut self, coords: Coords, hex: Hex) {
    if self.in_bounds(coords) {
      self.hexes.insert(coords, hex);
    }
  }

  pub fn add_terrain(&mut self, coords: Coords, terrain: Terrain) {
    if self.in_bounds(coords) {
      let hex = self.hexes.entry(coords).or_default();
      hex.terrains.retain(|t| t.kind != terrain.kind);
      hex.terrains.push(terrain);
    }
  }

  pub fn set_elevation(&mut self, coords: Coords, elevation: i32) {
    if self.in_bounds(coords) {
      self.hexes.entry(coords).or_default().elevation = elevation;
    }
  }
}

impl Board for HexMap {
  fn hex_at(&self, coords: Coords) -> Option<&Hex> {
    if !self.in_bounds(coords) {
      return None;
    }
    Some(self.hexes.get(&coords).unwrap_or(&self.clear))
  }

  fn is_space(&self) -> bool {
    self.space
  }
}
