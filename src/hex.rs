use std::fmt;

use cgmath::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::RulesError;

pub type Vec2 = Vector2<f64>;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

// Nudge applied when tracing lines so hexside-straddling lines resolve to both neighbors.
const LINE_EPSILON: (f64, f64, f64) = (1e-6, 2e-6, -3e-6);

// Cube offsets for directions 0 (north) through 5 (north-west), clockwise.
const CUBE_DIRECTIONS: [Cube; 6] = [
  Cube { q: 0, r: -1, s: 1 },
  Cube { q: 1, r: -1, s: 0 },
  Cube { q: 1, r: 0, s: -1 },
  Cube { q: 0, r: 1, s: -1 },
  Cube { q: -1, r: 1, s: 0 },
  Cube { q: -1, r: 0, s: 1 },
];

/// A hex on the map in offset coordinates.  Columns (`x`) run west to east, rows (`y`) north to south and every odd
/// column sits half a hex lower than its even neighbors.  Direction 0 is north and directions advance clockwise.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Coords {
  pub x: i32,
  pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cube {
  q: i32,
  r: i32,
  s: i32,
}

/// One step of a traced line.  When the line runs exactly along a hexside both hexes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStep {
  pub primary: Coords,
  pub alternate: Option<Coords>,
}

impl Coords {
  #[must_use]
  pub const fn new(x: i32, y: i32) -> Self {
    Coords { x, y }
  }

  fn to_cube(self) -> Cube {
    let q = self.x;
    let r = self.y - (self.x - (self.x & 1)) / 2;
    Cube { q, r, s: -q - r }
  }

  fn from_cube(cube: Cube) -> Self {
    Coords {
      x: cube.q,
      y: cube.r + (cube.q - (cube.q & 1)) / 2,
    }
  }

  #[must_use]
  pub fn distance(self, other: Coords) -> u32 {
    let a = self.to_cube();
    let b = other.to_cube();
    ((a.q - b.q).unsigned_abs() + (a.r - b.r).unsigned_abs() + (a.s - b.s).unsigned_abs()) / 2
  }

  /// The neighboring hex in `direction` (taken modulo 6).
  #[must_use]
  pub fn translated(self, direction: u8) -> Coords {
    self.translated_n(direction, 1)
  }

  #[must_use]
  pub fn translated_n(self, direction: u8, count: i32) -> Coords {
    let offset = CUBE_DIRECTIONS[usize::from(direction % 6)];
    let cube = self.to_cube();
    Coords::from_cube(Cube {
      q: cube.q + offset.q * count,
      r: cube.r + offset.r * count,
      s: cube.s + offset.s * count,
    })
  }

  #[must_use]
  pub fn adjacent(self) -> [Coords; 6] {
    [0, 1, 2, 3, 4, 5].map(|dir| self.translated(dir))
  }

  #[must_use]
  pub fn is_adjacent(self, other: Coords) -> bool {
    self.distance(other) == 1
  }

  /// Direction to an adjacent hex.
  ///
  /// # Errors
  /// Returns `RulesError::NotAdjacent` if `other` is not one of the six neighbors.
  pub fn adjacent_direction(self, other: Coords) -> Result<u8, RulesError> {
    (0..6)
      .find(|&dir| self.translated(dir) == other)
      .ok_or(RulesError::NotAdjacent(self, other))
  }

  /// Center of the hex in a cartesian frame where hexes have unit radius and y grows to the south.
  #[must_use]
  pub fn center(self) -> Vec2 {
    Vec2::new(1.5 * f64::from(self.x), SQRT_3 * (f64::from(self.y) + 0.5 * f64::from(self.x & 1)))
  }

  /// Bearing from this hex to `other` in whole degrees, 0 = north, clockwise.
  #[must_use]
  pub fn degree(self, other: Coords) -> i32 {
    if self == other {
      return 0;
    }
    let delta = other.center() - self.center();
    let degrees = delta.x.atan2(-delta.y).to_degrees();
    // Bearing is within [-180, 180] so the cast cannot truncate meaningfully.
    #[allow(clippy::cast_possible_truncation)]
    let rounded = degrees.round() as i32;
    rounded.rem_euclid(360)
  }

  /// The hex direction that best approximates the bearing to `other`.
  #[must_use]
  pub fn direction_to(self, other: Coords) -> u8 {
    // rem_euclid(6) is always in 0..6.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let dir = ((self.degree(other) + 30) / 60).rem_euclid(6) as u8;
    dir
  }

  /// Project this hex forward by `steps` repetitions of the displacement from `previous` to `self`.
  #[must_use]
  pub fn projected(self, previous: Coords, steps: i32) -> Coords {
    let now = self.to_cube();
    let before = previous.to_cube();
    Coords::from_cube(Cube {
      q: now.q + (now.q - before.q) * steps,
      r: now.r + (now.r - before.r) * steps,
      s: now.s + (now.s - before.s) * steps,
    })
  }

  /// Every hex on the straight line from `self` to `other`, endpoints included.
  #[must_use]
  pub fn line_to(self, other: Coords) -> Vec<LineStep> {
    let steps = self.distance(other);
    if steps == 0 {
      return vec![LineStep {
        primary: self,
        alternate: None,
      }];
    }
    let a = self.to_cube();
    let b = other.to_cube();
    (0..=steps)
      .map(|i| {
        let t = f64::from(i) / f64::from(steps);
        let plus = Coords::from_cube(cube_round(cube_lerp(a, b, t, 1.0)));
        let minus = Coords::from_cube(cube_round(cube_lerp(a, b, t, -1.0)));
        LineStep {
          primary: plus,
          alternate: (plus != minus).then_some(minus),
        }
      })
      .collect()
  }

  /// Hexes strictly between `self` and `other`, including both sides of any hexside split.
  #[must_use]
  pub fn intervening(self, other: Coords) -> Vec<Coords> {
    let line = self.line_to(other);
    if line.len() <= 2 {
      return vec![];
    }
    line[1..line.len() - 1]
      .iter()
      .flat_map(|step| std::iter::once(step.primary).chain(step.alternate))
      .collect()
  }
}

impl fmt::Display for Coords {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.x, self.y)
  }
}

fn cube_lerp(a: Cube, b: Cube, t: f64, nudge: f64) -> (f64, f64, f64) {
  let lerp = |from: i32, to: i32, eps: f64| f64::from(from) + eps * nudge + (f64::from(to) - f64::from(from)) * t;
  (
    lerp(a.q, b.q, LINE_EPSILON.0),
    lerp(a.r, b.r, LINE_EPSILON.1),
    lerp(a.s, b.s, LINE_EPSILON.2),
  )
}

// Values are hex coordinates on a game map, far inside i32.
#[allow(clippy::cast_possible_truncation)]
fn cube_round((q, r, s): (f64, f64, f64)) -> Cube {
  let mut rq = q.round();
  let mut rr = r.round();
  let rs = s.round();

  let dq = (rq - q).abs();
  let dr = (rr - r).abs();
  let ds = (rs - s).abs();

  if dq > dr && dq > ds {
    rq = -rr - rs;
  } else if dr > ds {
    rr = -rq - rs;
  }
  let q = rq as i32;
  let r = rr as i32;
  Cube { q, r, s: -q - r }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_distance_is_symmetric() {
    let points = [
      Coords::new(0, 0),
      Coords::new(3, 7),
      Coords::new(-2, 4),
      Coords::new(5, -3),
      Coords::new(10, 10),
    ];
    for a in points {
      for b in points {
        assert_eq!(a.distance(b), b.distance(a), "distance {a} -> {b}");
      }
    }
    assert_eq!(Coords::new(0, 0).distance(Coords::new(0, 4)), 4);
    assert_eq!(Coords::new(0, 0).distance(Coords::new(4, 0)), 4);
  }

  #[test]
  fn test_neighbors() {
    for center in [Coords::new(4, 4), Coords::new(5, 4), Coords::new(-3, 2)] {
      let neighbors = center.adjacent();
      for (dir, n) in neighbors.iter().enumerate() {
        assert_eq!(center.distance(*n), 1);
        assert_eq!(n.translated(u8::try_from(dir).unwrap() + 3), center);
        assert_eq!(center.adjacent_direction(*n).unwrap(), u8::try_from(dir).unwrap());
        assert_eq!(i32::from(center.direction_to(*n)), i32::try_from(dir).unwrap());
      }
      let mut unique = neighbors.to_vec();
      unique.sort();
      unique.dedup();
      assert_eq!(unique.len(), 6);
    }
  }

  #[test]
  fn test_adjacent_direction_rejects_distant_hex() {
    let result = Coords::new(0, 0).adjacent_direction(Coords::new(0, 2));
    assert!(matches!(result, Err(RulesError::NotAdjacent(_, _))));
  }

  #[test]
  fn test_degree_of_neighbors() {
    let center = Coords::new(6, 6);
    for dir in 0..6_u8 {
      assert_eq!(center.degree(center.translated(dir)), i32::from(dir) * 60);
    }
    assert_eq!(center.degree(center), 0);
  }

  #[test]
  fn test_degree_is_opposite() {
    let a = Coords::new(2, 3);
    let b = Coords::new(9, 1);
    assert_eq!((a.degree(b) + 180).rem_euclid(360), b.degree(a));
  }

  #[test]
  fn test_line_and_split() {
    let line = Coords::new(0, 0).line_to(Coords::new(0, 5));
    assert_eq!(line.len(), 6);
    assert!(line.iter().all(|s| s.alternate.is_none()));

    // A line that runs along a hexside reports both hexes.
    let between = Coords::new(0, 0).intervening(Coords::new(1, 1));
    assert!(between.contains(&Coords::new(1, 0)));
    assert!(between.contains(&Coords::new(0, 1)));
  }

  #[test]
  fn test_projected() {
    let previous = Coords::new(4, 4);
    let now = previous.translated_n(2, 3);
    assert_eq!(now.projected(previous, 2), previous.translated_n(2, 9));
    assert_eq!(now.projected(now, 5), now);
  }
}
