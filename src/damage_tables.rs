use crate::weapon::Guidance;

// Rack size followed by hits for rolls of 2 through 12.
pub type ClusterRow = [u32; 12];

pub const CLUSTER_HITS_TABLE: [ClusterRow; 30] = [
  [2, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2],
  [3, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3],
  [4, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4],
  [5, 1, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5],
  [6, 2, 2, 3, 3, 4, 4, 4, 5, 5, 6, 6],
  [7, 2, 2, 3, 4, 4, 4, 4, 6, 6, 7, 7],
  [8, 3, 3, 4, 4, 5, 5, 5, 6, 6, 8, 8],
  [9, 3, 3, 4, 5, 5, 5, 5, 7, 7, 9, 9],
  [10, 3, 3, 4, 6, 6, 6, 6, 8, 8, 10, 10],
  [11, 4, 4, 5, 7, 7, 7, 7, 9, 9, 11, 11],
  [12, 4, 4, 5, 8, 8, 8, 8, 10, 10, 12, 12],
  [13, 4, 4, 5, 8, 8, 8, 8, 11, 11, 13, 13],
  [14, 5, 5, 6, 9, 9, 9, 9, 11, 11, 14, 14],
  [15, 5, 5, 6, 9, 9, 9, 9, 12, 12, 15, 15],
  [16, 5, 5, 7, 10, 10, 10, 10, 13, 13, 16, 16],
  [17, 5, 5, 7, 10, 10, 10, 10, 14, 14, 17, 17],
  [18, 6, 6, 8, 11, 11, 11, 11, 14, 14, 18, 18],
  [19, 6, 6, 8, 11, 11, 11, 11, 15, 15, 19, 19],
  [20, 6, 6, 9, 12, 12, 12, 12, 16, 16, 20, 20],
  [21, 7, 7, 9, 13, 13, 13, 13, 17, 17, 21, 21],
  [22, 7, 7, 9, 14, 14, 14, 14, 18, 18, 22, 22],
  [23, 7, 7, 10, 15, 15, 15, 15, 19, 19, 23, 23],
  [24, 8, 8, 10, 16, 16, 16, 16, 20, 20, 24, 24],
  [25, 8, 8, 10, 16, 16, 16, 16, 21, 21, 25, 25],
  [26, 9, 9, 11, 17, 17, 17, 17, 21, 21, 26, 26],
  [27, 9, 9, 11, 17, 17, 17, 17, 22, 22, 27, 27],
  [28, 9, 9, 11, 17, 17, 17, 17, 23, 23, 28, 28],
  [29, 10, 10, 12, 18, 18, 18, 18, 23, 23, 29, 29],
  [30, 10, 10, 12, 18, 18, 18, 18, 24, 24, 30, 30],
  [40, 12, 12, 18, 24, 24, 24, 24, 32, 32, 40, 40],
];

// Column holding the average result, used wherever a roll is not made.
pub const AVERAGE_ROLL: u32 = 7;

// Ways out of 36 to roll at least the index on 2d6.
pub const TWO_D6_AT_LEAST: [u32; 13] = [36, 36, 36, 35, 33, 30, 26, 21, 15, 10, 6, 3, 1];

// Index by Guidance: ArtemisIV, ArtemisV, Apollo
pub const GUIDANCE_CLUSTER_MOD: [i32; 3] = [2, 3, -1];
pub const GUIDANCE_DAMAGE_MULT: [f64; 3] = [1.2, 1.3, 0.8];

pub const NARC_CLUSTER_MOD: i32 = 2;
pub const NARC_DAMAGE_MULT: f64 = 1.2;
pub const AMS_CLUSTER_MOD: i32 = -4;
pub const AMS_DAMAGE_MULT: f64 = 0.6;

// Ammo preference multipliers.
pub const CLUSTER_PREFERENCE: f64 = 1.5;
pub const ARMOR_PIERCING_PREFERENCE: f64 = 1.3;
pub const INFERNO_PREFERENCE: f64 = 1.5;
pub const NARC_PREFERENCE: f64 = 1.5;
pub const LOW_ARMOR_FRACTION: f64 = 0.25;
pub const HOT_TARGET_HEAT: u32 = 10;

#[must_use]
pub fn guidance_cluster_mod(guidance: Guidance) -> i32 {
  GUIDANCE_CLUSTER_MOD[guidance as usize]
}

#[must_use]
pub fn guidance_damage_mult(guidance: Guidance) -> f64 {
  GUIDANCE_DAMAGE_MULT[guidance as usize]
}

#[must_use]
pub fn cluster_row(rack_size: u32) -> Option<&'static ClusterRow> {
  CLUSTER_HITS_TABLE.iter().find(|row| row[0] == rack_size)
}
