//! Sphere layout: deterministic golden-angle placement of gallery tiles.
//!
//! For tile index `i` in `[0, count)`:
//!
//!   y        = 1 - (i / (count - 1)) * 2          sweeps +1 .. -1
//!   r(y)     = sqrt(1 - y^2)
//!   theta    = i * golden_angle                   golden_angle = pi * (3 - sqrt(5))
//!   position = (cos(theta) * r(y), y, sin(theta) * r(y)) * radius
//!
//! Every tile faces the sphere centre with its up axis locked to world +Y, so
//! tiles read upright at any latitude. Image and video references cycle through
//! a small fixed asset pool: slot `n = (i % pool.size) + 1`.
//!
//! Generation is a pure function of `(count, radius, pool)`; repeated calls
//! produce bit-identical positions and rotations.

use glam::{Mat3, Quat, Vec3};
use std::fmt;

/// Base URL of the stock media pool.
pub const DEFAULT_ASSET_BASE_URL: &str =
    "https://raw.githubusercontent.com/CinemaNinja/Spatial-Cinema-Media/main";
/// Number of distinct image/video pairs in the stock pool.
pub const DEFAULT_ASSET_POOL_SIZE: usize = 4;

/// Stable, 0-based tile index within one generation.
pub type TileId = usize;

/// Golden angle in radians, `pi * (3 - sqrt(5))`.
#[inline]
pub fn golden_angle() -> f32 {
    std::f32::consts::PI * (3.0 - 5.0f32.sqrt())
}

/// Identifier of a remote media asset (a plain URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetRef {
    fn from(url: &str) -> Self {
        Self(url.to_owned())
    }
}

impl From<String> for AssetRef {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// A fixed pool of `img{n}.jpg` / `vid{n}.mov` pairs under one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPool {
    pub base_url: String,
    pub size: usize,
}

impl AssetPool {
    pub fn new(base_url: impl Into<String>, size: usize) -> Self {
        debug_assert!(size > 0, "asset pool must hold at least one asset");
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, size }
    }

    /// 1-based pool slot used by tile `id`.
    #[inline]
    pub fn slot(&self, id: TileId) -> usize {
        (id % self.size.max(1)) + 1
    }

    pub fn image_ref(&self, id: TileId) -> AssetRef {
        AssetRef(format!("{}/img{}.jpg", self.base_url, self.slot(id)))
    }

    pub fn video_ref(&self, id: TileId) -> AssetRef {
        AssetRef(format!("{}/vid{}.mov", self.base_url, self.slot(id)))
    }
}

impl Default for AssetPool {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_BASE_URL, DEFAULT_ASSET_POOL_SIZE)
    }
}

/// One generated tile. Immutable value data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    /// Resting location on the sphere surface.
    pub position: Vec3,
    /// Faces the sphere centre, up locked to world +Y.
    pub rest_rotation: Quat,
    pub image: AssetRef,
    pub video: AssetRef,
}

/// Rotation whose local +Z axis points from `from` toward `target` and whose
/// local +Y stays as close to `up` as possible (no roll).
///
/// When the view direction is parallel to `up` (the two pole tiles of a
/// layout), world +Z is used as the reference up instead.
pub fn facing(from: Vec3, target: Vec3, up: Vec3) -> Quat {
    let forward = (target - from).normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let mut right = up.cross(forward);
    if right.length_squared() < 1e-8 {
        right = Vec3::Z.cross(forward);
    }
    let right = right.normalize();
    let true_up = forward.cross(right);

    Quat::from_mat3(&Mat3::from_cols(right, true_up, forward)).normalize()
}

/// Generates `count` tiles on a sphere of `radius` using the stock asset pool.
///
/// `count >= 2` and `radius > 0` are caller obligations.
pub fn generate(count: usize, radius: f32) -> Vec<Tile> {
    generate_with_pool(count, radius, &AssetPool::default())
}

/// Generates `count` tiles on a sphere of `radius`, cycling through `pool`.
pub fn generate_with_pool(count: usize, radius: f32, pool: &AssetPool) -> Vec<Tile> {
    debug_assert!(count >= 2, "layout needs at least two tiles, got {count}");
    debug_assert!(radius > 0.0, "layout radius must be positive, got {radius}");

    let phi = golden_angle();
    let last = count.saturating_sub(1).max(1) as f32;

    (0..count)
        .map(|i| {
            let y = 1.0 - (i as f32 / last) * 2.0;
            let radius_at_y = (1.0 - y * y).max(0.0).sqrt();
            let theta = phi * i as f32;

            let position = Vec3::new(theta.cos() * radius_at_y, y, theta.sin() * radius_at_y) * radius;

            Tile {
                id: i,
                position,
                rest_rotation: facing(position, Vec3::ZERO, Vec3::Y),
                image: pool.image_ref(i),
                video: pool.video_ref(i),
            }
        })
        .collect()
}

/// Tiles generated once and looked up by id afterwards.
#[derive(Debug, Clone)]
pub struct Layout {
    radius: f32,
    pool: AssetPool,
    tiles: Vec<Tile>,
}

impl Layout {
    pub fn new(count: usize, radius: f32) -> Self {
        Self::with_pool(count, radius, AssetPool::default())
    }

    pub fn with_pool(count: usize, radius: f32, pool: AssetPool) -> Self {
        let tiles = generate_with_pool(count, radius, &pool);
        Self { radius, pool, tiles }
    }

    #[inline]
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn pool(&self) -> &AssetPool {
        &self.pool
    }
}
