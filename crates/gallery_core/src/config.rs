//! Gallery configuration: layout parameters, choreography timings and the
//! fixed cinema stage.

use crate::error::ConfigError;
use crate::transform::Transform;
use glam::{Quat, Vec3};
use sphere_layout::{facing, AssetPool, Layout};
use std::f32::consts::{FRAC_PI_2, PI};
use std::time::Duration;

/// Timings and scales of the focus, dismiss and landing-wobble sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoreographyConfig {
    pub dismiss_lift: Duration,
    pub dismiss_settle: Duration,
    pub focus_lift: Duration,
    pub focus_arrive: Duration,
    pub wobble_pop: Duration,
    pub wobble_settle: Duration,
    /// Scale at the midpoint of both transitions
    pub lift_scale: f32,
    /// Scale of the focused tile at the cinema position
    pub cinema_scale: f32,
    /// Peak scale of the landing wobble
    pub wobble_scale: f32,
    /// Twist about local X composed at the dismiss midpoint (radians)
    pub dismiss_twist: f32,
    /// Twist about local X composed at the focus midpoint (radians)
    pub focus_twist: f32,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            dismiss_lift: Duration::from_millis(250),
            dismiss_settle: Duration::from_millis(250),
            focus_lift: Duration::from_millis(350),
            focus_arrive: Duration::from_millis(350),
            wobble_pop: Duration::from_millis(100),
            wobble_settle: Duration::from_millis(250),
            lift_scale: 1.5,
            cinema_scale: 2.5,
            wobble_scale: 1.15,
            dismiss_twist: FRAC_PI_2,
            focus_twist: PI,
        }
    }
}

impl ChoreographyConfig {
    /// Upper bound on how long one dismiss sequence takes, wobble included.
    pub fn dismiss_duration(&self) -> Duration {
        self.dismiss_lift + self.dismiss_settle + self.wobble_pop + self.wobble_settle
    }

    pub fn focus_duration(&self) -> Duration {
        self.focus_lift + self.focus_arrive
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("dismiss_lift", self.dismiss_lift),
            ("dismiss_settle", self.dismiss_settle),
            ("focus_lift", self.focus_lift),
            ("focus_arrive", self.focus_arrive),
            ("wobble_pop", self.wobble_pop),
            ("wobble_settle", self.wobble_settle),
        ];
        for (name, duration) in durations {
            if duration.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }

        let scales = [
            ("lift_scale", self.lift_scale),
            ("cinema_scale", self.cinema_scale),
            ("wobble_scale", self.wobble_scale),
        ];
        for (name, value) in scales {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidScale { name, value });
            }
        }
        Ok(())
    }
}

/// Fixed viewing position a focused tile travels to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CinemaStage {
    pub position: Vec3,
    /// Viewer eye-level point the focused tile faces
    pub look_target: Vec3,
}

impl Default for CinemaStage {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, -2.0),
            look_target: Vec3::new(0.0, 1.6, 0.0),
        }
    }
}

impl CinemaStage {
    /// Orientation at the stage: faces the viewer, up locked to world Y.
    pub fn facing(&self) -> Quat {
        facing(self.position, self.look_target, Vec3::Y)
    }

    pub fn transform(&self, scale: f32) -> Transform {
        Transform::new(self.position, self.facing(), scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    pub tile_count: usize,
    pub sphere_radius: f32,
    pub asset_pool: AssetPool,
    /// Per-request timeout of the HTTP asset source
    pub fetch_timeout: Duration,
    pub choreography: ChoreographyConfig,
    pub stage: CinemaStage,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            tile_count: 80,
            sphere_radius: 4.0,
            asset_pool: AssetPool::default(),
            fetch_timeout: Duration::from_secs(15),
            choreography: ChoreographyConfig::default(),
            stage: CinemaStage::default(),
        }
    }
}

impl GalleryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_count < 2 {
            return Err(ConfigError::TooFewTiles(self.tile_count));
        }
        if !(self.sphere_radius.is_finite() && self.sphere_radius > 0.0) {
            return Err(ConfigError::InvalidRadius(self.sphere_radius));
        }
        if self.asset_pool.size == 0 {
            return Err(ConfigError::EmptyAssetPool);
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(self.fetch_timeout));
        }
        self.choreography.validate()
    }

    /// Validates, then builds the tile arena once.
    pub fn layout(&self) -> Result<Layout, ConfigError> {
        self.validate()?;
        Ok(Layout::with_pool(
            self.tile_count,
            self.sphere_radius,
            self.asset_pool.clone(),
        ))
    }
}
