//! Seam to the external renderer.
//!
//! The choreographer never touches the scene graph directly: it issues timed
//! motions and material bindings through [`Scene`], and reads back the
//! current (possibly mid-flight) transform when a new sequence starts.

use crate::cache::ImageResource;
use crate::easing::Easing;
use crate::transform::Transform;
use sphere_layout::TileId;
use std::sync::Arc;
use std::time::Duration;

/// A timed move toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub target: Transform,
    pub duration: Duration,
    pub easing: Easing,
}

impl Motion {
    pub fn new(target: Transform, duration: Duration, easing: Easing) -> Self {
        Self {
            target,
            duration,
            easing,
        }
    }
}

/// What a tile's surface shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Decoded still image for the tile.
    Image(Arc<ImageResource>),
    /// Neutral fallback, used before images load and when a fetch fails.
    Placeholder,
    /// The process-wide video surface.
    SharedVideo,
}

impl Material {
    pub fn kind(&self) -> MaterialKind {
        match self {
            Self::Image(_) => MaterialKind::Image,
            Self::Placeholder => MaterialKind::Placeholder,
            Self::SharedVideo => MaterialKind::SharedVideo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Image,
    Placeholder,
    SharedVideo,
}

/// Renderer operations the choreographer depends on.
///
/// Implementations are called from the interaction thread and must not block.
pub trait Scene: Send + Sync {
    /// Current transform of `tile`, sampled mid-motion if one is running.
    fn transform(&self, tile: TileId) -> Option<Transform>;

    /// Starts moving `tile` from wherever it is now, replacing any motion in flight.
    fn move_to(&self, tile: TileId, motion: Motion);

    /// Freezes `tile` at its current sampled transform.
    fn stop_animations(&self, tile: TileId);

    fn bind_material(&self, tile: TileId, material: Material);
}
