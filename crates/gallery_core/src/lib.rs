//! Selection choreography for a spherical media-tile gallery.
//!
//! Tiles rest on a sphere (see `sphere_layout`). Tapping one flips it over to
//! a fixed cinema position where it shows the single shared video surface;
//! tapping the backdrop or another tile sends it back to its slot, restores
//! its still image from the coalescing [`ResourceCache`] and plays a short
//! landing wobble.
//!
//! The renderer and the video decoder are external: the crate drives them
//! through the [`Scene`] and [`VideoPlayer`] traits. [`sim`] provides
//! in-memory implementations of both.

pub mod animator;
pub mod cache;
pub mod choreographer;
pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod scene;
pub mod sim;
pub mod source;
pub mod surface;
pub mod transform;
pub mod video;

pub use cache::{CacheStats, ImageResource, ResourceCache};
pub use choreographer::{Choreographer, ChoreographyStats, SequenceKind, TilePhase, Transition};
pub use config::{ChoreographyConfig, CinemaStage, GalleryConfig};
pub use controller::{HitTarget, IgnoreReason, SelectionController, SelectionState, TapEvent, TapOutcome, TapPhase};
pub use easing::Easing;
pub use error::{ConfigError, FetchError};
pub use scene::{Material, MaterialKind, Motion, Scene};
pub use source::{AssetSource, HttpAssetSource};
pub use surface::SharedVideoSurface;
pub use transform::Transform;
pub use video::{FeedStart, VideoFeed, VideoPlayer};

pub use sphere_layout::{AssetPool, AssetRef, Layout, Tile, TileId};
