//! Waypoint scheduling on top of [`Scene`].
//!
//! Issuing a motion returns a [`Waypoint`] whose completion is an awaitable
//! event. Every await races the owning sequence's cancellation token, so a
//! preempted sequence stops at the next waypoint boundary instead of running
//! its remaining steps.

use crate::scene::{Motion, Scene};
use crate::transform::Transform;
use sphere_layout::TileId;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// The sequence's tile was claimed by a newer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sequence preempted")]
pub struct Preempted;

#[derive(Clone)]
pub struct Animator {
    scene: Arc<dyn Scene>,
}

impl Animator {
    pub fn new(scene: Arc<dyn Scene>) -> Self {
        Self { scene }
    }

    /// Hands `motion` to the renderer and returns its completion handle.
    pub fn issue(&self, tile: TileId, motion: Motion) -> Waypoint {
        let deadline = Instant::now() + motion.duration;
        tracing::trace!(
            tile,
            duration_ms = motion.duration.as_millis() as u64,
            easing = ?motion.easing,
            "Issuing waypoint"
        );
        self.scene.move_to(tile, motion);
        Waypoint { tile, deadline }
    }

    #[inline]
    pub fn current(&self, tile: TileId) -> Option<Transform> {
        self.scene.transform(tile)
    }

    #[inline]
    pub fn stop(&self, tile: TileId) {
        self.scene.stop_animations(tile);
    }

    #[inline]
    pub fn scene(&self) -> &Arc<dyn Scene> {
        &self.scene
    }
}

/// A motion in flight.
#[must_use = "a waypoint does nothing unless awaited"]
#[derive(Debug)]
pub struct Waypoint {
    tile: TileId,
    deadline: Instant,
}

impl Waypoint {
    pub fn tile(&self) -> TileId {
        self.tile
    }

    /// Resolves once the motion's duration has elapsed.
    pub async fn settled(self, token: &CancellationToken) -> Result<(), Preempted> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Preempted),
            _ = sleep_until(self.deadline) => Ok(()),
        }
    }
}

/// Runs `fut` unless `token` fires first.
pub async fn guarded<F: Future>(token: &CancellationToken, fut: F) -> Result<F::Output, Preempted> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Preempted),
        out = fut => Ok(out),
    }
}
