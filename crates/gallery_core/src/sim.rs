//! In-memory renderer and video player.
//!
//! `SimulatedScene` evaluates motions analytically against the Tokio clock,
//! so a paused test runtime (or the headless driver) can observe mid-flight
//! transforms without a frame loop. Every call is appended to a history log.

use crate::easing::Easing;
use crate::scene::{Material, MaterialKind, Motion, Scene};
use crate::transform::Transform;
use crate::video::VideoPlayer;
use dashmap::DashMap;
use parking_lot::Mutex;
use sphere_layout::{AssetRef, Layout, TileId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// One renderer call, as recorded by [`SimulatedScene`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Moved {
        tile: TileId,
        target: Transform,
        duration: Duration,
        easing: Easing,
    },
    Stopped {
        tile: TileId,
    },
    Bound {
        tile: TileId,
        material: MaterialKind,
    },
}

impl SceneEvent {
    pub fn tile(&self) -> TileId {
        match self {
            Self::Moved { tile, .. } | Self::Stopped { tile } | Self::Bound { tile, .. } => *tile,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveMotion {
    from: Transform,
    motion: Motion,
    started: Instant,
}

impl ActiveMotion {
    fn sample(&self, now: Instant) -> Transform {
        let elapsed = now.saturating_duration_since(self.started);
        let t = if self.motion.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f32() / self.motion.duration.as_secs_f32()
        };
        self.from.lerp(&self.motion.target, self.motion.easing.apply(t))
    }
}

#[derive(Debug, Clone)]
struct Node {
    base: Transform,
    active: Option<ActiveMotion>,
    material: Material,
}

impl Node {
    fn sample(&self, now: Instant) -> Transform {
        self.active
            .as_ref()
            .map_or(self.base, |active| active.sample(now))
    }
}

#[derive(Default)]
pub struct SimulatedScene {
    nodes: DashMap<TileId, Node>,
    history: Mutex<Vec<SceneEvent>>,
}

impl SimulatedScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tile at its rest transform with the placeholder material.
    pub fn from_layout(layout: &Layout) -> Self {
        let scene = Self::new();
        for tile in layout.iter() {
            scene.insert(tile.id, Transform::rest(tile), Material::Placeholder);
        }
        scene
    }

    /// Adds (or resets) a tile entity. Not recorded in the history.
    pub fn insert(&self, tile: TileId, transform: Transform, material: Material) {
        self.nodes.insert(
            tile,
            Node {
                base: transform,
                active: None,
                material,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn material(&self, tile: TileId) -> Option<Material> {
        self.nodes.get(&tile).map(|node| node.material.clone())
    }

    pub fn material_kind(&self, tile: TileId) -> Option<MaterialKind> {
        self.nodes.get(&tile).map(|node| node.material.kind())
    }

    /// Tiles currently showing `kind`, in ascending id order.
    pub fn tiles_showing(&self, kind: MaterialKind) -> Vec<TileId> {
        let mut tiles: Vec<TileId> = self
            .nodes
            .iter()
            .filter(|entry| entry.material.kind() == kind)
            .map(|entry| *entry.key())
            .collect();
        tiles.sort_unstable();
        tiles
    }

    pub fn history(&self) -> Vec<SceneEvent> {
        self.history.lock().clone()
    }

    pub fn events_for(&self, tile: TileId) -> Vec<SceneEvent> {
        self.history
            .lock()
            .iter()
            .filter(|event| event.tile() == tile)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    fn record(&self, event: SceneEvent) {
        self.history.lock().push(event);
    }
}

impl Scene for SimulatedScene {
    fn transform(&self, tile: TileId) -> Option<Transform> {
        let now = Instant::now();
        self.nodes.get(&tile).map(|node| node.sample(now))
    }

    fn move_to(&self, tile: TileId, motion: Motion) {
        let now = Instant::now();
        let Some(mut node) = self.nodes.get_mut(&tile) else {
            tracing::debug!(tile, "Move for unknown scene node ignored");
            return;
        };
        let from = node.sample(now);
        node.base = from;
        node.active = Some(ActiveMotion {
            from,
            motion,
            started: now,
        });
        drop(node);

        self.record(SceneEvent::Moved {
            tile,
            target: motion.target,
            duration: motion.duration,
            easing: motion.easing,
        });
    }

    fn stop_animations(&self, tile: TileId) {
        let now = Instant::now();
        if let Some(mut node) = self.nodes.get_mut(&tile) {
            node.base = node.sample(now);
            node.active = None;
        }
        self.record(SceneEvent::Stopped { tile });
    }

    fn bind_material(&self, tile: TileId, material: Material) {
        let kind = material.kind();
        match self.nodes.get_mut(&tile) {
            Some(mut node) => node.material = material,
            None => {
                tracing::debug!(tile, "Bind for unknown scene node ignored");
                return;
            }
        }
        self.record(SceneEvent::Bound {
            tile,
            material: kind,
        });
    }
}

/// One call received by [`SimulatedPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Load(AssetRef),
    Play,
    Pause,
}

/// Video player that only tracks state and logs what it was asked to do.
#[derive(Default)]
pub struct SimulatedPlayer {
    playing: AtomicBool,
    source: Mutex<Option<AssetRef>>,
    calls: Mutex<Vec<PlayerCall>>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().clone()
    }

    pub fn source(&self) -> Option<AssetRef> {
        self.source.lock().clone()
    }
}

impl VideoPlayer for SimulatedPlayer {
    fn load_source(&self, url: &AssetRef) {
        tracing::info!(source = %url, "Player loading source");
        *self.source.lock() = Some(url.clone());
        self.calls.lock().push(PlayerCall::Load(url.clone()));
    }

    fn play(&self) {
        tracing::info!("Player playing");
        self.playing.store(true, Ordering::SeqCst);
        self.calls.lock().push(PlayerCall::Play);
    }

    fn pause(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            tracing::info!("Player paused");
        }
        self.calls.lock().push(PlayerCall::Pause);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
