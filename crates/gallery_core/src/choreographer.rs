//! Focus and dismiss sequences for individual tiles.
//!
//! A transition is two independent per-tile sequences (dismiss the outgoing
//! tile, focus the incoming one) that run concurrently as separate tasks.
//! Each sequence owns a cancellation token; starting a new sequence on a tile
//! cancels the old one, which then stops at its next waypoint boundary without
//! running any remaining steps.
//!
//! Every side effect a sequence has on shared state (issuing a motion,
//! binding a material, handing over the video surface) goes through
//! `Choreographer::commit`, which re-checks under the state lock that the
//! sequence is still the tile's current one.
//!
//! ```text
//! focus:    stop ─► lift (linear, flip) ─► arrive (ease-out) + bind video ─► Focused
//! dismiss:  stop ─► lift (linear, twist) ─► settle (ease-out) ─► restore image ─► wobble ─► Resting
//! ```

use crate::animator::{guarded, Animator, Preempted};
use crate::cache::ResourceCache;
use crate::config::{ChoreographyConfig, CinemaStage};
use crate::easing::Easing;
use crate::scene::{Material, Motion, Scene};
use crate::surface::SharedVideoSurface;
use crate::transform::Transform;
use glam::Quat;
use parking_lot::Mutex;
use sphere_layout::{Layout, Tile, TileId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    Focus,
    Dismiss,
}

/// Where a tile is in its focus lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TilePhase {
    #[default]
    Resting,
    Transitioning(SequenceKind),
    Focused,
}

/// A selection change: dismiss `previous`, focus `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    pub previous: Option<TileId>,
    pub next: Option<TileId>,
}

impl Transition {
    pub fn new(previous: Option<TileId>, next: Option<TileId>) -> Self {
        Self { previous, next }
    }
}

/// Sequence counters, for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChoreographyStats {
    pub focus_started: u64,
    pub dismiss_started: u64,
    pub completed: u64,
    pub preempted: u64,
    /// Dismissals that fell back to the placeholder material
    pub image_fallbacks: u64,
}

struct Running {
    seq: u64,
    kind: SequenceKind,
    token: CancellationToken,
}

#[derive(Default)]
struct TileSlot {
    phase: TilePhase,
    running: Option<Running>,
}

#[derive(Default)]
struct State {
    tiles: HashMap<TileId, TileSlot>,
    surface: SharedVideoSurface,
    next_seq: u64,
    stats: ChoreographyStats,
}

impl State {
    fn finish(&mut self, tile: TileId, phase: TilePhase) {
        if let Some(slot) = self.tiles.get_mut(&tile) {
            slot.phase = phase;
            slot.running = None;
        }
        self.stats.completed += 1;
    }
}

struct Inner {
    layout: Arc<Layout>,
    animator: Animator,
    cache: ResourceCache,
    config: ChoreographyConfig,
    stage: CinemaStage,
    state: Mutex<State>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Cheap-to-clone handle driving tile sequences against one scene.
#[derive(Clone)]
pub struct Choreographer {
    inner: Arc<Inner>,
}

impl Choreographer {
    pub fn new(
        layout: Arc<Layout>,
        scene: Arc<dyn Scene>,
        cache: ResourceCache,
        config: ChoreographyConfig,
        stage: CinemaStage,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                layout,
                animator: Animator::new(scene),
                cache,
                config,
                stage,
                state: Mutex::new(State::default()),
                tasks: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Starts the dismiss and focus sequences of `transition` concurrently.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle(&self, transition: Transition) {
        tracing::debug!(previous = ?transition.previous, next = ?transition.next, "Handling transition");
        if let Some(previous) = transition.previous {
            self.dismiss(previous);
        }
        if let Some(next) = transition.next {
            self.focus(next);
        }
    }

    /// Moves `tile` to the cinema stage and binds the shared video surface to it.
    pub fn focus(&self, tile: TileId) -> bool {
        self.start(tile, SequenceKind::Focus)
    }

    /// Returns `tile` to its rest slot and restores its still image.
    pub fn dismiss(&self, tile: TileId) -> bool {
        self.start(tile, SequenceKind::Dismiss)
    }

    /// `None` for ids outside the layout.
    pub fn phase(&self, tile: TileId) -> Option<TilePhase> {
        self.inner.layout.get(tile)?;
        let state = self.inner.state.lock();
        Some(state.tiles.get(&tile).map_or(TilePhase::Resting, |slot| slot.phase))
    }

    pub fn surface_holder(&self) -> Option<TileId> {
        self.inner.state.lock().surface.holder()
    }

    pub fn stats(&self) -> ChoreographyStats {
        self.inner.state.lock().stats
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.inner.layout
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.inner.cache
    }

    pub fn scene(&self) -> &Arc<dyn Scene> {
        self.inner.animator.scene()
    }

    /// Tiles with a sequence in flight.
    pub fn active(&self) -> Vec<TileId> {
        let state = self.inner.state.lock();
        let mut tiles: Vec<TileId> = state
            .tiles
            .iter()
            .filter(|(_, slot)| slot.running.is_some())
            .map(|(&tile, _)| tile)
            .collect();
        tiles.sort_unstable();
        tiles
    }

    /// Waits until no sequence is running, including ones started meanwhile.
    pub async fn wait_idle(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.inner.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            for outcome in futures::future::join_all(tasks).await {
                if let Err(e) = outcome {
                    tracing::error!(error = %e, "Tile sequence task failed");
                }
            }
        }
    }

    /// Cancels every running sequence and releases the video surface; its last
    /// holder falls back to the placeholder. Later focus/dismiss requests are
    /// ignored.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let mut state = self.inner.state.lock();
        for slot in state.tiles.values_mut() {
            if let Some(running) = slot.running.take() {
                running.token.cancel();
            }
        }
        let released = state.surface.release_any();
        if let Some(tile) = released {
            self.inner.animator.scene().bind_material(tile, Material::Placeholder);
        }
        tracing::info!(released = ?released, "Choreographer shut down");
    }

    fn start(&self, tile: TileId, kind: SequenceKind) -> bool {
        if self.inner.shutdown.is_cancelled() {
            tracing::debug!(tile, ?kind, "Sequence after shutdown ignored");
            return false;
        }
        let Some(def) = self.inner.layout.get(tile).cloned() else {
            tracing::debug!(tile, ?kind, "Sequence for unknown tile ignored");
            return false;
        };

        let (seq, token) = {
            let mut state = self.inner.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            match kind {
                SequenceKind::Focus => state.stats.focus_started += 1,
                SequenceKind::Dismiss => state.stats.dismiss_started += 1,
            }

            let slot = state.tiles.entry(tile).or_default();
            let preempted = slot.running.take().map(|running| {
                running.token.cancel();
                running.kind
            });
            let token = self.inner.shutdown.child_token();
            slot.running = Some(Running {
                seq,
                kind,
                token: token.clone(),
            });
            slot.phase = TilePhase::Transitioning(kind);
            if let Some(previous) = preempted {
                state.stats.preempted += 1;
                tracing::debug!(tile, seq, ?previous, "Preempting running sequence");
            }

            self.inner.animator.stop(tile);
            (seq, token)
        };

        tracing::info!(tile, seq, ?kind, "Starting tile sequence");
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = match kind {
                SequenceKind::Focus => this.run_focus(&def, seq, &token).await,
                SequenceKind::Dismiss => this.run_dismiss(&def, seq, &token).await,
            };
            match outcome {
                Ok(()) => tracing::debug!(tile = def.id, seq, ?kind, "Tile sequence settled"),
                Err(Preempted) => tracing::debug!(tile = def.id, seq, ?kind, "Tile sequence abandoned"),
            }
        });

        let mut tasks = self.inner.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        true
    }

    /// Runs `f` under the state lock if `seq` is still `tile`'s current sequence.
    fn commit<R>(&self, tile: TileId, seq: u64, f: impl FnOnce(&mut State) -> R) -> Result<R, Preempted> {
        let mut state = self.inner.state.lock();
        let current = state
            .tiles
            .get(&tile)
            .and_then(|slot| slot.running.as_ref())
            .map(|running| running.seq);
        if current != Some(seq) {
            return Err(Preempted);
        }
        Ok(f(&mut state))
    }

    async fn run_focus(&self, tile: &Tile, seq: u64, token: &CancellationToken) -> Result<(), Preempted> {
        let config = &self.inner.config;
        let stage = self.inner.stage;
        let animator = &self.inner.animator;
        let id = tile.id;

        let current = animator.current(id).unwrap_or_else(|| Transform::rest(tile));
        let facing_viewer = stage.facing();
        let lift = Transform::new(
            current.translation.lerp(stage.position, 0.5),
            facing_viewer * Quat::from_rotation_x(config.focus_twist),
            config.lift_scale,
        );
        let cinema = stage.transform(config.cinema_scale);

        self.commit(id, seq, |_| {
            animator.issue(id, Motion::new(lift, config.focus_lift, Easing::Linear))
        })?
        .settled(token)
        .await?;

        let arrival = self.commit(id, seq, |state| {
            let waypoint = animator.issue(id, Motion::new(cinema, config.focus_arrive, Easing::EaseOut));
            if let Some(revoked) = state.surface.acquire(id) {
                animator.scene().bind_material(revoked, Material::Placeholder);
                tracing::info!(tile = id, revoked, "Video surface handed over");
            }
            animator.scene().bind_material(id, Material::SharedVideo);
            tracing::debug!(tile = id, handoffs = state.surface.handoffs(), "Video surface bound");
            waypoint
        })?;
        arrival.settled(token).await?;

        self.commit(id, seq, |state| state.finish(id, TilePhase::Focused))
    }

    async fn run_dismiss(&self, tile: &Tile, seq: u64, token: &CancellationToken) -> Result<(), Preempted> {
        let config = &self.inner.config;
        let animator = &self.inner.animator;
        let id = tile.id;

        let rest = Transform::rest(tile);
        let current = animator.current(id).unwrap_or(rest);
        let lift = Transform::new(
            current.translation.lerp(rest.translation, 0.5),
            current.rotation * Quat::from_rotation_x(config.dismiss_twist),
            config.lift_scale,
        );

        self.commit(id, seq, |_| {
            animator.issue(id, Motion::new(lift, config.dismiss_lift, Easing::Linear))
        })?
        .settled(token)
        .await?;

        self.commit(id, seq, |_| {
            animator.issue(id, Motion::new(rest, config.dismiss_settle, Easing::EaseOut))
        })?
        .settled(token)
        .await?;

        let material = match guarded(token, self.inner.cache.fetch(&tile.image)).await? {
            Ok(image) => Material::Image(image),
            Err(e) => {
                tracing::warn!(tile = id, error = %e, "Still image unavailable, using placeholder");
                Material::Placeholder
            }
        };

        self.commit(id, seq, |state| {
            if matches!(material, Material::Placeholder) {
                state.stats.image_fallbacks += 1;
            }
            if state.surface.release(id) {
                tracing::debug!(tile = id, "Video surface released");
            }
            animator.scene().bind_material(id, material);
        })?;

        self.commit(id, seq, |_| {
            animator.issue(
                id,
                Motion::new(rest.with_scale(config.wobble_scale), config.wobble_pop, Easing::EaseOut),
            )
        })?
        .settled(token)
        .await?;

        self.commit(id, seq, |_| {
            animator.issue(id, Motion::new(rest, config.wobble_settle, Easing::EaseInOut))
        })?
        .settled(token)
        .await?;

        self.commit(id, seq, |state| state.finish(id, TilePhase::Resting))
    }
}
