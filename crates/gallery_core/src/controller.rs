//! Tap handling: turns hit-test results into transitions and keeps the video
//! feed in step with the selection.

use crate::choreographer::{Choreographer, Transition};
use crate::video::{VideoFeed, VideoPlayer};
use sphere_layout::TileId;
use std::sync::Arc;

/// What a tap landed on, as resolved by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Tile(TileId),
    /// Anything that is not a tile.
    Backdrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapPhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapEvent {
    pub target: HitTarget,
    pub phase: TapPhase,
}

impl TapEvent {
    /// A completed tap on `target`.
    pub fn ended(target: HitTarget) -> Self {
        Self {
            target,
            phase: TapPhase::Ended,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Focused(TileId),
}

impl SelectionState {
    pub fn focused(&self) -> Option<TileId> {
        match self {
            Self::Idle => None,
            Self::Focused(tile) => Some(*tile),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Only `TapPhase::Ended` selects.
    NotEnded,
    AlreadyFocused,
    /// Id outside the layout, e.g. a stale hit after re-layout.
    UnknownTile,
    IdleBackdrop,
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Transition(Transition),
    Ignored(IgnoreReason),
}

/// Owns the selection state and the shared video feed.
///
/// Lives on the interaction thread; every method takes `&mut self`.
pub struct SelectionController {
    choreographer: Choreographer,
    feed: VideoFeed,
    state: SelectionState,
    closed: bool,
}

impl SelectionController {
    pub fn new(choreographer: Choreographer, player: Arc<dyn VideoPlayer>) -> Self {
        Self {
            choreographer,
            feed: VideoFeed::new(player),
            state: SelectionState::Idle,
            closed: false,
        }
    }

    pub fn handle_tap(&mut self, event: TapEvent) -> TapOutcome {
        if event.phase != TapPhase::Ended {
            return TapOutcome::Ignored(IgnoreReason::NotEnded);
        }
        match event.target {
            HitTarget::Tile(tile) => self.select(tile),
            HitTarget::Backdrop => self.deselect(),
        }
    }

    /// Focuses `tile`, dismissing whatever was focused before.
    pub fn select(&mut self, tile: TileId) -> TapOutcome {
        if self.closed {
            return TapOutcome::Ignored(IgnoreReason::ShutDown);
        }
        let Some(video) = self.choreographer.layout().get(tile).map(|t| t.video.clone()) else {
            tracing::debug!(tile, "Tap on unknown tile ignored");
            return TapOutcome::Ignored(IgnoreReason::UnknownTile);
        };
        if self.state == SelectionState::Focused(tile) {
            tracing::debug!(tile, "Tap on focused tile ignored");
            return TapOutcome::Ignored(IgnoreReason::AlreadyFocused);
        }

        let transition = Transition::new(self.state.focused(), Some(tile));
        self.state = SelectionState::Focused(tile);
        self.choreographer.handle(transition);

        let feed = self.feed.start(&video);
        tracing::info!(tile, previous = ?transition.previous, ?feed, "Tile selected");
        TapOutcome::Transition(transition)
    }

    /// Dismisses the focused tile, if any, and pauses playback.
    pub fn deselect(&mut self) -> TapOutcome {
        if self.closed {
            return TapOutcome::Ignored(IgnoreReason::ShutDown);
        }
        let Some(previous) = self.state.focused() else {
            return TapOutcome::Ignored(IgnoreReason::IdleBackdrop);
        };

        let transition = Transition::new(Some(previous), None);
        self.state = SelectionState::Idle;
        self.choreographer.handle(transition);
        self.feed.pause();

        tracing::info!(tile = previous, "Tile deselected");
        TapOutcome::Transition(transition)
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn choreographer(&self) -> &Choreographer {
        &self.choreographer
    }

    pub fn feed(&self) -> &VideoFeed {
        &self.feed
    }

    /// Pauses playback, cancels every running sequence and waits for them to stop.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.feed.pause();
        self.choreographer.shutdown();
        self.choreographer.wait_idle().await;
        self.state = SelectionState::Idle;
    }
}
