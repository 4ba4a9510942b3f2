//! Playback control for the one underlying video feed.

use sphere_layout::AssetRef;
use std::sync::Arc;

/// External video playback collaborator. Owns the decode pipeline.
pub trait VideoPlayer: Send + Sync {
    fn load_source(&self, url: &AssetRef);
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
}

/// What [`VideoFeed::start`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStart {
    /// A different clip was loaded and started.
    Loaded,
    /// Same clip, was paused, now playing again.
    Resumed,
    /// Same clip, already playing.
    AlreadyPlaying,
}

/// Remembers the loaded source so refocusing the same clip resumes it
/// instead of reloading it.
pub struct VideoFeed {
    player: Arc<dyn VideoPlayer>,
    current: Option<AssetRef>,
}

impl VideoFeed {
    pub fn new(player: Arc<dyn VideoPlayer>) -> Self {
        Self {
            player,
            current: None,
        }
    }

    pub fn start(&mut self, url: &AssetRef) -> FeedStart {
        if self.current.as_ref() == Some(url) {
            if self.player.is_playing() {
                return FeedStart::AlreadyPlaying;
            }
            self.player.play();
            tracing::debug!(source = %url, "Resumed video feed");
            return FeedStart::Resumed;
        }

        self.player.pause();
        self.player.load_source(url);
        self.current = Some(url.clone());
        self.player.play();
        tracing::debug!(source = %url, "Loaded video feed");
        FeedStart::Loaded
    }

    pub fn pause(&self) {
        self.player.pause();
    }

    pub fn current_source(&self) -> Option<&AssetRef> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PlayerCall, SimulatedPlayer};

    #[test]
    fn new_source_is_loaded_then_played() {
        let player = Arc::new(SimulatedPlayer::new());
        let mut feed = VideoFeed::new(player.clone());
        let clip = AssetRef::from("http://media.test/vid1.mov");

        assert_eq!(feed.start(&clip), FeedStart::Loaded);
        assert_eq!(
            player.calls(),
            vec![PlayerCall::Pause, PlayerCall::Load(clip.clone()), PlayerCall::Play]
        );
        assert_eq!(feed.current_source(), Some(&clip));
        assert!(feed.is_playing());
    }

    #[test]
    fn same_source_resumes_without_reload() {
        let player = Arc::new(SimulatedPlayer::new());
        let mut feed = VideoFeed::new(player.clone());
        let clip = AssetRef::from("http://media.test/vid2.mov");

        feed.start(&clip);
        assert_eq!(feed.start(&clip), FeedStart::AlreadyPlaying);
        feed.pause();
        assert_eq!(feed.start(&clip), FeedStart::Resumed);

        let loads = player
            .calls()
            .iter()
            .filter(|c| matches!(c, PlayerCall::Load(_)))
            .count();
        assert_eq!(loads, 1);
        assert!(player.is_playing());
    }

    #[test]
    fn switching_source_reloads() {
        let player = Arc::new(SimulatedPlayer::new());
        let mut feed = VideoFeed::new(player.clone());
        let a = AssetRef::from("http://media.test/vid1.mov");
        let b = AssetRef::from("http://media.test/vid3.mov");

        feed.start(&a);
        assert_eq!(feed.start(&b), FeedStart::Loaded);
        assert_eq!(player.source(), Some(b));
    }
}
