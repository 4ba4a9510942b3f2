use async_trait::async_trait;
use bytes::Bytes;
use gallery_core::sim::{PlayerCall, SceneEvent, SimulatedPlayer, SimulatedScene};
use gallery_core::{
    AssetRef, AssetSource, Choreographer, ChoreographyConfig, CinemaStage, Easing, FetchError, HitTarget,
    IgnoreReason, Layout, Material, MaterialKind, ResourceCache, Scene, SelectionController, SelectionState,
    TapEvent, TapOutcome, TilePhase, TileId, Transform, VideoPlayer,
};
use glam::Quat;
use std::f32::consts::{FRAC_PI_2, PI};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct PngSource {
    body: Bytes,
    calls: AtomicUsize,
}

impl PngSource {
    fn new() -> Arc<Self> {
        let img = image::RgbaImage::from_pixel(8, 6, image::Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        Arc::new(Self {
            body: Bytes::from(buf.into_inner()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AssetSource for PngSource {
    async fn fetch(&self, _url: &AssetRef) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

struct Gallery {
    layout: Arc<Layout>,
    scene: Arc<SimulatedScene>,
    player: Arc<SimulatedPlayer>,
    controller: SelectionController,
}

impl Gallery {
    fn new(count: usize, radius: f32) -> Self {
        let layout = Arc::new(Layout::new(count, radius));
        let scene = Arc::new(SimulatedScene::from_layout(&layout));
        let player = Arc::new(SimulatedPlayer::new());
        let choreographer = Choreographer::new(
            layout.clone(),
            scene.clone(),
            ResourceCache::new(PngSource::new()),
            ChoreographyConfig::default(),
            CinemaStage::default(),
        );
        let controller = SelectionController::new(choreographer, player.clone());
        Self {
            layout,
            scene,
            player,
            controller,
        }
    }

    fn tap(&mut self, target: HitTarget) -> TapOutcome {
        self.controller.handle_tap(TapEvent::ended(target))
    }

    async fn settle(&self) {
        self.controller.choreographer().wait_idle().await;
    }

    fn rest(&self, tile: TileId) -> Transform {
        Transform::rest(self.layout.get(tile).unwrap())
    }

    fn cinema() -> Transform {
        CinemaStage::default().transform(ChoreographyConfig::default().cinema_scale)
    }

    fn first_move(&self, tile: TileId) -> Option<Transform> {
        self.scene.events_for(tile).into_iter().find_map(|event| match event {
            SceneEvent::Moved { target, .. } => Some(target),
            _ => None,
        })
    }

    fn claimed_surface(&self, tile: TileId) -> bool {
        self.scene.events_for(tile).iter().any(|event| {
            matches!(
                event,
                SceneEvent::Bound {
                    material: MaterialKind::SharedVideo,
                    ..
                }
            )
        })
    }
}

#[tokio::test(start_paused = true)]
async fn full_round_trip_on_tile_seven() {
    let mut gallery = Gallery::new(80, 4.0);

    gallery.tap(HitTarget::Tile(7));
    gallery.settle().await;

    let focused = gallery.scene.transform(7).unwrap();
    assert!(focused.approx_eq(&Gallery::cinema(), 1e-4));
    assert_eq!(gallery.controller.state(), SelectionState::Focused(7));
    assert_eq!(gallery.controller.choreographer().surface_holder(), Some(7));
    assert_eq!(gallery.scene.material_kind(7), Some(MaterialKind::SharedVideo));
    assert_eq!(gallery.controller.choreographer().phase(7), Some(TilePhase::Focused));
    assert!(gallery.player.is_playing());
    assert_eq!(gallery.player.source(), Some(gallery.layout.get(7).unwrap().video.clone()));

    gallery.tap(HitTarget::Backdrop);
    gallery.settle().await;

    let rested = gallery.scene.transform(7).unwrap();
    assert!(rested.approx_eq(&gallery.rest(7), 1e-4));
    assert!(rested.scale.abs_diff_eq(glam::Vec3::ONE, 1e-5));
    match gallery.scene.material(7) {
        Some(Material::Image(image)) => assert_eq!((image.width, image.height), (8, 6)),
        other => panic!("expected still image, got {other:?}"),
    }
    assert_eq!(gallery.controller.choreographer().surface_holder(), None);
    assert_eq!(gallery.controller.choreographer().phase(7), Some(TilePhase::Resting));
    assert_eq!(gallery.controller.state(), SelectionState::Idle);
    assert!(!gallery.player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn dismiss_runs_lift_settle_and_wobble() {
    let mut gallery = Gallery::new(80, 4.0);
    gallery.tap(HitTarget::Tile(7));
    gallery.settle().await;
    gallery.scene.clear_history();

    gallery.tap(HitTarget::Backdrop);
    gallery.settle().await;

    let steps: Vec<(Duration, Easing)> = gallery
        .scene
        .events_for(7)
        .into_iter()
        .filter_map(|event| match event {
            SceneEvent::Moved { duration, easing, .. } => Some((duration, easing)),
            _ => None,
        })
        .collect();
    assert_eq!(
        steps,
        vec![
            (Duration::from_millis(250), Easing::Linear),
            (Duration::from_millis(250), Easing::EaseOut),
            (Duration::from_millis(100), Easing::EaseOut),
            (Duration::from_millis(250), Easing::EaseInOut),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn lift_waypoints_sit_halfway_with_a_twist() {
    let mut gallery = Gallery::new(80, 4.0);
    let stage = CinemaStage::default();
    let rest = gallery.rest(7);

    gallery.tap(HitTarget::Tile(7));
    gallery.settle().await;
    let lift = gallery.first_move(7).unwrap();
    let expected = Transform::new(
        rest.translation.lerp(stage.position, 0.5),
        stage.facing() * Quat::from_rotation_x(PI),
        1.5,
    );
    assert!(lift.approx_eq(&expected, 1e-4), "focus lift {lift:?}");
    assert!(!lift.approx_eq(&Transform::new(lift.translation, stage.facing(), 1.5), 1e-3));

    gallery.scene.clear_history();
    gallery.tap(HitTarget::Backdrop);
    gallery.settle().await;
    let lift = gallery.first_move(7).unwrap();
    let cinema = Gallery::cinema();
    let expected = Transform::new(
        cinema.translation.lerp(rest.translation, 0.5),
        cinema.rotation * Quat::from_rotation_x(FRAC_PI_2),
        1.5,
    );
    assert!(lift.approx_eq(&expected, 1e-4), "dismiss lift {lift:?}");
}

#[tokio::test(start_paused = true)]
async fn only_the_last_focused_tile_holds_the_surface() {
    let mut gallery = Gallery::new(30, 4.0);

    for tile in [2, 11, 23] {
        gallery.tap(HitTarget::Tile(tile));
        gallery.settle().await;
    }

    let choreographer = gallery.controller.choreographer();
    assert_eq!(choreographer.surface_holder(), Some(23));
    assert_eq!(gallery.scene.tiles_showing(MaterialKind::SharedVideo), vec![23]);
    for tile in [2, 11] {
        assert_eq!(choreographer.phase(tile), Some(TilePhase::Resting));
        assert_eq!(gallery.scene.material_kind(tile), Some(MaterialKind::Image));
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_reselection_abandons_the_first_focus() {
    let mut gallery = Gallery::new(80, 4.0);

    gallery.tap(HitTarget::Tile(3));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let outcome = gallery.tap(HitTarget::Tile(9));
    assert_eq!(
        outcome,
        TapOutcome::Transition(gallery_core::Transition::new(Some(3), Some(9)))
    );
    gallery.settle().await;

    assert!(!gallery.claimed_surface(3));
    let reached_cinema = gallery.scene.events_for(3).iter().any(|event| {
        matches!(event, SceneEvent::Moved { target, .. } if target.approx_eq(&Gallery::cinema(), 1e-4))
    });
    assert!(!reached_cinema);
    assert!(gallery.scene.transform(3).unwrap().approx_eq(&gallery.rest(3), 1e-4));

    let choreographer = gallery.controller.choreographer();
    assert_eq!(choreographer.surface_holder(), Some(9));
    assert_eq!(choreographer.phase(9), Some(TilePhase::Focused));
    assert!(gallery.scene.transform(9).unwrap().approx_eq(&Gallery::cinema(), 1e-4));
    assert!(choreographer.stats().preempted >= 1);
}

#[tokio::test(start_paused = true)]
async fn preempted_dismiss_skips_its_wobble() {
    let mut gallery = Gallery::new(20, 4.0);
    gallery.tap(HitTarget::Tile(5));
    gallery.settle().await;

    gallery.tap(HitTarget::Backdrop);
    tokio::time::sleep(Duration::from_millis(300)).await;
    gallery.tap(HitTarget::Tile(5));
    gallery.settle().await;

    let wobbled = gallery.scene.events_for(5).iter().any(|event| {
        matches!(event, SceneEvent::Moved { target, .. } if (target.scale.x - 1.15).abs() < 1e-6)
    });
    assert!(!wobbled);
    assert_eq!(gallery.controller.choreographer().phase(5), Some(TilePhase::Focused));
    assert_eq!(gallery.scene.material_kind(5), Some(MaterialKind::SharedVideo));

    // same clip as before: resumed, not reloaded
    let loads = gallery
        .player
        .calls()
        .iter()
        .filter(|call| matches!(call, PlayerCall::Load(_)))
        .count();
    assert_eq!(loads, 1);
    assert!(gallery.player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn backdrop_tap_while_idle_changes_nothing() {
    let mut gallery = Gallery::new(80, 4.0);

    assert_eq!(
        gallery.tap(HitTarget::Backdrop),
        TapOutcome::Ignored(IgnoreReason::IdleBackdrop)
    );
    gallery.settle().await;

    assert_eq!(gallery.controller.state(), SelectionState::Idle);
    assert!(gallery.scene.history().is_empty());
    assert!(gallery.player.calls().is_empty());
    assert!(gallery.controller.choreographer().active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_tile_id_is_ignored() {
    let mut gallery = Gallery::new(10, 4.0);
    assert_eq!(
        gallery.tap(HitTarget::Tile(10)),
        TapOutcome::Ignored(IgnoreReason::UnknownTile)
    );
    assert!(gallery.scene.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_leaves_no_tile_showing_video() {
    let mut gallery = Gallery::new(20, 4.0);
    gallery.tap(HitTarget::Tile(4));
    gallery.settle().await;
    assert_eq!(gallery.scene.material_kind(4), Some(MaterialKind::SharedVideo));

    gallery.controller.shutdown().await;

    assert!(gallery.scene.tiles_showing(MaterialKind::SharedVideo).is_empty());
    assert_eq!(gallery.scene.material_kind(4), Some(MaterialKind::Placeholder));
    assert_eq!(gallery.controller.choreographer().surface_holder(), None);
}
