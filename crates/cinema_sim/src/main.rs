mod config;
mod input;
mod metrics;

use crate::config::Config;
use crate::input::{parse_line, parse_script, Command};
use crate::metrics::GalleryMetrics;
use anyhow::Context;
use clap::Parser;
use gallery_core::sim::{SimulatedPlayer, SimulatedScene};
use gallery_core::{
    Choreographer, HttpAssetSource, Layout, Material, MaterialKind, ResourceCache, Scene, SelectionController,
    TapEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

const METRICS_REFRESH: Duration = Duration::from_secs(1);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    let config = Config::parse();
    tracing::info!(config = ?config, "Gallery starting with configuration");

    let gallery = config.gallery();
    let layout = Arc::new(gallery.layout().context("Invalid gallery configuration")?);
    let script = config
        .script
        .as_deref()
        .map(parse_script)
        .transpose()
        .context("Failed to parse --script")?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let metrics = Arc::new(GalleryMetrics::new(&session_id).context("Failed to build metrics registry")?);

    let source = HttpAssetSource::new(gallery.fetch_timeout).context("Failed to build HTTP client")?;
    let cache = ResourceCache::new(Arc::new(source));
    let scene = Arc::new(SimulatedScene::from_layout(&layout));
    let player = Arc::new(SimulatedPlayer::new());
    let choreographer = Choreographer::new(
        layout.clone(),
        scene.clone(),
        cache.clone(),
        gallery.choreography.clone(),
        gallery.stage,
    );
    let mut controller = SelectionController::new(choreographer, player);
    tracing::info!(
        session_id,
        tiles = layout.len(),
        radius = layout.radius(),
        "Gallery sphere built"
    );

    // --- 2. Start Metrics Server ---
    let metrics_router = metrics.router();
    let metrics_addr = config.metrics_listen_addr;
    let metrics_server = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(metrics_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(addr = %metrics_addr, error = %e, "Failed to bind metrics listener");
                return;
            }
        };
        tracing::info!(addr = %metrics_addr, "Metrics server started");
        if let Err(e) = axum::serve(listener, metrics_router.into_make_service()).await {
            tracing::error!(error = %e, "Metrics server exited with an error");
        }
    });

    // --- 3. Pre-warm textures ---
    let prewarm = tokio::spawn(prewarm(layout.clone(), cache.clone(), scene.clone()));

    // --- 4. Spawn Input Task ---
    let (tx_commands, mut rx_commands) = mpsc::channel::<Command>(32);
    let input = match script {
        Some(taps) => tokio::spawn(replay(taps, config.tap_interval(), tx_commands)),
        None => tokio::spawn(read_stdin(tx_commands)),
    };

    // --- 5. Main Interaction Loop ---
    let mut refresh = tokio::time::interval(METRICS_REFRESH);
    tracing::info!("Waiting for taps...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received.");
                break;
            },
            command = rx_commands.recv() => match command {
                Some(Command::Tap(target)) => {
                    let outcome = controller.handle_tap(TapEvent::ended(target));
                    tracing::info!(?target, ?outcome, state = ?controller.state(), "Tap handled");
                    metrics.record_tap(&outcome);
                },
                Some(Command::Quit) | None => {
                    tracing::info!("Input finished; letting running sequences settle.");
                    controller.choreographer().wait_idle().await;
                    break;
                },
            },
            _ = refresh.tick() => {
                let choreographer = controller.choreographer();
                metrics.observe(choreographer.cache().stats(), choreographer.stats());
            },
        }
    }

    // --- 6. Shutdown ---
    input.abort();
    prewarm.abort();
    controller.shutdown().await;
    let choreographer = controller.choreographer();
    metrics.observe(choreographer.cache().stats(), choreographer.stats());
    metrics_server.abort();

    tracing::info!(
        cache = ?choreographer.cache().stats(),
        choreography = ?choreographer.stats(),
        "Gallery shut down."
    );
    Ok(())
}

/// Requests every tile's still image concurrently and binds it on arrival.
///
/// Tiles share a small asset pool, so the cache turns this into one download
/// per pool entry.
async fn prewarm(layout: Arc<Layout>, cache: ResourceCache, scene: Arc<SimulatedScene>) {
    let loads = layout.iter().map(|tile| {
        let cache = cache.clone();
        let scene = scene.clone();
        async move {
            match cache.fetch(&tile.image).await {
                Ok(image) => {
                    // A tile focused meanwhile keeps the video surface.
                    if scene.material_kind(tile.id) == Some(MaterialKind::Placeholder) {
                        scene.bind_material(tile.id, Material::Image(image));
                    }
                    true
                }
                Err(e) => {
                    tracing::warn!(tile = tile.id, error = %e, "Initial texture unavailable");
                    false
                }
            }
        }
    });

    let loaded = futures::future::join_all(loads)
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count();
    tracing::info!(loaded, total = layout.len(), stats = ?cache.stats(), "Texture pre-warm finished");
}

async fn replay(taps: Vec<gallery_core::HitTarget>, interval: Duration, tx: mpsc::Sender<Command>) {
    for target in taps {
        tokio::time::sleep(interval).await;
        if tx.send(Command::Tap(target)).await.is_err() {
            return;
        }
    }
    tokio::time::sleep(interval).await;
    let _ = tx.send(Command::Quit).await;
}

async fn read_stdin(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(command) => {
                if tx.send(command).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(input = %line, error = %e, "Ignoring input line"),
        }
    }
    let _ = tx.send(Command::Quit).await;
}
