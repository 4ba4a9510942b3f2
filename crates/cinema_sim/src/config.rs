use clap::Parser;
use gallery_core::{AssetPool, GalleryConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// `cinema_sim` - headless driver for the spherical cinema gallery.
///
/// Builds the tile sphere against a simulated renderer, streams still images
/// from the asset pool and replays taps either from `--script` or from stdin.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Number of tiles on the sphere.
    #[arg(long, env = "GALLERY_TILE_COUNT", default_value_t = 80)]
    pub tile_count: usize,

    /// Sphere radius in metres.
    #[arg(long, env = "GALLERY_SPHERE_RADIUS", default_value_t = 4.0)]
    pub sphere_radius: f32,

    /// Base URL of the `img{n}.jpg` / `vid{n}.mov` asset pool.
    #[arg(long, env = "GALLERY_ASSET_BASE_URL", default_value = sphere_layout::DEFAULT_ASSET_BASE_URL)]
    pub asset_base_url: String,

    /// Number of image/video pairs in the pool.
    #[arg(long, env = "GALLERY_ASSET_POOL_SIZE", default_value_t = sphere_layout::DEFAULT_ASSET_POOL_SIZE)]
    pub asset_pool_size: usize,

    /// Per-request timeout for image downloads, in seconds.
    #[arg(long, env = "GALLERY_FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Listen address of the Prometheus `/metrics` endpoint.
    #[arg(long, env = "GALLERY_METRICS_LISTEN_ADDR", default_value = "127.0.0.1:9464")]
    pub metrics_listen_addr: SocketAddr,

    /// Comma-separated taps to replay, e.g. `7,backdrop,3,9`.
    ///
    /// Without a script, taps are read from stdin one per line.
    #[arg(long, env = "GALLERY_SCRIPT")]
    pub script: Option<String>,

    /// Delay between scripted taps, in milliseconds.
    #[arg(long, env = "GALLERY_TAP_INTERVAL_MS", default_value_t = 1500)]
    pub tap_interval_ms: u64,
}

impl Config {
    pub fn gallery(&self) -> GalleryConfig {
        GalleryConfig {
            tile_count: self.tile_count,
            sphere_radius: self.sphere_radius,
            asset_pool: AssetPool {
                base_url: self.asset_base_url.trim_end_matches('/').to_owned(),
                size: self.asset_pool_size,
            },
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            ..GalleryConfig::default()
        }
    }

    pub fn tap_interval(&self) -> Duration {
        Duration::from_millis(self.tap_interval_ms)
    }
}
