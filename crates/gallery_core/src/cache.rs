//! Coalescing image cache.
//!
//! Maps an asset URL to a decoded image. Concurrent requests for a URL that is
//! already being fetched subscribe to the in-flight fetch instead of issuing
//! another one; everyone observes the single outcome.
//!
//! ```text
//! fetch(url) ─┐                      spawned fetch task
//! fetch(url) ─┼──► slots[url] ─────► source.fetch ─► spawn_blocking(decode)
//! fetch(url) ─┘   Pending(tx)                               │
//!                      ▲                                    │
//!                      └──── broadcast outcome ◄────────────┘
//! ```
//!
//! Successes stay cached for the life of the process. Failures are reported to
//! the waiters and then forgotten, so a later request fetches again.
//!
//! The fetch runs in its own task: a caller that gets cancelled while waiting
//! (e.g. a preempted dismiss sequence) does not abort the fetch for the others.

use crate::error::FetchError;
use crate::source::AssetSource;
use parking_lot::Mutex;
use sphere_layout::AssetRef;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageResource {
    /// Decodes any format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

type Outcome = Result<Arc<ImageResource>, FetchError>;

enum Slot {
    Ready(Arc<ImageResource>),
    Pending(broadcast::Sender<Outcome>),
}

/// Counters for monitoring cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total `fetch` calls
    pub requests: u64,
    /// Served from a completed entry
    pub hits: u64,
    /// Joined a fetch already in flight
    pub coalesced: u64,
    /// Underlying source fetches issued
    pub fetches: u64,
    /// Fetches that ended in a network or decode failure
    pub failures: u64,
}

impl CacheStats {
    /// Fraction of requests that did not trigger a fetch (0.0 to 1.0).
    pub fn saved_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.hits + self.coalesced) as f64 / self.requests as f64
        }
    }
}

struct Inner {
    source: Arc<dyn AssetSource>,
    slots: Mutex<HashMap<AssetRef, Slot>>,
    stats: Mutex<CacheStats>,
}

/// Cheap-to-clone handle to the shared cache.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl ResourceCache {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slots: Mutex::new(HashMap::new()),
                stats: Mutex::new(CacheStats::default()),
            }),
        }
    }

    /// Returns the decoded image for `url`, fetching it at most once at a time.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn fetch(&self, url: &AssetRef) -> Result<Arc<ImageResource>, FetchError> {
        let mut rx = {
            let mut slots = self.inner.slots.lock();
            let mut stats = self.inner.stats.lock();
            stats.requests += 1;

            match slots.get(url) {
                Some(Slot::Ready(image)) => {
                    stats.hits += 1;
                    return Ok(image.clone());
                }
                Some(Slot::Pending(tx)) => {
                    stats.coalesced += 1;
                    tracing::debug!(url = %url, waiters = tx.receiver_count() + 1, "Joining in-flight fetch");
                    tx.subscribe()
                }
                None => {
                    stats.fetches += 1;
                    let (tx, rx) = broadcast::channel(1);
                    slots.insert(url.clone(), Slot::Pending(tx));
                    tracing::debug!(url = %url, in_flight = slots.len(), "Starting fetch");

                    let flight = InFlight {
                        inner: self.inner.clone(),
                        url: url.clone(),
                        done: false,
                    };
                    tokio::spawn(flight.run());
                    rx
                }
            }
        };

        rx.recv().await.unwrap_or_else(|_| {
            Err(FetchError::Abandoned {
                url: url.to_string(),
            })
        })
    }

    /// Completed entry for `url`, without fetching.
    pub fn peek(&self, url: &AssetRef) -> Option<Arc<ImageResource>> {
        match self.inner.slots.lock().get(url) {
            Some(Slot::Ready(image)) => Some(image.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, url: &AssetRef) -> bool {
        self.peek(url).is_some()
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        *self.inner.stats.lock()
    }
}

/// Owns one pending slot until its outcome is published.
///
/// Dropped without completing (panic, runtime shutdown): the slot is removed,
/// which closes the channel and reports `Abandoned` to the waiters.
struct InFlight {
    inner: Arc<Inner>,
    url: AssetRef,
    done: bool,
}

impl InFlight {
    async fn run(mut self) {
        let outcome = self.load().await;
        self.complete(outcome);
    }

    async fn load(&self) -> Outcome {
        let bytes = self.inner.source.fetch(&self.url).await?;

        let decoded = tokio::task::spawn_blocking(move || ImageResource::decode(&bytes)).await;
        match decoded {
            Ok(Ok(image)) => Ok(Arc::new(image)),
            Ok(Err(e)) => Err(FetchError::Decode {
                url: self.url.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => Err(FetchError::Decode {
                url: self.url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn complete(&mut self, outcome: Outcome) {
        self.done = true;

        let tx = {
            let mut slots = self.inner.slots.lock();
            let tx = match slots.remove(&self.url) {
                Some(Slot::Pending(tx)) => Some(tx),
                Some(ready @ Slot::Ready(_)) => {
                    slots.insert(self.url.clone(), ready);
                    None
                }
                None => None,
            };

            match &outcome {
                Ok(image) => {
                    slots.insert(self.url.clone(), Slot::Ready(image.clone()));
                    tracing::debug!(
                        url = %self.url,
                        width = image.width,
                        height = image.height,
                        "Cached image"
                    );
                }
                Err(e) => {
                    self.inner.stats.lock().failures += 1;
                    tracing::warn!(url = %self.url, error = %e, "Image fetch failed");
                }
            }
            tx
        };

        if let Some(tx) = tx {
            // Waiters may have been cancelled; nobody listening is fine.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.done {
            let mut slots = self.inner.slots.lock();
            if matches!(slots.get(&self.url), Some(Slot::Pending(_))) {
                slots.remove(&self.url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf.into_inner())
    }

    struct StaticSource {
        body: Bytes,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetSource for StaticSource {
        async fn fetch(&self, _url: &AssetRef) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn decodes_and_memoizes() {
        let source = Arc::new(StaticSource {
            body: png_bytes(3, 2),
            calls: AtomicUsize::new(0),
        });
        let cache = ResourceCache::new(source.clone());
        let url = AssetRef::from("http://assets.test/img1.jpg");

        let first = cache.fetch(&url).await.unwrap();
        assert_eq!((first.width, first.height), (3, 2));
        assert_eq!(first.rgba.len(), 3 * 2 * 4);
        assert_eq!(&first.rgba[..4], &[10, 20, 30, 255]);

        let second = cache.fetch(&url).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.fetches, 1);
        assert!((stats.saved_ratio() - 0.5).abs() < 1e-9);
        assert!(cache.contains(&url));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_failure() {
        let source = Arc::new(StaticSource {
            body: Bytes::from_static(b"definitely not an image"),
            calls: AtomicUsize::new(0),
        });
        let cache = ResourceCache::new(source);
        let url = AssetRef::from("http://assets.test/broken.jpg");

        let err = cache.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert_eq!(err.url(), url.as_str());
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight(), 0);
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn empty_stats_ratio_is_zero() {
        assert_eq!(CacheStats::default().saved_ratio(), 0.0);
    }
}
