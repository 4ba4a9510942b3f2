use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use gallery_core::{CacheStats, ChoreographyStats, TapOutcome};
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus collectors for one gallery session.
pub struct GalleryMetrics {
    pub registry: Registry,
    /// Taps delivered to the controller.
    pub taps_total: IntCounter,
    /// Taps that produced no transition, by reason.
    pub taps_ignored_total: IntCounterVec,
    pub focus_sequences_total: IntCounter,
    pub dismiss_sequences_total: IntCounter,
    pub sequences_preempted_total: IntCounter,
    pub image_fallbacks_total: IntCounter,
    pub cache_requests_total: IntCounter,
    pub cache_fetches_total: IntCounter,
    pub cache_coalesced_total: IntCounter,
    pub cache_failures_total: IntCounter,
    /// Share of image requests served without a new download.
    pub cache_saved_ratio: Gauge,
}

impl GalleryMetrics {
    pub fn new(session_id: &str) -> Result<Self, prometheus::Error> {
        let mut labels = std::collections::HashMap::new();
        labels.insert("session".to_owned(), session_id.to_owned());
        let registry = Registry::new_custom(Some("sphere_cinema".into()), Some(labels))?;

        macro_rules! reg {
            ($metric:expr) => {{
                let collector = $metric?;
                registry.register(Box::new(collector.clone()))?;
                collector
            }};
        }

        Ok(Self {
            taps_total: reg!(IntCounter::new("taps_total", "Taps delivered to the controller")),
            taps_ignored_total: reg!(IntCounterVec::new(
                Opts::new("taps_ignored_total", "Taps that caused no transition"),
                &["reason"]
            )),
            focus_sequences_total: reg!(IntCounter::new("focus_sequences_total", "Focus sequences started")),
            dismiss_sequences_total: reg!(IntCounter::new("dismiss_sequences_total", "Dismiss sequences started")),
            sequences_preempted_total: reg!(IntCounter::new(
                "sequences_preempted_total",
                "Sequences abandoned because a newer one claimed the tile"
            )),
            image_fallbacks_total: reg!(IntCounter::new(
                "image_fallbacks_total",
                "Dismissals that ended on the placeholder material"
            )),
            cache_requests_total: reg!(IntCounter::new("cache_requests_total", "Image cache lookups")),
            cache_fetches_total: reg!(IntCounter::new("cache_fetches_total", "Image downloads issued")),
            cache_coalesced_total: reg!(IntCounter::new(
                "cache_coalesced_total",
                "Lookups that joined a download already in flight"
            )),
            cache_failures_total: reg!(IntCounter::new("cache_failures_total", "Failed image downloads")),
            cache_saved_ratio: reg!(Gauge::new(
                "cache_saved_ratio",
                "Fraction of lookups served without a new download"
            )),
            registry,
        })
    }

    /// Serves the registry on `/metrics`.
    pub fn router(&self) -> Router {
        let registry = self.registry.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move {
                    let mut buffer = Vec::new();
                    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
                        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
                    }
                    String::from_utf8_lossy(&buffer).into_owned().into_response()
                }
            }),
        )
    }

    pub fn record_tap(&self, outcome: &TapOutcome) {
        self.taps_total.inc();
        if let TapOutcome::Ignored(reason) = outcome {
            let reason = format!("{reason:?}");
            self.taps_ignored_total.with_label_values(&[reason.as_str()]).inc();
        }
    }

    /// Catches the counters up with cumulative stats snapshots.
    pub fn observe(&self, cache: CacheStats, choreography: ChoreographyStats) {
        advance(&self.cache_requests_total, cache.requests);
        advance(&self.cache_fetches_total, cache.fetches);
        advance(&self.cache_coalesced_total, cache.coalesced);
        advance(&self.cache_failures_total, cache.failures);
        self.cache_saved_ratio.set(cache.saved_ratio());

        advance(&self.focus_sequences_total, choreography.focus_started);
        advance(&self.dismiss_sequences_total, choreography.dismiss_started);
        advance(&self.sequences_preempted_total, choreography.preempted);
        advance(&self.image_fallbacks_total, choreography.image_fallbacks);
    }
}

fn advance(counter: &IntCounter, total: u64) {
    counter.inc_by(total.saturating_sub(counter.get()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_core::IgnoreReason;

    #[test]
    fn records_taps_by_outcome() {
        let metrics = GalleryMetrics::new("test").unwrap();
        metrics.record_tap(&TapOutcome::Ignored(IgnoreReason::IdleBackdrop));
        metrics.record_tap(&TapOutcome::Transition(gallery_core::Transition::new(None, Some(3))));

        assert_eq!(metrics.taps_total.get(), 2);
        assert_eq!(
            metrics
                .taps_ignored_total
                .with_label_values(&["IdleBackdrop"])
                .get(),
            1
        );
    }

    #[test]
    fn mirrors_cache_stats() {
        let metrics = GalleryMetrics::new("test").unwrap();
        let cache = CacheStats {
            requests: 80,
            hits: 0,
            coalesced: 76,
            fetches: 4,
            failures: 1,
        };
        metrics.observe(cache, ChoreographyStats::default());

        assert_eq!(metrics.cache_fetches_total.get(), 4);
        assert_eq!(metrics.cache_coalesced_total.get(), 76);
        assert!((metrics.cache_saved_ratio.get() - 0.95).abs() < 1e-9);

        let families = metrics.registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "sphere_cinema_cache_fetches_total"));
    }

    #[test]
    fn repeated_snapshots_only_add_the_difference() {
        let metrics = GalleryMetrics::new("test").unwrap();
        let mut stats = ChoreographyStats {
            focus_started: 3,
            ..ChoreographyStats::default()
        };
        metrics.observe(CacheStats::default(), stats);
        metrics.observe(CacheStats::default(), stats);
        assert_eq!(metrics.focus_sequences_total.get(), 3);

        stats.focus_started = 5;
        stats.preempted = 1;
        metrics.observe(CacheStats::default(), stats);
        assert_eq!(metrics.focus_sequences_total.get(), 5);
        assert_eq!(metrics.sequences_preempted_total.get(), 1);
        assert_eq!(metrics.dismiss_sequences_total.get(), 0);

        let body = {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer).unwrap();
            String::from_utf8(buffer).unwrap()
        };
        assert!(body.contains("# TYPE sphere_cinema_focus_sequences_total counter"));
    }
}
