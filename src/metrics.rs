use anyhow::Context;
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::cache::CacheOptions;

pub const ENV_METRICS: &str = "RELATED_METRICS";

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub fn enabled_from_env() -> bool {
    std::env::var(ENV_METRICS).is_ok_and(|v| v == "1")
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// static cache settings as gauges.
    pub fn init(cache: &CacheOptions) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();

        gauge!("fetch_cache_timeout_ms").set(cache.fetch_timeout.as_millis() as f64);
        if let Some(max) = cache.max_entries {
            gauge!("fetch_cache_max_entries").set(max as f64);
        }

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
