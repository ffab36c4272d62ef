// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod article;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod related;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::article::Article;
pub use crate::cache::{CacheKey, ContentFetchCache};
pub use crate::config::AppConfig;
pub use crate::error::FetchError;
pub use crate::pool::ArticlePool;
pub use crate::related::{RelatedArticleFinder, RelatedArticles};
pub use crate::service::{RelatedService, ServiceOptions};

use crate::config::ContentMode;
use crate::content::{DynContentSource, FixtureSource, GraphqlSource};
use crate::related::HotReloadWeights;

/// Full application router from `config/related.toml` and the environment.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load()?;
    build_app(&cfg, metrics::enabled_from_env())
}

/// Wire source, cache, service and routes for an already loaded config.
pub fn build_app(cfg: &AppConfig, with_metrics: bool) -> anyhow::Result<Router> {
    let source: DynContentSource = match cfg.content.mode {
        ContentMode::Graphql => Arc::new(
            GraphqlSource::new(
                &cfg.content.endpoint,
                cfg.content.connect_timeout(),
                cfg.content.fetch_timeout(),
            )
            .context("building content API client")?,
        ),
        ContentMode::Fixture => Arc::new(FixtureSource::from_path(&cfg.content.fixture_path)?),
    };
    info!(
        target: "related",
        source = source.name(),
        pool_size = cfg.content.pool_size,
        "content source ready"
    );

    let cache_options = cfg.cache_options();
    let service = RelatedService::new(
        source,
        Arc::new(ContentFetchCache::new(cache_options)),
        ServiceOptions::from_config(cfg),
    )
    .with_hot_weights(HotReloadWeights::new(Some(&cfg.related.weights_path)));

    let mut router = api::router(AppState::new(service));
    if with_metrics {
        let m = metrics::Metrics::init(&cache_options)?;
        router = router.merge(m.router());
    }
    Ok(router)
}
