// src/service.rs
//! Request-path glue: look the current article up, assemble a candidate pool
//! through the fetch cache, and run the finder over it.
//!
//! Nothing here fails towards the page. Fetch errors become an empty pool (or
//! an unknown article) and the page simply renders no related section.

use std::sync::Arc;

use futures::future::join;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::article::Article;
use crate::cache::{CacheKey, ContentFetchCache};
use crate::config::{AppConfig, TtlPolicy};
use crate::content::queries::{
    ARTICLE_BY_SLUG, BREAKING_ARTICLES, CATEGORY_ARTICLES, RECENT_ARTICLES,
};
use crate::content::{DynContentSource, NamedQuery};
use crate::error::FetchError;
use crate::pool::ArticlePool;
use crate::related::{
    FinderOptions, HotReloadWeights, RelatedArticleFinder, RelatedArticles, ScoringWeights,
};

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub ttl: TtlPolicy,
    pub pool_size: u32,
    pub default_limit: usize,
    pub max_limit: usize,
    pub finder: FinderOptions,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ServiceOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            ttl: cfg.cache.ttl,
            pool_size: cfg.content.pool_size,
            default_limit: cfg.related.default_limit,
            max_limit: cfg.related.max_limit,
            finder: cfg.finder_options(),
        }
    }
}

enum Weights {
    Fixed(ScoringWeights),
    HotReload(HotReloadWeights),
}

pub struct RelatedService {
    cache: Arc<ContentFetchCache<Value>>,
    source: DynContentSource,
    weights: Weights,
    options: ServiceOptions,
}

impl RelatedService {
    pub fn new(
        source: DynContentSource,
        cache: Arc<ContentFetchCache<Value>>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            cache,
            source,
            weights: Weights::Fixed(ScoringWeights::default()),
            options,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Weights::Fixed(weights.sanitized());
        self
    }

    /// Re-read weights from disk whenever the file changes.
    pub fn with_hot_weights(mut self, weights: HotReloadWeights) -> Self {
        self.weights = Weights::HotReload(weights);
        self
    }

    pub fn cache(&self) -> &Arc<ContentFetchCache<Value>> {
        &self.cache
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    fn weights(&self) -> ScoringWeights {
        match &self.weights {
            Weights::Fixed(w) => *w,
            Weights::HotReload(h) => h.current(),
        }
    }

    /// `None` picks the default; anything above `max_limit` is capped.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.options.default_limit)
            .min(self.options.max_limit)
    }

    /// Run `query` through the cache under its class TTL.
    async fn fetch(&self, query: NamedQuery, variables: Value) -> Result<Arc<Value>, FetchError> {
        let key = CacheKey::derive(query.document, &variables);
        let ttl = self.options.ttl.ttl_for(query.kind);
        let source = self.source.clone();
        self.cache
            .get_or_fetch(&key, ttl, move || async move {
                source.fetch_content(query.document, &variables).await
            })
            .await
    }

    pub async fn current_article(&self, slug: &str) -> Result<Option<Article>, FetchError> {
        let resp = self.fetch(ARTICLE_BY_SLUG, json!({ "slug": slug })).await?;
        let pool = ArticlePool::from_response(&resp);
        Ok(pool.find_by_slug(slug).cloned())
    }

    /// Recent articles plus the current primary category's, merged. A failed
    /// fetch contributes nothing.
    pub async fn candidate_pool(&self, current: &Article) -> ArticlePool {
        let first = self.options.pool_size;
        let recent = self.fetch(RECENT_ARTICLES, json!({ "first": first }));

        let (recent, category) = match category_filter_id(current) {
            Some(category_id) => {
                let by_category = self.fetch(
                    CATEGORY_ARTICLES,
                    json!({ "first": first, "categoryId": category_id }),
                );
                let (r, c) = join(recent, by_category).await;
                (r, Some(c))
            }
            None => (recent.await, None),
        };

        let mut pool = pool_or_empty(RECENT_ARTICLES.name, recent);
        if let Some(c) = category {
            pool = pool.merge(pool_or_empty(CATEGORY_ARTICLES.name, c));
        }
        pool
    }

    pub async fn related_for(&self, current: &Article, limit: Option<usize>) -> RelatedArticles {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            return RelatedArticles::empty();
        }
        let pool = self.candidate_pool(current).await;
        let finder = RelatedArticleFinder::new(self.weights(), self.options.finder);
        finder.find(current, pool.articles(), limit)
    }

    /// Newest breaking stories, cached under the short breaking TTL.
    pub async fn breaking(&self, limit: Option<usize>) -> Vec<Article> {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            return Vec::new();
        }
        let res = self
            .fetch(BREAKING_ARTICLES, json!({ "first": limit }))
            .await;
        let mut articles = pool_or_empty(BREAKING_ARTICLES.name, res).into_articles();
        articles.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        articles.truncate(limit);
        articles
    }

    pub async fn related_for_slug(&self, slug: &str, limit: Option<usize>) -> RelatedArticles {
        match self.current_article(slug).await {
            Ok(Some(current)) => self.related_for(&current, limit).await,
            Ok(None) => {
                debug!(target: "related", slug, "unknown slug");
                RelatedArticles::empty()
            }
            Err(e) => {
                warn!(target: "related", slug, error = %e, "current article unavailable");
                RelatedArticles::empty()
            }
        }
    }
}

/// Numeric database id of the primary category, as the category filter
/// expects. Without one the category half of the pool is skipped.
fn category_filter_id(current: &Article) -> Option<i64> {
    let cat = current.primary_category()?;
    if cat.database_id.is_none() {
        debug!(target: "related", category = %cat.id, "primary category has no database id");
    }
    cat.database_id
}

fn pool_or_empty(query: &'static str, res: Result<Arc<Value>, FetchError>) -> ArticlePool {
    match res {
        Ok(resp) => {
            let (pool, dropped) = ArticlePool::from_response_with_report(&resp);
            if dropped > 0 {
                debug!(target: "pool", query, dropped, "malformed records dropped");
            }
            pool
        }
        Err(e) => {
            warn!(target: "related", query, error = %e, "candidate fetch failed; using empty pool");
            ArticlePool::empty()
        }
    }
}
