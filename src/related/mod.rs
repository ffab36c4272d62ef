// src/related/mod.rs
//! Related-content selection entry: scores the pool against the current
//! article, then either splits the ranking into trending/related or falls
//! back to looser criteria.
//!
//! Order:
//! 1) Score + rank (`scoring`), self excluded, recency-only matches excluded
//! 2) Drop near-duplicate titles (`dedup`), then truncate to `limit`
//! 3) Non-empty → split into trending/related (`trending`)
//! 4) Empty → fallback chain (`fallback`) over the pool minus copies of the
//!    current story; the result goes to `related`
//!
//! Any candidate sharing the primary category passes the relatedness gate in
//! step 1, so through `find` the chain always resolves at `GlobalRecent` or
//! empty. `SamePrimaryCategory` only fires for callers that run a
//! `FallbackResolver` on its own.

pub mod dedup;
pub mod fallback;
pub mod scoring;
pub mod trending;
pub mod weights;

use metrics::counter;
use serde::Serialize;
use tracing::debug;

use crate::article::Article;

// Re-export convenient types.
pub use crate::related::fallback::{FallbackOutcome, FallbackResolver, FallbackStrategy};
pub use crate::related::scoring::{RelatedArticleScorer, ScoreBreakdown};
pub use crate::related::trending::{
    EngagementSignal, RecencySignal, TrendingSelector, TrendingSignal, TrendingSplit,
};
pub use crate::related::weights::{HotReloadWeights, ScoringWeights};

pub const DEFAULT_TRENDING_COUNT: usize = 2;

/// Which path produced a `RelatedArticles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Ranked,
    Fallback(FallbackStrategy),
    Empty,
}

impl ResultOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultOrigin::Ranked => "ranked",
            ResultOrigin::Fallback(FallbackStrategy::SamePrimaryCategory) => "same_primary_category",
            ResultOrigin::Fallback(FallbackStrategy::GlobalRecent) => "global_recent",
            ResultOrigin::Empty => "empty",
        }
    }
}

/// What the page layer renders. Empty means "render no section".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedArticles {
    pub trending: Vec<Article>,
    pub related: Vec<Article>,
    #[serde(skip)]
    pub origin: ResultOrigin,
}

impl RelatedArticles {
    pub fn empty() -> Self {
        Self {
            trending: Vec::new(),
            related: Vec::new(),
            origin: ResultOrigin::Empty,
        }
    }

    pub fn len(&self) -> usize {
        self.trending.len() + self.related.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trending first, then related.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.trending.iter().chain(self.related.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderOptions {
    pub trending_count: usize,
    /// `None` disables near-duplicate suppression.
    pub duplicate_title_similarity: Option<f32>,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            trending_count: DEFAULT_TRENDING_COUNT,
            duplicate_title_similarity: Some(dedup::DEFAULT_TITLE_SIMILARITY),
        }
    }
}

#[derive(Debug, Default)]
pub struct RelatedArticleFinder {
    scorer: RelatedArticleScorer,
    trending: TrendingSelector,
    fallback: FallbackResolver,
    options: FinderOptions,
}

impl RelatedArticleFinder {
    pub fn new(weights: ScoringWeights, options: FinderOptions) -> Self {
        Self {
            scorer: RelatedArticleScorer::new(weights),
            trending: TrendingSelector::default(),
            fallback: FallbackResolver::default(),
            options,
        }
    }

    pub fn with_trending_selector(mut self, selector: TrendingSelector) -> Self {
        self.trending = selector;
        self
    }

    pub fn with_fallback(mut self, resolver: FallbackResolver) -> Self {
        self.fallback = resolver;
        self
    }

    pub fn scorer(&self) -> &RelatedArticleScorer {
        &self.scorer
    }

    pub fn options(&self) -> FinderOptions {
        self.options
    }

    /// `|trending| + |related| <= limit`; the two never overlap and never
    /// contain `current`.
    ///
    /// A non-empty ranking is always used as is. The fallback chain only sees
    /// a pool with nothing in the current primary category, so its first
    /// step never matches here.
    pub fn find(&self, current: &Article, pool: &[Article], limit: usize) -> RelatedArticles {
        if limit == 0 {
            return RelatedArticles::empty();
        }

        let mut ranked = self.scorer.ranked_candidates(current, pool);
        if let Some(threshold) = self.options.duplicate_title_similarity {
            ranked = dedup::drop_near_duplicates(current, ranked, threshold);
        }
        let ranked: Vec<Article> = ranked
            .into_iter()
            .take(limit)
            .map(|s| s.article.clone())
            .collect();

        let out = if ranked.is_empty() {
            let outcome = match self.options.duplicate_title_similarity {
                Some(t) => {
                    let distinct: Vec<Article> = pool
                        .iter()
                        .filter(|a| !dedup::is_near_duplicate(current, a, t))
                        .cloned()
                        .collect();
                    self.fallback.fallback(current, &distinct, limit)
                }
                None => self.fallback.fallback(current, pool, limit),
            };
            let FallbackOutcome { strategy, articles } = outcome;
            let origin = strategy.map_or(ResultOrigin::Empty, ResultOrigin::Fallback);
            counter!("related_fallback_total", "origin" => origin.as_str()).increment(1);
            RelatedArticles {
                trending: Vec::new(),
                related: articles,
                origin,
            }
        } else {
            let TrendingSplit { trending, related } = self
                .trending
                .select_trending(ranked, self.options.trending_count.min(limit));
            RelatedArticles {
                trending,
                related,
                origin: ResultOrigin::Ranked,
            }
        };

        debug!(
            target: "related",
            current = %current.id,
            pool = pool.len(),
            origin = out.origin.as_str(),
            trending = out.trending.len(),
            related = out.related.len(),
            "related articles selected"
        );
        out
    }
}
