//! Fallback chain used when ranking finds nothing related.
//!
//! Strategies are tried in order; the first non-empty result wins. When all
//! of them come back empty the caller renders no related section at all.

use serde::Serialize;

use crate::article::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Most recent articles sharing the current article's first category.
    SamePrimaryCategory,
    /// Most recent articles regardless of category.
    GlobalRecent,
}

impl FallbackStrategy {
    pub const CHAIN: [FallbackStrategy; 2] = [
        FallbackStrategy::SamePrimaryCategory,
        FallbackStrategy::GlobalRecent,
    ];

    /// Run this single strategy. The current article is always excluded.
    pub fn apply(&self, current: &Article, pool: &[Article], limit: usize) -> Vec<Article> {
        let primary = current.primary_category().map(|c| c.id.as_str());
        let mut picked: Vec<&Article> = pool
            .iter()
            .filter(|a| a.id != current.id)
            .filter(|a| match self {
                FallbackStrategy::SamePrimaryCategory => {
                    primary.is_some_and(|id| a.primary_category().is_some_and(|c| c.id == id))
                }
                FallbackStrategy::GlobalRecent => true,
            })
            .collect();
        picked.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        picked.into_iter().take(limit).cloned().collect()
    }
}

/// Which step of the chain produced the result.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome {
    /// `None` means every strategy came back empty.
    pub strategy: Option<FallbackStrategy>,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    chain: Vec<FallbackStrategy>,
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self {
            chain: FallbackStrategy::CHAIN.to_vec(),
        }
    }
}

impl FallbackResolver {
    /// Custom chain, e.g. to disable the global step on section pages.
    pub fn with_chain(chain: Vec<FallbackStrategy>) -> Self {
        Self { chain }
    }

    pub fn fallback(&self, current: &Article, pool: &[Article], limit: usize) -> FallbackOutcome {
        if limit > 0 {
            for strategy in &self.chain {
                let articles = strategy.apply(current, pool, limit);
                if !articles.is_empty() {
                    return FallbackOutcome {
                        strategy: Some(*strategy),
                        articles,
                    };
                }
            }
        }
        FallbackOutcome {
            strategy: None,
            articles: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::fixtures::*;

    #[test]
    fn same_primary_category_matches_on_first_category_only() {
        let cur = article("cur", 10, &["politics"], &[]);
        let pool = vec![
            article("a", 3, &["sports", "politics"], &[]),
            article("b", 4, &["politics"], &[]),
            article("c", 9, &["politics", "world"], &[]),
        ];
        let got = FallbackStrategy::SamePrimaryCategory.apply(&cur, &pool, 5);
        let ids: Vec<_> = got.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn global_recent_is_used_when_category_is_empty() {
        let cur = article("cur", 10, &["politics"], &[]);
        let pool = vec![
            article("old", 1, &["sports"], &[]),
            article("new", 8, &["culture"], &[]),
            cur.clone(),
        ];
        let out = FallbackResolver::default().fallback(&cur, &pool, 1);
        assert_eq!(out.strategy, Some(FallbackStrategy::GlobalRecent));
        assert_eq!(out.articles.len(), 1);
        assert_eq!(out.articles[0].id, "new");
    }

    #[test]
    fn uncategorized_current_skips_to_global() {
        let cur = article("cur", 10, &[], &[]);
        let pool = vec![article("a", 3, &[], &[])];
        let out = FallbackResolver::default().fallback(&cur, &pool, 3);
        assert_eq!(out.strategy, Some(FallbackStrategy::GlobalRecent));
    }

    #[test]
    fn only_current_in_pool_is_empty_not_error() {
        let cur = article("cur", 10, &["politics"], &[]);
        let out = FallbackResolver::default().fallback(&cur, std::slice::from_ref(&cur), 4);
        assert_eq!(out.strategy, None);
        assert!(out.articles.is_empty());
    }

    #[test]
    fn custom_chain_can_stop_early() {
        let cur = article("cur", 10, &["politics"], &[]);
        let pool = vec![article("a", 3, &["sports"], &[])];
        let out = FallbackResolver::with_chain(vec![FallbackStrategy::SamePrimaryCategory])
            .fallback(&cur, &pool, 3);
        assert!(out.articles.is_empty());
    }
}
