//! Trending: a featured slice of the *already related* set, picked by a
//! secondary signal that is independent of relatedness.
//!
//! The signal is a trait so a real engagement metric can replace the default
//! recency proxy without touching callers.

use std::collections::HashMap;

use crate::article::Article;

pub trait TrendingSignal: Send + Sync {
    /// Higher is more trending. Must be deterministic for a given article.
    fn signal(&self, article: &Article) -> f64;
}

/// Newer articles trend higher. Default when no engagement data exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencySignal;

impl TrendingSignal for RecencySignal {
    fn signal(&self, article: &Article) -> f64 {
        article.publish_date.timestamp() as f64
    }
}

/// Externally supplied engagement numbers (views, shares, …) keyed by id.
/// Unknown articles score zero.
#[derive(Debug, Clone, Default)]
pub struct EngagementSignal {
    scores: HashMap<String, f64>,
}

impl EngagementSignal {
    pub fn new(scores: HashMap<String, f64>) -> Self {
        Self { scores }
    }
}

impl TrendingSignal for EngagementSignal {
    fn signal(&self, article: &Article) -> f64 {
        self.scores.get(&article.id).copied().unwrap_or(0.0)
    }
}

/// Result of splitting a ranked list. The two groups never share an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendingSplit {
    pub trending: Vec<Article>,
    pub related: Vec<Article>,
}

pub struct TrendingSelector {
    signal: Box<dyn TrendingSignal>,
}

impl Default for TrendingSelector {
    fn default() -> Self {
        Self::new(RecencySignal)
    }
}

impl std::fmt::Debug for TrendingSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendingSelector").finish_non_exhaustive()
    }
}

impl TrendingSelector {
    pub fn new(signal: impl TrendingSignal + 'static) -> Self {
        Self {
            signal: Box::new(signal),
        }
    }

    /// Pick up to `count` items of `ranked` as trending (signal desc, ties by
    /// rank position); the rest stay in `related` in rank order.
    pub fn select_trending(&self, ranked: Vec<Article>, count: usize) -> TrendingSplit {
        let mut order: Vec<(usize, f64)> = ranked
            .iter()
            .enumerate()
            .map(|(i, a)| (i, self.signal.signal(a)))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut slots: Vec<Option<Article>> = ranked.into_iter().map(Some).collect();
        let trending = order
            .into_iter()
            .take(count)
            .filter_map(|(i, _)| slots[i].take())
            .collect();
        // picked slots are now empty
        let related = slots.into_iter().flatten().collect();

        TrendingSplit { trending, related }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::fixtures::*;

    fn ids(v: &[Article]) -> Vec<&str> {
        v.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn recency_picks_newest_and_keeps_rank_order_for_the_rest() {
        let ranked = vec![
            article("r1", 3, &[], &[]),
            article("r2", 9, &[], &[]),
            article("r3", 5, &[], &[]),
            article("r4", 7, &[], &[]),
        ];
        let split = TrendingSelector::default().select_trending(ranked, 2);
        assert_eq!(ids(&split.trending), vec!["r2", "r4"]);
        assert_eq!(ids(&split.related), vec!["r1", "r3"]);
    }

    #[test]
    fn engagement_signal_substitutes_without_caller_changes() {
        let ranked = vec![
            article("a", 9, &[], &[]),
            article("b", 1, &[], &[]),
            article("c", 5, &[], &[]),
        ];
        let views = HashMap::from([("b".to_string(), 900.0), ("c".to_string(), 10.0)]);
        let split = TrendingSelector::new(EngagementSignal::new(views)).select_trending(ranked, 1);
        assert_eq!(ids(&split.trending), vec!["b"]);
        assert_eq!(ids(&split.related), vec!["a", "c"]);
    }

    #[test]
    fn count_larger_than_input_takes_everything() {
        let ranked = vec![article("a", 1, &[], &[])];
        let split = TrendingSelector::default().select_trending(ranked, 5);
        assert_eq!(ids(&split.trending), vec!["a"]);
        assert!(split.related.is_empty());

        let none = TrendingSelector::default().select_trending(Vec::new(), 2);
        assert_eq!(none, TrendingSplit::default());
    }
}
