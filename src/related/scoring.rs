//! Relatedness scoring between the article being viewed and a candidate.
//!
//! Every signal is normalized into [0, 1] before weighting:
//! - `primary_category` : 1 when the candidate carries the current article's
//!   primary category (in any position)
//! - `secondary_category`: other shared categories, saturating at 2
//! - `tags`              : `1 - 0.5^n` over shared tags, saturating at n = 4
//! - `recency`           : `0.5^(Δhours / half_life)` on publish-date distance
//! - `same_author`       : 1 when both authors are known and equal
//!
//! Score = Σ weight · signal. A candidate is *related* only when at least one
//! topical signal (category, tag, author) is non-zero; closeness in time alone
//! does not qualify.

use std::cmp::Ordering;

use serde::Serialize;

use super::weights::ScoringWeights;
use crate::article::Article;

pub const TAG_SATURATION: usize = 4;
pub const SECONDARY_CATEGORY_SATURATION: usize = 2;

/// Normalized per-signal values plus the weighted total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub primary_category: f64,
    pub secondary_category: f64,
    pub tags: f64,
    pub recency: f64,
    pub same_author: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    pub fn is_topical(&self) -> bool {
        self.primary_category > 0.0
            || self.secondary_category > 0.0
            || self.tags > 0.0
            || self.same_author > 0.0
    }
}

/// A ranked candidate, borrowed from the pool.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub article: &'a Article,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelatedArticleScorer {
    weights: ScoringWeights,
}

impl RelatedArticleScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: weights.sanitized(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weighted relatedness of `candidate` to `current`.
    ///
    /// Self-exclusion is applied by `rank`, not here.
    pub fn score(&self, current: &Article, candidate: &Article) -> f64 {
        self.breakdown(current, candidate).total
    }

    pub fn breakdown(&self, current: &Article, candidate: &Article) -> ScoreBreakdown {
        let w = &self.weights;
        let primary_id = current.primary_category().map(|c| c.id.as_str());

        let primary_category = match primary_id {
            Some(id) if candidate.has_category(id) => 1.0,
            _ => 0.0,
        };

        let cand_cats = candidate.category_ids();
        let shared_secondary = current
            .category_ids()
            .into_iter()
            .filter(|id| Some(*id) != primary_id && cand_cats.contains(id))
            .count();
        let secondary_category = shared_secondary.min(SECONDARY_CATEGORY_SATURATION) as f64
            / SECONDARY_CATEGORY_SATURATION as f64;

        let cand_tags = candidate.tag_ids();
        let shared_tags = current
            .tag_ids()
            .intersection(&cand_tags)
            .count()
            .min(TAG_SATURATION);
        let tags = 1.0 - 0.5f64.powi(shared_tags as i32);

        let delta_hours = (current.publish_date - candidate.publish_date)
            .num_seconds()
            .unsigned_abs() as f64
            / 3600.0;
        let recency = 0.5f64.powf(delta_hours / w.recency_half_life_hours);

        let same_author = match (current.author_id(), candidate.author_id()) {
            (Some(a), Some(b)) if a == b => 1.0,
            _ => 0.0,
        };

        let total = w.primary_category * primary_category
            + w.secondary_category * secondary_category
            + w.tags * tags
            + w.recency * recency
            + w.same_author * same_author;

        ScoreBreakdown {
            primary_category,
            secondary_category,
            tags,
            recency,
            same_author,
            total,
        }
    }

    /// Every related candidate in final order, without truncation.
    pub fn ranked_candidates<'a>(&self, current: &Article, pool: &'a [Article]) -> Vec<Scored<'a>> {
        let mut scored: Vec<Scored<'a>> = pool
            .iter()
            .filter(|c| c.id != current.id)
            .filter_map(|c| {
                let b = self.breakdown(current, c);
                b.is_topical().then_some(Scored {
                    article: c,
                    score: b.total,
                })
            })
            .collect();
        scored.sort_by(compare_scored);
        scored
    }

    /// Top `limit` related candidates. Empty (never an error) when nothing
    /// but the current article is in the pool.
    pub fn rank(&self, current: &Article, pool: &[Article], limit: usize) -> Vec<Article> {
        self.ranked_candidates(current, pool)
            .into_iter()
            .take(limit)
            .map(|s| s.article.clone())
            .collect()
    }
}

/// Score desc, then newer publish date, then id asc.
pub fn compare_scored(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.article.publish_date.cmp(&a.article.publish_date))
        .then_with(|| a.article.id.cmp(&b.article.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::fixtures::*;

    fn scorer() -> RelatedArticleScorer {
        RelatedArticleScorer::default()
    }

    #[test]
    fn tag_signal_has_diminishing_returns() {
        let s = scorer();
        let cur = article("cur", 10, &[], &["a", "b", "c", "d", "e"]);
        let t = |tags: &[&str]| s.breakdown(&cur, &article("x", 10, &[], tags)).tags;
        let (one, three, four, five) = (
            t(&["a"]),
            t(&["a", "b", "c"]),
            t(&["a", "b", "c", "d"]),
            t(&["a", "b", "c", "d", "e"]),
        );
        assert!(one < three && three < four);
        assert!(four - three < three - one);
        assert_eq!(four, five);
        assert!(five <= 1.0);
    }

    #[test]
    fn recency_decays_smoothly() {
        let s = scorer();
        let cur = article("cur", 10, &["x"], &[]);
        let r = |day| s.breakdown(&cur, &article("c", day, &["x"], &[])).recency;
        assert_eq!(r(10), 1.0);
        assert!(r(11) > r(12) && r(12) > r(20));
        // symmetric around the current publish date
        assert!((r(9) - r(11)).abs() < 1e-12);
        assert!(r(1) > 0.0);
    }

    #[test]
    fn same_author_needs_both_sides() {
        let s = scorer();
        let cur = with_author(article("cur", 10, &[], &[]), "jane");
        let same = with_author(article("a", 10, &[], &[]), "jane");
        let anon = article("b", 10, &[], &[]);
        assert_eq!(s.breakdown(&cur, &same).same_author, 1.0);
        assert_eq!(s.breakdown(&cur, &anon).same_author, 0.0);
        assert_eq!(s.breakdown(&anon, &anon.clone()).same_author, 0.0);
    }

    #[test]
    fn secondary_categories_count_below_primary() {
        let s = scorer();
        let cur = article("cur", 10, &["politics", "world", "europe"], &[]);
        let prim = s.breakdown(&cur, &article("p", 10, &["politics"], &[]));
        let sec = s.breakdown(&cur, &article("s", 10, &["world"], &[]));
        assert_eq!(prim.primary_category, 1.0);
        assert_eq!(prim.secondary_category, 0.0);
        assert_eq!(sec.secondary_category, 0.5);
        assert!(prim.total > sec.total);
    }

    #[test]
    fn recency_alone_is_not_related() {
        let s = scorer();
        let cur = article("cur", 10, &["politics"], &["vote"]);
        let pool = vec![article("same-day", 10, &["sports"], &["football"])];
        assert!(s.rank(&cur, &pool, 5).is_empty());
    }

    #[test]
    fn ties_break_on_date_then_id() {
        let s = scorer();
        let cur = article("cur", 10, &["x"], &[]);
        // b and c tie on score (same distance); a is newer with the same distance
        let pool = vec![
            article("c", 8, &["x"], &[]),
            article("b", 8, &["x"], &[]),
            article("a", 12, &["x"], &[]),
        ];
        let ids: Vec<_> = s.rank(&cur, &pool, 10).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
