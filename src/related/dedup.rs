// src/related/dedup.rs
//! Near-duplicate suppression: syndicated or re-published copies of a story
//! usually carry (almost) the same headline. Walk a ranked list and drop any
//! candidate whose title is too close to the current article's or to an
//! earlier pick.
//!
//! Similarity: `strsim::normalized_levenshtein` on lower-cased titles.

use strsim::normalized_levenshtein;

use super::scoring::Scored;
use crate::article::Article;

pub const DEFAULT_TITLE_SIMILARITY: f32 = 0.92;

fn title_key(a: &Article) -> String {
    a.title.trim().to_lowercase()
}

fn too_similar(a: &str, b: &str, threshold: f32) -> bool {
    !a.is_empty() && !b.is_empty() && normalized_levenshtein(a, b) as f32 >= threshold
}

/// Whether `a` and `b` read as the same headline.
pub fn is_near_duplicate(a: &Article, b: &Article, threshold: f32) -> bool {
    too_similar(&title_key(a), &title_key(b), threshold)
}

/// Keep rank order, dropping near-duplicate titles. Articles without a title
/// are never treated as duplicates.
pub fn drop_near_duplicates<'a>(
    current: &Article,
    ranked: Vec<Scored<'a>>,
    threshold: f32,
) -> Vec<Scored<'a>> {
    let mut kept_titles = vec![title_key(current)];
    let mut out = Vec::with_capacity(ranked.len());
    for s in ranked {
        let t = title_key(s.article);
        if kept_titles.iter().any(|k| too_similar(k, &t, threshold)) {
            tracing::debug!(target: "related", id = %s.article.id, "dropping near-duplicate title");
            continue;
        }
        kept_titles.push(t);
        out.push(s);
    }
    out
}
