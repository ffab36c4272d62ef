//! GraphQL documents the service sends, each tagged with the TTL class it
//! is cached under.

use serde::Deserialize;

/// Logical query class; selects the TTL in `TtlPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Front-page / breaking lists that go stale within minutes.
    Breaking,
    /// A single article looked up by slug.
    Article,
    /// Candidate pools for related-content scoring.
    CandidatePool,
}

#[derive(Debug, Clone, Copy)]
pub struct NamedQuery {
    pub name: &'static str,
    pub kind: QueryKind,
    pub document: &'static str,
}

macro_rules! article_fields {
    () => {
        r#"
  id
  slug
  title
  date
  modified
  excerpt
  author { node { id name slug } }
  featuredImage { node { sourceUrl altText } }
  categories { nodes { id databaseId name slug } }
  tags { nodes { id name slug } }
"#
    };
}

macro_rules! with_fields {
    ($head:literal, $tail:literal) => {
        concat!($head, article_fields!(), $tail)
    };
}

const ARTICLE_FIELDS: &str = article_fields!();

pub const ARTICLE_BY_SLUG: NamedQuery = NamedQuery {
    name: "ArticleBySlug",
    kind: QueryKind::Article,
    document: with_fields!(
        "query ArticleBySlug($slug: ID!) {\n post(id: $slug, idType: SLUG) {",
        "}\n}"
    ),
};

pub const RECENT_ARTICLES: NamedQuery = NamedQuery {
    name: "RecentArticles",
    kind: QueryKind::CandidatePool,
    document: with_fields!(
        "query RecentArticles($first: Int!) {\n posts(first: $first, where: { orderby: { field: DATE, order: DESC } }) {\n edges { node {",
        "} }\n }\n}"
    ),
};

pub const CATEGORY_ARTICLES: NamedQuery = NamedQuery {
    name: "CategoryArticles",
    kind: QueryKind::CandidatePool,
    document: with_fields!(
        "query CategoryArticles($first: Int!, $categoryId: Int!) {\n posts(first: $first, where: { categoryId: $categoryId, orderby: { field: DATE, order: DESC } }) {\n edges { node {",
        "} }\n }\n}"
    ),
};

pub const BREAKING_ARTICLES: NamedQuery = NamedQuery {
    name: "BreakingArticles",
    kind: QueryKind::Breaking,
    document: with_fields!(
        "query BreakingArticles($first: Int!) {\n posts(first: $first, where: { tag: \"breaking\" }) {\n nodes {",
        "}\n }\n}"
    ),
};

/// Field selection shared by every article query.
pub fn article_fields() -> &'static str {
    ARTICLE_FIELDS
}
