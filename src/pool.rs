// src/pool.rs
//! Candidate pool construction: pull article-shaped records out of a content
//! API response, validate them once, and drop whatever is malformed.
//!
//! Accepted envelopes:
//! - `{"data": {"posts": {"edges": [{"node": {..}}]}}}`
//! - `{"data": {"posts": {"nodes": [..]}}}`
//! - `{"data": {"post": {..}}}` (single record)
//! - a bare JSON array of records
//!
//! Record fields accept both the relay-style nested shapes (`author.node`,
//! `featuredImage.node.sourceUrl`, `categories.nodes`) and flat ones.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::article::{Article, AuthorRef, Category, ImageRef, Tag};
use crate::error::RecordError;

const EXCERPT_MAX_CHARS: usize = 600;

/// Normalized, read-only set of candidate articles. Ids are unique.
#[derive(Debug, Clone, Default)]
pub struct ArticlePool {
    articles: Vec<Article>,
}

impl ArticlePool {
    /// Build from already-normalized articles. Duplicate ids: first one wins.
    pub fn new(articles: Vec<Article>) -> Self {
        let mut seen = HashSet::new();
        let articles = articles
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .collect();
        Self { articles }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Extract and normalize every record in `response`, silently dropping
    /// malformed ones.
    pub fn from_response(response: &Value) -> Self {
        Self::from_response_with_report(response).0
    }

    /// Like `from_response`, also returning how many records were dropped.
    pub fn from_response_with_report(response: &Value) -> (Self, usize) {
        let mut kept = Vec::new();
        let mut dropped = 0usize;
        for raw in records_in(response) {
            match parse_article(raw) {
                Ok(a) => kept.push(a),
                Err(e) => {
                    dropped += 1;
                    debug!(target: "pool", error = %e, "dropping malformed record");
                }
            }
        }
        if dropped > 0 {
            counter!("pool_records_dropped_total").increment(dropped as u64);
        }
        (Self::new(kept), dropped)
    }

    /// Union of two pools; on id collision the record from `self` is kept.
    pub fn merge(self, other: ArticlePool) -> Self {
        let mut all = self.articles;
        all.extend(other.articles);
        Self::new(all)
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.slug == slug)
    }

    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

impl From<Vec<Article>> for ArticlePool {
    fn from(v: Vec<Article>) -> Self {
        Self::new(v)
    }
}

/* ----------------------------
Envelope walking
---------------------------- */

/// Locate article-shaped records inside a response, in response order.
pub fn records_in(v: &Value) -> Vec<&Value> {
    match v {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            if let Some(data) = map.get("data") {
                return records_in_data(data);
            }
            if let Some(list) = connection_items(v) {
                return list;
            }
            if map.contains_key("id") {
                return vec![v];
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn records_in_data(data: &Value) -> Vec<&Value> {
    let Value::Object(fields) = data else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for field in fields.values() {
        match field {
            Value::Array(items) => out.extend(items.iter()),
            Value::Object(obj) => {
                if let Some(list) = connection_items(field) {
                    out.extend(list);
                } else if obj.contains_key("id") {
                    out.push(field);
                }
            }
            _ => {}
        }
    }
    out
}

/// `{"edges": [{"node": ..}]}` or `{"nodes": [..]}`.
fn connection_items(v: &Value) -> Option<Vec<&Value>> {
    if let Some(Value::Array(edges)) = v.get("edges") {
        return Some(edges.iter().filter_map(|e| e.get("node")).collect());
    }
    if let Some(Value::Array(nodes)) = v.get("nodes") {
        return Some(nodes.iter().collect());
    }
    None
}

/* ----------------------------
Raw record schema
---------------------------- */

/// Only `id`, `slug` and `date` are strict. Every other field decodes
/// leniently: a value of the wrong shape is treated as absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    id: Option<RawId>,
    slug: Option<String>,
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, alias = "modifiedDate", deserialize_with = "lenient")]
    modified: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    author: Option<Wrapped<RawTerm>>,
    #[serde(default, deserialize_with = "lenient")]
    featured_image: Option<Wrapped<RawImage>>,
    #[serde(default, deserialize_with = "lenient")]
    categories: Option<Terms>,
    #[serde(default, deserialize_with = "lenient")]
    tags: Option<Terms>,
}

/// Decode `T`, mapping a value of the wrong shape to `None`.
fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(de)?;
    Ok(T::deserialize(v).ok())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Wrapped<T> {
    Node { node: T },
    Flat(T),
}

impl<T> Wrapped<T> {
    fn into_inner(self) -> T {
        match self {
            Wrapped::Node { node } | Wrapped::Flat(node) => node,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Terms {
    Nodes { nodes: Vec<RawTerm> },
    Edges { edges: Vec<Wrapped<RawTerm>> },
    List(Vec<RawTerm>),
}

impl Terms {
    fn into_vec(self) -> Vec<RawTerm> {
        match self {
            Terms::Nodes { nodes } => nodes,
            Terms::Edges { edges } => edges.into_iter().map(Wrapped::into_inner).collect(),
            Terms::List(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTerm {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    database_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImage {
    #[serde(default, alias = "sourceUrl", deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    alt_text: Option<String>,
}

/* ----------------------------
Normalization
---------------------------- */

/// Validate and normalize a single raw record.
pub fn parse_article(raw: &Value) -> Result<Article, RecordError> {
    if !raw.is_object() {
        return Err(RecordError::NotAnObject);
    }
    let rec = RawArticle::deserialize(raw).map_err(|e| RecordError::Shape(e.to_string()))?;

    let id = rec
        .id
        .map(RawId::into_string)
        .filter(|s| !s.trim().is_empty())
        .ok_or(RecordError::MissingField("id"))?;
    let slug = rec
        .slug
        .filter(|s| !s.trim().is_empty())
        .ok_or(RecordError::MissingField("slug"))?;
    let date_raw = rec.date.ok_or(RecordError::MissingField("date"))?;
    let publish_date =
        parse_timestamp(&date_raw).ok_or_else(|| RecordError::BadDate(date_raw.clone()))?;
    // Missing or inconsistent modified dates collapse onto the publish date.
    let modified_date = rec
        .modified
        .as_deref()
        .and_then(parse_timestamp)
        .filter(|m| *m >= publish_date)
        .unwrap_or(publish_date);

    let title = rec.title.as_deref().map(normalize_text).unwrap_or_default();
    let excerpt = rec
        .excerpt
        .as_deref()
        .map(normalize_text)
        .map(|s| truncate_chars(s, EXCERPT_MAX_CHARS))
        .filter(|s| !s.is_empty());

    let categories = terms(rec.categories)
        .map(|t| Category {
            id: t.id,
            name: t.name,
            slug: t.slug,
            database_id: t.database_id,
        })
        .fold(Vec::<Category>::new(), |mut acc, c| {
            if !acc.contains(&c) {
                acc.push(c);
            }
            acc
        });
    let tags = terms(rec.tags)
        .map(|t| Tag {
            id: t.id,
            name: t.name,
            slug: t.slug,
        })
        .fold(Vec::<Tag>::new(), |mut acc, t| {
            if !acc.contains(&t) {
                acc.push(t);
            }
            acc
        });

    let author = rec
        .author
        .map(Wrapped::into_inner)
        .and_then(term_parts)
        .map(|t| AuthorRef {
            id: t.id,
            name: t.name,
            slug: t.slug,
        });

    let featured_image = rec
        .featured_image
        .map(Wrapped::into_inner)
        .and_then(|img| {
            let url = img.url.filter(|u| !u.trim().is_empty())?;
            Some(ImageRef {
                url,
                alt_text: img.alt_text.filter(|a| !a.trim().is_empty()),
            })
        });

    Ok(Article {
        id,
        slug,
        title,
        publish_date,
        modified_date,
        excerpt,
        categories,
        tags,
        author,
        featured_image,
    })
}

struct TermParts {
    id: String,
    name: String,
    slug: String,
    database_id: Option<i64>,
}

fn terms(t: Option<Terms>) -> impl Iterator<Item = TermParts> {
    t.map(Terms::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(term_parts)
}

/// Terms without an id carry no identity and are skipped.
fn term_parts(t: RawTerm) -> Option<TermParts> {
    let id = t.id.map(RawId::into_string).filter(|s| !s.is_empty())?;
    Some(TermParts {
        id,
        name: t.name.map(|n| normalize_text(&n)).unwrap_or_default(),
        slug: t.slug.unwrap_or_default(),
        database_id: t.database_id,
    })
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|n| n.and_utc())
}

/// Decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

fn truncate_chars(s: String, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s
    }
}
