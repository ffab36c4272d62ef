//! # Article model
//! Normalized article records as consumed by scoring and rendered by the page
//! layer. Built once per request by `pool`; never mutated afterwards.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Category reference. Equality and hashing use `id` only.
///
/// `id` is the CMS's opaque node id; list filters take the numeric
/// `database_id` instead.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "databaseId", skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
}

/// Tag reference. Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// Weak reference to an author; the author record itself lives in the CMS.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// External image reference; no pixel data is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    pub alt_text: Option<String>,
}

macro_rules! id_identity {
    ($($t:ty),*) => {$(
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }
        impl Eq for $t {}
        impl Hash for $t {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    )*};
}

id_identity!(Category, Tag, AuthorRef);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub publish_date: DateTime<Utc>,
    /// Always `>= publish_date`.
    pub modified_date: DateTime<Utc>,
    pub excerpt: Option<String>,
    /// First element is the primary category.
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub author: Option<AuthorRef>,
    pub featured_image: Option<ImageRef>,
}

impl Article {
    pub fn primary_category(&self) -> Option<&Category> {
        self.categories.first()
    }

    pub fn category_ids(&self) -> BTreeSet<&str> {
        self.categories.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn tag_ids(&self) -> BTreeSet<&str> {
        self.tags.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn has_category(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }
}
