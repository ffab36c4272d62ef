// src/content/mod.rs
//! Content API seam: the remote CMS is opaque, we only pass a query and its
//! variables through and get JSON back.

pub mod fixture;
pub mod graphql;
pub mod queries;

use std::sync::Arc;

use serde_json::Value;

use crate::error::FetchError;

pub use fixture::FixtureSource;
pub use graphql::GraphqlSource;
pub use queries::{NamedQuery, QueryKind};

#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Run `query` with `variables` unmodified and return the raw response.
    async fn fetch_content(&self, query: &str, variables: &Value) -> Result<Value, FetchError>;
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynContentSource = Arc<dyn ContentSource>;
