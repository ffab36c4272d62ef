use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::ContentSource;
use crate::error::FetchError;
use crate::pool::records_in;

/// Serves a fixed JSON document; used for local runs and tests.
///
/// Answers slug lookups (`{"slug": ..}` variables) with the matching record
/// only, and every other query with the whole document.
pub struct FixtureSource {
    document: Value,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn from_value(document: Value) -> Self {
        Self {
            document,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let document = serde_json::from_str(s).context("parsing fixture json")?;
        Ok(Self::from_value(document))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture from {}", path.display()))?;
        Self::from_json_str(&s)
    }

    /// How many times `fetch_content` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn fetch_content(&self, _query: &str, variables: &Value) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(slug) = variables.get("slug").and_then(Value::as_str) {
            let hit = records_in(&self.document)
                .into_iter()
                .find(|r| r.get("slug").and_then(Value::as_str) == Some(slug))
                .cloned()
                .unwrap_or(Value::Null);
            return Ok(serde_json::json!({ "data": { "post": hit } }));
        }
        Ok(self.document.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
