// src/config.rs
//! Service configuration from `config/related.toml`.
//!
//! Resolution:
//! 1) `$RELATED_CONFIG_PATH`, if set (must exist)
//! 2) `config/related.toml`
//! 3) built-in defaults
//!
//! Afterwards `CONTENT_API_URL` and `CONTENT_MODE` override the `[content]`
//! section. Every field has a default, so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::cache::CacheOptions;
use crate::content::QueryKind;
use crate::related::FinderOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config/related.toml";
pub const ENV_CONFIG_PATH: &str = "RELATED_CONFIG_PATH";
pub const ENV_CONTENT_API_URL: &str = "CONTENT_API_URL";
pub const ENV_CONTENT_MODE: &str = "CONTENT_MODE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub content: ContentConfig,
    pub cache: CacheConfig,
    pub related: RelatedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Graphql,
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub mode: ContentMode,
    pub endpoint: String,
    pub fixture_path: PathBuf,
    pub connect_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    /// How many recent articles make up a candidate pool.
    pub pool_size: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            mode: ContentMode::Graphql,
            endpoint: "http://localhost:8080/graphql".to_string(),
            fixture_path: PathBuf::from("tests/fixtures/posts.json"),
            connect_timeout_ms: 2_000,
            fetch_timeout_ms: 8_000,
            pool_size: 50,
        }
    }
}

impl ContentConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 0 disables capacity eviction.
    pub max_entries: usize,
    pub ttl: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            ttl: TtlPolicy::default(),
        }
    }
}

/// TTL per logical query class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    pub breaking_secs: u64,
    pub article_secs: u64,
    pub candidate_pool_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            breaking_secs: 60,
            article_secs: 300,
            candidate_pool_secs: 600,
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, kind: QueryKind) -> Duration {
        Duration::from_secs(match kind {
            QueryKind::Breaking => self.breaking_secs,
            QueryKind::Article => self.article_secs,
            QueryKind::CandidatePool => self.candidate_pool_secs,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelatedConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub trending_count: usize,
    /// Omit to disable near-duplicate suppression.
    pub duplicate_title_similarity: Option<f32>,
    pub weights_path: PathBuf,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            default_limit: 6,
            max_limit: 24,
            trending_count: crate::related::DEFAULT_TRENDING_COUNT,
            duplicate_title_similarity: Some(crate::related::dedup::DEFAULT_TITLE_SIMILARITY),
            weights_path: PathBuf::from(crate::related::weights::DEFAULT_WEIGHTS_PATH),
        }
    }
}

impl AppConfig {
    /// Resolve the config file, apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(&default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_CONTENT_API_URL) {
            if !url.trim().is_empty() {
                self.content.endpoint = url.trim().to_string();
            }
        }
        if let Ok(mode) = std::env::var(ENV_CONTENT_MODE) {
            self.content.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "graphql" => ContentMode::Graphql,
                "fixture" => ContentMode::Fixture,
                other => return Err(anyhow!("unsupported {ENV_CONTENT_MODE}: {other}")),
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.content.fetch_timeout_ms == 0 {
            bail!("content.fetch_timeout_ms must be > 0");
        }
        if self.related.max_limit == 0 {
            bail!("related.max_limit must be > 0");
        }
        if let Some(t) = self.related.duplicate_title_similarity {
            if !(0.0..=1.0).contains(&t) {
                bail!("related.duplicate_title_similarity must be within 0.0..=1.0");
            }
        }
        Ok(())
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            fetch_timeout: self.content.fetch_timeout(),
            max_entries: (self.cache.max_entries > 0).then_some(self.cache.max_entries),
        }
    }

    pub fn finder_options(&self) -> FinderOptions {
        FinderOptions {
            trending_count: self.related.trending_count,
            duplicate_title_similarity: self.related.duplicate_title_similarity,
        }
    }
}
