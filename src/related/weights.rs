//! Runtime-tunable scoring weights with hot-reload from config/weights.json.
//!
//! JSON shape (every field optional, missing ones keep their default):
//! {
//!   "primary_category": 4.0,
//!   "secondary_category": 1.5,
//!   "tags": 3.0,
//!   "recency": 1.0,
//!   "same_author": 0.75,
//!   "recency_half_life_hours": 72.0
//! }
//!
//! On each `current()` call we check the file's modified time and reload if changed.

use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::SystemTime,
};
use tracing::{info, warn};

pub const DEFAULT_WEIGHTS_PATH: &str = "config/weights.json";

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub primary_category: f64,
    pub secondary_category: f64,
    pub tags: f64,
    pub recency: f64,
    pub same_author: f64,
    pub recency_half_life_hours: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary_category: 4.0,
            secondary_category: 1.5,
            tags: 3.0,
            recency: 1.0,
            same_author: 0.75,
            recency_half_life_hours: 72.0,
        }
    }
}

impl ScoringWeights {
    /// Replace unusable values with defaults. The primary-category weight must
    /// stay strictly positive so sharing the primary category always helps.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let non_neg = |v: f64, dv: f64| if v.is_finite() && v >= 0.0 { v } else { dv };
        let positive = |v: f64, dv: f64| if v.is_finite() && v > 0.0 { v } else { dv };
        Self {
            primary_category: positive(self.primary_category, d.primary_category),
            secondary_category: non_neg(self.secondary_category, d.secondary_category),
            tags: non_neg(self.tags, d.tags),
            recency: non_neg(self.recency, d.recency),
            same_author: non_neg(self.same_author, d.same_author),
            recency_half_life_hours: positive(
                self.recency_half_life_hours,
                d.recency_half_life_hours,
            ),
        }
    }
}

/// Hot-reload wrapper: reloads when the config file mtime changes.
#[derive(Debug)]
pub struct HotReloadWeights {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    weights: ScoringWeights,
    last_modified: Option<SystemTime>,
}

impl HotReloadWeights {
    /// Create with a path (defaults to "config/weights.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS_PATH));
        Self {
            path,
            inner: RwLock::new(State {
                weights: ScoringWeights::default(),
                last_modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the latest weights, reloading if the config file changed.
    pub fn current(&self) -> ScoringWeights {
        // Fast path: check metadata without grabbing write lock yet.
        let needs_reload = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
                guard.last_modified != Some(mtime)
            }
            // No file: keep whatever we have.
            Err(_) => false,
        };

        if !needs_reload {
            return self
                .inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .weights;
        }

        // Slow path: reload with write lock.
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Double-check in case of races.
        if let Ok(mtime) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            if guard.last_modified != Some(mtime) {
                match load_weights_file(&self.path) {
                    Ok(w) => {
                        info!(target: "related", path = %self.path.display(), ?w, "scoring weights reloaded");
                        guard.weights = w;
                    }
                    Err(e) => {
                        warn!(target: "related", path = %self.path.display(), error = %e, "keeping previous scoring weights");
                    }
                }
                // Remember the mtime either way so a broken file is not re-read on every call.
                guard.last_modified = Some(mtime);
            }
        }
        guard.weights
    }
}

/// Load weights directly (no caching). Public for tests/tools.
pub fn load_weights_file(path: &Path) -> io::Result<ScoringWeights> {
    let bytes = fs::read(path)?;
    let w: ScoringWeights = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(w.sanitized())
}
