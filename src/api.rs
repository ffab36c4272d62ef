use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::article::Article;
use crate::cache::CacheStats;
use crate::related::RelatedArticles;
use crate::service::RelatedService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RelatedService>,
}

impl AppState {
    pub fn new(service: RelatedService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/related/{slug}", get(related))
        .route("/breaking", get(breaking))
        .route("/debug/cache", get(debug_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

/// Always 200; an unknown slug or an unreachable CMS yields empty lists.
async fn related(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Json<RelatedArticles> {
    Json(state.service.related_for_slug(&slug, q.limit).await)
}

async fn breaking(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Article>> {
    Json(state.service.breaking(q.limit).await)
}

#[derive(serde::Serialize)]
struct CacheDebug {
    source: &'static str,
    #[serde(flatten)]
    stats: CacheStats,
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheDebug> {
    Json(CacheDebug {
        source: state.service.source_name(),
        stats: state.service.cache().stats(),
    })
}
