use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use boolex_core::corpus::{self, DocumentCatalog};
use boolex_core::{DocId, EnglishNormalizer, QueryKind, QueryProcessor, SearchIndex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub docs_dir: PathBuf,
    pub stopwords: Option<PathBuf>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_preview")]
    pub preview: bool,
}
fn default_preview() -> bool { true }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub kind: QueryKind,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<QueryKind>,
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Serve-phase state. Built once at startup and never mutated.
pub struct AppState {
    pub index: SearchIndex,
    pub catalog: DocumentCatalog,
    pub normalizer: EnglishNormalizer,
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    // Build phase runs to completion before the router exists
    let normalizer = match &config.stopwords {
        Some(path) => EnglishNormalizer::from_stopword_file(path)?,
        None => EnglishNormalizer::new(),
    };
    let loaded = corpus::load(&config.docs_dir, &normalizer)?;
    let app_state = Arc::new(AppState { index: loaded.index, catalog: loaded.catalog, normalizer });

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/examples", get(examples_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<Arc<AppState>>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let (kind, result) = QueryProcessor::new(&state.index, &state.normalizer).evaluate_with_kind(&params.q);
    let docs = match result {
        Ok(docs) => docs,
        Err(e) => {
            let body = ErrorResponse { query: Some(params.q), kind: Some(QueryKind::Invalid), error: e.to_string() };
            return Err((StatusCode::BAD_REQUEST, Json(body)));
        }
    };

    // previews read one file per hit; keep that off the runtime workers
    let raw_terms = raw_terms(&params.q, kind);
    let with_preview = params.preview;
    let catalog_state = Arc::clone(&state);
    let results: Vec<SearchHit> = tokio::task::spawn_blocking(move || {
        docs.iter()
            .map(|&doc_id| SearchHit {
                doc_id,
                name: catalog_state.catalog.name(doc_id),
                preview: if with_preview { preview(&catalog_state.catalog, doc_id, &raw_terms) } else { None },
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        tracing::warn!(error = %e, "building search hits failed");
        error(StatusCode::INTERNAL_SERVER_ERROR, "search failed")
    })?;

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, ?kind, hits = results.len(), "search");
    Ok(Json(SearchResponse { query: params.q, kind, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub name: String,
    pub text: String,
}

pub async fn doc_handler(State(state): State<Arc<AppState>>, Path(doc_id): Path<DocId>) -> Result<Json<DocResponse>, ApiError> {
    let Some(entry) = state.catalog.get(doc_id) else {
        return Err(error(StatusCode::NOT_FOUND, "not found"));
    };
    match entry.read_text() {
        Ok(text) => Ok(Json(DocResponse { doc_id, name: entry.name.clone(), text })),
        Err(e) => {
            tracing::warn!(doc_id, error = %e, "failed to read document");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, "unable to read document"))
        }
    }
}

pub async fn examples_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "boolean": ["information", "information AND retrieval", "information OR retrieval", "NOT information"],
        "proximity": ["information retrieval / 3"],
    }))
}

fn error(status: StatusCode, msg: &str) -> ApiError {
    (status, Json(ErrorResponse { query: None, kind: None, error: msg.to_string() }))
}

/// Surface words worth highlighting: operators and the proximity distance are dropped.
fn raw_terms(query: &str, kind: QueryKind) -> Vec<String> {
    let body = match kind {
        QueryKind::Proximity => query.split('/').next().unwrap_or(""),
        _ => query,
    };
    body.split_whitespace()
        .filter(|t| !matches!(*t, "AND" | "OR" | "NOT"))
        .map(|t| t.to_string())
        .collect()
}

fn preview(catalog: &DocumentCatalog, doc_id: DocId, raw_terms: &[String]) -> Option<String> {
    let text = catalog.get(doc_id)?.read_text().ok()?;
    let mut snippet: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        snippet.push_str("...");
    }
    Some(highlight_terms(&snippet, raw_terms))
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let alternation: Vec<String> = terms
        .iter()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if alternation.is_empty() {
        return snippet.to_string();
    }
    // one pass so inserted tags are never re-matched
    match regex::RegexBuilder::new(&format!(r"\b(?:{})\b", alternation.join("|"))).case_insensitive(true).build() {
        Ok(pat) => pat.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string(),
        Err(_) => snippet.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_terms_drop_operators_and_distance() {
        assert_eq!(raw_terms("a AND NOT b", QueryKind::Boolean), vec!["a", "b"]);
        assert_eq!(raw_terms("info retrieval / 3", QueryKind::Proximity), vec!["info", "retrieval"]);
    }

    #[test]
    fn highlight_is_case_insensitive_single_pass() {
        let out = highlight_terms("Rust and rust", &["rust".to_string(), "em".to_string()]);
        assert_eq!(out, "<em>Rust</em> and <em>rust</em>");
    }

    #[test]
    fn highlight_matches_whole_words_only() {
        let out = highlight_terms("a banana and a cab", &["a".to_string(), "b".to_string()]);
        assert_eq!(out, "<em>a</em> banana and <em>a</em> cab");
        let out = highlight_terms("Retrieval, again", &["retrieval,".to_string()]);
        assert_eq!(out, "<em>Retrieval</em>, again");
    }
}
