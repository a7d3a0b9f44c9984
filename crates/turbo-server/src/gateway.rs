use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::join_all;

use turbo_core::config::GatewaySettings;
use turbo_core::types::{SearchHit, SearchRequest, SearchResponse};
use turbo_hybrid::merge_hits;

use crate::errors::ApiError;
use crate::with_layers;

#[derive(Clone)]
pub struct GatewayState {
    client: reqwest::Client,
    shards: Arc<Vec<String>>,
    default_top_k: usize,
    max_top_k: usize,
}

impl GatewayState {
    pub fn new(settings: &GatewaySettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        let shards = settings.shards.iter().map(|s| s.trim_end_matches('/').to_string()).collect();
        Ok(Self { client, shards: Arc::new(shards), default_top_k: settings.default_top_k, max_top_k: settings.max_top_k })
    }

    pub fn shards(&self) -> &[String] { &self.shards }
}

pub fn gateway_router(state: GatewayState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .with_state(state);
    with_layers(router)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn query_shard(client: &reqwest::Client, base: &str, request: &SearchRequest) -> Result<Vec<SearchHit>, String> {
    let resp = client
        .post(format!("{base}/search"))
        .json(request)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("status {status}"));
    }
    let body: SearchResponse = resp.json().await.map_err(|e| e.to_string())?;
    Ok(body.hits)
}

async fn search(State(state): State<GatewayState>, body: Bytes) -> Result<Json<SearchResponse>, ApiError> {
    let request: SearchRequest = serde_json::from_slice(&body)?;
    let top_k = request.effective_top_k(state.default_top_k, state.max_top_k);
    let forwarded = SearchRequest { query: request.query, top_k: i64::try_from(top_k).unwrap_or(i64::MAX) };
    let start = Instant::now();

    let calls = state.shards.iter().map(|base| query_shard(&state.client, base, &forwarded));
    let results = join_all(calls).await;

    let mut per_shard = Vec::with_capacity(results.len());
    for (base, result) in state.shards.iter().zip(results) {
        match result {
            Ok(hits) => per_shard.push(hits),
            Err(e) => tracing::warn!(shard = %base, error = %e, "shard omitted from results"),
        }
    }
    if per_shard.is_empty() && !state.shards.is_empty() {
        return Err(ApiError::Upstream("no shard node answered".to_string()));
    }

    let answered = per_shard.len();
    let hits = merge_hits(per_shard, top_k);
    tracing::info!(
        answered,
        shards = state.shards.len(),
        hits = hits.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "gateway search served"
    );
    Ok(Json(SearchResponse { hits }))
}
