use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use turbo_core::config::{expand_path, ShardSettings};
use turbo_core::error::Result;
use turbo_core::layout::ShardLayout;
use turbo_core::traits::Embedder;
use turbo_core::types::{SearchRequest, SearchResponse};
use turbo_hybrid::ShardQueryExecutor;
use turbo_text::ShardTextIndex;
use turbo_vector::{DocMap, VectorStore};

use crate::errors::ApiError;
use crate::with_layers;

/// Open the shard directory at `settings.data_dir` read-only for serving.
pub fn open_shard(settings: &ShardSettings, embedder: Arc<dyn Embedder>) -> Result<ShardQueryExecutor> {
    let layout = ShardLayout::at(expand_path(&settings.data_dir));
    let text = ShardTextIndex::open(&layout.index_dir())?;
    let doc_map = DocMap::load(&layout.docmap_path())?;
    let vectors = VectorStore::open_read_only(&layout.vectors_path(), embedder.dim())?;
    tracing::info!(
        shard_id = settings.id,
        dir = %layout.dir.display(),
        docs = doc_map.len(),
        indexed = text.num_docs(),
        capacity = vectors.capacity(),
        "shard opened"
    );
    Ok(ShardQueryExecutor::new(Box::new(text), vectors, doc_map, embedder, settings))
}

pub fn shard_router(executor: Arc<ShardQueryExecutor>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .with_state(executor);
    with_layers(router)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn search(State(executor): State<Arc<ShardQueryExecutor>>, body: Bytes) -> std::result::Result<Json<SearchResponse>, ApiError> {
    let request: SearchRequest = serde_json::from_slice(&body)?;
    let start = Instant::now();
    let exec = Arc::clone(&executor);
    let response = tokio::task::spawn_blocking(move || exec.search(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("search task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(shard_id = %executor.shard_id(), error = %e, "search failed");
            ApiError::from(e)
        })?;
    tracing::info!(
        shard_id = %executor.shard_id(),
        hits = response.hits.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "search served"
    );
    Ok(Json(response))
}
