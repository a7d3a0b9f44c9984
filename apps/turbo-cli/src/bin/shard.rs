use std::sync::Arc;

use turbo_embed::get_default_embedder;
use turbo_server::{open_shard, shard_router, shutdown_signal};

fn main() -> anyhow::Result<()> {
    turbo_cli::init_tracing();
    let settings = turbo_cli::load_settings()?;
    // The HTTP embedder wraps a blocking client, which must be built outside the runtime.
    let embedder = get_default_embedder(&settings.embedding)?;
    let executor = Arc::new(open_shard(&settings.shard, embedder)?);
    let addr = format!("0.0.0.0:{}", settings.shard.port);

    tokio::runtime::Runtime::new()?.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(shard_id = settings.shard.id, %addr, docs = executor.num_docs(), "shard node listening");
        axum::serve(listener, shard_router(executor))
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok::<(), anyhow::Error>(())
    })
}
