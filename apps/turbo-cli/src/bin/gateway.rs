use turbo_server::{gateway_router, shutdown_signal, GatewayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    turbo_cli::init_tracing();
    let settings = turbo_cli::load_settings()?;
    let state = GatewayState::new(&settings.gateway)?;
    let addr = format!("0.0.0.0:{}", settings.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, shards = ?state.shards(), "gateway listening");
    axum::serve(listener, gateway_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
