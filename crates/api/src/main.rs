use anyhow::Result;
use chatter_api::{build_router, build_state, spawn_session_reaper, ApiConfig};
use chatter_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("chatter_api", "info");

    let config = ApiConfig::from_env();
    let bind = config.bind.clone();
    let state = build_state(config)?;
    let _reaper = spawn_session_reaper(&state);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "chatter web shell started");

    axum::serve(listener, app).await?;
    Ok(())
}
