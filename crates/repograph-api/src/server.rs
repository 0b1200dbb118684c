use crate::routes::create_router;
use crate::state::AppState;
use repograph_core::Result;
use tracing::info;

pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    state.preload_graph().await;

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("repograph listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
