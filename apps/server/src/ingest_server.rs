//! HTTP endpoint receiving broadcast blocks.
//!
//! The protocol is notify-only: every broadcast is acknowledged with an
//! empty `200`, whatever happens to the block afterwards.

use crate::gate::IngestionGate;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use proposal_core::Block;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Create the ingestion router.
pub fn create_ingest_router(gate: Arc<IngestionGate>) -> Router {
    Router::new()
        .route("/broadcast", post(broadcast_handler))
        .route("/health", get(health_handler))
        .with_state(gate)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn broadcast_handler(
    State(gate): State<Arc<IngestionGate>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> StatusCode {
    match serde_json::from_slice::<Block>(&body) {
        Ok(block) => {
            gate.admit(Some(peer), block).await;
        }
        Err(e) => warn!(%peer, error = %e, "Undecodable broadcast body, dropping"),
    }
    StatusCode::OK
}

/// Bind `addr` and serve the ingestion endpoint until `shutdown` resolves.
pub async fn start_ingest_server(
    gate: Arc<IngestionGate>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<()>, Box<dyn std::error::Error + Send + Sync>> {
    let app = create_ingest_router(gate);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Ingestion server listening on http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown);

        if let Err(e) = server.await {
            error!(error = %e, "Ingestion server error");
        }
        info!("Ingestion server stopped");
    });

    Ok(handle)
}
