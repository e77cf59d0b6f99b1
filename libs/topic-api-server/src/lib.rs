mod http;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;

use topic_engine::{
    BridgeContext, ChannelRegistry, MessagePublisher, TopicDirectory, TopicProvisioner,
};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ChannelRegistry>,
    directory: TopicDirectory,
    publisher: MessagePublisher,
    provisioner: TopicProvisioner,
}

impl AppState {
    pub fn new(ctx: Arc<BridgeContext>, registry: Arc<ChannelRegistry>) -> Self {
        Self {
            registry,
            directory: TopicDirectory::new(ctx.clone()),
            publisher: MessagePublisher::new(ctx.clone()),
            provisioner: TopicProvisioner::new(ctx),
        }
    }
}

/// Routes of the bridge HTTP API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages/{topic}", get(http::handle_poll_message))
        .route("/send", post(http::handle_send))
        .route("/create", post(http::handle_create))
        .with_state(state)
}

/// Serve the HTTP API on `0.0.0.0:{port}` until `shutdown` is cancelled.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "api server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}
