use tokio_util::sync::CancellationToken;

use topic_api_server::AppState;
use topic_engine::Bridge;

use super::{build_context, flush_producer};
use crate::config::Effective;
use crate::error::ServerError;

pub async fn run(eff: Effective) -> Result<(), ServerError> {
    tracing::info!("kafka-bridge starting");

    let ctx = build_context(&eff)?;

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Consumption loops (topic list fixed from here on) ---
    let bridge = Bridge::start(ctx.clone(), token.clone()).await?;

    // --- HTTP API ---
    let state = AppState::new(ctx.clone(), bridge.registry());
    let api_token = token.clone();
    let api_port = eff.api_port;
    let mut api_handle = tokio::spawn(async move {
        topic_api_server::run(api_port, state, api_token).await
    });

    tracing::info!(port = api_port, "server ready");

    // --- Wait for Ctrl+C or the API dying on its own ---
    let api_failure = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down...");
            None
        }
        exited = &mut api_handle => Some(match exited {
            Ok(Ok(())) => "exited unexpectedly".to_string(),
            Ok(Err(e)) => e,
            Err(e) => format!("task: {e}"),
        }),
    };

    // --- Graceful shutdown ---
    bridge.shutdown().await;

    if api_failure.is_none()
        && tokio::time::timeout(ctx.config.shutdown_grace, &mut api_handle).await.is_err()
    {
        tracing::warn!("api server did not stop within grace period");
        api_handle.abort();
    }

    flush_producer(&ctx).await;

    match api_failure {
        Some(e) => {
            tracing::error!(error = %e, "api server failed");
            Err(ServerError::Api(e))
        }
        None => {
            tracing::info!("shutdown complete");
            Ok(())
        }
    }
}
