use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use topic_engine::EngineError;

use super::AppState;

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn ok(message: impl Into<String>) -> Response {
    Json(MessageBody { message: message.into() }).into_response()
}

fn error(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: error.into() })).into_response()
}

fn engine_error(e: &EngineError) -> Response {
    match e {
        EngineError::TopicNotFound(_) => error(StatusCode::NOT_FOUND, "topic does not exist"),
        EngineError::NoChannel(_) => error(StatusCode::NOT_FOUND, "no channel for topic"),
        EngineError::TopicAlreadyExists(_) => error(StatusCode::CONFLICT, "topic already exists"),
        EngineError::AdminConnectionFailed(_) => error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        EngineError::PublishFailed { .. }
        | EngineError::CreateFailed { .. }
        | EngineError::ConsumerFailed { .. } => error(StatusCode::BAD_GATEWAY, e.to_string()),
        EngineError::Cipher(_) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ═══════════════════════════════════════════════════════════════
//  GET /messages/{topic}
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_poll_message(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Response {
    tracing::debug!(topic = %topic, "poll");

    match state.directory.exists(&topic).await {
        Ok(true) => {}
        Ok(false) => return engine_error(&EngineError::TopicNotFound(topic)),
        Err(e) => {
            tracing::warn!(topic = %topic, error = %e, "existence check failed");
            return engine_error(&e);
        }
    }

    match state.registry.poll(&topic) {
        Ok(Some(message)) => ok(message),
        Ok(None) => error(StatusCode::NOT_FOUND, "no message received"),
        Err(e) => engine_error(&e),
    }
}

// ═══════════════════════════════════════════════════════════════
//  POST /send  {"topic": "...", "message": "..."}
// ═══════════════════════════════════════════════════════════════

/// Missing fields bind to "", so `{"topic": "t"}` publishes an empty message.
#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct SendRequest {
    topic: String,
    message: String,
}

pub(crate) async fn handle_send(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.publisher.publish(&req.topic, &req.message).await {
        Ok(()) => ok("message sent to kafka"),
        Err(e) => {
            tracing::error!(topic = %req.topic, error = %e, "publish failed");
            engine_error(&e)
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  POST /create  {"topic": "..."}
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct CreateRequest {
    topic: String,
}

pub(crate) async fn handle_create(
    State(state): State<AppState>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.provisioner.create_topic(&req.topic).await {
        Ok(_) => {
            tracing::info!(topic = %req.topic, "topic created");
            ok("topic created")
        }
        Err(e) => {
            tracing::error!(topic = %req.topic, error = %e, "topic creation failed");
            engine_error(&e)
        }
    }
}
