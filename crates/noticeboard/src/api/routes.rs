//! API route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use shared::{BroadcastRequest, BroadcastResponse, MessageResponse, SubscribeRequest};

use crate::api::AppState;
use crate::db;

/// Placeholder served while the board has no messages.
const EMPTY_BOARD_CONTENT: &str = "No messages yet";

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/message", get(message_latest))
        .route("/subscribe", post(subscribe))
        .route("/broadcast", post(broadcast))
}

/// Latest message for the main page. An empty board serves the placeholder
/// body, still as 200.
async fn message_latest(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<serde_json::Value>)> {
    let conn = state.db.0.lock().unwrap();
    let latest = db::latest_message(&conn).map_err(|e| {
        tracing::error!("failed to load latest message: {:#}", e);
        internal_error("Failed to load message")
    })?;
    let response = match latest {
        Some((id, content, created_at)) => MessageResponse {
            id: Some(id),
            content,
            created_at: Some(created_at),
        },
        None => MessageResponse {
            id: None,
            content: EMPTY_BOARD_CONTENT.to_string(),
            created_at: None,
        },
    };
    Ok(Json(response))
}

/// Register or refresh a subscriber endpoint. Browsers re-post the same
/// subscription on every page load; the upsert keeps one row per endpoint.
async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    if req.endpoint.is_empty() || req.keys.p256dh.is_empty() || req.keys.auth.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "endpoint and keys required"})),
        ));
    }
    let conn = state.db.0.lock().unwrap();
    db::upsert_subscription(&conn, &req.endpoint, &req.keys.p256dh, &req.keys.auth).map_err(
        |e| {
            tracing::error!("failed to save subscription: {:#}", e);
            internal_error("Failed to subscribe")
        },
    )?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

/// Persist the admin's text and push it to every subscriber. Individual
/// delivery outcomes are not surfaced; only a pre-dispatch failure is.
async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, (StatusCode, Json<serde_json::Value>)> {
    state.dispatcher.broadcast(&req.content).await.map_err(|e| {
        tracing::error!("broadcast failed: {:#}", e);
        internal_error("Broadcast failed")
    })?;
    Ok(Json(BroadcastResponse { success: true }))
}

fn internal_error(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message})),
    )
}
