//! HTTP surface

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use omniline_channels::{suggested_channel, ChannelContext, SwitchError};
use omniline_core::Channel;
use omniline_orchestrator::CallInput;

use crate::state::AppState;
use crate::ws::ws_handler;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let ws_path = state.settings.server.ws_path.clone();
    let cors_enabled = state.settings.server.cors_enabled;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/calls", get(list_calls))
        .route("/calls/:id", get(get_call))
        .route("/calls/:id/switch", post(switch_channel))
        .route(&ws_path, get(ws_handler))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_calls(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.calls.list();
    Json(serde_json::json!({
        "calls": calls,
        "count": calls.len(),
    }))
}

async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let handle = state.calls.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::json!({
        "conversation_id": handle.conversation_id,
        "state": format!("{:?}", handle.state()),
    })))
}

#[derive(Debug, Deserialize)]
struct SwitchRequest {
    tenant_id: String,
    from: Channel,
    /// Omitted means "pick the best reachable channel for this caller".
    #[serde(default)]
    to: Option<Channel>,
    reason: String,
}

async fn switch_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SwitchRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let to = match req.to {
        Some(to) => to,
        None => {
            let conversation = state
                .stores
                .conversations
                .get(&req.tenant_id, &id)
                .await
                .map_err(|err| switch_rejection(SwitchError::Store(err)))?
                .ok_or_else(|| switch_rejection(SwitchError::NotFound(id.clone())))?;
            // Leaving the live leg, so the phone counts as not callable.
            let ctx = ChannelContext {
                phone: Some(conversation.caller.clone()),
                callable: false,
                ..Default::default()
            };
            suggested_channel(&ctx)
        }
    };

    let outcome = state
        .switcher
        .switch(&req.tenant_id, &id, req.from, to, &req.reason)
        .await
        .map_err(switch_rejection)?;

    // The voice actor has nothing left to do once the conversation moved on.
    if req.from == Channel::Voice {
        if let Some(handle) = state.calls.get(&id) {
            let stop = CallInput::Stop {
                reason: format!("switched to {to}"),
            };
            if let Err(err) = handle.try_send(stop) {
                tracing::debug!(conversation_id = %id, error = %err, "call already gone");
            }
        }
    }

    Ok(Json(serde_json::json!({
        "conversation_id": outcome.conversation.id,
        "current_channel": outcome.conversation.current_channel,
        "from": outcome.switch.from,
        "to": outcome.switch.to,
        "reason": outcome.switch.reason,
    })))
}

fn switch_rejection(err: SwitchError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        SwitchError::NotFound(_) => StatusCode::NOT_FOUND,
        SwitchError::Closed(_) => StatusCode::CONFLICT,
        SwitchError::NotAllowed { .. } | SwitchError::WrongChannel { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SwitchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}
