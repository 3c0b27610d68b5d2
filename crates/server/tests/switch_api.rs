//! Channel switch endpoint, exercised through the router.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use omniline_config::Settings;
use omniline_core::{Channel, Conversation};
use omniline_dialogue::ScriptedEngine;
use omniline_persistence::{ConversationStore, MemoryStore, TurnStore};
use omniline_pipeline::{NoopStt, SpeechSynthesizer, UnavailableTts};
use omniline_server::{create_router, AppState};

const TENANT: &str = "tenant-1";

fn test_app(store: &Arc<MemoryStore>) -> Router {
    let settings = Settings::default();
    let engine = Arc::new(ScriptedEngine::new(settings.agent.fallback_phrase.clone()));
    let state = AppState::new(
        settings,
        store.stores(),
        Arc::new(NoopStt),
        Arc::new(SpeechSynthesizer::new(Box::new(UnavailableTts))),
        engine,
    );
    create_router(state)
}

async fn seed_conversation(store: &Arc<MemoryStore>) -> Conversation {
    let conversation = Conversation::new(TENANT, "+33612345678", Channel::Voice);
    store.create(conversation.clone()).await.unwrap();
    conversation
}

fn switch_request(id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/calls/{id}/switch"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_switch_commits_and_records_a_note() {
    let store = MemoryStore::new();
    let conversation = seed_conversation(&store).await;
    let app = test_app(&store);

    let body = json!({
        "tenant_id": TENANT,
        "from": "voice",
        "to": "sms",
        "reason": "confirmation écrite",
    });
    let response = app
        .oneshot(switch_request(&conversation.id, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = body_json(response).await;
    assert_eq!(reply["current_channel"], "sms");
    assert_eq!(reply["from"], "voice");

    let stored = store.get(TENANT, &conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.current_channel, Channel::Sms);
    assert_eq!(stored.switches.len(), 1);

    let turns = store.list(TENANT, &conversation.id).await.unwrap();
    assert!(turns.iter().any(|t| t.content.contains("sms")));
}

#[tokio::test]
async fn test_omitted_target_falls_back_to_the_suggested_channel() {
    let store = MemoryStore::new();
    let conversation = seed_conversation(&store).await;
    let app = test_app(&store);

    // The caller is known only by phone, so the written fallback is SMS.
    let body = json!({
        "tenant_id": TENANT,
        "from": "voice",
        "reason": "ligne coupée",
    });
    let response = app
        .oneshot(switch_request(&conversation.id, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = store.get(TENANT, &conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.current_channel, Channel::Sms);
}

#[tokio::test]
async fn test_self_switch_is_rejected() {
    let store = MemoryStore::new();
    let conversation = seed_conversation(&store).await;
    let app = test_app(&store);

    let body = json!({
        "tenant_id": TENANT,
        "from": "voice",
        "to": "voice",
        "reason": "loop",
    });
    let response = app
        .oneshot(switch_request(&conversation.id, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = store.get(TENANT, &conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.current_channel, Channel::Voice);
    assert!(stored.switches.is_empty());
}

#[tokio::test]
async fn test_unknown_conversation_is_not_found() {
    let store = MemoryStore::new();
    let app = test_app(&store);

    let body = json!({
        "tenant_id": TENANT,
        "from": "voice",
        "to": "sms",
        "reason": "r",
    });
    let response = app.oneshot(switch_request("missing", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
