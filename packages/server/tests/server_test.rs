use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mafia_server::{
    app,
    models::config::GameConfig,
    state::AppState,
    utils::test_setup::{participants, setup_test_env},
};

fn test_app() -> Router {
    setup_test_env();
    app::create_app_with_state(AppState::with_config(GameConfig::default()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn start_room(app: &Router, room_id: &str, n: usize) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/game/start",
            json!({ "room_id": room_id, "participants": participants(n) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_start_game_returns_public_roster() {
    let app = test_app();
    let roster = start_room(&app, "room-1", 7).await;

    let roster = roster.as_array().unwrap();
    assert_eq!(roster.len(), 7);
    for (i, player) in roster.iter().enumerate() {
        assert_eq!(player["id"], i);
        assert_eq!(player["user_id"], format!("user-{}", i));
        // 役職は返さない
        assert!(player.get("role").is_none());
    }
}

#[tokio::test]
async fn test_duplicate_participants_are_rejected() {
    let app = test_app();
    let mut list = participants(6);
    list[5] = list[0].clone();

    let response = app
        .oneshot(post_json(
            "/api/game/start",
            json!({ "room_id": "dup", "participants": list }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_hides_living_roles() {
    let app = test_app();
    start_room(&app, "room-2", 6).await;

    let response = app.clone().oneshot(get("/api/game/room-2/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["room_id"], "room-2");
    assert_eq!(view["day"], 1);
    for player in view["players"].as_array().unwrap() {
        assert_eq!(player["is_dead"], false);
        assert!(player["role"].is_null());
    }
}

#[tokio::test]
async fn test_log_endpoint() {
    let app = test_app();

    let response = app.clone().oneshot(get("/api/game/none/log")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    start_room(&app, "room-3", 6).await;
    let response = app.oneshot(get("/api/game/room-3/log")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let log = json_body(response).await;
    assert_eq!(log["room_id"], "room-3");
}

#[tokio::test]
async fn test_command_from_outsider_is_rejected() {
    let app = test_app();
    start_room(&app, "room-4", 6).await;

    let response = app
        .oneshot(post_json(
            "/api/game/room-4/command",
            json!({ "sender": "stranger", "content": "3", "context": "private" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["accepted"], false);
    assert_eq!(body["message"], "You are not part of this game.");
}

#[tokio::test]
async fn test_public_chatter_is_not_a_command() {
    let app = test_app();
    start_room(&app, "room-5", 6).await;

    let response = app
        .oneshot(post_json(
            "/api/game/room-5/command",
            json!({ "sender": "user-0", "content": "good morning", "context": "public" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accepted"], false);
}

#[tokio::test]
async fn test_command_for_unknown_room() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/game/missing/command",
            json!({ "sender": "user-0", "content": "1", "context": "private" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_log_does_not_reveal_roles_mid_game() {
    setup_test_env();
    let state = AppState::with_config(GameConfig::default());
    let app = app::create_app_with_state(state.clone());
    start_room(&app, "room-6", 6).await;

    // 役職通知がログに書き込まれるまで待つ
    let log = state.get_or_create_chat_log("room-6").await;
    for _ in 0..200 {
        if log.lock().unwrap().messages.len() >= 7 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(log.lock().unwrap().messages.len() >= 7);

    let response = app.oneshot(get("/api/game/room-6/log")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let entries = body["messages"].as_array().unwrap();
    assert!(!entries.is_empty());
    for entry in entries {
        let content = entry["content"].as_str().unwrap();
        assert!(!content.starts_with("You are"), "role leaked: {}", content);
        assert!(!content.contains("The Mafia:"));
        assert!(entry["message_type"] == "Public" || entry["message_type"] == "System");
    }
}
