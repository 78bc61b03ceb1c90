use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::{command::CommandContext, player::Participant};
use crate::services::{
    command_service::CommandOutcome,
    game_service::{self, GameServiceError},
};
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub room_id: String,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub sender: String,
    pub content: String,
    pub context: CommandContext,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse {
    pub accepted: bool,
    pub message: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // curl -X POST http://localhost:8080/api/game/start -H 'Content-Type: application/json' \
        //   -d '{"room_id":"1","participants":[{"user_id":"a","name":"Alice"}, ...]}'
        .route("/start", post(start_game))
        .nest(
            "/:roomid",
            Router::new()
                .route("/state", get(get_game_state))
                .route("/log", get(get_chat_log))
                // 夜の能力(context: private)と裁判コマンド(context: public)
                .route("/command", post(command_handler))
                // websocat "ws://localhost:8080/api/game/{roomid}/ws?player_id=a"
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

fn error_response(error: GameServiceError) -> Response {
    let status = match error {
        GameServiceError::GameNotFound => StatusCode::NOT_FOUND,
        GameServiceError::AlreadyRunning(_) => StatusCode::CONFLICT,
        GameServiceError::Muted => StatusCode::FORBIDDEN,
        GameServiceError::Setup(_) | GameServiceError::Rejected(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(error.to_string())).into_response()
}

pub async fn start_game(
    State(state): State<AppState>,
    Json(request): Json<StartGameRequest>,
) -> Response {
    match game_service::start_game(state, &request.room_id, request.participants).await {
        Ok(players) => (StatusCode::OK, Json(players)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_game_state(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match game_service::get_game_state(&state, &room_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_chat_log(Path(room_id): Path<String>, State(state): State<AppState>) -> Response {
    match game_service::get_chat_log(&state, &room_id).await {
        Ok(log) => (StatusCode::OK, Json(log)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn command_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let result = game_service::submit_command(
        &state,
        &room_id,
        &request.sender,
        &request.content,
        request.context,
    )
    .await;
    match result {
        Ok(CommandOutcome::Accepted { reply, .. }) => (
            StatusCode::OK,
            Json(CommandResponse {
                accepted: true,
                message: reply,
            }),
        )
            .into_response(),
        Ok(CommandOutcome::Ignored) => (
            StatusCode::OK,
            Json(CommandResponse {
                accepted: false,
                message: String::new(),
            }),
        )
            .into_response(),
        Err(GameServiceError::Rejected(e)) => (
            StatusCode::BAD_REQUEST,
            Json(CommandResponse {
                accepted: false,
                message: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
