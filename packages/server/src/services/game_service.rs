use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    models::{
        chat::ChatLog,
        command::CommandContext,
        error::{CommandError, SetupError},
        game::{Game, GameView},
        notice::Channel,
        player::{Participant, Player, PlayerId},
    },
    services::{
        command_service::{self, CommandOutcome},
        gateway::Gateway,
        phase_service, roster_service,
    },
    state::{AppState, GameHandle, GameRoom},
    utils::{config::CONFIG, websocket::RoomGateway},
};

#[derive(Debug, thiserror::Error)]
pub enum GameServiceError {
    #[error("Game not found")]
    GameNotFound,
    #[error("A game is already running in room {0}")]
    AlreadyRunning(String),
    #[error("Invalid roster: {0}")]
    Setup(#[from] SetupError),
    #[error("{0}")]
    Rejected(#[from] CommandError),
    #[error("You cannot speak in that channel right now.")]
    Muted,
}

/// 役職を含まない公開ロスター
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub user_id: String,
    pub name: String,
}

impl From<&Player> for PlayerSummary {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id.clone(),
            name: p.name.clone(),
        }
    }
}

/// 役職を配ってゲームを開始する。配送はルームのWebSocketチャンネル。
pub async fn start_game(
    state: AppState,
    room_id: &str,
    participants: Vec<Participant>,
) -> Result<Vec<PlayerSummary>, GameServiceError> {
    let mut rng = StdRng::from_entropy();
    let players = roster_service::assign_roles(&participants, &state.game_config, &mut rng)?;
    evict_finished(&state, room_id).await?;

    let tx = state.get_or_create_room_channel(room_id).await;
    let log = state.get_or_create_chat_log(room_id).await;
    let gateway = Arc::new(RoomGateway::new(
        room_id,
        tx,
        CONFIG.channels.clone(),
        &players,
        log,
    ));

    let summary = players.iter().map(PlayerSummary::from).collect();
    launch(&state, room_id, players, gateway, rng).await?;
    Ok(summary)
}

/// 終わったゲームとそのログを片付ける。進行中なら開始を拒否する。
async fn evict_finished(state: &AppState, room_id: &str) -> Result<(), GameServiceError> {
    let mut games = state.games.lock().await;
    if let Some(existing) = games.get(room_id) {
        if !existing.game.lock().await.is_finished() {
            return Err(GameServiceError::AlreadyRunning(room_id.to_string()));
        }
        games.remove(room_id);
        state.chat_logs.lock().await.remove(room_id);
        log::info!("[{}] finished game evicted", room_id);
    }
    Ok(())
}

/// Registers a game built from an already-assigned roster and spawns its phase loop.
pub async fn launch(
    state: &AppState,
    room_id: &str,
    players: Vec<Player>,
    gateway: Arc<dyn Gateway>,
    rng: StdRng,
) -> Result<GameHandle, GameServiceError> {
    let game = Game::new(room_id.to_string(), players);
    log::debug!("launching {}", game);
    let game: GameHandle = Arc::new(Mutex::new(game));
    {
        let mut games = state.games.lock().await;
        if let Some(existing) = games.get(room_id) {
            if !existing.game.lock().await.is_finished() {
                return Err(GameServiceError::AlreadyRunning(room_id.to_string()));
            }
        }
        games.insert(
            room_id.to_string(),
            GameRoom {
                game: game.clone(),
                gateway: gateway.clone(),
            },
        );
    }
    log::info!("[{}] game started", room_id);

    let config = state.game_config.as_ref().clone();
    let handle = game.clone();
    let room = room_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = phase_service::run_phase_loop(handle, gateway, config, rng).await {
            log::error!("[{}] phase loop aborted: {}", room, e);
        }
    });
    Ok(game)
}

pub async fn get_game_state(state: &AppState, room_id: &str) -> Result<GameView, GameServiceError> {
    let room = state
        .get_room(room_id)
        .await
        .ok_or(GameServiceError::GameNotFound)?;
    let game = room.game.lock().await;
    Ok(game.public_view())
}

/// ゲーム中はDMとマフィアの会話を伏せる。全文は終了後のみ。
pub async fn get_chat_log(state: &AppState, room_id: &str) -> Result<ChatLog, GameServiceError> {
    let room = state
        .get_room(room_id)
        .await
        .ok_or(GameServiceError::GameNotFound)?;
    let finished = room.game.lock().await.is_finished();
    let log = state
        .chat_logs
        .lock()
        .await
        .get(room_id)
        .cloned()
        .ok_or(GameServiceError::GameNotFound)?;
    let log = log
        .lock()
        .map(|log| if finished { log.clone() } else { log.public_only() })
        .map_err(|_| GameServiceError::GameNotFound)?;
    Ok(log)
}

/// `sender`が今`channel`で発言できるか
pub async fn check_speaker(
    state: &AppState,
    room_id: &str,
    sender: &str,
    channel: Channel,
) -> Result<(), GameServiceError> {
    let room = state
        .get_room(room_id)
        .await
        .ok_or(GameServiceError::GameNotFound)?;
    let game = room.game.lock().await;
    let player = game.find_by_user(sender).ok_or(CommandError::NotAPlayer)?;
    if !game.can_speak(player.id, channel) {
        return Err(GameServiceError::Muted);
    }
    Ok(())
}

/// マフィア専用チャンネルへの発言。生きているマフィアだけが夜の間に使える。
pub async fn faction_chat(
    state: &AppState,
    room_id: &str,
    sender: &str,
    content: &str,
) -> Result<(), GameServiceError> {
    let room = state
        .get_room(room_id)
        .await
        .ok_or(GameServiceError::GameNotFound)?;
    let text = {
        let game = room.game.lock().await;
        let player = game.find_by_user(sender).ok_or(CommandError::NotAPlayer)?;
        if !game.can_speak(player.id, Channel::Faction) {
            return Err(GameServiceError::Muted);
        }
        format!("**{}**: {}", player.name, content)
    };
    if let Err(e) = room.gateway.send(Channel::Faction, &text) {
        log::warn!("[{}] faction chat was not delivered: {}", room_id, e);
    }
    Ok(())
}

pub async fn submit_command(
    state: &AppState,
    room_id: &str,
    sender: &str,
    content: &str,
    context: CommandContext,
) -> Result<CommandOutcome, GameServiceError> {
    let room = state
        .get_room(room_id)
        .await
        .ok_or(GameServiceError::GameNotFound)?;
    let outcome = command_service::handle_command(
        &room.game,
        room.gateway.as_ref(),
        sender,
        content,
        context,
    )
    .await?;
    Ok(outcome)
}
