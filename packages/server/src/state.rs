use axum::extract::ws::Message;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

use crate::models::chat::{ChatLog, ChatMessage};
use crate::models::config::GameConfig;
use crate::models::game::Game;
use crate::services::gateway::Gateway;

/// 1ゲーム分の共有状態。コマンド処理とフェーズ進行はこのロックで直列化する。
pub type GameHandle = Arc<Mutex<Game>>;

/// ゲートウェイからは同期的に書き込むので std の Mutex
pub type SharedChatLog = Arc<std::sync::Mutex<ChatLog>>;

#[derive(Clone)]
pub struct GameRoom {
    pub game: GameHandle,
    pub gateway: Arc<dyn Gateway>,
}

#[derive(Clone)]
pub struct AppState {
    pub games: Arc<Mutex<HashMap<String, GameRoom>>>,
    pub channel: Arc<Mutex<HashMap<String, broadcast::Sender<Message>>>>,
    pub chat_logs: Arc<Mutex<HashMap<String, SharedChatLog>>>,
    pub game_config: Arc<GameConfig>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::from_env())
    }

    pub fn with_config(game_config: GameConfig) -> Self {
        AppState {
            games: Arc::new(Mutex::new(HashMap::new())),
            channel: Arc::new(Mutex::new(HashMap::new())),
            chat_logs: Arc::new(Mutex::new(HashMap::new())),
            game_config: Arc::new(game_config),
        }
    }

    pub async fn get_or_create_room_channel(&self, room_id: &str) -> broadcast::Sender<Message> {
        let mut channels = self.channel.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(1000);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    pub async fn get_or_create_chat_log(&self, room_id: &str) -> SharedChatLog {
        let mut logs = self.chat_logs.lock().await;
        logs.entry(room_id.to_string())
            .or_insert_with(|| {
                Arc::new(std::sync::Mutex::new(ChatLog::new(room_id.to_string())))
            })
            .clone()
    }

    pub async fn get_room(&self, room_id: &str) -> Option<GameRoom> {
        self.games.lock().await.get(room_id).cloned()
    }

    /// ゲームのないルームにはログを作らない
    pub async fn save_chat_message(&self, room_id: &str, message: ChatMessage) -> Result<(), String> {
        let Some(log) = self.chat_logs.lock().await.get(room_id).cloned() else {
            return Ok(());
        };
        let mut log = log
            .lock()
            .map_err(|_| "Chat log is unavailable".to_string())?;
        log.add_message(message);
        Ok(())
    }

    /// 購読者もゲームもなくなったルームのチャンネルを捨てる
    pub async fn release_room_channel(&self, room_id: &str) {
        if self.games.lock().await.contains_key(room_id) {
            return;
        }
        let mut channels = self.channel.lock().await;
        if channels
            .get(room_id)
            .map(|tx| tx.receiver_count() == 0)
            .unwrap_or(false)
        {
            channels.remove(room_id);
        }
    }
}
