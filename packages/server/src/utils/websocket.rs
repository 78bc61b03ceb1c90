use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chrono;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::models::chat::{ChatMessage, ChatMessageType};
use crate::models::command::CommandContext;
use crate::models::notice::{Channel, SpeakerGroup};
use crate::models::player::{Player, PlayerId};
use crate::services::command_service::CommandOutcome;
use crate::services::game_service::{self, GameServiceError};
use crate::services::gateway::{Gateway, GatewayError};
use crate::state::{AppState, SharedChatLog};
use crate::utils::config::ChannelNames;

/// クライアントから届くメッセージ
#[derive(Debug, Serialize, Deserialize)]
struct WebSocketMessage {
    message_type: String,
    player_id: String,
    player_name: String,
    content: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    room_id: String,
}

/// サーバーから送るメッセージ。`recipients`があればその相手にだけ届ける。
#[derive(Debug, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message_type: String, // "broadcast", "private", "permission"
    pub room_id: String,
    pub channel: Option<String>,
    pub content: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub group: Option<SpeakerGroup>,
    pub allowed: Option<bool>,
    pub timestamp: String,
}

impl OutboundMessage {
    fn new(message_type: &str, room_id: &str) -> Self {
        Self {
            message_type: message_type.to_string(),
            room_id: room_id.to_string(),
            channel: None,
            content: None,
            recipients: None,
            group: None,
            allowed: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn private(room_id: &str, recipient: &str, content: String) -> Self {
        Self {
            content: Some(content),
            recipients: Some(vec![recipient.to_string()]),
            ..Self::new("private", room_id)
        }
    }
}

/// 受信メッセージの種類。`message_type`が "private" ならDM、"mafia" ならマフィア専用チャンネル。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbound {
    Public,
    Private,
    Mafia,
}

impl WebSocketMessage {
    fn kind(&self) -> Inbound {
        match self.message_type.as_str() {
            "private" => Inbound::Private,
            "mafia" => Inbound::Mafia,
            _ => Inbound::Public,
        }
    }

    fn to_chat_message(&self) -> ChatMessage {
        let message_type = match self.kind() {
            Inbound::Private => ChatMessageType::Private,
            Inbound::Mafia => ChatMessageType::Mafia,
            Inbound::Public => ChatMessageType::Public,
        };

        ChatMessage::new(
            self.player_id.clone(),
            self.player_name.clone(),
            self.content.clone(),
            message_type,
        )
    }
}

/// ルームのブロードキャストチャンネルに乗せるゲートウェイ。
/// 送信先(公開ID→ユーザー、マフィアの面々、チャンネル名)は開始時に一度だけ解決する。
pub struct RoomGateway {
    room_id: String,
    tx: broadcast::Sender<Message>,
    channels: ChannelNames,
    roster: Vec<String>,
    mafia: Vec<String>,
    log: SharedChatLog,
}

impl RoomGateway {
    pub fn new(
        room_id: &str,
        tx: broadcast::Sender<Message>,
        channels: ChannelNames,
        players: &[Player],
        log: SharedChatLog,
    ) -> Self {
        Self {
            room_id: room_id.to_string(),
            tx,
            channels,
            roster: players.iter().map(|p| p.user_id.clone()).collect(),
            mafia: players
                .iter()
                .filter(|p| p.role.is_mafia())
                .map(|p| p.user_id.clone())
                .collect(),
            log,
        }
    }

    fn emit(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        let text =
            serde_json::to_string(message).map_err(|e| GatewayError::Delivery(e.to_string()))?;
        // 購読者がいないだけなら失敗扱いにしない
        let _ = self.tx.send(Message::Text(text));
        Ok(())
    }

    fn record(&self, recipient: &str, content: &str, message_type: ChatMessageType) {
        if let Ok(mut log) = self.log.lock() {
            log.add_message(ChatMessage::new(
                recipient.to_string(),
                "System".to_string(),
                content.to_string(),
                message_type,
            ));
        }
    }
}

impl Gateway for RoomGateway {
    fn send(&self, channel: Channel, text: &str) -> Result<(), GatewayError> {
        let recipients = match channel {
            Channel::Phase => None,
            Channel::Faction => Some(self.mafia.clone()),
        };
        self.emit(&OutboundMessage {
            channel: Some(self.channels.name(channel).to_string()),
            content: Some(text.to_string()),
            recipients,
            ..OutboundMessage::new("broadcast", &self.room_id)
        })?;
        if let Ok(mut log) = self.log.lock() {
            log.add_system_message(text.to_string(), channel.into());
        }
        Ok(())
    }

    fn send_private(&self, player: PlayerId, text: &str) -> Result<(), GatewayError> {
        let user_id = self
            .roster
            .get(player)
            .ok_or(GatewayError::UnknownPlayer(player))?;
        self.emit(&OutboundMessage::private(
            &self.room_id,
            user_id,
            text.to_string(),
        ))?;
        self.record(user_id, text, ChatMessageType::Private);
        Ok(())
    }

    fn set_can_speak(
        &self,
        channel: Channel,
        group: SpeakerGroup,
        allowed: bool,
    ) -> Result<(), GatewayError> {
        self.emit(&OutboundMessage {
            channel: Some(self.channels.name(channel).to_string()),
            group: Some(group),
            allowed: Some(allowed),
            ..OutboundMessage::new("permission", &self.room_id)
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub player_id: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let player_id = params
        .player_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state.clone(), room_id, player_id))
}

/// この接続宛てか(ルームが一致し、宛先指定があれば自分が含まれる)
fn is_for(text: &str, room_id: &str, player_id: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return true;
    };
    if let Some(room) = value.get("room_id").and_then(|r| r.as_str()) {
        if room != room_id {
            return false;
        }
    }
    match value.get("recipients").and_then(|r| r.as_array()) {
        Some(list) => list.iter().any(|r| r.as_str() == Some(player_id)),
        None => true,
    }
}

fn relay(tx: &broadcast::Sender<Message>, message: &WebSocketMessage) {
    match serde_json::to_string(message) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text));
        }
        Err(e) => eprintln!("Error encoding message: {}", e),
    }
}

pub async fn handle_socket(ws: WebSocket, state: AppState, room_id: String, player_id: String) {
    info!(
        "New WebSocket connection established for room {} (player {})",
        room_id, player_id
    );
    let tx = state.get_or_create_room_channel(&room_id).await;

    let (mut sender, mut receiver) = ws.split();
    let mut rx = tx.subscribe();

    let state_for_cleanup = state.clone();
    let room_id_for_send = room_id.clone();
    let room_id_for_receive = room_id.clone();
    let player_id_for_send = player_id.clone();

    let receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let mut ws_message = match serde_json::from_str::<WebSocketMessage>(&text) {
                Ok(m) => m,
                Err(e) => {
                    let error = OutboundMessage::private(
                        &room_id_for_receive,
                        &player_id,
                        format!("Malformed message: {}", e),
                    );
                    if let Ok(error_response) = serde_json::to_string(&error) {
                        info!("Sending error message: {}", error_response);
                        let _ = tx.send(Message::Text(error_response));
                    }
                    continue;
                }
            };
            // 送信者は接続時のIDで固定する
            ws_message.player_id = player_id.clone();
            ws_message.room_id = room_id_for_receive.clone();
            ws_message.timestamp = chrono::Utc::now().to_rfc3339();

            let kind = ws_message.kind();
            let reply = match kind {
                // マフィアの会話はゲートウェイ経由でマフィアにだけ届く(ログもそちらで残る)
                Inbound::Mafia => {
                    match game_service::faction_chat(
                        &state,
                        &room_id_for_receive,
                        &ws_message.player_id,
                        &ws_message.content,
                    )
                    .await
                    {
                        Ok(()) | Err(GameServiceError::GameNotFound) => None,
                        Err(e) => Some(e.to_string()),
                    }
                }
                Inbound::Private | Inbound::Public => {
                    if let Err(e) = state
                        .save_chat_message(&room_id_for_receive, ws_message.to_chat_message())
                        .await
                    {
                        eprintln!("Error saving chat message: {}", e);
                    }
                    let context = match kind {
                        Inbound::Private => CommandContext::Private,
                        _ => CommandContext::Public,
                    };
                    let result = game_service::submit_command(
                        &state,
                        &room_id_for_receive,
                        &ws_message.player_id,
                        &ws_message.content,
                        context,
                    )
                    .await;
                    match result {
                        Ok(CommandOutcome::Accepted { reply, .. }) => Some(reply),
                        Ok(CommandOutcome::Ignored) if kind == Inbound::Public => {
                            // 雑談は発言権があるときだけ公開チャンネルに流す
                            match game_service::check_speaker(
                                &state,
                                &room_id_for_receive,
                                &ws_message.player_id,
                                Channel::Phase,
                            )
                            .await
                            {
                                Ok(()) | Err(GameServiceError::GameNotFound) => {
                                    relay(&tx, &ws_message);
                                    None
                                }
                                Err(e) => Some(e.to_string()),
                            }
                        }
                        Ok(CommandOutcome::Ignored) | Err(GameServiceError::GameNotFound) => None,
                        Err(e) => Some(e.to_string()),
                    }
                }
            };

            let Some(reply) = reply else {
                continue;
            };
            let outbound = serde_json::to_string(&OutboundMessage::private(
                &room_id_for_receive,
                &player_id,
                reply,
            ));

            match outbound {
                Ok(response) => {
                    info!(
                        "Received valid message in room {}: {:?}",
                        room_id_for_receive, response
                    );
                    if let Err(e) = tx.send(Message::Text(response)) {
                        eprintln!("Error sending message: {}", e);
                        break;
                    }
                }
                Err(e) => eprintln!("Error encoding message: {}", e),
            }
        }
    });

    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if let Message::Text(text) = &msg {
                if !is_for(text, &room_id_for_send, &player_id_for_send) {
                    continue;
                }
            }

            if let Err(e) = sender.send(msg).await {
                eprintln!("Error sending message: {}", e);
                break;
            }
        }
    });

    let _ = tokio::join!(receive_task, send_task);
    state_for_cleanup.release_room_channel(&room_id).await;
}
