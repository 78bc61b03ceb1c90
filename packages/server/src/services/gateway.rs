use crate::models::{
    notice::{Channel, Notice, SpeakerGroup},
    player::PlayerId,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("配送に失敗しました: {0}")]
    Delivery(String),
    #[error("不明なプレイヤーです: {0}")]
    UnknownPlayer(PlayerId),
}

/// チャット会場との境界。送信・DM・発言権の切り替えを外部に任せる。
pub trait Gateway: Send + Sync {
    fn send(&self, channel: Channel, text: &str) -> Result<(), GatewayError>;

    fn send_private(&self, player: PlayerId, text: &str) -> Result<(), GatewayError>;

    fn set_can_speak(
        &self,
        channel: Channel,
        group: SpeakerGroup,
        allowed: bool,
    ) -> Result<(), GatewayError>;
}

/// Delivers notices one after another, in order. Failures are logged and skipped:
/// game state never depends on a delivery succeeding.
pub fn dispatch(gateway: &dyn Gateway, notices: &[Notice]) -> usize {
    let mut failed = 0;
    for notice in notices {
        let result = match notice {
            Notice::Broadcast { channel, text } => gateway.send(*channel, text),
            Notice::Private { player, text } => gateway.send_private(*player, text),
            Notice::Permission {
                channel,
                group,
                allowed,
            } => gateway.set_can_speak(*channel, *group, *allowed),
        };
        if let Err(e) = result {
            failed += 1;
            log::warn!("notice dropped ({:?}): {}", notice, e);
        }
    }
    failed
}
