use serde::{Deserialize, Serialize};

use super::error::CommandError;

/// コマンドがどこから来たか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandContext {
    /// DMでの夜の能力
    Private,
    /// 公開チャンネルでの裁判コマンド
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Target(usize),
    CancelAction,
    Nominate(usize),
    CancelVote,
    Guilty,
    Innocent,
}

impl Command {
    /// `Ok(None)` means the text is ordinary chat, not a command.
    pub fn parse(text: &str, context: CommandContext) -> Result<Option<Command>, CommandError> {
        let text = text.trim();
        match context {
            CommandContext::Private => {
                if text.eq_ignore_ascii_case("cancel") {
                    return Ok(Some(Command::CancelAction));
                }
                parse_id(text).map(|id| Some(Command::Target(id)))
            }
            CommandContext::Public => {
                let mut words = text.split_whitespace();
                let command = match words.next() {
                    Some(word) if word.starts_with('!') => word.to_ascii_lowercase(),
                    _ => return Ok(None),
                };
                match command.as_str() {
                    "!vote" => {
                        let id = words.next().ok_or(CommandError::InvalidPlayerId)?;
                        parse_id(id).map(|id| Some(Command::Nominate(id)))
                    }
                    "!cancel" => Ok(Some(Command::CancelVote)),
                    "!guilty" => Ok(Some(Command::Guilty)),
                    "!innocent" => Ok(Some(Command::Innocent)),
                    _ => Ok(None),
                }
            }
        }
    }
}

fn parse_id(text: &str) -> Result<usize, CommandError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommandError::InvalidPlayerId);
    }
    text.parse().map_err(|_| CommandError::InvalidPlayerId)
}
