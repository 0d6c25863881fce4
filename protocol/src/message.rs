//! 消息类型定义
//!
//! 所有消息均为 JSON，使用 `type` 字段区分类型。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::constants::BOT_NAME;
use crate::error::{ProtocolError, Result};

/// 排行榜快照：用户名 -> 胜场数
pub type LeaderboardSnapshot = BTreeMap<String, u32>;

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 加入匹配（或以同名重连）
    Join { username: String },
    /// 在指定列落子
    Move { column: usize },
}

impl ClientMessage {
    /// 从 JSON 文本解析
    ///
    /// 用户名为空也视为无效消息。
    pub fn from_json(text: &str) -> Result<Self> {
        let msg: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::Join { username } = &msg {
            if username.trim().is_empty() {
                return Err(ProtocolError::UsernameEmpty);
            }
        }
        Ok(msg)
    }
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 对局开始
    Start { board: Board },
    /// 重连成功，附带当前棋盘
    Reconnected { board: Board },
    /// 有人落子后的棋盘
    Update { board: Board },
    /// 对局结束
    GameOver { board: Board, result: String },
}

impl ServerMessage {
    /// 序列化为 JSON 文本
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 消息携带的棋盘
    pub fn board(&self) -> &Board {
        match self {
            ServerMessage::Start { board }
            | ServerMessage::Reconnected { board }
            | ServerMessage::Update { board }
            | ServerMessage::GameOver { board, .. } => board,
        }
    }
}

/// 对局结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    /// 正常获胜
    Win { winner: String },
    /// 对手断线超时判负
    Forfeit { winner: String },
    /// 棋盘下满无人获胜
    Draw,
}

impl GameResult {
    /// 机器人获胜
    pub fn bot_win() -> Self {
        GameResult::Win {
            winner: BOT_NAME.to_string(),
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Win { winner } => write!(f, "{} won the game", winner),
            GameResult::Forfeit { winner } => {
                write!(f, "{} won the game (opponent disconnected)", winner)
            }
            GameResult::Draw => write!(f, "The game ended in a draw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seat::Seat;

    #[test]
    fn test_parse_join() {
        let msg = ClientMessage::from_json(r#"{"type":"join","username":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_parse_move() {
        let msg = ClientMessage::from_json(r#"{"type":"move","column":3}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { column: 3 });
    }

    #[test]
    fn test_parse_malformed() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"resign"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"move","column":-1}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"move"}"#).is_err());
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"join","username":"  "}"#),
            Err(ProtocolError::UsernameEmpty)
        ));
    }

    #[test]
    fn test_game_over_json() {
        let mut board = Board::new();
        board.drop_disc(3, Seat::PlayerOne).unwrap();
        let msg = ServerMessage::GameOver {
            board,
            result: GameResult::Win {
                winner: "alice".to_string(),
            }
            .to_string(),
        };

        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "game_over");
        assert_eq!(value["result"], "alice won the game");
        assert_eq!(value["board"][5][3], serde_json::json!(1));
    }

    #[test]
    fn test_result_text() {
        assert_eq!(GameResult::bot_win().to_string(), "Bot won the game");
        assert_eq!(
            GameResult::Forfeit {
                winner: "bob".to_string()
            }
            .to_string(),
            "bob won the game (opponent disconnected)"
        );
        assert_eq!(GameResult::Draw.to_string(), "The game ended in a draw");
    }
}
