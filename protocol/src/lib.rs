//! 四子棋共享协议库
//!
//! 包含:
//! - 棋盘、座位等核心数据结构
//! - 落子与四连判定规则
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 对局结果与排行榜快照

mod board;
mod constants;
mod error;
mod message;
mod seat;

pub use board::Board;
pub use constants::*;
pub use error::{BoardError, ProtocolError, Result};
pub use message::{ClientMessage, GameResult, LeaderboardSnapshot, ServerMessage};
pub use seat::Seat;
