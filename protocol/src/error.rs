//! 错误类型定义

use thiserror::Error;

/// 落子规则错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// 列号越界
    #[error("Column {column} is out of range")]
    ColumnOutOfRange { column: usize },

    /// 该列已满
    #[error("Column {column} is full")]
    ColumnFull { column: usize },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 棋盘数据无效
    #[error("Invalid board: {reason}")]
    InvalidBoard { reason: String },

    /// 用户名为空
    #[error("Username is empty")]
    UsernameEmpty,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
