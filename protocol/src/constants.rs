//! 协议常量定义

/// 棋盘行数
pub const BOARD_ROWS: usize = 6;

/// 棋盘列数
pub const BOARD_COLUMNS: usize = 7;

/// 中间列（机器人优先落子）
pub const CENTER_COLUMN: usize = 3;

/// 连成几子获胜
pub const WIN_LENGTH: usize = 4;

/// 机器人在对局结果中使用的名字
pub const BOT_NAME: &str = "Bot";

/// WebSocket 服务默认地址
pub const DEFAULT_WS_ADDR: &str = "0.0.0.0:8080";

/// 排行榜 HTTP 服务默认地址
pub const DEFAULT_LEADERBOARD_ADDR: &str = "0.0.0.0:3001";

/// 匹配等待超时（秒）- 超时后与机器人对战
pub const MATCHMAKING_TIMEOUT_SECS: u64 = 10;

/// 断线重连超时（秒）
pub const RECONNECT_TIMEOUT_SECS: u64 = 30;
