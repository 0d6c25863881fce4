//! 服务端配置

use std::time::Duration;

use clap::Parser;
use protocol::{
    DEFAULT_LEADERBOARD_ADDR, DEFAULT_WS_ADDR, MATCHMAKING_TIMEOUT_SECS, RECONNECT_TIMEOUT_SECS,
};

/// 服务端配置，命令行参数优先，其次环境变量
#[derive(Debug, Clone, Parser)]
#[command(name = "connect4-server", about = "四子棋对战服务端")]
pub struct ServerConfig {
    /// WebSocket 对战服务监听地址
    #[arg(long, env = "CONNECT4_WS_ADDR", default_value = DEFAULT_WS_ADDR)]
    pub ws_addr: String,

    /// 排行榜 HTTP 服务监听地址
    #[arg(long, env = "CONNECT4_LEADERBOARD_ADDR", default_value = DEFAULT_LEADERBOARD_ADDR)]
    pub leaderboard_addr: String,

    /// 匹配等待超时（秒），超时后与机器人对战
    #[arg(long, env = "CONNECT4_MATCHMAKING_TIMEOUT", default_value_t = MATCHMAKING_TIMEOUT_SECS)]
    pub matchmaking_timeout_secs: u64,

    /// 断线重连宽限时间（秒）
    #[arg(long, env = "CONNECT4_RECONNECT_TIMEOUT", default_value_t = RECONNECT_TIMEOUT_SECS)]
    pub reconnect_timeout_secs: u64,
}

impl ServerConfig {
    /// 服务使用的超时设置
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            matchmaking: Duration::from_secs(self.matchmaking_timeout_secs),
            reconnect: Duration::from_secs(self.reconnect_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            leaderboard_addr: DEFAULT_LEADERBOARD_ADDR.to_string(),
            matchmaking_timeout_secs: MATCHMAKING_TIMEOUT_SECS,
            reconnect_timeout_secs: RECONNECT_TIMEOUT_SECS,
        }
    }
}

/// 超时设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// 匹配等待超时
    pub matchmaking: Duration,
    /// 断线重连宽限
    pub reconnect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        ServerConfig::default().timeouts()
    }
}
