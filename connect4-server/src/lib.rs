//! 四子棋服务端
//!
//! 包含:
//! - 匹配与人机兜底
//! - 对局控制与回合仲裁
//! - 断线重连
//! - 排行榜
//! - WebSocket / HTTP 接入

pub mod config;
pub mod connection;
pub mod game;
pub mod gateway;
pub mod leaderboard;
pub mod registry;
pub mod server;
pub mod timer;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

pub use config::{ServerConfig, Timeouts};
pub use connection::{ConnectionId, ConnectionManager};
pub use game::{Match, MatchId, MoveOutcome, MoveRejected, Outcome, Participant};
pub use leaderboard::Leaderboard;
pub use registry::{PendingPlayer, SessionRegistry};
pub use server::{Event, GameService, MatchSnapshot, MessageHandler, ServerState, ServerStats, ServiceHandle};

/// 启动对局服务和两个监听端口，直到任一服务出错
pub async fn run(config: ServerConfig) -> Result<()> {
    let handle = GameService::spawn(config.timeouts());

    let ws_listener = TcpListener::bind(&config.ws_addr)
        .await
        .with_context(|| format!("无法监听 {}", config.ws_addr))?;
    let leaderboard_listener = TcpListener::bind(&config.leaderboard_addr)
        .await
        .with_context(|| format!("无法监听 {}", config.leaderboard_addr))?;

    info!("WebSocket 服务: ws://{}", config.ws_addr);
    info!("排行榜服务: http://{}/leaderboard", config.leaderboard_addr);

    let game = gateway::game_router(handle.clone());
    let leaderboard = gateway::leaderboard_router(handle);

    tokio::try_join!(
        async { axum::serve(ws_listener, game).await },
        async { axum::serve(leaderboard_listener, leaderboard).await },
    )?;

    Ok(())
}
