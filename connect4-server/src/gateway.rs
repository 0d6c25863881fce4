//! 网络接入
//!
//! - WebSocket：每个连接一个任务，解析客户端消息并转交对局服务，
//!   同时把服务发来的消息写回连接
//! - HTTP：只读的排行榜查询

use std::ops::ControlFlow;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use protocol::ClientMessage;
use tracing::{debug, info, warn};

use crate::connection::ConnectionId;
use crate::server::ServiceHandle;

/// 对战 WebSocket 路由（`/` 与 `/ws`）
pub fn game_router(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/", get(ws_upgrade))
        .route("/ws", get(ws_upgrade))
        .with_state(handle)
}

/// 排行榜路由
pub fn leaderboard_router(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/leaderboard", get(get_leaderboard))
        .with_state(handle)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(handle): State<ServiceHandle>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(handle, socket))
}

/// 单个 WebSocket 连接的收发循环
async fn handle_socket(handle: ServiceHandle, mut socket: WebSocket) {
    let (conn, mut outbound) = handle.connect();
    info!(conn, "玩家已连接");

    loop {
        tokio::select! {
            Some(msg) = outbound.recv() => {
                let json = match msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(conn, "消息序列化失败: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                if handle_frame(&handle, conn, incoming).is_break() {
                    break;
                }
            }
        }
    }

    handle.disconnect(conn);
    info!(conn, "玩家已断开");
}

/// 处理一帧入站数据，返回 `Break` 时关闭连接
fn handle_frame(
    handle: &ServiceHandle,
    conn: ConnectionId,
    incoming: Option<Result<Message, axum::Error>>,
) -> ControlFlow<()> {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            match ClientMessage::from_json(text.as_str()) {
                Ok(msg) => handle.message(conn, msg),
                // 无法解析的消息直接丢弃，连接保持
                Err(e) => debug!(conn, "丢弃无效消息: {}", e),
            }
            ControlFlow::Continue(())
        }
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => ControlFlow::Break(()),
        Some(Ok(_)) => ControlFlow::Continue(()),
    }
}

/// GET /leaderboard
async fn get_leaderboard(State(handle): State<ServiceHandle>) -> Response {
    match handle.leaderboard().await {
        Ok(snapshot) => (
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(snapshot),
        )
            .into_response(),
        Err(e) => {
            warn!("排行榜查询失败: {:#}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "leaderboard unavailable").into_response()
        }
    }
}
