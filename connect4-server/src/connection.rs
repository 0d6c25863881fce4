//! 连接管理

use std::collections::HashMap;

use protocol::{Seat, ServerMessage};
use tokio::sync::mpsc;

use crate::game::MatchId;

/// 连接 ID
pub type ConnectionId = u64;

/// 单个客户端连接
#[derive(Debug)]
pub struct ClientConnection {
    /// 发往该连接的消息通道
    tx: mpsc::UnboundedSender<ServerMessage>,
    /// 最近一次 join 声明的用户名
    pub username: Option<String>,
    /// 当前所在对局和座位
    pub binding: Option<(MatchId, Seat)>,
}

/// 连接管理器
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, ClientConnection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新连接
    pub fn register(&mut self, id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) {
        self.connections.insert(
            id,
            ClientConnection {
                tx,
                username: None,
                binding: None,
            },
        );
    }

    /// 移除连接
    pub fn remove(&mut self, id: ConnectionId) -> Option<ClientConnection> {
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.connections.get(&id)
    }

    /// 检查连接是否存在
    pub fn exists(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// 记录连接声明的用户名
    pub fn set_username(&mut self, id: ConnectionId, username: &str) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.username = Some(username.to_string());
        }
    }

    /// 将连接绑定到对局座位
    pub fn bind(&mut self, id: ConnectionId, match_id: MatchId, seat: Seat) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.binding = Some((match_id, seat));
        }
    }

    /// 解除所有绑定到该对局的连接
    pub fn unbind_match(&mut self, match_id: MatchId) {
        for conn in self.connections.values_mut() {
            if matches!(conn.binding, Some((id, _)) if id == match_id) {
                conn.binding = None;
            }
        }
    }

    /// 发送消息给连接，连接已关闭时返回 false
    pub fn send(&self, id: ConnectionId, msg: ServerMessage) -> bool {
        match self.connections.get(&id) {
            Some(conn) => conn.tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// 在线连接数量
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Board;
    use uuid::Uuid;

    #[test]
    fn test_register_and_send() {
        let mut manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register(1, tx);

        assert!(manager.exists(1));
        assert!(manager.send(1, ServerMessage::Update { board: Board::new() }));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Update { .. })));

        assert!(!manager.send(2, ServerMessage::Update { board: Board::new() }));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let mut manager = ConnectionManager::new();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.register(1, tx);
        drop(rx);
        assert!(!manager.send(1, ServerMessage::Update { board: Board::new() }));
    }

    #[test]
    fn test_bind_and_unbind_match() {
        let mut manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.register(1, tx.clone());
        manager.register(2, tx);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        manager.bind(1, a, Seat::PlayerOne);
        manager.bind(2, b, Seat::PlayerTwo);

        manager.unbind_match(a);
        assert_eq!(manager.get(1).unwrap().binding, None);
        assert_eq!(manager.get(2).unwrap().binding, Some((b, Seat::PlayerTwo)));

        manager.set_username(1, "alice");
        assert_eq!(manager.get(1).unwrap().username.as_deref(), Some("alice"));

        assert!(manager.remove(1).is_some());
        assert_eq!(manager.count(), 1);
    }
}
