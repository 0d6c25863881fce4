//! 对局注册表
//!
//! 保存所有进行中的对局，以及唯一的匹配等待位。

use std::collections::HashMap;

use protocol::Seat;

use crate::connection::ConnectionId;
use crate::game::{Match, MatchId};
use crate::timer::TimerHandle;

/// 等待匹配的玩家
#[derive(Debug)]
pub struct PendingPlayer {
    pub conn: ConnectionId,
    pub username: String,
    /// 匹配超时计时器，令牌即等待位的票据
    pub timer: TimerHandle,
}

impl PendingPlayer {
    pub fn ticket(&self) -> u64 {
        self.timer.token()
    }
}

/// 对局注册表
#[derive(Debug, Default)]
pub struct SessionRegistry {
    matches: HashMap<MatchId, Match>,
    pending: Option<PendingPlayer>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入新对局
    pub fn insert(&mut self, m: Match) -> MatchId {
        let id = m.id;
        self.matches.insert(id, m);
        id
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&id)
    }

    /// 移除对局
    pub fn remove(&mut self, id: MatchId) -> Option<Match> {
        self.matches.remove(&id)
    }

    /// 在所有对局中按用户名查找（重连用）
    pub fn find_by_username(&self, username: &str) -> Option<(MatchId, Seat)> {
        self.matches
            .values()
            .find_map(|m| m.seat_of(username).map(|seat| (m.id, seat)))
    }

    /// 进行中的对局数量
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// 当前等待匹配的玩家
    pub fn pending(&self) -> Option<&PendingPlayer> {
        self.pending.as_ref()
    }

    /// 占用等待位，已被占用时返回 Err 并交还玩家
    pub fn set_pending(&mut self, player: PendingPlayer) -> Result<(), PendingPlayer> {
        if self.pending.is_some() {
            return Err(player);
        }
        self.pending = Some(player);
        Ok(())
    }

    /// 取出等待位上的玩家
    pub fn take_pending(&mut self) -> Option<PendingPlayer> {
        self.pending.take()
    }

    /// 仅当等待位仍持有该票据时取出
    pub fn take_pending_if(&mut self, ticket: u64) -> Option<PendingPlayer> {
        match &self.pending {
            Some(p) if p.ticket() == ticket => self.pending.take(),
            _ => None,
        }
    }

    /// 仅当等待位由该连接占用时取出
    pub fn take_pending_for(&mut self, conn: ConnectionId) -> Option<PendingPlayer> {
        match &self.pending {
            Some(p) if p.conn == conn => self.pending.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Event;
    use crate::timer::Scheduler;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn pending(scheduler: &mut Scheduler, conn: ConnectionId, name: &str) -> PendingPlayer {
        PendingPlayer {
            conn,
            username: name.to_string(),
            timer: scheduler.schedule(Duration::from_secs(10), |token| Event::MatchmakingTimeout { token }),
        }
    }

    #[tokio::test]
    async fn test_pending_slot_holds_one() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        let mut registry = SessionRegistry::new();

        assert!(registry.set_pending(pending(&mut scheduler, 1, "alice")).is_ok());
        let rejected = registry.set_pending(pending(&mut scheduler, 2, "bob"));
        assert_eq!(rejected.map_err(|p| p.conn), Err(2));
        assert_eq!(registry.pending().map(|p| p.conn), Some(1));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        let mut registry = SessionRegistry::new();

        let first = pending(&mut scheduler, 1, "alice");
        let stale = first.ticket();
        registry.set_pending(first).unwrap();
        registry.take_pending().unwrap().timer.cancel();

        let second = pending(&mut scheduler, 2, "bob");
        let current = second.ticket();
        registry.set_pending(second).unwrap();

        assert!(registry.take_pending_if(stale).is_none());
        assert!(registry.take_pending_for(1).is_none());
        assert_eq!(registry.take_pending_if(current).map(|p| p.conn), Some(2));
        assert!(registry.pending().is_none());
    }

    #[test]
    fn test_find_by_username() {
        let mut registry = SessionRegistry::new();
        let id = registry.insert(Match::new_pvp(("alice".to_string(), 1), ("bob".to_string(), 2)));
        registry.insert(Match::new_bot("carol".to_string(), 3));

        assert_eq!(registry.find_by_username("bob"), Some((id, Seat::PlayerTwo)));
        assert!(registry.find_by_username("Bot").is_none());
        assert!(registry.find_by_username("dave").is_none());
        assert_eq!(registry.match_count(), 2);

        assert!(registry.remove(id).is_some());
        assert!(registry.find_by_username("alice").is_none());
    }
}
