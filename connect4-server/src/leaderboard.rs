//! 排行榜
//!
//! 只记录真人玩家的胜场，进程退出后不保留。

use std::collections::HashMap;

use protocol::LeaderboardSnapshot;

/// 排行榜
#[derive(Debug, Default)]
pub struct Leaderboard {
    wins: HashMap<String, u32>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一场胜利，返回新的胜场数
    pub fn record_win(&mut self, username: &str) -> u32 {
        let count = self.wins.entry(username.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// 完整快照
    pub fn snapshot(&self) -> LeaderboardSnapshot {
        self.wins.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_win() {
        let mut board = Leaderboard::new();
        assert!(board.snapshot().is_empty());
        assert_eq!(board.record_win("alice"), 1);
        assert_eq!(board.record_win("alice"), 2);
        assert_eq!(board.record_win("bob"), 1);

        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["alice"], 2);
        assert_eq!(snapshot["bob"], 1);
    }
}
