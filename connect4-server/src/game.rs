//! 对局控制
//!
//! 一局游戏的权威状态：棋盘、当前回合、双方身份、连接和断线计时器。

use chrono::{DateTime, Utc};
use protocol::{Board, BoardError, GameResult, Seat, BOT_NAME};
use thiserror::Error;
use uuid::Uuid;

use crate::connection::ConnectionId;
use crate::timer::TimerHandle;

/// 对局 ID
pub type MatchId = Uuid;

/// 参与者身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    /// 真人玩家（用户名）
    Human(String),
    /// 机器人
    Bot,
}

impl Participant {
    /// 显示名称
    pub fn name(&self) -> &str {
        match self {
            Participant::Human(name) => name,
            Participant::Bot => BOT_NAME,
        }
    }

    /// 真人玩家的用户名
    pub fn as_human(&self) -> Option<&str> {
        match self {
            Participant::Human(name) => Some(name),
            Participant::Bot => None,
        }
    }
}

/// 落子被拒绝的原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejected {
    #[error("not {0:?}'s turn")]
    NotYourTurn(Seat),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// 落子之后的局面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// 对局继续，轮到对方
    Continue,
    /// 落子方获胜
    Won(Seat),
    /// 棋盘已满，无人获胜
    Draw,
}

/// 对局终局方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 连成四子
    Win(Seat),
    /// 对手断线超时，该座位获胜
    Forfeit(Seat),
    /// 和棋
    Draw,
}

impl Outcome {
    /// 获胜座位
    pub fn winner(&self) -> Option<Seat> {
        match self {
            Outcome::Win(seat) | Outcome::Forfeit(seat) => Some(*seat),
            Outcome::Draw => None,
        }
    }
}

/// 对局
#[derive(Debug)]
pub struct Match {
    pub id: MatchId,
    pub board: Board,
    pub current_turn: Seat,
    pub is_bot_match: bool,
    /// 下标 0 为一号位
    pub player_order: [Participant; 2],
    /// 各座位当前绑定的连接（机器人和断线玩家为 None）
    connections: [Option<ConnectionId>; 2],
    /// 各座位的断线计时器
    disconnect_timers: [Option<TimerHandle>; 2],
    pub created_at: DateTime<Utc>,
}

impl Match {
    fn new(player_order: [Participant; 2], connections: [Option<ConnectionId>; 2]) -> Self {
        let is_bot_match = player_order.contains(&Participant::Bot);
        Self {
            id: Uuid::new_v4(),
            board: Board::new(),
            current_turn: Seat::PlayerOne,
            is_bot_match,
            player_order,
            connections,
            disconnect_timers: [None, None],
            created_at: Utc::now(),
        }
    }

    /// 两名真人玩家对局，先加入者为一号位
    pub fn new_pvp(first: (String, ConnectionId), second: (String, ConnectionId)) -> Self {
        Self::new(
            [Participant::Human(first.0), Participant::Human(second.0)],
            [Some(first.1), Some(second.1)],
        )
    }

    /// 人机对局，真人为一号位
    pub fn new_bot(username: String, conn: ConnectionId) -> Self {
        Self::new(
            [Participant::Human(username), Participant::Bot],
            [Some(conn), None],
        )
    }

    /// 指定座位的参与者
    pub fn participant(&self, seat: Seat) -> &Participant {
        &self.player_order[seat.index()]
    }

    /// 机器人座位
    pub fn bot_seat(&self) -> Option<Seat> {
        [Seat::PlayerOne, Seat::PlayerTwo]
            .into_iter()
            .find(|seat| *self.participant(*seat) == Participant::Bot)
    }

    /// 是否轮到机器人
    pub fn is_bot_turn(&self) -> bool {
        self.bot_seat() == Some(self.current_turn)
    }

    /// 按用户名查找座位
    ///
    /// 同名的两个座位优先返回当前断线的那个。
    pub fn seat_of(&self, username: &str) -> Option<Seat> {
        let mut found = None;
        for seat in [Seat::PlayerOne, Seat::PlayerTwo] {
            if self.participant(seat).as_human() == Some(username) {
                if self.connections[seat.index()].is_none() {
                    return Some(seat);
                }
                found.get_or_insert(seat);
            }
        }
        found
    }

    /// 指定座位绑定的连接
    pub fn connection(&self, seat: Seat) -> Option<ConnectionId> {
        self.connections[seat.index()]
    }

    /// 所有在线的连接
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.iter().flatten().copied()
    }

    /// 重新绑定连接（重连），返回被取消的断线计时器
    pub fn bind_connection(&mut self, seat: Seat, conn: ConnectionId) -> Option<TimerHandle> {
        self.connections[seat.index()] = Some(conn);
        self.disconnect_timers[seat.index()].take()
    }

    /// 解除连接绑定
    ///
    /// 仅当该座位仍绑定在 `conn` 上时生效，旧连接晚到的关闭事件不会影响重连后的新连接。
    pub fn unbind_connection(&mut self, seat: Seat, conn: ConnectionId) -> bool {
        if self.connections[seat.index()] == Some(conn) {
            self.connections[seat.index()] = None;
            true
        } else {
            false
        }
    }

    /// 记录断线计时器，替换掉的旧计时器会被取消
    pub fn arm_grace_timer(&mut self, seat: Seat, timer: TimerHandle) {
        if let Some(old) = self.disconnect_timers[seat.index()].replace(timer) {
            old.cancel();
        }
    }

    /// 指定座位当前断线计时器的令牌
    pub fn grace_token(&self, seat: Seat) -> Option<u64> {
        self.disconnect_timers[seat.index()]
            .as_ref()
            .map(TimerHandle::token)
    }

    /// 取消所有断线计时器
    pub fn cancel_timers(&mut self) {
        for timer in self.disconnect_timers.iter_mut().filter_map(Option::take) {
            timer.cancel();
        }
    }

    /// 执行落子
    ///
    /// 不是 `seat` 的回合或该列不可落子时不修改任何状态。
    pub fn apply_move(&mut self, seat: Seat, column: usize) -> Result<MoveOutcome, MoveRejected> {
        if seat != self.current_turn {
            return Err(MoveRejected::NotYourTurn(seat));
        }

        self.board.drop_disc(column, seat)?;

        if self.board.check_win(seat) {
            return Ok(MoveOutcome::Won(seat));
        }
        if self.board.is_full() {
            return Ok(MoveOutcome::Draw);
        }

        self.current_turn = seat.opponent();
        Ok(MoveOutcome::Continue)
    }

    /// 生成对局结果
    pub fn result(&self, outcome: Outcome) -> GameResult {
        match outcome {
            Outcome::Win(seat) => GameResult::Win {
                winner: self.participant(seat).name().to_string(),
            },
            Outcome::Forfeit(seat) => GameResult::Forfeit {
                winner: self.participant(seat).name().to_string(),
            },
            Outcome::Draw => GameResult::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{BOARD_COLUMNS, BOARD_ROWS};

    fn pvp() -> Match {
        Match::new_pvp(("alice".to_string(), 1), ("bob".to_string(), 2))
    }

    #[test]
    fn test_new_pvp() {
        let m = pvp();
        assert_eq!(m.current_turn, Seat::PlayerOne);
        assert!(!m.is_bot_match);
        assert_eq!(m.participant(Seat::PlayerOne).name(), "alice");
        assert_eq!(m.participant(Seat::PlayerTwo).name(), "bob");
        assert_eq!(m.bot_seat(), None);
        assert_eq!(m.connections().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_new_bot() {
        let m = Match::new_bot("alice".to_string(), 7);
        assert!(m.is_bot_match);
        assert_eq!(m.bot_seat(), Some(Seat::PlayerTwo));
        assert_eq!(m.participant(Seat::PlayerTwo).name(), BOT_NAME);
        assert_eq!(m.seat_of(BOT_NAME), None);
        assert!(!m.is_bot_turn());
        assert_eq!(m.connections().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_wrong_turn_is_rejected() {
        let mut m = pvp();
        assert_eq!(
            m.apply_move(Seat::PlayerTwo, 0),
            Err(MoveRejected::NotYourTurn(Seat::PlayerTwo))
        );
        assert_eq!(m.board, Board::new());
        assert_eq!(m.current_turn, Seat::PlayerOne);
    }

    #[test]
    fn test_move_flips_turn() {
        let mut m = pvp();
        assert_eq!(m.apply_move(Seat::PlayerOne, 3), Ok(MoveOutcome::Continue));
        assert_eq!(m.current_turn, Seat::PlayerTwo);
        assert_eq!(m.board.get(BOARD_ROWS - 1, 3), Some(Seat::PlayerOne));
    }

    #[test]
    fn test_full_column_is_rejected() {
        let mut m = pvp();
        for i in 0..BOARD_ROWS {
            let seat = if i % 2 == 0 { Seat::PlayerOne } else { Seat::PlayerTwo };
            m.apply_move(seat, 0).unwrap();
        }
        let before = m.board.clone();
        assert_eq!(
            m.apply_move(Seat::PlayerOne, 0),
            Err(MoveRejected::Board(BoardError::ColumnFull { column: 0 }))
        );
        assert_eq!(m.board, before);
        assert_eq!(m.current_turn, Seat::PlayerOne);

        assert!(m.apply_move(Seat::PlayerOne, BOARD_COLUMNS).is_err());
    }

    #[test]
    fn test_vertical_win() {
        let mut m = pvp();
        for _ in 0..3 {
            m.apply_move(Seat::PlayerOne, 0).unwrap();
            m.apply_move(Seat::PlayerTwo, 1).unwrap();
        }
        assert_eq!(m.apply_move(Seat::PlayerOne, 0), Ok(MoveOutcome::Won(Seat::PlayerOne)));
        assert_eq!(
            m.result(Outcome::Win(Seat::PlayerOne)),
            GameResult::Win {
                winner: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_last_cell_is_a_draw() {
        let mut m = pvp();
        // 每两列翻转一次颜色，整盘不会出现四连
        for column in 0..BOARD_COLUMNS {
            for i in 0..BOARD_ROWS {
                if column == BOARD_COLUMNS - 1 && i == BOARD_ROWS - 1 {
                    break;
                }
                let seat = if (column / 2 + i) % 2 == 0 { Seat::PlayerOne } else { Seat::PlayerTwo };
                m.board.drop_disc(column, seat).unwrap();
            }
        }
        m.current_turn = Seat::PlayerOne;
        assert_eq!(
            m.apply_move(Seat::PlayerOne, BOARD_COLUMNS - 1),
            Ok(MoveOutcome::Draw)
        );
        assert_eq!(m.result(Outcome::Draw), GameResult::Draw);
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut m = pvp();
        assert!(!m.unbind_connection(Seat::PlayerOne, 99));
        assert!(m.unbind_connection(Seat::PlayerOne, 1));
        assert_eq!(m.connection(Seat::PlayerOne), None);
        assert_eq!(m.seat_of("alice"), Some(Seat::PlayerOne));

        assert!(m.bind_connection(Seat::PlayerOne, 5).is_none());
        assert_eq!(m.connection(Seat::PlayerOne), Some(5));
    }

    #[test]
    fn test_seat_of_prefers_disconnected_duplicate() {
        let mut m = Match::new_pvp(("sam".to_string(), 1), ("sam".to_string(), 2));
        assert_eq!(m.seat_of("sam"), Some(Seat::PlayerOne));
        m.unbind_connection(Seat::PlayerTwo, 2);
        assert_eq!(m.seat_of("sam"), Some(Seat::PlayerTwo));
    }

    #[test]
    fn test_forfeit_result_names_opponent() {
        let m = Match::new_bot("alice".to_string(), 1);
        assert_eq!(
            m.result(Outcome::Forfeit(Seat::PlayerTwo)).to_string(),
            "Bot won the game (opponent disconnected)"
        );
        assert_eq!(Outcome::Forfeit(Seat::PlayerTwo).winner(), Some(Seat::PlayerTwo));
        assert_eq!(Outcome::Draw.winner(), None);
    }
}
