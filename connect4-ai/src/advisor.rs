//! 走法建议
//!
//! 按固定优先级选择落子列，同一优先级内总是取列号最小者：
//! 1. 能直接获胜的列
//! 2. 能阻止对手直接获胜的列
//! 3. 中间列
//! 4. 第一个未满的列

use protocol::{Board, Seat, BOARD_COLUMNS, CENTER_COLUMN};
use tracing::trace;

/// 机器人走法建议器（无状态）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveAdvisor {
    seat: Seat,
}

impl MoveAdvisor {
    /// 为指定座位创建建议器
    pub fn new(seat: Seat) -> Self {
        Self { seat }
    }

    /// 选择落子列，棋盘已满时返回 `None`
    pub fn choose_column(&self, board: &Board) -> Option<usize> {
        if let Some(column) = Self::winning_column(board, self.seat) {
            trace!(column, "机器人直接取胜");
            return Some(column);
        }

        if let Some(column) = Self::winning_column(board, self.seat.opponent()) {
            trace!(column, "机器人封堵对手");
            return Some(column);
        }

        if !board.is_column_full(CENTER_COLUMN) {
            return Some(CENTER_COLUMN);
        }

        board.open_columns().next()
    }

    /// 找出 `seat` 落下后立即获胜的最小列号
    fn winning_column(board: &Board, seat: Seat) -> Option<usize> {
        (0..BOARD_COLUMNS).find(|&column| {
            let mut trial = board.clone();
            trial.drop_disc(column, seat).is_ok() && trial.check_win(seat)
        })
    }
}
