//! 棋盘状态与规则
//!
//! 6 行 7 列，第 0 行为最上方。棋子只能通过 [`Board::drop_disc`] 落下，
//! 因此每一列的棋子始终从底部连续堆叠。

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_COLUMNS, BOARD_ROWS, WIN_LENGTH};
use crate::error::{BoardError, ProtocolError};
use crate::seat::Seat;

/// 连线检测的四个方向：横、竖、↘、↗
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// 线上传输的棋盘格式：0 空，1 一号位，2 二号位
type WireGrid = Vec<Vec<u8>>;

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireGrid", try_from = "WireGrid")]
pub struct Board {
    cells: [[Option<Seat>; BOARD_COLUMNS]; BOARD_ROWS],
}

impl Board {
    /// 创建空棋盘
    pub fn new() -> Self {
        Self {
            cells: [[None; BOARD_COLUMNS]; BOARD_ROWS],
        }
    }

    /// 获取指定格子
    pub fn get(&self, row: usize, column: usize) -> Option<Seat> {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .flatten()
    }

    /// 在指定列落子，返回落下的行号
    ///
    /// 从底部向上寻找第一个空格；列已满时不修改棋盘。
    pub fn drop_disc(&mut self, column: usize, seat: Seat) -> Result<usize, BoardError> {
        if column >= BOARD_COLUMNS {
            return Err(BoardError::ColumnOutOfRange { column });
        }

        for row in (0..BOARD_ROWS).rev() {
            if self.cells[row][column].is_none() {
                self.cells[row][column] = Some(seat);
                return Ok(row);
            }
        }

        Err(BoardError::ColumnFull { column })
    }

    /// 检查列是否已满（越界的列视为已满）
    pub fn is_column_full(&self, column: usize) -> bool {
        column >= BOARD_COLUMNS || self.cells[0][column].is_some()
    }

    /// 所有未满的列，按列号升序
    pub fn open_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..BOARD_COLUMNS).filter(move |&c| !self.is_column_full(c))
    }

    /// 棋盘是否已下满（顶行没有空格）
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(Option::is_some)
    }

    /// 检查某一方是否已连成四子
    pub fn check_win(&self, seat: Seat) -> bool {
        for row in 0..BOARD_ROWS {
            for column in 0..BOARD_COLUMNS {
                if self.cells[row][column] != Some(seat) {
                    continue;
                }
                for &(dr, dc) in &DIRECTIONS {
                    if self.run_from(row, column, dr, dc, seat) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// 从 (row, column) 沿方向检查是否有 WIN_LENGTH 个同色棋子
    fn run_from(&self, row: usize, column: usize, dr: isize, dc: isize, seat: Seat) -> bool {
        (0..WIN_LENGTH as isize).all(|step| {
            let r = row as isize + dr * step;
            let c = column as isize + dc * step;
            r >= 0
                && c >= 0
                && (r as usize) < BOARD_ROWS
                && (c as usize) < BOARD_COLUMNS
                && self.cells[r as usize][c as usize] == Some(seat)
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Board> for WireGrid {
    fn from(board: Board) -> Self {
        board
            .cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.map_or(0, |s| s.number())).collect())
            .collect()
    }
}

impl TryFrom<WireGrid> for Board {
    type Error = ProtocolError;

    fn try_from(grid: WireGrid) -> Result<Self, Self::Error> {
        if grid.len() != BOARD_ROWS {
            return Err(ProtocolError::InvalidBoard {
                reason: format!("expected {} rows, got {}", BOARD_ROWS, grid.len()),
            });
        }

        let mut board = Board::new();
        for (row, values) in grid.iter().enumerate() {
            if values.len() != BOARD_COLUMNS {
                return Err(ProtocolError::InvalidBoard {
                    reason: format!("row {} has {} columns", row, values.len()),
                });
            }
            for (column, &value) in values.iter().enumerate() {
                board.cells[row][column] = match value {
                    0 => None,
                    n => Some(Seat::from_number(n).ok_or_else(|| ProtocolError::InvalidBoard {
                        reason: format!("unknown cell value {} at ({}, {})", n, row, column),
                    })?),
                };
            }
        }

        // 不允许悬空的棋子
        for column in 0..BOARD_COLUMNS {
            for row in 0..BOARD_ROWS - 1 {
                if board.cells[row][column].is_some() && board.cells[row + 1][column].is_none() {
                    return Err(ProtocolError::InvalidBoard {
                        reason: format!("floating disc at ({}, {})", row, column),
                    });
                }
            }
        }

        Ok(board)
    }
}
