//! 座位定义

use serde::{Deserialize, Serialize};

/// 座位（先手 / 后手），与玩家身份无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// 一号位（先手）
    PlayerOne,
    /// 二号位（后手）
    PlayerTwo,
}

impl Seat {
    /// 获取对方座位
    pub fn opponent(&self) -> Seat {
        match self {
            Seat::PlayerOne => Seat::PlayerTwo,
            Seat::PlayerTwo => Seat::PlayerOne,
        }
    }

    /// 在 `playerOrder` 中的下标
    pub fn index(&self) -> usize {
        match self {
            Seat::PlayerOne => 0,
            Seat::PlayerTwo => 1,
        }
    }

    /// 棋盘编码中使用的编号（1 或 2）
    pub fn number(&self) -> u8 {
        match self {
            Seat::PlayerOne => 1,
            Seat::PlayerTwo => 2,
        }
    }

    /// 从棋盘编号解析
    pub fn from_number(n: u8) -> Option<Seat> {
        match n {
            1 => Some(Seat::PlayerOne),
            2 => Some(Seat::PlayerTwo),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent() {
        assert_eq!(Seat::PlayerOne.opponent(), Seat::PlayerTwo);
        assert_eq!(Seat::PlayerTwo.opponent(), Seat::PlayerOne);
    }

    #[test]
    fn test_number() {
        assert_eq!(Seat::from_number(Seat::PlayerTwo.number()), Some(Seat::PlayerTwo));
        assert_eq!(Seat::from_number(0), None);
        assert_eq!(Seat::from_number(3), None);
    }
}
