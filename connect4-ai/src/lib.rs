//! 四子棋 AI 引擎
//!
//! 包含:
//! - 基于优先级的确定性走法选择（先赢、再堵、后占中）

mod advisor;

pub use advisor::MoveAdvisor;
