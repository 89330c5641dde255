//! 电脑对手：局面评估、搜索与分级策略。

pub mod evaluation;
pub mod minimax;
pub mod search;

pub use evaluation::{evaluate_position, order_moves, order_score, strategic_moves, WIN_SCORE};
pub use minimax::{
    blocking_move,
    computer_move,
    tactical_move,
    winning_move,
    AiAgent,
    AiConfig,
    AiDecision,
    AiDifficulty,
    AiStrategy,
    DecisionSource,
};
pub use search::{SearchStats, Searcher};
