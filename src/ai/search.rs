//! 极小化极大搜索与 alpha-beta 剪枝。
//!
//! 每次递归都在 [`Position`] 副本上推演，兄弟分支看到的永远是未修改的父局面。

use serde::{Deserialize, Serialize};

use super::evaluation::{evaluate_position, order_moves, WIN_SCORE};
use crate::game::{Move, Player, Position, RuleEngine};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub depth_reached: u8,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn visit(&mut self, ply: u8) {
        self.nodes += 1;
        if ply + 1 > self.depth_reached {
            self.depth_reached = ply + 1;
        }
    }
}

/// 以 `maximizer` 为最大化方的搜索器。
#[derive(Debug, Clone)]
pub struct Searcher {
    maximizer: Player,
    stats: SearchStats,
}

impl Searcher {
    pub fn new(maximizer: Player) -> Self {
        Self {
            maximizer,
            stats: SearchStats::new(),
        }
    }

    pub fn maximizer(&self) -> Player {
        self.maximizer
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// 不剪枝的极小化极大。
    ///
    /// 在 `position` 的副本上由行棋方走 `mv`，之后还要看 `depth` 层。
    /// 深度耗尽或出现连线时返回 [`evaluate_position`]。
    pub fn minimax(&mut self, position: &Position, mv: Move, depth: u8) -> i32 {
        self.minimax_at(position, mv, depth, 0)
    }

    fn minimax_at(&mut self, position: &Position, mv: Move, depth: u8, ply: u8) -> i32 {
        self.stats.visit(ply);
        let child = position.with_move(mv);

        if depth == 0
            || RuleEngine::is_win(&child.board, Player::X)
            || RuleEngine::is_win(&child.board, Player::O)
        {
            return evaluate_position(&child.board, child.phase, self.maximizer);
        }

        let moves = RuleEngine::legal_moves_for(&child);
        if moves.is_empty() {
            return 0;
        }

        let maximizing = child.to_move == self.maximizer;
        let scores = moves
            .into_iter()
            .map(|next| self.minimax_at(&child, next, depth - 1, ply + 1))
            .collect::<Vec<_>>();

        if maximizing {
            scores.into_iter().max().unwrap_or(0)
        } else {
            scores.into_iter().min().unwrap_or(0)
        }
    }

    /// 带 alpha-beta 剪枝和着法排序的搜索。
    ///
    /// 终局分值按离根的步数修正（`WIN_SCORE - ply`），越快的胜利、越慢的失败得分越高。
    /// 非终局且无着可走时返回 0。
    pub fn alpha_beta(
        &mut self,
        position: &Position,
        mv: Move,
        depth: u8,
        alpha: i32,
        beta: i32,
    ) -> i32 {
        self.alpha_beta_at(position, mv, depth, 0, alpha, beta)
    }

    fn alpha_beta_at(
        &mut self,
        position: &Position,
        mv: Move,
        depth: u8,
        ply: u8,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.stats.visit(ply);
        let child = position.with_move(mv);

        if RuleEngine::is_win(&child.board, self.maximizer) {
            return WIN_SCORE - ply as i32;
        }
        if RuleEngine::is_win(&child.board, self.maximizer.opponent()) {
            return -WIN_SCORE + ply as i32;
        }
        if depth == 0 {
            return evaluate_position(&child.board, child.phase, self.maximizer);
        }

        let moves = order_moves(&child, RuleEngine::legal_moves_for(&child));
        if moves.is_empty() {
            return 0;
        }

        if child.to_move == self.maximizer {
            let mut value = i32::MIN;
            for next in moves {
                let score = self.alpha_beta_at(&child, next, depth - 1, ply + 1, alpha, beta);
                value = value.max(score);
                alpha = alpha.max(value);
                if beta <= alpha {
                    break;
                }
            }
            value
        } else {
            let mut value = i32::MAX;
            for next in moves {
                let score = self.alpha_beta_at(&child, next, depth - 1, ply + 1, alpha, beta);
                value = value.min(score);
                beta = beta.min(value);
                if beta <= alpha {
                    break;
                }
            }
            value
        }
    }
}
