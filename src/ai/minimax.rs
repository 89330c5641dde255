use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use super::evaluation::{order_moves, strategic_moves};
use super::search::{SearchStats, Searcher};
use crate::game::{GameState, Move, Phase, Player, Position, RuleEngine};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    /// 多数时候随机落子。
    Reactive,
    /// 放置阶段偏好中心和角，移动阶段偏好保留连线威胁。
    Weighted,
    /// 两层不剪枝的极小化极大，带随机失误。
    Shallow,
    /// 深层 alpha-beta 搜索。
    Deep,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reactive" | "random" => Ok(AiStrategy::Reactive),
            "weighted" | "heuristic" => Ok(AiStrategy::Weighted),
            "shallow" | "minimax" => Ok(AiStrategy::Shallow),
            "deep" | "alphabeta" | "alpha-beta" => Ok(AiStrategy::Deep),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    #[default]
    Easy,
    Normal,
    Hard,
    Expert,
}

impl AiDifficulty {
    pub fn level(self) -> u8 {
        match self {
            AiDifficulty::Easy => 1,
            AiDifficulty::Normal => 2,
            AiDifficulty::Hard => 3,
            AiDifficulty::Expert => 4,
        }
    }

    /// 未知等级按 1 级处理。
    pub fn from_level(level: u8) -> Self {
        match level {
            2 => AiDifficulty::Normal,
            3 => AiDifficulty::Hard,
            4 => AiDifficulty::Expert,
            _ => AiDifficulty::Easy,
        }
    }
}

impl From<u8> for AiDifficulty {
    fn from(level: u8) -> Self {
        AiDifficulty::from_level(level)
    }
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(AiDifficulty::Easy),
            "normal" | "medium" | "2" => Ok(AiDifficulty::Normal),
            "hard" | "3" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" | "4" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    pub strategy: AiStrategy,
    pub placement_depth: u8,
    pub movement_depth: u8,
    /// Reactive：随机落子的概率；Shallow：放弃最佳着的概率。
    pub random_move_chance: f64,
    /// Weighted 放置阶段直接取最佳战略位置的概率。
    pub greedy_chance: f64,
    /// Weighted 移动阶段从威胁着法中挑选的概率。
    pub threat_chance: f64,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            AiDifficulty::Easy => Self {
                strategy: AiStrategy::Reactive,
                placement_depth: 0,
                movement_depth: 0,
                random_move_chance: 0.8,
                greedy_chance: 0.0,
                threat_chance: 0.0,
            },
            AiDifficulty::Normal => Self {
                strategy: AiStrategy::Weighted,
                placement_depth: 0,
                movement_depth: 0,
                random_move_chance: 0.0,
                greedy_chance: 0.7,
                threat_chance: 0.6,
            },
            AiDifficulty::Hard => Self {
                strategy: AiStrategy::Shallow,
                placement_depth: 2,
                movement_depth: 2,
                random_move_chance: 0.2,
                greedy_chance: 0.0,
                threat_chance: 0.0,
            },
            AiDifficulty::Expert => Self {
                strategy: AiStrategy::Deep,
                placement_depth: 6,
                movement_depth: 5,
                random_move_chance: 0.0,
                greedy_chance: 0.0,
                threat_chance: 0.0,
            },
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        if matches!(self.strategy, AiStrategy::Shallow | AiStrategy::Deep)
            && self.placement_depth == 0
        {
            self.placement_depth = 2;
            self.movement_depth = 2;
        }
        self
    }

    pub fn search_depth(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Placement => self.placement_depth,
            Phase::Movement => self.movement_depth,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::default())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Winning,
    Blocking,
    Strategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Move>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DecisionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i32>,
    pub depth_reached: u8,
    pub nodes: u64,
    pub duration_ms: u64,
    pub strategy: AiStrategy,
}

impl AiDecision {
    fn idle(strategy: AiStrategy, start: Instant) -> Self {
        Self {
            action: None,
            source: None,
            evaluation: None,
            depth_reached: 0,
            nodes: 0,
            duration_ms: start.elapsed().as_millis() as u64,
            strategy,
        }
    }
}

/// `player` 能一步连成三子的第一个着法。
pub fn winning_move(position: &Position, player: Player) -> Option<Move> {
    if position.phase == Phase::Placement && position.counters.get(player) == 0 {
        return None;
    }
    RuleEngine::candidate_moves(&position.board, position.phase, player)
        .into_iter()
        .find(|mv| RuleEngine::is_win(&position.board.with_move(*mv, player), player))
}

/// 对手下一步即可获胜的格子。
fn threatened_cells(position: &Position, opponent: Player) -> Vec<usize> {
    // 对手已放完棋子时，下一手只能是移动。
    let phase = match position.phase {
        Phase::Placement if position.counters.get(opponent) == 0 => Phase::Movement,
        phase => phase,
    };
    let mut cells: Vec<usize> = RuleEngine::candidate_moves(&position.board, phase, opponent)
        .into_iter()
        .filter(|mv| RuleEngine::is_win(&position.board.with_move(*mv, opponent), opponent))
        .map(|mv| mv.destination())
        .collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// 占住对手获胜格的着法。优先选择走完后对手仍无法立即获胜的那一步。
pub fn blocking_move(position: &Position) -> Option<Move> {
    let opponent = position.to_move.opponent();
    let threats = threatened_cells(position, opponent);
    if threats.is_empty() {
        return None;
    }

    let blocks: Vec<Move> = RuleEngine::legal_moves_for(position)
        .into_iter()
        .filter(|mv| threats.contains(&mv.destination()))
        .collect();

    blocks
        .iter()
        .copied()
        .find(|mv| {
            let child = position.with_move(*mv);
            threatened_cells(&child, opponent).is_empty()
        })
        .or_else(|| blocks.first().copied())
}

/// 先取胜，再封堵；都没有时返回 `None`。
pub fn tactical_move(position: &Position) -> Option<(Move, DecisionSource)> {
    if let Some(mv) = winning_move(position, position.to_move) {
        return Some((mv, DecisionSource::Winning));
    }
    blocking_move(position).map(|mv| (mv, DecisionSource::Blocking))
}

pub struct AiAgent<R = SmallRng> {
    config: AiConfig,
    rng: R,
}

impl AiAgent<SmallRng> {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        Self::new(AiConfig::from_difficulty(difficulty))
    }
}

impl<R: Rng> AiAgent<R> {
    pub fn with_rng(config: AiConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AiConfig) {
        self.config = config;
    }

    /// 为当前行棋方挑选一步棋。
    pub fn decide_action(&mut self, state: &GameState) -> AiDecision {
        let start = Instant::now();
        let strategy = self.config.strategy;

        if state.is_finished() {
            return AiDecision::idle(strategy, start);
        }

        let position = state.position();
        let moves = RuleEngine::legal_moves_for(&position);
        if moves.is_empty() {
            return AiDecision::idle(strategy, start);
        }

        if let Some((mv, source)) = tactical_move(&position) {
            log::debug!("{:?} plays {:?} ({:?})", position.to_move, mv, source);
            return AiDecision {
                action: Some(mv),
                source: Some(source),
                evaluation: None,
                depth_reached: 1,
                nodes: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                strategy,
            };
        }

        let mut searcher = Searcher::new(position.to_move);
        let (action, evaluation) = match strategy {
            AiStrategy::Reactive => (self.reactive_move(&position, &moves), None),
            AiStrategy::Weighted => (self.weighted_move(&position, &moves), None),
            AiStrategy::Shallow => self.shallow_search(&position, &moves, &mut searcher),
            AiStrategy::Deep => self.deep_search(&position, moves, &mut searcher),
        };
        let SearchStats {
            nodes,
            depth_reached,
        } = searcher.stats();

        log::debug!(
            "{:?} plays {:?} via {:?} (score {:?}, {} nodes)",
            position.to_move,
            action,
            strategy,
            evaluation,
            nodes
        );

        AiDecision {
            action,
            source: action.map(|_| DecisionSource::Strategy),
            evaluation,
            depth_reached,
            nodes,
            duration_ms: start.elapsed().as_millis() as u64,
            strategy,
        }
    }

    fn reactive_move(&mut self, position: &Position, moves: &[Move]) -> Option<Move> {
        if self.rng.gen_bool(self.config.random_move_chance) {
            return moves.choose(&mut self.rng).copied();
        }
        match position.phase {
            Phase::Placement => strategic_moves(moves.to_vec())
                .choose(&mut self.rng)
                .copied(),
            Phase::Movement => moves.choose(&mut self.rng).copied(),
        }
    }

    fn weighted_move(&mut self, position: &Position, moves: &[Move]) -> Option<Move> {
        match position.phase {
            Phase::Placement => {
                let ordered = strategic_moves(moves.to_vec());
                if self.rng.gen_bool(self.config.greedy_chance) {
                    ordered.first().copied()
                } else {
                    ordered.choose(&mut self.rng).copied()
                }
            }
            Phase::Movement => {
                let me = position.to_move;
                let threats: Vec<Move> = moves
                    .iter()
                    .copied()
                    .filter(|mv| {
                        let child = position.with_move(*mv);
                        winning_move(&child, me).is_some()
                    })
                    .collect();
                if !threats.is_empty() && self.rng.gen_bool(self.config.threat_chance) {
                    return threats.choose(&mut self.rng).copied();
                }
                moves.choose(&mut self.rng).copied()
            }
        }
    }

    fn shallow_search(
        &mut self,
        position: &Position,
        moves: &[Move],
        searcher: &mut Searcher,
    ) -> (Option<Move>, Option<i32>) {
        let depth = self.config.search_depth(position.phase);
        let mut best: Option<(Move, i32)> = None;
        for &mv in moves {
            let score = searcher.minimax(position, mv, depth);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mv, score));
            }
        }

        let Some((best_move, best_score)) = best else {
            return (None, None);
        };

        if moves.len() > 1 && self.rng.gen_bool(self.config.random_move_chance) {
            let others: Vec<Move> = moves.iter().copied().filter(|mv| *mv != best_move).collect();
            if let Some(&handicap) = others.choose(&mut self.rng) {
                log::debug!("handicap: skipping {:?} for {:?}", best_move, handicap);
                return (Some(handicap), None);
            }
        }

        (Some(best_move), Some(best_score))
    }

    fn deep_search(
        &mut self,
        position: &Position,
        moves: Vec<Move>,
        searcher: &mut Searcher,
    ) -> (Option<Move>, Option<i32>) {
        let depth = self.config.search_depth(position.phase);
        let mut alpha = i32::MIN;
        let mut best: Option<(Move, i32)> = None;

        for mv in order_moves(position, moves) {
            let score = searcher.alpha_beta(position, mv, depth, alpha, i32::MAX);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mv, score));
            }
            alpha = alpha.max(score);
        }

        match best {
            Some((mv, score)) => (Some(mv), Some(score)),
            None => (None, None),
        }
    }
}

/// 用指定难度为当前行棋方挑一步棋，随机源取自系统熵。
pub fn computer_move(state: &GameState, difficulty: AiDifficulty) -> Option<Move> {
    AiAgent::from_difficulty(difficulty)
        .decide_action(state)
        .action
}
