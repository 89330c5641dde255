use serde::{Deserialize, Serialize};

use super::rules::{IllegalMoveReason, RuleEngine, RuleError, RuleResolution};
use super::state::{GameEvent, GameMode, GameState, Move, Phase, Player, CELL_COUNT};
use crate::ai::{AiAgent, AiDecision, AiDifficulty};

/// 人机模式下电脑执后手。
pub const COMPUTER_SEAT: Player = Player::O;
/// 人类落子后电脑应手前的停顿。
pub const COMPUTER_MOVE_DELAY_MS: u32 = 500;

/// 一次点击的处理结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClickOutcome {
    Ignored,
    Selected { cell: usize },
    SelectionCleared,
    Moved { mv: Move, events: Vec<GameEvent> },
}

/// 前端持有的一局游戏：权威状态、模式、难度以及移动阶段的选中格。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    state: GameState,
    mode: GameMode,
    difficulty: AiDifficulty,
    #[serde(default)]
    selected_cell: Option<usize>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameMode::default(), AiDifficulty::default())
    }
}

impl GameSession {
    pub fn new(mode: GameMode, difficulty: AiDifficulty) -> Self {
        log::info!("new game: {:?}, difficulty {}", mode, difficulty.level());
        Self {
            state: GameState::new(Player::X),
            mode,
            difficulty,
            selected_cell: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// 替换当前局面，外部数据必须通过完整性检查。
    pub fn load_state(&mut self, state: GameState) -> Result<(), RuleError> {
        RuleEngine::ensure_integrity(&state)?;
        self.state = state;
        self.selected_cell = None;
        Ok(())
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> AiDifficulty {
        self.difficulty
    }

    pub fn selected_cell(&self) -> Option<usize> {
        self.selected_cell
    }

    pub fn reset(&mut self) {
        log::info!("game reset");
        self.state = GameState::new(Player::X);
        self.selected_cell = None;
    }

    /// 切换模式不会清空棋盘。
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }

    pub fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        self.difficulty = difficulty;
    }

    pub fn is_computer_turn(&self) -> bool {
        self.mode == GameMode::HumanVsComputer
            && !self.state.is_finished()
            && self.state.current_player == COMPUTER_SEAT
    }

    /// 处理棋盘点击。
    ///
    /// 放置阶段点空格即落子；移动阶段先点己方棋子选中，再点空格移动，
    /// 点到其他有子的格子则取消选中。对局结束或轮到电脑时忽略点击。
    pub fn click_cell(&mut self, cell: usize) -> Result<ClickOutcome, RuleError> {
        if cell >= CELL_COUNT {
            return Err(RuleError::IllegalMove {
                mv: Move::Place { cell },
                reason: IllegalMoveReason::CellOutOfRange,
            });
        }
        if self.state.is_finished() || self.is_computer_turn() {
            return Ok(ClickOutcome::Ignored);
        }

        let player = self.state.current_player;
        let empty = self.state.board.is_empty(cell);

        match self.state.phase {
            Phase::Placement => {
                if !empty {
                    return Ok(ClickOutcome::Ignored);
                }
                self.play(Move::Place { cell })
            }
            Phase::Movement => match self.selected_cell {
                None if self.state.board.cells()[cell].is_owned_by(player) => {
                    self.selected_cell = Some(cell);
                    Ok(ClickOutcome::Selected { cell })
                }
                None => Ok(ClickOutcome::Ignored),
                Some(from) if empty => self.play(Move::Relocate { from, to: cell }),
                Some(_) => {
                    self.selected_cell = None;
                    Ok(ClickOutcome::SelectionCleared)
                }
            },
        }
    }

    /// 直接提交一步棋（不经过点击选中流程）。
    pub fn submit_move(&mut self, mv: Move) -> Result<RuleResolution, RuleError> {
        let mut engine = RuleEngine::new();
        let events = engine.apply_move(&mut self.state, mv)?;
        self.selected_cell = None;
        Ok(RuleResolution::new(self.state.clone(), events))
    }

    /// 让电脑为当前行棋方走一步，返回决策与执行结果。
    pub fn play_computer_turn<R: rand::Rng>(
        &mut self,
        agent: &mut AiAgent<R>,
    ) -> Result<(AiDecision, Option<RuleResolution>), RuleError> {
        let decision = agent.decide_action(&self.state);
        let applied = match decision.action {
            Some(mv) => Some(self.submit_move(mv)?),
            None => None,
        };
        Ok((decision, applied))
    }

    fn play(&mut self, mv: Move) -> Result<ClickOutcome, RuleError> {
        let resolution = self.submit_move(mv)?;
        Ok(ClickOutcome::Moved {
            mv,
            events: resolution.events,
        })
    }
}
