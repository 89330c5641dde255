use serde::{Deserialize, Serialize};

use super::state::{
    Board, GameEvent, GameState, IntegrityError, Move, Outcome, Phase, Player, Position,
    CELL_COUNT,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IllegalMoveReason {
    GameFinished,
    WrongPhase,
    CellOutOfRange,
    CellOccupied,
    NotOwnPiece,
    NoCountersLeft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    IllegalMove {
        mv: Move,
        reason: IllegalMoveReason,
    },
    IntegrityViolation {
        error: IntegrityError,
    },
}

impl RuleError {
    fn illegal(mv: Move, reason: IllegalMoveReason) -> Self {
        RuleError::IllegalMove { mv, reason }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        Self {
            state,
            events,
            outcome,
        }
    }
}

/// 规则引擎：合法着法生成、胜负判定与状态推进。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        RuleEngine
    }

    /// 当前行棋方的全部合法着法。对局结束后为空。
    pub fn legal_moves(state: &GameState) -> Vec<Move> {
        if state.is_finished() {
            return Vec::new();
        }
        Self::legal_moves_for(&state.position())
    }

    /// 快照局面上行棋方的合法着法，不判断胜负。
    pub fn legal_moves_for(position: &Position) -> Vec<Move> {
        if position.phase == Phase::Placement && position.counters.get(position.to_move) == 0 {
            return Vec::new();
        }
        Self::candidate_moves(&position.board, position.phase, position.to_move)
    }

    /// 按阶段枚举某一方的着法形状，忽略剩余棋子数。
    ///
    /// 放置阶段为每个空格一个 `Place`；移动阶段为（己方棋子 × 空格）的全部组合。
    pub fn candidate_moves(board: &Board, phase: Phase, player: Player) -> Vec<Move> {
        match phase {
            Phase::Placement => board
                .empty_cells()
                .map(|cell| Move::Place { cell })
                .collect(),
            Phase::Movement => {
                let empties: Vec<usize> = board.empty_cells().collect();
                board
                    .pieces_of(player)
                    .flat_map(|from| empties.iter().map(move |&to| Move::Relocate { from, to }))
                    .collect()
            }
        }
    }

    pub fn is_win(board: &Board, player: Player) -> bool {
        board.has_line(player)
    }

    pub fn is_draw(board: &Board) -> bool {
        board.is_full() && !Self::is_win(board, Player::X) && !Self::is_win(board, Player::O)
    }

    /// 判定棋盘终局。`last_mover` 优先，胜负先于和棋。
    pub fn terminal_outcome(board: &Board, last_mover: Player) -> Option<Outcome> {
        if Self::is_win(board, last_mover) {
            return Some(Outcome::Win {
                winner: last_mover,
            });
        }
        if Self::is_win(board, last_mover.opponent()) {
            return Some(Outcome::Win {
                winner: last_mover.opponent(),
            });
        }
        if Self::is_draw(board) {
            return Some(Outcome::Draw);
        }
        None
    }

    pub fn validate(state: &GameState, mv: Move) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::illegal(mv, IllegalMoveReason::GameFinished));
        }

        let player = state.current_player;
        match (state.phase, mv) {
            (Phase::Placement, Move::Place { cell }) => {
                if cell >= CELL_COUNT {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::CellOutOfRange));
                }
                if !state.board.is_empty(cell) {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::CellOccupied));
                }
                if state.counters.get(player) == 0 {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::NoCountersLeft));
                }
                Ok(())
            }
            (Phase::Movement, Move::Relocate { from, to }) => {
                if from >= CELL_COUNT || to >= CELL_COUNT {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::CellOutOfRange));
                }
                if !state.board.cells()[from].is_owned_by(player) {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::NotOwnPiece));
                }
                if !state.board.is_empty(to) {
                    return Err(RuleError::illegal(mv, IllegalMoveReason::CellOccupied));
                }
                Ok(())
            }
            (Phase::Placement, Move::Relocate { .. }) | (Phase::Movement, Move::Place { .. }) => {
                Err(RuleError::illegal(mv, IllegalMoveReason::WrongPhase))
            }
        }
    }

    /// 校验并执行一步棋。失败时状态保持不变。
    ///
    /// 终局时行棋方不再切换，`current_player` 保留为胜者。
    pub fn apply_move(
        &mut self,
        state: &mut GameState,
        mv: Move,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::validate(state, mv)?;

        let mover = state.current_player;
        let next = state.position().with_move(mv);
        let mut events = Vec::new();

        state.board = next.board;
        state.counters = next.counters;
        state.turn = state.turn.saturating_add(1);

        let move_event = match mv {
            Move::Place { cell } => GameEvent::CounterPlaced {
                player: mover,
                cell,
            },
            Move::Relocate { from, to } => GameEvent::PieceRelocated {
                player: mover,
                from,
                to,
            },
        };
        state.record_event(move_event.clone());
        events.push(move_event);

        if next.phase != state.phase {
            state.phase = next.phase;
            let phase_event = GameEvent::PhaseChanged { phase: next.phase };
            state.record_event(phase_event.clone());
            events.push(phase_event);
            log::info!("all counters placed, entering {:?} phase", next.phase);
        }

        if let Some(outcome) = Self::terminal_outcome(&state.board, mover) {
            state.declare_outcome(outcome);
            events.push(match outcome {
                Outcome::Win { winner } => GameEvent::GameWon { winner },
                Outcome::Draw => GameEvent::GameDrawn,
            });
            log::info!("game over after turn {}: {:?}", state.turn - 1, outcome);
            return Ok(events);
        }

        state.current_player = next.to_move;
        Ok(events)
    }

    pub fn check_outcome(state: &GameState) -> Option<Outcome> {
        state
            .outcome
            .or_else(|| Self::terminal_outcome(&state.board, state.current_player.opponent()))
    }

    pub fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Cell, Counters, WIN_PATTERNS};

    fn board_of(marks: &str) -> Board {
        let mut cells = [Cell::Empty; CELL_COUNT];
        for (index, mark) in marks.chars().enumerate() {
            cells[index] = match mark {
                'X' => Cell::Occupied(Player::X),
                'O' => Cell::Occupied(Player::O),
                _ => Cell::Empty,
            };
        }
        Board::from_cells(cells)
    }

    fn play_all(state: &mut GameState, moves: &[Move]) {
        let mut engine = RuleEngine::new();
        for mv in moves {
            engine
                .apply_move(state, *mv)
                .expect("scripted move should be legal");
        }
    }

    #[test]
    fn placement_offers_every_empty_cell() {
        let state = GameState::from_parts(
            board_of("X...O...."),
            Counters::new(2, 2),
            Phase::Placement,
            Player::X,
        );
        let moves = RuleEngine::legal_moves(&state);
        let cells: Vec<usize> = moves.iter().map(Move::destination).collect();
        assert_eq!(cells, vec![1, 2, 3, 5, 6, 7, 8]);
        assert!(moves.iter().all(|mv| matches!(mv, Move::Place { .. })));
    }

    #[test]
    fn movement_offers_own_pieces_times_empty_cells() {
        let state = GameState::from_parts(
            board_of("XOXO.O.X."),
            Counters::new(0, 0),
            Phase::Movement,
            Player::X,
        );
        let moves = RuleEngine::legal_moves(&state);
        assert_eq!(moves.len(), 9);
        for mv in &moves {
            match *mv {
                Move::Relocate { from, to } => {
                    assert!(state.board.cells()[from].is_owned_by(Player::X));
                    assert!(state.board.is_empty(to));
                }
                Move::Place { .. } => panic!("placement move offered in movement phase"),
            }
        }
    }

    #[test]
    fn rejected_move_leaves_state_untouched() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::from_parts(
            board_of("X...O...."),
            Counters::new(2, 2),
            Phase::Placement,
            Player::X,
        );
        let before = state.clone();

        let occupied = engine.apply_move(&mut state, Move::Place { cell: 4 });
        assert_eq!(
            occupied,
            Err(RuleError::IllegalMove {
                mv: Move::Place { cell: 4 },
                reason: IllegalMoveReason::CellOccupied,
            })
        );

        let wrong_shape = engine.apply_move(&mut state, Move::Relocate { from: 0, to: 1 });
        assert!(matches!(
            wrong_shape,
            Err(RuleError::IllegalMove {
                reason: IllegalMoveReason::WrongPhase,
                ..
            })
        ));

        let out_of_range = engine.apply_move(&mut state, Move::Place { cell: 9 });
        assert!(matches!(
            out_of_range,
            Err(RuleError::IllegalMove {
                reason: IllegalMoveReason::CellOutOfRange,
                ..
            })
        ));

        assert_eq!(state, before);
    }

    #[test]
    fn relocation_must_start_from_own_piece() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::from_parts(
            board_of("XOXO.O.X."),
            Counters::new(0, 0),
            Phase::Movement,
            Player::X,
        );

        for (from, reason) in [
            (1, IllegalMoveReason::NotOwnPiece),
            (4, IllegalMoveReason::NotOwnPiece),
        ] {
            let mv = Move::Relocate { from, to: 6 };
            assert_eq!(
                engine.apply_move(&mut state, mv),
                Err(RuleError::IllegalMove { mv, reason })
            );
        }

        let into_occupied = Move::Relocate { from: 0, to: 1 };
        assert_eq!(
            engine.apply_move(&mut state, into_occupied),
            Err(RuleError::IllegalMove {
                mv: into_occupied,
                reason: IllegalMoveReason::CellOccupied,
            })
        );
    }

    #[test]
    fn phase_flips_exactly_once_after_last_placement() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new(Player::X);
        let script = [0, 1, 5, 3, 7, 8];
        let mut flips = 0;

        for (index, cell) in script.iter().enumerate() {
            assert_eq!(state.phase, Phase::Placement, "flipped early at move {index}");
            let events = engine
                .apply_move(&mut state, Move::Place { cell: *cell })
                .expect("placement should succeed");
            flips += events
                .iter()
                .filter(|event| matches!(event, GameEvent::PhaseChanged { .. }))
                .count();
        }

        assert_eq!(flips, 1);
        assert_eq!(state.phase, Phase::Movement);
        assert!(state.counters.all_placed());
        assert_eq!(state.current_player, Player::X);
        assert!(RuleEngine::legal_moves(&state)
            .iter()
            .all(|mv| matches!(mv, Move::Relocate { .. })));

        engine
            .apply_move(&mut state, Move::Relocate { from: 0, to: 2 })
            .expect("relocation should succeed");
        assert_eq!(state.phase, Phase::Movement);
        assert_eq!(state.current_player, Player::O);
    }

    #[test]
    fn win_keeps_winner_as_current_player() {
        let mut state = GameState::new(Player::X);
        play_all(
            &mut state,
            &[
                Move::Place { cell: 0 },
                Move::Place { cell: 3 },
                Move::Place { cell: 1 },
                Move::Place { cell: 4 },
                Move::Place { cell: 2 },
            ],
        );

        assert_eq!(state.outcome, Some(Outcome::Win { winner: Player::X }));
        assert_eq!(state.current_player, Player::X);
        assert!(RuleEngine::legal_moves(&state).is_empty());
        assert!(matches!(
            state.event_log.last(),
            Some(GameEvent::GameWon { winner: Player::X })
        ));

        let mut engine = RuleEngine::new();
        assert!(matches!(
            engine.apply_move(&mut state, Move::Place { cell: 8 }),
            Err(RuleError::IllegalMove {
                reason: IllegalMoveReason::GameFinished,
                ..
            })
        ));
    }

    #[test]
    fn movement_win_is_detected() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::from_parts(
            board_of("XX.OO...X"),
            Counters::new(0, 0),
            Phase::Movement,
            Player::X,
        );
        let events = engine
            .apply_move(&mut state, Move::Relocate { from: 8, to: 2 })
            .expect("winning relocation should be legal");
        assert!(events.contains(&GameEvent::GameWon { winner: Player::X }));
        assert_eq!(state.winner(), Some(Player::X));
    }

    #[test]
    fn win_and_draw_are_exclusive() {
        let full_no_line = board_of("XOXXOOOXX");
        assert!(RuleEngine::is_draw(&full_no_line));
        assert!(!RuleEngine::is_win(&full_no_line, Player::X));
        assert!(!RuleEngine::is_win(&full_no_line, Player::O));

        let full_with_line = board_of("XXXOOXOXO");
        assert!(RuleEngine::is_win(&full_with_line, Player::X));
        assert!(!RuleEngine::is_draw(&full_with_line));
        assert_eq!(
            RuleEngine::terminal_outcome(&full_with_line, Player::O),
            Some(Outcome::Win { winner: Player::X })
        );

        assert!(!RuleEngine::is_draw(&board_of("XO.......")));
    }

    #[test]
    fn every_pattern_is_a_win() {
        for pattern in WIN_PATTERNS {
            let mut cells = [Cell::Empty; CELL_COUNT];
            for index in pattern {
                cells[index] = Cell::Occupied(Player::O);
            }
            let board = Board::from_cells(cells);
            assert!(RuleEngine::is_win(&board, Player::O));
            assert!(!RuleEngine::is_win(&board, Player::X));
        }
    }
}
