use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 每名玩家的棋子数量。
pub const COUNTERS_PER_PLAYER: u8 = 3;
/// 棋盘格子数，按行优先编号 0–8。
pub const CELL_COUNT: usize = 9;
/// 事件日志最多保留的条数，超出后丢弃最早的记录。
pub const EVENT_LOG_LIMIT: usize = 64;

pub const CENTER: usize = 4;
pub const CORNERS: [usize; 4] = [0, 2, 6, 8];
pub const EDGES: [usize; 4] = [1, 3, 5, 7];

/// 八条连线：三行、三列、两条对角线。
pub const WIN_PATTERNS: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 玩家。X 先手。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Player::X => "X",
            Player::O => "O",
        }
    }
}

impl FromStr for Player {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Player::X),
            "O" => Ok(Player::O),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Occupied(Player),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Empty
    }
}

impl Cell {
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn owner(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(player) => Some(player),
        }
    }

    pub fn is_owned_by(self, player: Player) -> bool {
        self == Cell::Occupied(player)
    }
}

/// 3×3 棋盘。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn set(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Cell::Empty))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index)
    }

    pub fn pieces_of(&self, player: Player) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.is_owned_by(player))
            .map(|(index, _)| index)
    }

    pub fn count(&self, player: Player) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.is_owned_by(player))
            .count()
    }

    /// 交换双方棋子，用于对称性检查。
    pub fn swapped(&self) -> Board {
        let mut cells = self.cells;
        for cell in cells.iter_mut() {
            if let Cell::Occupied(player) = *cell {
                *cell = Cell::Occupied(player.opponent());
            }
        }
        Board { cells }
    }

    /// 仅在棋盘副本上落子或移子，不做合法性检查。
    pub fn with_move(&self, mv: Move, player: Player) -> Board {
        let mut next = *self;
        match mv {
            Move::Place { cell } => next.cells[cell] = Cell::Occupied(player),
            Move::Relocate { from, to } => {
                next.cells[from] = Cell::Empty;
                next.cells[to] = Cell::Occupied(player);
            }
        }
        next
    }

    /// `player` 是否占满任意一条连线。
    pub fn has_line(&self, player: Player) -> bool {
        WIN_PATTERNS
            .iter()
            .any(|pattern| pattern.iter().all(|&index| self.cells[index].is_owned_by(player)))
    }

    /// 统计某条连线上双方棋子和空格的数量：(player, opponent, empty)。
    pub fn line_counts(&self, pattern: &[usize; 3], player: Player) -> (u8, u8, u8) {
        let mut own = 0;
        let mut other = 0;
        let mut empty = 0;
        for &index in pattern {
            match self.cells[index] {
                Cell::Empty => empty += 1,
                Cell::Occupied(owner) if owner == player => own += 1,
                Cell::Occupied(_) => other += 1,
            }
        }
        (own, other, empty)
    }
}

/// 双方剩余可放置的棋子数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Counters {
    pub x: u8,
    pub o: u8,
}

impl Counters {
    pub fn new(x: u8, o: u8) -> Self {
        Self { x, o }
    }

    pub fn get(&self, player: Player) -> u8 {
        match player {
            Player::X => self.x,
            Player::O => self.o,
        }
    }

    pub fn decrement(&mut self, player: Player) {
        match player {
            Player::X => self.x = self.x.saturating_sub(1),
            Player::O => self.o = self.o.saturating_sub(1),
        }
    }

    pub fn all_placed(&self) -> bool {
        self.x == 0 && self.o == 0
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            x: COUNTERS_PER_PLAYER,
            o: COUNTERS_PER_PLAYER,
        }
    }
}

/// 游戏阶段：先放置，后移动。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    Placement,
    Movement,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Placement
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type")]
pub enum Move {
    Place { cell: usize },
    Relocate { from: usize, to: usize },
}

impl Move {
    /// 落点。
    pub fn destination(&self) -> usize {
        match *self {
            Move::Place { cell } => cell,
            Move::Relocate { to, .. } => to,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    Win { winner: Player },
    Draw,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    HumanVsHuman,
    HumanVsComputer,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::HumanVsHuman
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "pvp" | "human_vs_human" => Ok(GameMode::HumanVsHuman),
            "ai" | "computer" | "human_vs_computer" => Ok(GameMode::HumanVsComputer),
            _ => Err(()),
        }
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CounterPlaced {
        player: Player,
        cell: usize,
    },
    PieceRelocated {
        player: Player,
        from: usize,
        to: usize,
    },
    PhaseChanged {
        phase: Phase,
    },
    GameWon {
        winner: Player,
    },
    GameDrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    CountersOutOfRange { player: Player, value: u8 },
    PieceCountMismatch { player: Player, on_board: u8, remaining: u8 },
    PhaseMismatch { phase: Phase },
    OutcomeMismatch,
    MultipleWinners,
    TurnOrderMismatch { x: u8, o: u8 },
    NoCountersToPlace { player: Player },
}

/// 搜索使用的轻量快照：棋盘、剩余棋子、阶段和行棋方。
///
/// 该类型是 `Copy` 的，每层递归都在自己的副本上推演，
/// 权威的 [`GameState`] 永远不会被搜索修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub board: Board,
    pub counters: Counters,
    pub phase: Phase,
    pub to_move: Player,
}

impl Position {
    /// 在副本上为行棋方走一步：放置时扣减棋子，双方放完即进入移动阶段，然后换边。
    pub fn with_move(&self, mv: Move) -> Position {
        let mover = self.to_move;
        let mut next = *self;
        next.board = self.board.with_move(mv, mover);
        if let Move::Place { .. } = mv {
            next.counters.decrement(mover);
        }
        if next.phase == Phase::Placement && next.counters.all_placed() {
            next.phase = Phase::Movement;
        }
        next.to_move = mover.opponent();
        next
    }
}

/// 一局游戏的完整状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub counters: Counters,
    pub phase: Phase,
    pub current_player: Player,
    pub turn: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl GameState {
    pub fn new(first_player: Player) -> Self {
        Self {
            board: Board::new(),
            counters: Counters::default(),
            phase: Phase::Placement,
            current_player: first_player,
            turn: 1,
            event_log: Vec::new(),
            outcome: None,
        }
    }

    /// 直接构造任意局面，主要用于测试和前端调试。
    pub fn from_parts(
        board: Board,
        counters: Counters,
        phase: Phase,
        current_player: Player,
    ) -> Self {
        Self {
            board,
            counters,
            phase,
            current_player,
            turn: 1,
            event_log: Vec::new(),
            outcome: None,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            board: self.board,
            counters: self.counters,
            phase: self.phase,
            to_move: self.current_player,
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        if self.event_log.len() >= EVENT_LOG_LIMIT {
            let overflow = self.event_log.len() + 1 - EVENT_LOG_LIMIT;
            self.event_log.drain(..overflow);
        }
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Player> {
        match self.outcome {
            Some(Outcome::Win { winner }) => Some(winner),
            _ => None,
        }
    }

    pub fn declare_outcome(&mut self, outcome: Outcome) -> Outcome {
        if self.outcome.is_none() {
            self.record_event(match outcome {
                Outcome::Win { winner } => GameEvent::GameWon { winner },
                Outcome::Draw => GameEvent::GameDrawn,
            });
            self.outcome = Some(outcome);
        }
        outcome
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        for player in [Player::X, Player::O] {
            let remaining = self.counters.get(player);
            if remaining > COUNTERS_PER_PLAYER {
                return Err(IntegrityError::CountersOutOfRange {
                    player,
                    value: remaining,
                });
            }
            let on_board = self.board.count(player) as u8;
            if on_board + remaining != COUNTERS_PER_PLAYER {
                return Err(IntegrityError::PieceCountMismatch {
                    player,
                    on_board,
                    remaining,
                });
            }
        }

        let should_move = self.counters.all_placed();
        if should_move != (self.phase == Phase::Movement) {
            return Err(IntegrityError::PhaseMismatch { phase: self.phase });
        }

        let x_wins = self.board.has_line(Player::X);
        let o_wins = self.board.has_line(Player::O);
        if x_wins && o_wins {
            return Err(IntegrityError::MultipleWinners);
        }

        let consistent = match self.outcome {
            None => !x_wins && !o_wins,
            Some(Outcome::Win { winner }) => self.board.has_line(winner),
            Some(Outcome::Draw) => self.board.is_full() && !x_wins && !o_wins,
        };
        if !consistent {
            return Err(IntegrityError::OutcomeMismatch);
        }

        // 双方轮流放置，剩余棋子数最多相差一枚。
        if self.counters.x.abs_diff(self.counters.o) > 1 {
            return Err(IntegrityError::TurnOrderMismatch {
                x: self.counters.x,
                o: self.counters.o,
            });
        }

        // 未结束的放置阶段里，行棋方必须还有棋子可放。
        if self.phase == Phase::Placement
            && self.outcome.is_none()
            && self.counters.get(self.current_player) == 0
        {
            return Err(IntegrityError::NoCountersToPlace {
                player: self.current_player,
            });
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(Player::X)
    }
}
