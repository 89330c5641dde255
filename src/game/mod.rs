//! 棋局核心逻辑（状态、规则、人机会话）。

pub mod rules;
pub mod session;
pub mod state;

pub use rules::{IllegalMoveReason, RuleEngine, RuleError, RuleResolution};
pub use session::{ClickOutcome, GameSession, COMPUTER_MOVE_DELAY_MS, COMPUTER_SEAT};
pub use state::{
    Board,
    Cell,
    Counters,
    GameEvent,
    GameMode,
    GameState,
    IntegrityError,
    Move,
    Outcome,
    Phase,
    Player,
    Position,
    CELL_COUNT,
    CENTER,
    CORNERS,
    COUNTERS_PER_PLAYER,
    EDGES,
    EVENT_LOG_LIMIT,
    WIN_PATTERNS,
};
