pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    computer_move, evaluate_position, order_score, AiAgent, AiConfig, AiDecision, AiDifficulty,
    AiStrategy, DecisionSource, Searcher,
};
pub use game::{
    Board, Cell, ClickOutcome, Counters, GameEvent, GameMode, GameSession, GameState,
    IllegalMoveReason, IntegrityError, Move, Outcome, Phase, Player, Position, RuleEngine,
    RuleError, RuleResolution, COMPUTER_MOVE_DELAY_MS,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(serde_to_js_error)
}

fn parse_difficulty(value: Option<&str>) -> AiDifficulty {
    value
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or_default()
}

fn build_config(difficulty: AiDifficulty, strategy: Option<&str>) -> AiConfig {
    let config = AiConfig::from_difficulty(difficulty);
    match strategy.and_then(|value| AiStrategy::from_str(value).ok()) {
        Some(strategy) => config.with_strategy(strategy),
        None => config,
    }
}

fn cell_symbols(board: &Board) -> Vec<&'static str> {
    board
        .cells()
        .iter()
        .map(|cell| cell.owner().map_or("", Player::symbol))
        .collect()
}

/// 外部传入的局面先做完整性检查，再交给电脑决策。
fn decide_checked(state: &GameState, config: AiConfig) -> Result<AiDecision, RuleError> {
    RuleEngine::ensure_integrity(state)?;
    Ok(AiAgent::new(config).decide_action(state))
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct GameEngine {
    session: GameSession,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(mode: Option<String>, difficulty: Option<String>) -> GameEngine {
        let mode = mode
            .as_deref()
            .and_then(|value| GameMode::from_str(value).ok())
            .unwrap_or_default();
        let difficulty = parse_difficulty(difficulty.as_deref());
        GameEngine {
            session: GameSession::new(mode, difficulty),
        }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(self.session.state())
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.session.load_state(state).map_err(to_js_error)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = GameMode::from_str(mode)
            .map_err(|_| JsValue::from_str(&format!("unknown game mode: {mode}")))?;
        self.session.set_mode(mode);
        Ok(())
    }

    /// 未知难度按 1 级处理。
    pub fn set_difficulty(&mut self, difficulty: &str) {
        self.session.set_difficulty(parse_difficulty(Some(difficulty)));
    }

    pub fn click_cell(&mut self, cell: usize) -> Result<String, JsValue> {
        let outcome = self.session.click_cell(cell).map_err(to_js_error)?;
        to_json(&outcome)
    }

    pub fn submit_move_json(&mut self, move_json: &str) -> Result<String, JsValue> {
        let mv: Move = serde_json::from_str(move_json).map_err(serde_to_js_error)?;
        let resolution = self.session.submit_move(mv).map_err(to_js_error)?;
        to_json(&resolution)
    }

    pub fn legal_moves_json(&self) -> Result<String, JsValue> {
        to_json(&RuleEngine::legal_moves(self.session.state()))
    }

    /// 九个格子的符号，空格为空字符串。
    pub fn board(&self) -> Result<JsValue, JsValue> {
        to_value(&cell_symbols(&self.session.state().board)).map_err(JsValue::from)
    }

    pub fn counters_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.state().counters)
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.session.state().phase)
    }

    pub fn current_player(&self) -> String {
        self.session.state().current_player.symbol().to_string()
    }

    pub fn selected_cell(&self) -> Option<usize> {
        self.session.selected_cell()
    }

    pub fn outcome_json(&self) -> Result<String, JsValue> {
        to_json(&RuleEngine::check_outcome(self.session.state()))
    }

    pub fn is_game_over(&self) -> bool {
        self.session.state().is_finished()
    }

    pub fn is_computer_turn(&self) -> bool {
        self.session.is_computer_turn()
    }

    /// 由电脑为当前行棋方走一步并立即执行。
    pub fn apply_ai_move(
        &mut self,
        difficulty: Option<String>,
        strategy: Option<String>,
    ) -> Result<String, JsValue> {
        let difficulty = difficulty
            .as_deref()
            .map_or(self.session.difficulty(), |value| parse_difficulty(Some(value)));
        let mut agent = AiAgent::new(build_config(difficulty, strategy.as_deref()));
        let (decision, applied) = self
            .session
            .play_computer_turn(&mut agent)
            .map_err(to_js_error)?;

        let response = AiMoveResponse { decision, applied };
        to_json(&response)
    }

    /// 停顿 `delay_ms`（默认 500 毫秒）后返回电脑的决策，不修改棋局。
    pub fn think_ai(
        &self,
        difficulty: Option<String>,
        strategy: Option<String>,
        delay_ms: Option<u32>,
    ) -> Promise {
        let state = self.session.state().clone();
        let difficulty = difficulty
            .as_deref()
            .map_or(self.session.difficulty(), |value| parse_difficulty(Some(value)));
        let config = build_config(difficulty, strategy.as_deref());
        let delay = delay_ms.unwrap_or(COMPUTER_MOVE_DELAY_MS);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.decide_action(&state);
            let json = to_json(&decision)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 新开一局，默认 X 先手。
#[wasm_bindgen(js_name = "newGame")]
pub fn new_game(first_player: Option<String>) -> Result<JsValue, JsValue> {
    let first = first_player
        .as_deref()
        .and_then(|value| Player::from_str(value).ok())
        .unwrap_or(Player::X);
    to_value(&GameState::new(first)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&RuleEngine::legal_moves(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "submitMove")]
pub fn submit_move(state: JsValue, mv: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let mv: Move = from_value(mv).map_err(JsValue::from)?;
    RuleEngine::ensure_integrity(&state).map_err(to_js_error)?;
    let mut engine = RuleEngine::new();
    match engine.apply_move(&mut state, mv) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    state: JsValue,
    difficulty: Option<String>,
    strategy: Option<String>,
) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let config = build_config(parse_difficulty(difficulty.as_deref()), strategy.as_deref());
    let decision = decide_checked(&state, config).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkOutcome")]
pub fn check_outcome(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&RuleEngine::check_outcome(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    RuleEngine::ensure_integrity(&state).map_err(to_js_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_strings_fall_back_to_easy() {
        assert_eq!(parse_difficulty(Some("hard")), AiDifficulty::Hard);
        assert_eq!(parse_difficulty(Some("4")), AiDifficulty::Expert);
        assert_eq!(parse_difficulty(Some("nightmare")), AiDifficulty::Easy);
        assert_eq!(parse_difficulty(None), AiDifficulty::Easy);
    }

    #[test]
    fn strategy_override_keeps_a_search_depth() {
        let config = build_config(AiDifficulty::Easy, Some("deep"));
        assert_eq!(config.strategy, AiStrategy::Deep);
        assert!(config.search_depth(Phase::Movement) > 0);
        let untouched = build_config(AiDifficulty::Normal, Some("bogus"));
        assert_eq!(untouched, AiConfig::from_difficulty(AiDifficulty::Normal));
    }

    #[test]
    fn engine_json_round_trip_through_a_placement() {
        let mut engine = GameEngine::new(Some("human".into()), None);
        let outcome: ClickOutcome =
            serde_json::from_str(&engine.click_cell(4).unwrap()).unwrap();
        assert!(matches!(outcome, ClickOutcome::Moved { .. }));
        assert_eq!(engine.current_player(), "O");
        assert_eq!(engine.phase(), "Placement");

        let moves: Vec<Move> = serde_json::from_str(&engine.legal_moves_json().unwrap()).unwrap();
        assert_eq!(moves.len(), 8);

        let resolution: serde_json::Value = serde_json::from_str(
            &engine
                .submit_move_json(r#"{"type":"Place","cell":0}"#)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(resolution["events"][0]["type"], "CounterPlaced");

        let snapshot = engine.state_json().unwrap();
        let mut restored = GameEngine::new(None, None);
        restored.set_state_json(&snapshot).unwrap();
        assert_eq!(restored.state_json().unwrap(), snapshot);
    }

    #[test]
    fn apply_ai_move_plays_for_the_side_to_move() {
        let mut engine = GameEngine::new(Some("ai".into()), Some("expert".into()));
        engine.click_cell(0).unwrap();
        assert!(engine.is_computer_turn());

        let response: serde_json::Value =
            serde_json::from_str(&engine.apply_ai_move(None, None).unwrap()).unwrap();
        assert_eq!(response["decision"]["action"]["cell"], 4);
        assert_eq!(response["applied"]["state"]["current_player"], "X");
        assert!(!engine.is_computer_turn());
        assert!(!engine.is_game_over());
    }

    #[test]
    fn corrupted_state_gets_no_ai_decision() {
        let mut stuck = GameState::new(Player::X);
        stuck.counters = Counters::new(0, 2);
        for cell in [0, 5, 7] {
            stuck.board.set(cell, Cell::Occupied(Player::X));
        }
        stuck.board.set(1, Cell::Occupied(Player::O));
        let config = AiConfig::from_difficulty(AiDifficulty::Expert);
        assert!(matches!(
            decide_checked(&stuck, config.clone()),
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::TurnOrderMismatch { x: 0, o: 2 }
            })
        ));

        let decision = decide_checked(&GameState::new(Player::O), config).unwrap();
        assert_eq!(decision.action, Some(Move::Place { cell: 4 }));
    }

    #[test]
    fn cell_symbols_use_blank_for_empty_cells() {
        let mut board = Board::new();
        board.set(4, Cell::Occupied(Player::O));
        let symbols = cell_symbols(&board);
        assert_eq!(symbols[4], "O");
        assert_eq!(symbols[0], "");
    }
}
