//! 静态局面评估与着法排序。

use crate::game::{Board, Move, Phase, Player, Position, RuleEngine, CENTER, CORNERS, EDGES, WIN_PATTERNS};

/// 直接获胜（或失败）的分值。
pub const WIN_SCORE: i32 = 1000;

const LINE_COMPLETE: i32 = 100;
const LINE_TWO_OPEN: i32 = 10;
const LINE_ONE_OPEN: i32 = 1;
const CENTER_BONUS: i32 = 3;
const CORNER_BONUS: i32 = 2;
const MATERIAL_WEIGHT: i32 = 2;

const ORDER_TWO_UNCONTESTED: i32 = 50;
const ORDER_ONE_UNCONTESTED: i32 = 5;
const ORDER_CENTER: i32 = 10;
const ORDER_CORNER: i32 = 5;

/// 放置阶段的战略顺序：中心、四角、四边。
pub const STRATEGIC_ORDER: [usize; 9] = [
    CENTER, CORNERS[0], CORNERS[1], CORNERS[2], CORNERS[3], EDGES[0], EDGES[1], EDGES[2],
    EDGES[3],
];

/// 搜索叶节点使用的完整评估，站在 `player` 一方。
pub fn evaluate_position(board: &Board, phase: Phase, player: Player) -> i32 {
    let opponent = player.opponent();
    if RuleEngine::is_win(board, player) {
        return WIN_SCORE;
    }
    if RuleEngine::is_win(board, opponent) {
        return -WIN_SCORE;
    }

    let mut score = 0;
    for pattern in &WIN_PATTERNS {
        let (own, other, empty) = board.line_counts(pattern, player);
        score += match (own, other, empty) {
            (3, _, _) => LINE_COMPLETE,
            (_, 3, _) => -LINE_COMPLETE,
            (2, _, 1) => LINE_TWO_OPEN,
            (_, 2, 1) => -LINE_TWO_OPEN,
            (1, _, 2) => LINE_ONE_OPEN,
            (_, 1, 2) => -LINE_ONE_OPEN,
            _ => 0,
        };
    }

    score += control_bonus(board, CENTER, player, CENTER_BONUS);
    for corner in CORNERS {
        score += control_bonus(board, corner, player, CORNER_BONUS);
    }

    if phase == Phase::Movement {
        let material = board.count(player) as i32 - board.count(opponent) as i32;
        score += MATERIAL_WEIGHT * material;
    }

    score
}

fn control_bonus(board: &Board, index: usize, player: Player, bonus: i32) -> i32 {
    match board.cells()[index].owner() {
        Some(owner) if owner == player => bonus,
        Some(_) => -bonus,
        None => 0,
    }
}

/// 仅用于排序的廉价评分。
///
/// 中心和角的加分只奖励 `player` 一方，不对称是有意保留的。
pub fn order_score(board: &Board, player: Player) -> i32 {
    if RuleEngine::is_win(board, player) {
        return WIN_SCORE;
    }
    if RuleEngine::is_win(board, player.opponent()) {
        return -WIN_SCORE;
    }

    let mut score = 0;
    for pattern in &WIN_PATTERNS {
        score += match board.line_counts(pattern, player) {
            (2, 0, _) => ORDER_TWO_UNCONTESTED,
            (0, 2, _) => -ORDER_TWO_UNCONTESTED,
            (1, 0, _) => ORDER_ONE_UNCONTESTED,
            (0, 1, _) => -ORDER_ONE_UNCONTESTED,
            _ => 0,
        };
    }

    let cells = board.cells();
    if cells[CENTER].is_owned_by(player) {
        score += ORDER_CENTER;
    }
    score += CORNERS
        .iter()
        .filter(|&&corner| cells[corner].is_owned_by(player))
        .count() as i32
        * ORDER_CORNER;

    score
}

fn strategic_rank(cell: usize) -> usize {
    STRATEGIC_ORDER
        .iter()
        .position(|&candidate| candidate == cell)
        .unwrap_or(STRATEGIC_ORDER.len())
}

/// 按中心 > 角 > 边排列放置着法，其他着法保持原顺序排在最后。
pub fn strategic_moves(mut moves: Vec<Move>) -> Vec<Move> {
    moves.sort_by_key(|mv| match mv {
        Move::Place { cell } => strategic_rank(*cell),
        Move::Relocate { .. } => STRATEGIC_ORDER.len(),
    });
    moves
}

/// 搜索前的着法排序：放置阶段用战略顺序，移动阶段按行棋方视角的 `order_score` 降序。
pub fn order_moves(position: &Position, moves: Vec<Move>) -> Vec<Move> {
    match position.phase {
        Phase::Placement => strategic_moves(moves),
        Phase::Movement => {
            let mover = position.to_move;
            let mut scored: Vec<(i32, Move)> = moves
                .into_iter()
                .map(|mv| (order_score(&position.board.with_move(mv, mover), mover), mv))
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.into_iter().map(|(_, mv)| mv).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, Counters, CELL_COUNT};

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

    #[test]
    fn empty_board_is_neutral() {
        let board = Board::new();
        assert_eq!(evaluate_position(&board, Phase::Placement, Player::O), 0);
        assert_eq!(order_score(&board, Player::O), 0);
    }

    #[test]
    fn wins_dominate_evaluation() {
        let board = board_of("OOOXX.X..");
        assert_eq!(evaluate_position(&board, Phase::Movement, Player::O), WIN_SCORE);
        assert_eq!(evaluate_position(&board, Phase::Movement, Player::X), -WIN_SCORE);
        assert_eq!(order_score(&board, Player::O), WIN_SCORE);
        assert_eq!(order_score(&board, Player::X), -WIN_SCORE);
    }

    #[test]
    fn center_stone_scores_lines_and_bonus() {
        // Four lines through the center with one stone and two blanks, plus the center bonus.
        let board = board_of("....O....");
        assert_eq!(evaluate_position(&board, Phase::Placement, Player::O), 4 + 3);
        assert_eq!(evaluate_position(&board, Phase::Placement, Player::X), -7);
    }

    #[test]
    fn open_two_outweighs_single_stones() {
        // Row 0 holds two O with a gap: +10, column 0 and the main diagonal +1 each,
        // column 2 and the anti-diagonal +1 each, two corners +2 each.
        let board = board_of("O.O......");
        assert_eq!(evaluate_position(&board, Phase::Placement, Player::O), 10 + 4 + 4);
    }

    #[test]
    fn evaluation_is_antisymmetric_under_swap() {
        let boards = [
            "XO.......",
            "X.O.X.O..",
            "XXO.O....",
            "XOXO.O.X.",
            "OX..X..O.",
            ".XO.OX...",
        ];
        for marks in boards {
            let board = board_of(marks);
            for phase in [Phase::Placement, Phase::Movement] {
                assert_eq!(
                    evaluate_position(&board, phase, Player::X),
                    -evaluate_position(&board.swapped(), phase, Player::X),
                    "board {marks} in {phase:?}"
                );
            }
        }
    }

    #[test]
    fn order_score_only_rewards_own_center_and_corners() {
        let own_center = board_of("....O....");
        let their_center = board_of("....X....");
        assert_eq!(order_score(&own_center, Player::O), 4 * 5 + 10);
        assert_eq!(order_score(&their_center, Player::O), -4 * 5);
    }

    #[test]
    fn strategic_order_puts_center_first() {
        let moves: Vec<Move> = (0..CELL_COUNT).map(|cell| Move::Place { cell }).collect();
        let ordered: Vec<usize> = strategic_moves(moves)
            .iter()
            .map(Move::destination)
            .collect();
        assert_eq!(ordered, vec![4, 0, 2, 6, 8, 1, 3, 5, 7]);
    }

    #[test]
    fn movement_ordering_prefers_completing_a_line() {
        let position = Position {
            board: board_of("OO.XX...O"),
            counters: Counters::new(0, 0),
            phase: Phase::Movement,
            to_move: Player::O,
        };
        let moves = RuleEngine::legal_moves_for(&position);
        let ordered = order_moves(&position, moves);
        assert_eq!(ordered[0], Move::Relocate { from: 8, to: 2 });
    }
}
