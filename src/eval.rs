use chess::{Board, Color, Piece};

pub const PAWN: i32 = 100;
pub const KNIGHT: i32 = 320;
pub const BISHOP: i32 = 330;
pub const ROOK: i32 = 500;
pub const QUEEN: i32 = 900;

/// Material balance in centipawns from the side to move's perspective.
///
/// The score is symmetric: the starting position is exactly zero and a
/// quiet move never changes it, so any non-zero value reflects captured
/// material alone.
pub fn evaluate(board: &Board) -> i32 {
    let material = [
        (Piece::Pawn, PAWN),
        (Piece::Knight, KNIGHT),
        (Piece::Bishop, BISHOP),
        (Piece::Rook, ROOK),
        (Piece::Queen, QUEEN),
    ];

    let mut score = 0;
    for &color in &[Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        let color_bb = board.color_combined(color);
        for &(piece, value) in &material {
            let bb = board.pieces(piece) & color_bb;
            score += sign * value * bb.popcnt() as i32;
        }
    }

    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn starting_position_is_level() {
        assert_eq!(evaluate(&Board::default()), 0);
    }

    #[test]
    fn score_is_side_to_move_relative() {
        // Same material imbalance (White up a queen), both sides to move.
        let white_to_move = Board::from_str("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let black_to_move = Board::from_str("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
        assert_eq!(evaluate(&white_to_move), QUEEN);
        assert_eq!(evaluate(&black_to_move), -QUEEN);
    }
}
