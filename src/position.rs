use std::str::FromStr;

use anyhow::Result;
use chess::{BitBoard, Board, ChessMove, Color, MoveGen};

use crate::eval;

/// Which moves to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    All,
    Captures,
}

/// Board state with make/unmake discipline layered over the copy-make
/// `chess` crate: `make` saves the current board on an undo stack,
/// `unmake` restores it.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
    undo: Vec<Board>,
}

impl Position {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            undo: Vec::with_capacity(64),
        }
    }

    pub fn startpos() -> Self {
        Self::new(Board::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let board =
            Board::from_str(fen).map_err(|e| anyhow::anyhow!("invalid FEN {:?}: {:?}", fen, e))?;
        Ok(Self::new(board))
    }

    /// 64-bit Zobrist key of the current board.
    #[inline]
    pub fn hash_key(&self) -> u64 {
        self.board.get_hash()
    }

    /// Static eval in centipawns from the side to move.
    #[inline]
    pub fn eval(&self) -> i32 {
        eval::evaluate(&self.board)
    }

    pub fn legal_moves(&self, kind: MoveKind) -> Vec<ChessMove> {
        let movegen = MoveGen::new_legal(&self.board);
        match kind {
            MoveKind::All => movegen.collect(),
            MoveKind::Captures => {
                let targets = *self.board.color_combined(!self.board.side_to_move());
                movegen
                    .filter(|m| (targets & BitBoard::from_square(m.get_dest())).popcnt() > 0)
                    .collect()
            }
        }
    }

    #[inline]
    pub fn make(&mut self, mv: ChessMove) {
        self.undo.push(self.board);
        self.board = self.board.make_move_new(mv);
    }

    #[inline]
    pub fn unmake(&mut self) {
        let previous = self.undo.pop().expect("unmake without a matching make");
        self.board = previous;
    }

    #[inline]
    pub fn is_legal(&self, mv: ChessMove) -> bool {
        self.board.legal(mv)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    #[test]
    fn make_unmake_restores_the_board() {
        let mut pos = Position::startpos();
        let key = pos.hash_key();
        let mv = ChessMove::new(Square::E2, Square::E4, None);
        pos.make(mv);
        assert_ne!(pos.hash_key(), key);
        pos.unmake();
        assert_eq!(pos.hash_key(), key);
    }

    #[test]
    fn capture_generation_matches_the_full_list() {
        // White can take on e5 with the knight, and nothing else.
        let pos = Position::from_fen("rnbqkb1r/pppp1ppp/5n2/4p3/8/2N2N2/PPPPPPPP/R1BQKB1R w KQkq - 0 1")
            .unwrap();
        let all = pos.legal_moves(MoveKind::All);
        let captures = pos.legal_moves(MoveKind::Captures);
        assert!(captures.iter().all(|m| all.contains(m)));
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0], ChessMove::new(Square::F3, Square::E5, None));
    }

    #[test]
    fn bad_fen_is_rejected() {
        assert!(Position::from_fen("not a position").is_err());
    }

    #[test]
    fn starting_position_evaluates_level() {
        assert_eq!(Position::startpos().eval(), 0);
    }
}
