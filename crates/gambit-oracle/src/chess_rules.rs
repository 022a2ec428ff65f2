//! Chess rules via the `chess` crate.
//!
//! The `chess` crate handles move generation, legality and mate
//! detection. Draw rules that depend on game history (repetition and the
//! fifty-move rule) are tracked here, because a bare `chess::Board` only
//! knows the current position.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Piece, Rank, Square};
use gambit_protocol::{Color, MoveSpec};

use crate::{GameOracle, OracleError, Outcome};

/// Squares where `(file + rank)` is odd, i.e. the light squares.
const LIGHT_SQUARES: u64 = 0x55AA_55AA_55AA_55AA;

/// Half-moves without a capture or pawn move that end the game.
const FIFTY_MOVE_PLIES: u32 = 100;

/// A chess position plus the history needed for the draw rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ChessPosition {
    board: Board,
    /// Half-moves since the last capture or pawn move.
    halfmove_clock: u32,
    fullmove_number: u32,
    /// Hashes of every position since the last irreversible move,
    /// current position included.
    history: Vec<u64>,
}

impl ChessPosition {
    fn from_board(board: Board, halfmove_clock: u32, fullmove_number: u32) -> Self {
        Self {
            history: vec![board.get_hash()],
            board,
            halfmove_clock,
            fullmove_number,
        }
    }

    /// The underlying board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Half-moves since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// How many times the current position has occurred.
    pub fn repetitions(&self) -> usize {
        let current = self.board.get_hash();
        self.history.iter().filter(|&&h| h == current).count()
    }

    fn has_insufficient_material(&self) -> bool {
        let board = &self.board;
        let count = |piece: Piece| board.pieces(piece).0.count_ones();

        if count(Piece::Pawn) + count(Piece::Rook) + count(Piece::Queen) > 0 {
            return false;
        }
        let knights = count(Piece::Knight);
        let bishops = board.pieces(Piece::Bishop).0;
        if knights + bishops.count_ones() <= 1 {
            return true;
        }
        // Any number of bishops, all on one square color, can't mate.
        let light = bishops & LIGHT_SQUARES;
        knights == 0 && (light == 0 || light == bishops)
    }
}

/// The standard game of chess.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessOracle;

impl ChessOracle {
    /// Creates a new chess oracle.
    pub fn new() -> Self {
        Self
    }
}

fn to_color(color: chess::Color) -> Color {
    match color {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}

fn parse_square(name: &str) -> Result<Square, OracleError> {
    Square::from_str(&name.trim().to_ascii_lowercase())
        .map_err(|_| OracleError::UnknownSquare(name.to_owned()))
}

fn parse_promotion(letter: Option<&str>) -> Result<Piece, OracleError> {
    match letter.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("q") => Ok(Piece::Queen),
        Some("r") => Ok(Piece::Rook),
        Some("b") => Ok(Piece::Bishop),
        Some("n") => Ok(Piece::Knight),
        Some(other) => Err(OracleError::BadPromotion(other.to_owned())),
    }
}

impl GameOracle for ChessOracle {
    type Position = ChessPosition;

    fn start_position(&self) -> ChessPosition {
        ChessPosition::from_board(Board::default(), 0, 1)
    }

    fn current_turn(&self, position: &ChessPosition) -> Color {
        to_color(position.board.side_to_move())
    }

    fn apply_move(&self, position: &mut ChessPosition, mv: &MoveSpec) -> Result<(), OracleError> {
        let board = position.board;
        let from = parse_square(&mv.from)?;
        let to = parse_square(&mv.to)?;
        let piece = board
            .piece_on(from)
            .ok_or_else(|| OracleError::EmptySquare(from.to_string()))?;

        // A promotion letter on an ordinary move is ignored; a pawn
        // reaching the last rank without one becomes a queen.
        let last_rank = match board.side_to_move() {
            chess::Color::White => Rank::Eighth,
            chess::Color::Black => Rank::First,
        };
        let promotion = if piece == Piece::Pawn && to.get_rank() == last_rank {
            Some(parse_promotion(mv.promotion.as_deref())?)
        } else {
            None
        };

        let chess_move = ChessMove::new(from, to, promotion);
        if !board.legal(chess_move) {
            return Err(OracleError::Illegal(format!("{from}{to}")));
        }

        let irreversible = piece == Piece::Pawn || board.piece_on(to).is_some();
        let next = board.make_move_new(chess_move);

        if board.side_to_move() == chess::Color::Black {
            position.fullmove_number += 1;
        }
        if irreversible {
            position.halfmove_clock = 0;
            position.history.clear();
        } else {
            position.halfmove_clock += 1;
        }
        position.history.push(next.get_hash());
        position.board = next;

        tracing::trace!(%from, %to, halfmove = position.halfmove_clock, "move applied");
        Ok(())
    }

    fn outcome(&self, position: &ChessPosition) -> Option<Outcome> {
        match position.board.status() {
            BoardStatus::Checkmate => {
                let loser = to_color(position.board.side_to_move());
                return Some(Outcome::Checkmate {
                    winner: loser.opponent(),
                });
            }
            BoardStatus::Stalemate => return Some(Outcome::Stalemate),
            BoardStatus::Ongoing => {}
        }
        if position.repetitions() >= 3 {
            Some(Outcome::ThreefoldRepetition)
        } else if position.has_insufficient_material() {
            Some(Outcome::InsufficientMaterial)
        } else if position.halfmove_clock >= FIFTY_MOVE_PLIES {
            Some(Outcome::FiftyMoveRule)
        } else {
            None
        }
    }

    /// Standard FEN. The first four fields come from the board; the move
    /// counters come from the tracked history.
    fn serialize(&self, position: &ChessPosition) -> String {
        let board_fen = position.board.to_string();
        let fields: Vec<&str> = board_fen.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            fields.join(" "),
            position.halfmove_clock,
            position.fullmove_number
        )
    }

    fn deserialize(&self, data: &str) -> Result<ChessPosition, OracleError> {
        let board = Board::from_str(data.trim())
            .map_err(|e| OracleError::InvalidPosition(e.to_string()))?;
        let mut counters = data.split_whitespace().skip(4);
        let halfmove = counters.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        let fullmove = counters.next().and_then(|f| f.parse().ok()).unwrap_or(1);
        Ok(ChessPosition::from_board(board, halfmove, fullmove))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

    fn play(oracle: &ChessOracle, position: &mut ChessPosition, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            oracle
                .apply_move(position, &MoveSpec::new(*from, *to))
                .unwrap_or_else(|e| panic!("{from}{to} should be legal: {e}"));
        }
    }

    fn load(fen: &str) -> ChessPosition {
        ChessOracle.deserialize(fen).expect("valid FEN")
    }

    #[test]
    fn test_start_position_serializes_to_standard_fen() {
        let oracle = ChessOracle::new();
        let fen = oracle.serialize(&oracle.start_position());
        let fields: Vec<&str> = fen.split(' ').collect();
        assert_eq!(fields[0], START_PLACEMENT);
        assert_eq!(fields[1], "w");
        assert_eq!(fields[4], "0");
        assert_eq!(fields[5], "1");
    }

    #[test]
    fn test_apply_move_opening_pawn_push_passes_turn() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        assert_eq!(oracle.current_turn(&position), Color::White);

        play(&oracle, &mut position, &[("e2", "e4")]);

        assert_eq!(oracle.current_turn(&position), Color::Black);
        let fen = oracle.serialize(&position);
        assert!(fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert!(fen.ends_with(" 0 1"));
    }

    #[test]
    fn test_apply_move_fullmove_advances_after_black() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        play(&oracle, &mut position, &[("g1", "f3"), ("g8", "f6")]);
        assert!(oracle.serialize(&position).ends_with(" 2 2"));
    }

    #[test]
    fn test_apply_move_illegal_leaves_position_unchanged() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        let before = position.clone();

        let err = oracle
            .apply_move(&mut position, &MoveSpec::new("e2", "e5"))
            .unwrap_err();

        assert!(matches!(err, OracleError::Illegal(_)));
        assert_eq!(position, before);
    }

    #[test]
    fn test_apply_move_rejects_unknown_square_and_empty_origin() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        assert!(matches!(
            oracle.apply_move(&mut position, &MoveSpec::new("z9", "e4")),
            Err(OracleError::UnknownSquare(_))
        ));
        assert!(matches!(
            oracle.apply_move(&mut position, &MoveSpec::new("e4", "e5")),
            Err(OracleError::EmptySquare(_))
        ));
    }

    #[test]
    fn test_apply_move_wrong_side_is_illegal() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        assert!(oracle
            .apply_move(&mut position, &MoveSpec::new("e7", "e5"))
            .is_err());
    }

    #[test]
    fn test_apply_move_ignores_promotion_on_ordinary_move() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        oracle
            .apply_move(&mut position, &MoveSpec::new("e2", "e4").with_promotion("q"))
            .expect("promotion letter is ignored");
        assert_eq!(oracle.current_turn(&position), Color::Black);
    }

    #[test]
    fn test_apply_move_promotion_defaults_to_queen() {
        let oracle = ChessOracle;
        let mut position = load("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        play(&oracle, &mut position, &[("e7", "e8")]);
        assert!(oracle.serialize(&position).starts_with("4Q3/"));
    }

    #[test]
    fn test_apply_move_underpromotion_to_knight() {
        let oracle = ChessOracle;
        let mut position = load("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        oracle
            .apply_move(&mut position, &MoveSpec::new("e7", "e8").with_promotion("n"))
            .expect("underpromotion is legal");
        assert!(oracle.serialize(&position).starts_with("4N3/"));
    }

    #[test]
    fn test_apply_move_unknown_promotion_piece_is_rejected() {
        let oracle = ChessOracle;
        let mut position = load("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        let err = oracle
            .apply_move(&mut position, &MoveSpec::new("e7", "e8").with_promotion("x"))
            .unwrap_err();
        assert_eq!(err, OracleError::BadPromotion("x".into()));
    }

    #[test]
    fn test_outcome_fools_mate_is_black_checkmate() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        play(
            &oracle,
            &mut position,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4")],
        );
        assert_eq!(oracle.outcome(&position), None);

        play(&oracle, &mut position, &[("d8", "h4")]);

        let outcome = oracle.outcome(&position).expect("game over");
        assert_eq!(outcome, Outcome::Checkmate { winner: Color::Black });
        assert_eq!(outcome.message(), "Checkmate! Black wins!");
        assert!(oracle.is_game_over(&position));
    }

    #[test]
    fn test_outcome_stalemate() {
        let position = load("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(ChessOracle.outcome(&position), Some(Outcome::Stalemate));
    }

    #[test]
    fn test_outcome_bare_kings_is_insufficient_material() {
        let position = load("8/8/8/4k3/8/8/8/4K3 w - - 0 1");
        assert_eq!(
            ChessOracle.outcome(&position),
            Some(Outcome::InsufficientMaterial)
        );
    }

    #[test]
    fn test_outcome_single_knight_is_insufficient_material() {
        let position = load("8/8/8/4k3/8/8/8/4KN2 w - - 0 1");
        assert_eq!(
            ChessOracle.outcome(&position),
            Some(Outcome::InsufficientMaterial)
        );
    }

    #[test]
    fn test_outcome_same_color_bishops_is_insufficient_material() {
        // c1 and f8 are both dark squares.
        let position = load("5b2/8/8/4k3/8/8/8/2B1K3 w - - 0 1");
        assert_eq!(
            ChessOracle.outcome(&position),
            Some(Outcome::InsufficientMaterial)
        );
    }

    #[test]
    fn test_outcome_opposite_color_bishops_play_on() {
        // c1 is dark, c8 is light.
        let position = load("2b5/8/8/4k3/8/8/8/2B1K3 w - - 0 1");
        assert_eq!(ChessOracle.outcome(&position), None);
    }

    #[test]
    fn test_outcome_threefold_repetition_by_knight_shuffle() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];

        play(&oracle, &mut position, &shuffle);
        assert_eq!(position.repetitions(), 2);
        assert_eq!(oracle.outcome(&position), None);

        play(&oracle, &mut position, &shuffle);
        assert_eq!(position.repetitions(), 3);
        assert_eq!(
            oracle.outcome(&position),
            Some(Outcome::ThreefoldRepetition)
        );
    }

    #[test]
    fn test_outcome_pawn_move_resets_repetition_history() {
        let oracle = ChessOracle;
        let mut position = oracle.start_position();
        play(
            &oracle,
            &mut position,
            &[("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8"), ("e2", "e3")],
        );
        assert_eq!(position.repetitions(), 1);
        assert_eq!(position.halfmove_clock(), 0);
    }

    #[test]
    fn test_outcome_fifty_move_rule_on_hundredth_quiet_ply() {
        let oracle = ChessOracle;
        let mut position = load("8/8/8/4k3/8/8/R7/4K3 w - - 99 80");
        assert_eq!(oracle.outcome(&position), None);

        play(&oracle, &mut position, &[("a2", "a3")]);

        assert_eq!(oracle.outcome(&position), Some(Outcome::FiftyMoveRule));
    }

    #[test]
    fn test_outcome_checkmate_wins_tie_break_over_fifty_moves() {
        let oracle = ChessOracle;
        let mut position =
            load("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 99 3");

        play(&oracle, &mut position, &[("d8", "h4")]);

        assert_eq!(position.halfmove_clock(), 100);
        assert_eq!(
            oracle.outcome(&position),
            Some(Outcome::Checkmate { winner: Color::Black })
        );
    }

    #[test]
    fn test_deserialize_round_trips_move_counters() {
        let fen = "8/8/8/4k3/8/8/R7/4K3 w - - 12 30";
        let oracle = ChessOracle;
        assert_eq!(oracle.serialize(&load(fen)), fen);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(matches!(
            ChessOracle.deserialize("not a position"),
            Err(OracleError::InvalidPosition(_))
        ));
    }
}
