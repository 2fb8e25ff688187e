//! The one place this crate has a typed, recoverable error: the optional
//! self-check of the tracker table against the board. Everything else — a
//! malformed input byte, a divergence discovered mid-operation — is a
//! programming error with no defined recovery, and is reported with
//! `debug_assert!`, not `Result`.

use crate::square::Square;

/// A detected divergence between the tracker table and the authoritative
/// board, or within the tracker table itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("square {square} holds tracker piece {tracker_piece:?} but board shows {board_piece:?}")]
    PieceMismatch {
        square: Square,
        tracker_piece: char,
        board_piece: char,
    },

    #[error("tracker at {square} (id {tracker_id}) is not reflected in the square map")]
    SquareMapMissing { square: Square, tracker_id: u8 },
}
