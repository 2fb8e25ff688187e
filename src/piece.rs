//! Piece kinds and color, and the board adapter's printable-character
//! convention: `'K','Q','R','B','N','P'` white, lower-case black, `' '`
//! empty.

use strum::{EnumIs, VariantArray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// Tagged piece kind, kept distinct from the board adapter's character
/// representation: dispatch on this, not on the character, and keep the
/// character only where the board adapter needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, VariantArray)]
pub enum Piece {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl Piece {
    /// The printable character the board adapter uses for this piece, in
    /// the given color.
    #[inline]
    pub fn to_char(self, color: Color) -> char {
        let upper = match self {
            Piece::King => 'K',
            Piece::Queen => 'Q',
            Piece::Rook => 'R',
            Piece::Bishop => 'B',
            Piece::Knight => 'N',
            Piece::Pawn => 'P',
        };
        if color.is_black() {
            upper.to_ascii_lowercase()
        } else {
            upper
        }
    }

    /// Parse a board adapter character back into `(Piece, Color)`. Returns
    /// `None` for the empty-square character `' '`.
    #[inline]
    pub fn from_char(c: char) -> Option<(Piece, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else if c.is_ascii_lowercase() {
            Color::Black
        } else {
            return None;
        };
        let piece = match c.to_ascii_uppercase() {
            'K' => Piece::King,
            'Q' => Piece::Queen,
            'R' => Piece::Rook,
            'B' => Piece::Bishop,
            'N' => Piece::Knight,
            'P' => Piece::Pawn,
            _ => return None,
        };
        Some((piece, color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_round_trip() {
        for &piece in Piece::VARIANTS {
            for &color in &[Color::White, Color::Black] {
                let c = piece.to_char(color);
                assert_eq!(Piece::from_char(c), Some((piece, color)));
            }
        }
    }

    #[test]
    fn empty_square_has_no_piece() {
        assert_eq!(Piece::from_char(' '), None);
    }
}
