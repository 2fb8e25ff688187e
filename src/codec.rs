//! Move codec: turns a ply into 1 byte (rarely 2) and back, given a shared,
//! incrementally-advancing board position and tracker table.
//!
//! Each piece kind gets its own low-nibble layout; the high nibble always
//! names a tracker slot. `decode_core` does the actual byte-to-move work
//! without touching any state, so `peek` and `decode` share one
//! implementation and can never disagree about what a byte stream means.

use crate::board::{Move, Position, Special};
use crate::piece::{Color, Piece};
use crate::square::Square;
use crate::tracker::{TrackerTable, TI_KN, TI_KR, TI_QR};

#[inline]
fn classify(piece_char: char) -> Piece {
    Piece::from_char(piece_char)
        .expect("tracker piece character is never the empty-square blank")
        .0
}

fn rook_code(src: Square, dst: Square) -> u8 {
    if src.file() == dst.file() {
        0x08 | dst.rank()
    } else {
        dst.file()
    }
}

fn rook_dst(src: Square, lo: u8) -> Square {
    if lo & 0x08 != 0 {
        Square::from_u8(((lo & 0x07) << 3) | src.file())
    } else {
        Square::from_u8((src.rank() << 3) | (lo & 0x07))
    }
}

fn bishop_code(src: Square, dst: Square) -> u8 {
    let diff = src.ix() as i16 - dst.ix() as i16;
    if diff % 9 == 0 {
        0x08 | dst.file()
    } else {
        dst.file()
    }
}

fn bishop_dst(src: Square, lo: u8) -> Square {
    let file_delta = (lo & 0x07) as i8 - src.file() as i8;
    if lo & 0x08 != 0 {
        src.offset(9 * file_delta).expect("FALL diagonal byte stays on board")
    } else {
        src.offset(-7 * file_delta).expect("RISE diagonal byte stays on board")
    }
}

fn king_code(delta: i16) -> u8 {
    match delta {
        9 => 5,
        8 => 6,
        7 => 7,
        1 => 8,
        -1 => 9,
        -7 => 0x0B,
        -8 => 0x0E,
        -9 => 0x0F,
        _ => unreachable!("king move is not one square in any direction"),
    }
}

fn king_delta(lo: u8) -> i16 {
    match lo {
        5 => 9,
        6 => 8,
        7 => 7,
        8 => 1,
        9 => -1,
        0x0B => -7,
        0x0E => -8,
        0x0F => -9,
        _ => unreachable!("low nibble is not one of the king's vector codes"),
    }
}

fn knight_code(delta: i16) -> u8 {
    match delta {
        17 => 0,
        15 => 1,
        10 => 2,
        6 => 3,
        -17 => 4,
        -15 => 5,
        -10 => 6,
        -6 => 7,
        _ => unreachable!("knight move is not an L-shape"),
    }
}

fn knight_delta(lo: u8) -> i16 {
    match lo & 0x07 {
        0 => 17,
        1 => 15,
        2 => 10,
        3 => 6,
        4 => -17,
        5 => -15,
        6 => -10,
        7 => -6,
        _ => unreachable!(),
    }
}

fn pawn_dir_code(color: Color, delta: i16) -> u8 {
    if color.is_white() {
        if delta == 16 { 3 } else { (delta - 7) as u8 }
    } else if delta == -16 {
        3
    } else {
        (delta + 9) as u8
    }
}

fn pawn_delta(color: Color, dir: u8) -> i16 {
    if color.is_white() {
        if dir == 3 { 16 } else { dir as i16 + 7 }
    } else if dir == 3 {
        -16
    } else {
        dir as i16 - 9
    }
}

fn promo_code(piece: Piece) -> u8 {
    match piece {
        Piece::Queen => 0,
        Piece::Rook => 4,
        Piece::Bishop => 8,
        Piece::Knight => 12,
        _ => unreachable!("only these four kinds can be promoted to"),
    }
}

fn promo_from_bits(bits: u8) -> Special {
    match bits {
        0 => Special::PromoteQueen,
        4 => Special::PromoteRook,
        8 => Special::PromoteBishop,
        12 => Special::PromoteKnight,
        _ => unreachable!(),
    }
}

/// The codec's whole working state: one board, one tracker table, moving
/// together one ply at a time. Cloning (and copying) this is a plain
/// memcpy — every cross-tracker link is an array index, not a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pub position: Position,
    pub trackers: TrackerTable,
}

impl Codec {
    pub fn init() -> Self {
        Codec { position: Position::startpos(), trackers: TrackerTable::init() }
    }

    #[inline]
    pub fn turn(&self) -> Color {
        if self.position.white { Color::White } else { Color::Black }
    }

    fn mover_id_at(&self, square: Square, color: Color) -> u8 {
        self.trackers.squares[square.ix()]
            .filter(|&(c, _)| c == color)
            .map(|(_, id)| id)
            .expect("encode(): no tracker for the side to move at this square")
    }

    /// Cross-check the tracker table against the board. Not called on any
    /// hot path; wire this into test harnesses or a debug build's assertion
    /// pass, not into `encode`/`decode` itself.
    pub fn check(&self) -> Result<(), crate::error::CheckError> {
        use crate::error::CheckError;

        for &color in &[Color::White, Color::Black] {
            for id in 0..=15u8 {
                let t = self.trackers.side(color).get(id);
                if t.in_use && t.shadow_owner.is_none() {
                    match self.trackers.squares[t.square.ix()] {
                        Some((c, i)) if c == color && i == id => {}
                        _ => {
                            let err = CheckError::SquareMapMissing { square: t.square, tracker_id: id };
                            tracing::warn!(%err, "self-check found a diverging square map entry");
                            return Err(err);
                        }
                    }
                }
            }
        }

        for ix in 0..64u8 {
            let sq = Square::from_u8(ix);
            let expected = match self.trackers.squares[ix as usize] {
                Some((color, id)) => self.trackers.side(color).get(id).piece,
                None => ' ',
            };
            let actual = self.position.at(sq);
            if expected != actual {
                let err = CheckError::PieceMismatch { square: sq, tracker_piece: expected, board_piece: actual };
                tracing::warn!(%err, "self-check found a board/tracker mismatch");
                return Err(err);
            }
        }

        Ok(())
    }

    /// Encode one ply, appending 1 or 2 bytes to `out`, advancing `self` by
    /// exactly that ply. Returns the number of bytes written.
    pub fn encode(&mut self, mv: &Move, out: &mut Vec<u8>) -> usize {
        let color = self.turn();
        let mover_id = self.mover_id_at(mv.src, color);
        let piece = classify(self.trackers.side(color).get(mover_id).piece);

        let mut encode_id = mover_id;
        let mut nbytes = 1usize;
        let code: u8;

        match piece {
            Piece::Pawn => {
                let delta = mv.dst.ix() as i16 - mv.src.ix() as i16;
                let dir = pawn_dir_code(color, delta);
                let promo = mv.special.promotion_piece().map(promo_code).unwrap_or(0);
                code = promo | dir;
            }
            Piece::Knight => {
                code = knight_code(mv.src.ix() as i16 - mv.dst.ix() as i16);
            }
            Piece::King => {
                code = match mv.special {
                    Special::CastleWk => 1,
                    Special::CastleBk => 2,
                    Special::CastleWq => 3,
                    Special::CastleBq => 4,
                    _ => king_code(mv.src.ix() as i16 - mv.dst.ix() as i16),
                };
            }
            Piece::Rook => {
                code = rook_code(mv.src, mv.dst);
            }
            Piece::Bishop => {
                code = bishop_code(mv.src, mv.dst);
            }
            Piece::Queen => {
                let pt = self.trackers.side(color).get(mover_id);
                if mv.src.file() == mv.dst.file() {
                    if let Some(rook) = pt.shadow_rook {
                        encode_id = rook;
                        code = rook_code(mv.src, mv.dst);
                    } else if let Some(rank_shadow) = pt.shadow_rank {
                        encode_id = rank_shadow;
                        code = 0x08 | mv.dst.rank();
                    } else {
                        code = 0x08 | mv.src.file();
                        nbytes = 2;
                    }
                } else if mv.src.rank() == mv.dst.rank() {
                    if let Some(rook) = pt.shadow_rook {
                        encode_id = rook;
                        code = rook_code(mv.src, mv.dst);
                    } else if let Some(file_shadow) = pt.shadow_file {
                        encode_id = file_shadow;
                        code = 0x08 | mv.dst.file();
                    } else {
                        code = 0x08 | mv.src.file();
                        nbytes = 2;
                    }
                } else {
                    code = bishop_code(mv.src, mv.dst);
                }
            }
        }

        let byte0 = (encode_id << 4) | code;
        debug_assert_ne!(byte0, 0x0A, "encoded byte must never be a forbidden value");
        debug_assert_ne!(byte0, 0x0D, "encoded byte must never be a forbidden value");

        out.push(byte0);
        if nbytes == 2 {
            out.push(0x40 | (mv.dst.ix() as u8 & 0x3F));
        }

        tracing::trace!(encode_id, code, nbytes, src = %mv.src, dst = %mv.dst, "encoded ply");

        self.apply_move(mv, color, mover_id);
        nbytes
    }

    /// Decode one ply from the front of `bytes` without mutating `self`.
    /// Equivalent to `decode` followed by a rewind, but does no work that
    /// decode itself doesn't also do.
    pub fn peek(&self, bytes: &[u8]) -> Move {
        self.decode_core(bytes).0
    }

    /// Decode one ply from the front of `bytes`, advancing `self` by
    /// exactly that ply. Returns the move and the number of bytes consumed.
    pub fn decode(&mut self, bytes: &[u8]) -> (Move, usize) {
        let (mv, nbytes, mover_id) = self.decode_core(bytes);
        let color = self.turn();
        self.apply_move(&mv, color, mover_id);
        (mv, nbytes)
    }

    fn decode_core(&self, bytes: &[u8]) -> (Move, usize, u8) {
        debug_assert!(!bytes.is_empty(), "decode() called on an empty byte stream");
        let color = self.turn();
        let byte0 = bytes[0];
        debug_assert_ne!(byte0, 0x0A, "0x0A never appears in a valid stream");
        debug_assert_ne!(byte0, 0x0D, "0x0D never appears in a valid stream");

        let tracker_id = byte0 >> 4;
        let lo = byte0 & 0x0F;
        let side = self.trackers.side(color);
        let pt = side.get(tracker_id);

        let mut nbytes = 1usize;
        let mut special = Special::None;
        let src: Square;
        let dst: Square;
        let mover_id: u8;

        // A tracker with a shadow_owner is either genuinely standing in for
        // the queen right now (rook-delegate byte, or CODE_N_SHADOW bit set
        // on a rank/file delegate) or it's TI_KN/TI_QN moving as an ordinary
        // knight — init() wires both of those up as rank/file shadows, so
        // shadow_owner alone can't distinguish the two; the low nibble must.
        let shadow_move = pt.shadow_owner.filter(|&owner_id| {
            side.get(owner_id).shadow_rook == Some(tracker_id) || lo & 0x08 != 0
        });

        if let Some(owner_id) = shadow_move {
            let owner = side.get(owner_id);
            src = owner.square;
            if owner.shadow_rook == Some(tracker_id) {
                dst = rook_dst(src, lo);
            } else if tracker_id == TI_KN {
                // Rank-shadow: low 3 bits name the new rank, file unchanged.
                dst = Square::from_u8(((lo & 0x07) << 3) | src.file());
            } else {
                // File-shadow: low 3 bits name the new file, rank unchanged.
                dst = Square::from_u8((src.rank() << 3) | (lo & 0x07));
            }
            mover_id = owner_id;
        } else {
            src = pt.square;
            mover_id = tracker_id;
            match classify(pt.piece) {
                Piece::Knight => {
                    dst = src.offset(-(knight_delta(lo) as i8)).expect("knight byte stays on board");
                }
                Piece::King => match lo {
                    1 => {
                        special = Special::CastleWk;
                        dst = Square::G1;
                    }
                    2 => {
                        special = Special::CastleBk;
                        dst = Square::G8;
                    }
                    3 => {
                        special = Special::CastleWq;
                        dst = Square::C1;
                    }
                    4 => {
                        special = Special::CastleBq;
                        dst = Square::C8;
                    }
                    _ => {
                        special = Special::KingMove;
                        dst = src.offset(-(king_delta(lo) as i8)).expect("king byte stays on board");
                    }
                },
                Piece::Queen | Piece::Bishop => {
                    if lo & 0x08 != 0 {
                        let file_delta = (lo & 0x07) as i8 - src.file() as i8;
                        if file_delta == 0 {
                            nbytes = 2;
                            dst = Square::from_u8(bytes[1] & 0x3F);
                        } else {
                            dst = src.offset(9 * file_delta).expect("FALL byte stays on board");
                        }
                    } else {
                        dst = bishop_dst(src, lo);
                    }
                }
                Piece::Rook => {
                    dst = rook_dst(src, lo);
                }
                Piece::Pawn => {
                    let on_promotion_rank = if color.is_white() {
                        (48..=55).contains(&src.ix())
                    } else {
                        (8..=15).contains(&src.ix())
                    };
                    let dir = lo & 0x03;
                    if dir == 3 {
                        special =
                            if color.is_white() { Special::PawnDoubleWhite } else { Special::PawnDoubleBlack };
                        dst = src.offset(pawn_delta(color, dir) as i8).expect("double push stays on board");
                    } else {
                        dst = src.offset(pawn_delta(color, dir) as i8).expect("pawn byte stays on board");
                        if on_promotion_rank {
                            special = promo_from_bits(lo & 0x0C);
                        } else if dir != 1 && self.position.at(dst) == ' ' {
                            let behind = if color.is_white() { dst.offset(-8) } else { dst.offset(8) };
                            let victim = if color.is_white() { 'p' } else { 'P' };
                            if behind.is_some_and(|sq| self.position.at(sq) == victim) {
                                special =
                                    if color.is_white() { Special::EnPassantWhite } else { Special::EnPassantBlack };
                            }
                        }
                    }
                }
            }
        }

        let capture_sq = match special {
            Special::EnPassantWhite => dst.offset(-8),
            Special::EnPassantBlack => dst.offset(8),
            _ => (self.position.at(dst) != ' ').then_some(dst),
        };
        let capture = capture_sq.map(|sq| self.position.at(sq));

        (Move { src, dst, special, capture }, nbytes, mover_id)
    }

    /// Mutations common to `encode` and `decode`: castling rook relocation,
    /// promotion, capture cleanup, and the mover itself. `mover_id` is the
    /// tracker that actually occupies `mv.src` — the queen, even when the
    /// byte's high nibble names one of its shadow delegates.
    fn apply_move(&mut self, mv: &Move, color: Color, mover_id: u8) {
        match mv.special {
            Special::CastleWk => self.trackers.relocate(color, TI_KR, Square::F1),
            Special::CastleBk => self.trackers.relocate(color, TI_KR, Square::F8),
            Special::CastleWq => self.trackers.relocate(color, TI_QR, Square::D1),
            Special::CastleBq => self.trackers.relocate(color, TI_QR, Square::D8),
            _ => {}
        }

        if let Some(promoted) = mv.special.promotion_piece() {
            self.trackers.side_mut(color).get_mut(mover_id).piece = promoted.to_char(color);
            if promoted == Piece::Queen {
                self.trackers.attach_shadow_rook(color, mover_id);
            }
        }

        let capture_sq = match mv.special {
            Special::EnPassantWhite => mv.dst.offset(-8),
            Special::EnPassantBlack => mv.dst.offset(8),
            _ => (self.position.at(mv.dst) != ' ').then_some(mv.dst),
        };
        if let Some(sq) = capture_sq {
            self.trackers.capture_at(sq);
        }

        self.trackers.relocate(color, mover_id, mv.dst);
        self.position.play(mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Move;

    fn push1(c: &mut Codec, src: Square, dst: Square) -> Vec<u8> {
        let mut out = Vec::new();
        c.encode(&Move::quiet(src, dst), &mut out);
        out
    }

    #[test]
    fn pawn_push_is_one_byte_and_round_trips() {
        let mut c = Codec::init();
        let bytes = push1(&mut c, Square::E2, Square::E4);
        assert_eq!(bytes.len(), 1);

        let mut d = Codec::init();
        let (mv, n) = d.decode(&bytes);
        assert_eq!(n, 1);
        assert_eq!(mv.dst, Square::E4);
        assert_eq!(d.position.at(Square::E4), 'P');
    }

    #[test]
    fn peek_does_not_mutate() {
        let c = Codec::init();
        let mut out = Vec::new();
        let mut scratch = c;
        scratch.encode(&Move::quiet(Square::E2, Square::E4), &mut out);

        let before = c;
        let peeked = c.peek(&out);
        assert_eq!(peeked.dst, Square::E4);
        assert_eq!(c, before);
    }

    #[test]
    fn kingside_castle_is_byte_0x01_low_nibble() {
        let mut c = Codec::init();
        c.position.squares[Square::F1.ix()] = ' ';
        c.position.squares[Square::G1.ix()] = ' ';
        let mut out = Vec::new();
        c.encode(&Move { src: Square::E1, dst: Square::G1, special: Special::CastleWk, capture: None }, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0] & 0x0F, 1);
        assert_eq!(c.trackers.side(Color::White).get(TI_KR).square, Square::F1);
    }

    #[test]
    fn promotion_attaches_shadow_rook_and_shadows_a_file_move() {
        let mut c = Codec::init();
        // clear a path: move the a-pawn to a7, then promote in place of the capture
        c.trackers.relocate(Color::White, crate::tracker::TI_AP, Square::B7);
        c.position.squares[Square::A7.ix()] = ' ';
        c.position.squares[Square::B7.ix()] = 'P';
        let mut out = Vec::new();
        c.encode(
            &Move { src: Square::B7, dst: Square::A8, special: Special::PromoteQueen, capture: Some('r') },
            &mut out,
        );
        let promoted_id = crate::tracker::TI_AP;
        assert_eq!(c.trackers.side(Color::White).get(promoted_id).piece, 'Q');
        assert!(c.trackers.side(Color::White).get(promoted_id).shadow_rook.is_some());
    }

    #[test]
    fn unshadowable_queen_rank_move_escapes_to_two_bytes() {
        let mut c = Codec::init();
        let qid = crate::tracker::TI_Q;
        c.trackers.side_mut(Color::White).get_mut(qid).shadow_rank = None;
        c.trackers.side_mut(Color::White).get_mut(qid).shadow_file = None;
        c.position.squares[Square::H1.ix()] = ' ';

        let mut out = Vec::new();
        let n = c.encode(&Move::quiet(Square::D1, Square::H1), &mut out);

        assert_eq!(n, 2);
        assert_eq!(out[0] >> 4, qid);
        assert_eq!(out[0] & 0x0F, 0x08 | Square::D1.file());
        assert_eq!(out[1], 0x40 | Square::H1.ix() as u8);
    }

    #[test]
    fn king_table_never_assigns_the_forbidden_line_terminator_bytes() {
        let castle_codes = [1u8, 2, 3, 4];
        let vector_codes: Vec<u8> =
            [9i16, 8, 7, 1, -1, -7, -8, -9].iter().map(|&d| king_code(d)).collect();
        for code in castle_codes.iter().chain(vector_codes.iter()) {
            assert_ne!(*code, 0x0A, "king low nibble must never be 0x0A");
            assert_ne!(*code, 0x0D, "king low nibble must never be 0x0D");
        }
        // every low nibble the king table can produce is distinct
        let mut all: Vec<u8> = castle_codes.to_vec();
        all.extend(vector_codes);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn deep_copy_mid_game_advances_byte_identically() {
        let mut original = Codec::init();
        let mut setup_bytes = Vec::new();
        original.encode(&Move::quiet(Square::E2, Square::E4), &mut setup_bytes);
        original.encode(&Move::quiet(Square::B8, Square::C6), &mut setup_bytes);

        let mut copy = original;

        let tail_moves = [
            Move::quiet(Square::F1, Square::C4),
            Move::quiet(Square::G8, Square::F6),
        ];

        let mut bytes_a = Vec::new();
        let mut bytes_b = Vec::new();
        for mv in &tail_moves {
            original.encode(mv, &mut bytes_a);
            copy.encode(mv, &mut bytes_b);
        }

        assert_eq!(bytes_a, bytes_b);
        assert_eq!(original, copy);
    }

    #[test]
    fn capturing_queen_reverts_shadows_but_keeps_original_pieces_alive() {
        let mut c = Codec::init();
        let qid = crate::tracker::TI_Q;
        c.trackers.attach_shadow_rook(Color::White, qid);
        let queen_sq = c.trackers.side(Color::White).get(qid).square;
        c.trackers.capture_at(queen_sq);
        assert!(c.trackers.side(Color::White).get(crate::tracker::TI_KN).in_use);
        assert!(c.trackers.side(Color::White).get(crate::tracker::TI_QN).in_use);
        assert!(!c.trackers.side(Color::White).get(15).in_use);
    }
}
