//! A stateful codec that turns a legal chess move into one byte (rarely
//! two) and back, given a shared, incrementally-advancing board position.
//!
//! The board adapter ([`board`]) and tracker table ([`tracker`]) hold the
//! state two independent codec instances must agree on to stay in sync;
//! [`codec::Codec`] is the only type callers need to touch.
//!
//! ```
//! use chesstrack::board::Move;
//! use chesstrack::square::Square;
//! use chesstrack::codec::Codec;
//!
//! let mut encoder = Codec::init();
//! let mut bytes = Vec::new();
//! encoder.encode(&Move::quiet(Square::E2, Square::E4), &mut bytes);
//!
//! let mut decoder = Codec::init();
//! let (mv, n) = decoder.decode(&bytes);
//! assert_eq!(n, bytes.len());
//! assert_eq!(mv.dst, Square::E4);
//! ```

pub mod board;
pub mod codec;
pub mod error;
pub mod piece;
pub mod square;
pub mod tracker;
