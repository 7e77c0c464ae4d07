#![allow(non_upper_case_globals)] // p, n, b, r, q, k mirror the FEN letters

use std::fmt;

// --- PIECES ---
// [Color * 6 + PieceType], matching the bitboard array layout in Position.
pub const P: usize = 0; pub const N: usize = 1; pub const B: usize = 2;
pub const R: usize = 3; pub const Q: usize = 4; pub const K: usize = 5;
pub const p: usize = 6; pub const n: usize = 7; pub const b: usize = 8;
pub const r: usize = 9; pub const q: usize = 10; pub const k: usize = 11;
pub const NO_PIECE: usize = 12;

pub const WHITE: usize = 0;
pub const BLACK: usize = 1;
pub const BOTH: usize = 2;

pub const PAWN: usize = 0;
pub const KNIGHT: usize = 1;
pub const BISHOP: usize = 2;
pub const ROOK: usize = 3;
pub const QUEEN: usize = 4;
pub const KING: usize = 5;

pub const NO_SQUARE: u8 = 64;

#[inline(always)]
pub fn make_piece(color: usize, piece_type: usize) -> usize {
    color * 6 + piece_type
}

#[inline(always)]
pub fn piece_type(piece: usize) -> usize {
    piece % 6
}

#[inline(always)]
pub fn piece_color(piece: usize) -> usize {
    piece / 6
}

pub fn piece_char(piece: usize) -> char {
    match piece {
        P => 'P', N => 'N', B => 'B', R => 'R', Q => 'Q', K => 'K',
        p => 'p', n => 'n', b => 'b', r => 'r', q => 'q', k => 'k',
        _ => '.',
    }
}

pub fn square_to_coord(sq: u8) -> String {
    let file = (b'a' + (sq % 8)) as char;
    let rank = (b'1' + (sq / 8)) as char;
    format!("{}{}", file, rank)
}

pub fn square_from_str(s: &str) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file < 8 && rank < 8 {
        Some(rank * 8 + file)
    } else {
        None
    }
}

// --- SCORES ---
pub type Score = i32;

pub const MAX_DEPTH: i32 = 255;

pub const SCORE_MATE: Score = 32000;
pub const SCORE_MAX: Score = SCORE_MATE + 1;
pub const SCORE_WIN: Score = SCORE_MATE - MAX_DEPTH;

#[inline(always)]
pub fn mated_in(ply: i32) -> Score {
    -SCORE_MATE + ply
}

// --- MOVE ---
// Packed 16 bits: [0..6) source, [6..12) target, [12..14) promotion, [14..16) kind.
// The all-zero value (a1a1) never occurs as a real move and stands for "no move" in the table.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Normal = 0,
    Promotion = 1,
    Castling = 2,
    EnPassant = 3,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    #[inline(always)]
    pub fn new(source: u8, target: u8) -> Self {
        Move(source as u16 | ((target as u16) << 6))
    }

    /// `promo` is a piece type in KNIGHT..=QUEEN.
    #[inline(always)]
    pub fn promotion(source: u8, target: u8, promo: usize) -> Self {
        debug_assert!((KNIGHT..=QUEEN).contains(&promo));
        Move(
            source as u16
                | ((target as u16) << 6)
                | (((promo - KNIGHT) as u16) << 12)
                | ((MoveKind::Promotion as u16) << 14),
        )
    }

    #[inline(always)]
    pub fn castling(source: u8, target: u8) -> Self {
        Move(source as u16 | ((target as u16) << 6) | ((MoveKind::Castling as u16) << 14))
    }

    #[inline(always)]
    pub fn en_passant(source: u8, target: u8) -> Self {
        Move(source as u16 | ((target as u16) << 6) | ((MoveKind::EnPassant as u16) << 14))
    }

    #[inline(always)]
    pub fn from_raw(raw: u16) -> Option<Self> {
        if raw == 0 { None } else { Some(Move(raw)) }
    }

    #[inline(always)]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn source(self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    #[inline(always)]
    pub fn target(self) -> u8 {
        ((self.0 >> 6) & 0x3F) as u8
    }

    #[inline(always)]
    pub fn kind(self) -> MoveKind {
        match self.0 >> 14 {
            0 => MoveKind::Normal,
            1 => MoveKind::Promotion,
            2 => MoveKind::Castling,
            _ => MoveKind::EnPassant,
        }
    }

    /// Promotion piece type, if any.
    #[inline(always)]
    pub fn promo(self) -> Option<usize> {
        if self.kind() == MoveKind::Promotion {
            Some(KNIGHT + ((self.0 >> 12) & 0x3) as usize)
        } else {
            None
        }
    }

    pub fn to_uci(self) -> String {
        let mut s = format!("{}{}", square_to_coord(self.source()), square_to_coord(self.target()));
        if let Some(promo) = self.promo() {
            s.push(match promo {
                KNIGHT => 'n',
                BISHOP => 'b',
                ROOK => 'r',
                _ => 'q',
            });
        }
        s
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self.to_uci())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_packing() {
        let mv = Move::promotion(52, 60, QUEEN);
        assert_eq!(mv.source(), 52);
        assert_eq!(mv.target(), 60);
        assert_eq!(mv.promo(), Some(QUEEN));
        assert_eq!(mv.to_uci(), "e7e8q");

        let castle = Move::castling(4, 6);
        assert_eq!(castle.kind(), MoveKind::Castling);
        assert_eq!(castle.promo(), None);
        assert_eq!(Move::from_raw(castle.raw()), Some(castle));
        assert_eq!(Move::from_raw(0), None);
    }

    #[test]
    fn test_square_from_str() {
        assert_eq!(square_from_str("a1"), Some(0));
        assert_eq!(square_from_str("h1"), Some(7));
        assert_eq!(square_from_str("e1"), Some(4));
        assert_eq!(square_from_str("h8"), Some(63));
        assert_eq!(square_from_str("i9"), None);
    }
}
