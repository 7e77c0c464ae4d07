#![allow(non_upper_case_globals)]

use std::ops::{Deref, DerefMut};

use crate::bitboard::{self, Bitboard};
use crate::error::{FenError, MoveParseError};
use crate::movegen::{self, MoveList};
use crate::tt::TranspositionTable;
use crate::types::*;
use crate::zobrist;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Castling rights: K=1, Q=2, k=4, q=8
pub const WHITE_OO: u8 = 1;
pub const WHITE_OOO: u8 = 2;
pub const BLACK_OO: u8 = 4;
pub const BLACK_OOO: u8 = 8;

// Rights that survive a move touching each square
const CASTLE_MASK: [u8; 64] = {
    let mut mask = [15u8; 64];
    mask[0] = 15 & !WHITE_OOO;
    mask[4] = 15 & !(WHITE_OO | WHITE_OOO);
    mask[7] = 15 & !WHITE_OO;
    mask[56] = 15 & !BLACK_OOO;
    mask[60] = 15 & !(BLACK_OO | BLACK_OOO);
    mask[63] = 15 & !BLACK_OO;
    mask
};

#[derive(Debug, Clone, Copy)]
pub struct BoardState {
    pub bitboards: [Bitboard; 12],
    pub occupancies: [Bitboard; 3],
    pub board: [u8; 64],
    pub side_to_move: usize,
    pub castling_rights: u8,
    pub en_passant: u8,
    pub halfmove: u16,
    pub fullmove: u16,
    pub key: u64,
    pub pawn_key: u64,
    pub last_move: Option<Move>,
}

impl BoardState {
    fn empty() -> Self {
        BoardState {
            bitboards: [Bitboard(0); 12],
            occupancies: [Bitboard(0); 3],
            board: [NO_PIECE as u8; 64],
            side_to_move: WHITE,
            castling_rights: 0,
            en_passant: NO_SQUARE,
            halfmove: 0,
            fullmove: 1,
            key: 0,
            pawn_key: 0,
            last_move: None,
        }
    }

    #[inline(always)]
    fn put_piece(&mut self, piece: usize, sq: u8) {
        self.bitboards[piece].set_bit(sq);
        self.occupancies[piece_color(piece)].set_bit(sq);
        self.occupancies[BOTH].set_bit(sq);
        self.board[sq as usize] = piece as u8;
        let z = zobrist::piece_key(piece, sq);
        self.key ^= z;
        if piece_type(piece) == PAWN {
            self.pawn_key ^= z;
        }
    }

    #[inline(always)]
    fn remove_piece(&mut self, piece: usize, sq: u8) {
        self.bitboards[piece].pop_bit(sq);
        self.occupancies[piece_color(piece)].pop_bit(sq);
        self.occupancies[BOTH].pop_bit(sq);
        self.board[sq as usize] = NO_PIECE as u8;
        let z = zobrist::piece_key(piece, sq);
        self.key ^= z;
        if piece_type(piece) == PAWN {
            self.pawn_key ^= z;
        }
    }

    #[inline(always)]
    fn move_piece(&mut self, piece: usize, from: u8, to: u8) {
        self.remove_piece(piece, from);
        self.put_piece(piece, to);
    }
}

/// Copy-make position. Every applied move pushes the previous state, so
/// reverting is a pop and repetition checks walk the saved keys.
#[derive(Debug, Clone)]
pub struct Position {
    curr: BoardState,
    history: Vec<BoardState>,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    pub fn startpos() -> Self {
        match Self::from_fen(START_FEN) {
            Ok(pos) => pos,
            Err(_) => unreachable!("start position FEN is valid"),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::MissingFields(parts.len()));
        }

        let mut state = BoardState::empty();

        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for c in parts[0].chars() {
            match c {
                '/' => {
                    if file != 8 {
                        return Err(FenError::BadPlacement(parts[0].to_string()));
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => file += c as i32 - '0' as i32,
                _ => {
                    let piece = match c {
                        'P' => P, 'N' => N, 'B' => B, 'R' => R, 'Q' => Q, 'K' => K,
                        'p' => p, 'n' => n, 'b' => b, 'r' => r, 'q' => q, 'k' => k,
                        _ => return Err(FenError::BadPlacement(parts[0].to_string())),
                    };
                    if rank < 0 || file > 7 {
                        return Err(FenError::BadPlacement(parts[0].to_string()));
                    }
                    state.put_piece(piece, (rank * 8 + file) as u8);
                    file += 1;
                }
            }
            if file > 8 {
                return Err(FenError::BadPlacement(parts[0].to_string()));
            }
        }
        if rank != 0 || file != 8 {
            return Err(FenError::BadPlacement(parts[0].to_string()));
        }
        if state.bitboards[K].count_bits() != 1 || state.bitboards[k].count_bits() != 1 {
            return Err(FenError::BadKings);
        }

        state.side_to_move = match parts[1] {
            "w" => WHITE,
            "b" => BLACK,
            other => return Err(FenError::BadSide(other.to_string())),
        };
        if state.side_to_move == BLACK {
            state.key ^= zobrist::side_key();
        }

        if parts[2] != "-" {
            for c in parts[2].chars() {
                state.castling_rights |= match c {
                    'K' => WHITE_OO,
                    'Q' => WHITE_OOO,
                    'k' => BLACK_OO,
                    'q' => BLACK_OOO,
                    _ => return Err(FenError::BadCastling(parts[2].to_string())),
                };
            }
        }
        state.key ^= zobrist::castling_key(state.castling_rights);

        if parts[3] != "-" {
            let sq = square_from_str(parts[3]).ok_or_else(|| FenError::BadEnPassant(parts[3].to_string()))?;
            let rank = sq / 8;
            if rank != 2 && rank != 5 {
                return Err(FenError::BadEnPassant(parts[3].to_string()));
            }
            state.en_passant = sq;
            state.key ^= zobrist::en_passant_key(sq);
        }

        if let Some(hm) = parts.get(4) {
            state.halfmove = hm.parse().map_err(|_| FenError::BadClock(hm.to_string()))?;
        }
        if let Some(fm) = parts.get(5) {
            state.fullmove = fm.parse().map_err(|_| FenError::BadClock(fm.to_string()))?;
        }

        Ok(Position { curr: state, history: Vec::with_capacity(512) })
    }

    pub fn to_fen(&self) -> String {
        let s = &self.curr;
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let piece = s.board[rank * 8 + file] as usize;
                if piece == NO_PIECE {
                    empty += 1;
                } else {
                    if empty > 0 {
                        fen.push_str(&empty.to_string());
                        empty = 0;
                    }
                    fen.push(piece_char(piece));
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push_str(if s.side_to_move == WHITE { " w " } else { " b " });

        if s.castling_rights == 0 {
            fen.push('-');
        } else {
            for (bit, c) in [(WHITE_OO, 'K'), (WHITE_OOO, 'Q'), (BLACK_OO, 'k'), (BLACK_OOO, 'q')] {
                if s.castling_rights & bit != 0 {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        if s.en_passant == NO_SQUARE {
            fen.push('-');
        } else {
            fen.push_str(&square_to_coord(s.en_passant));
        }
        fen.push_str(&format!(" {} {}", s.halfmove, s.fullmove));
        fen
    }

    // --- ACCESSORS ---

    #[inline(always)] pub fn state(&self) -> &BoardState { &self.curr }
    #[inline(always)] pub fn key(&self) -> u64 { self.curr.key }
    #[inline(always)] pub fn pawn_key(&self) -> u64 { self.curr.pawn_key }
    #[inline(always)] pub fn to_move(&self) -> usize { self.curr.side_to_move }
    #[inline(always)] pub fn opponent(&self) -> usize { 1 - self.curr.side_to_move }
    #[inline(always)] pub fn last_move(&self) -> Option<Move> { self.curr.last_move }
    #[inline(always)] pub fn halfmove(&self) -> u16 { self.curr.halfmove }
    #[inline(always)] pub fn fullmove(&self) -> u16 { self.curr.fullmove }
    #[inline(always)] pub fn castling_rights(&self) -> u8 { self.curr.castling_rights }
    #[inline(always)] pub fn en_passant(&self) -> u8 { self.curr.en_passant }
    #[inline(always)] pub fn pieces(&self, piece: usize) -> Bitboard { self.curr.bitboards[piece] }
    #[inline(always)] pub fn occupancy(&self, color: usize) -> Bitboard { self.curr.occupancies[color] }
    #[inline(always)] pub fn piece_at(&self, sq: u8) -> usize { self.curr.board[sq as usize] as usize }

    /// Number of moves applied on top of the position this was built from.
    #[inline(always)] pub fn ply_count(&self) -> usize { self.history.len() }

    #[inline(always)]
    pub fn king(&self, color: usize) -> u8 {
        self.curr.bitboards[make_piece(color, KING)].get_lsb_index() as u8
    }

    /// Pieces of `color` other than pawns and the king.
    #[inline(always)]
    pub fn non_pk(&self, color: usize) -> Bitboard {
        self.curr.occupancies[color]
            ^ self.curr.bitboards[make_piece(color, PAWN)]
            ^ self.curr.bitboards[make_piece(color, KING)]
    }

    pub fn attackers_to(&self, sq: u8, occupancy: Bitboard) -> Bitboard {
        let s = &self.curr;
        let rooks = s.bitboards[R] | s.bitboards[r] | s.bitboards[Q] | s.bitboards[q];
        let bishops = s.bitboards[B] | s.bitboards[b] | s.bitboards[Q] | s.bitboards[q];
        (bitboard::get_pawn_attacks(sq, BLACK) & s.bitboards[P])
            | (bitboard::get_pawn_attacks(sq, WHITE) & s.bitboards[p])
            | (bitboard::get_knight_attacks(sq) & (s.bitboards[N] | s.bitboards[n]))
            | (bitboard::get_king_attacks(sq) & (s.bitboards[K] | s.bitboards[k]))
            | (bitboard::get_rook_attacks(sq, occupancy) & rooks)
            | (bitboard::get_bishop_attacks(sq, occupancy) & bishops)
    }

    pub fn is_attacked(&self, sq: u8, by: usize) -> bool {
        let s = &self.curr;
        let occ = s.occupancies[BOTH];
        let queens = s.bitboards[make_piece(by, QUEEN)];

        (bitboard::get_pawn_attacks(sq, 1 - by) & s.bitboards[make_piece(by, PAWN)]).any()
            || (bitboard::get_knight_attacks(sq) & s.bitboards[make_piece(by, KNIGHT)]).any()
            || (bitboard::get_king_attacks(sq) & s.bitboards[make_piece(by, KING)]).any()
            || (bitboard::get_rook_attacks(sq, occ) & (s.bitboards[make_piece(by, ROOK)] | queens)).any()
            || (bitboard::get_bishop_attacks(sq, occ) & (s.bitboards[make_piece(by, BISHOP)] | queens)).any()
    }

    #[inline(always)]
    pub fn is_check(&self) -> bool {
        self.is_attacked(self.king(self.to_move()), self.opponent())
    }

    /// True if the side that just moved left its own king attacked.
    #[inline(always)]
    pub fn is_illegal(&self) -> bool {
        self.is_attacked(self.king(self.opponent()), self.to_move())
    }

    #[inline(always)]
    pub fn is_noisy(&self, mv: Move) -> bool {
        match mv.kind() {
            MoveKind::EnPassant | MoveKind::Promotion => true,
            MoveKind::Castling => false,
            MoveKind::Normal => self.piece_at(mv.target()) != NO_PIECE,
        }
    }

    /// Fifty-move rule, repetition and insufficient material. A single
    /// repetition counts unless `threefold` is set.
    pub fn is_drawn(&self, threefold: bool) -> bool {
        if self.curr.halfmove >= 100 {
            return true;
        }

        let len = self.history.len();
        let window = (self.curr.halfmove as usize).min(len);
        let mut repetitions = 0;
        let mut distance = 4;
        while distance <= window {
            if self.history[len - distance].key == self.curr.key {
                repetitions += 1;
                if !threefold || repetitions >= 2 {
                    return true;
                }
            }
            distance += 2;
        }

        self.insufficient_material()
    }

    fn insufficient_material(&self) -> bool {
        let s = &self.curr;
        let heavy = s.bitboards[P] | s.bitboards[p] | s.bitboards[R] | s.bitboards[r] | s.bitboards[Q] | s.bitboards[q];
        if heavy.any() {
            return false;
        }
        let minors = s.bitboards[N] | s.bitboards[n] | s.bitboards[B] | s.bitboards[b];
        minors.count_bits() <= 1
    }

    /// Checks that `mv` could have come out of the generator for this
    /// position. Legality (own king left in check) is not checked.
    pub fn is_pseudolegal(&self, mv: Move) -> bool {
        let s = &self.curr;
        let us = s.side_to_move;
        let from = mv.source();
        let to = mv.target();
        let piece = s.board[from as usize] as usize;

        if piece == NO_PIECE || piece_color(piece) != us || from == to {
            return false;
        }
        let victim = s.board[to as usize] as usize;
        if victim != NO_PIECE && (piece_color(victim) == us || piece_type(victim) == KING) {
            return false;
        }

        let pt = piece_type(piece);
        let occ = s.occupancies[BOTH];

        match mv.kind() {
            MoveKind::Castling => {
                if pt != KING {
                    return false;
                }
                movegen::castling_moves(self).contains(mv)
            }
            MoveKind::EnPassant => {
                pt == PAWN && to == s.en_passant && bitboard::get_pawn_attacks(from, us).get_bit(to)
            }
            MoveKind::Promotion | MoveKind::Normal => {
                let promo_rank = if us == WHITE { 7 } else { 0 };
                if pt == PAWN {
                    if (to / 8 == promo_rank) != (mv.kind() == MoveKind::Promotion) {
                        return false;
                    }
                    return self.pawn_reaches(from, to, victim != NO_PIECE);
                }
                if mv.kind() == MoveKind::Promotion {
                    return false;
                }
                let attacks = match pt {
                    KNIGHT => bitboard::get_knight_attacks(from),
                    BISHOP => bitboard::get_bishop_attacks(from, occ),
                    ROOK => bitboard::get_rook_attacks(from, occ),
                    QUEEN => bitboard::get_queen_attacks(from, occ),
                    _ => bitboard::get_king_attacks(from),
                };
                attacks.get_bit(to)
            }
        }
    }

    fn pawn_reaches(&self, from: u8, to: u8, capture: bool) -> bool {
        let us = self.curr.side_to_move;
        let occ = self.curr.occupancies[BOTH];
        if capture {
            return bitboard::get_pawn_attacks(from, us).get_bit(to);
        }
        let (single, double, start_rank) = if us == WHITE {
            (from as i32 + 8, from as i32 + 16, 1)
        } else {
            (from as i32 - 8, from as i32 - 16, 6)
        };
        if to as i32 == single {
            return !occ.get_bit(to);
        }
        to as i32 == double && from / 8 == start_rank && !occ.get_bit(single as u8) && !occ.get_bit(to)
    }

    // --- MAKE / UNMAKE ---

    /// Applies `mv` and returns a guard that reverts it when dropped.
    #[inline(always)]
    pub fn apply_move(&mut self, mv: Move, tt: Option<&TranspositionTable>) -> MoveGuard<'_> {
        self.apply_move_unchecked(mv);
        if let Some(tt) = tt {
            tt.prefetch(self.curr.key);
        }
        MoveGuard { pos: self }
    }

    #[inline(always)]
    pub fn apply_null_move(&mut self, tt: Option<&TranspositionTable>) -> MoveGuard<'_> {
        self.history.push(self.curr);
        let s = &mut self.curr;

        if s.en_passant != NO_SQUARE {
            s.key ^= zobrist::en_passant_key(s.en_passant);
            s.en_passant = NO_SQUARE;
        }
        s.side_to_move = 1 - s.side_to_move;
        s.key ^= zobrist::side_key();
        s.halfmove += 1;
        s.last_move = None;

        if let Some(tt) = tt {
            tt.prefetch(self.curr.key);
        }
        MoveGuard { pos: self }
    }

    /// Applies `mv` without a guard; the caller must `pop_move` it.
    pub fn apply_move_unchecked(&mut self, mv: Move) {
        self.history.push(self.curr);
        let s = &mut self.curr;

        let us = s.side_to_move;
        let from = mv.source();
        let to = mv.target();
        let piece = s.board[from as usize] as usize;
        debug_assert!(piece != NO_PIECE, "no piece on source square of {}", mv);

        s.halfmove += 1;

        if s.en_passant != NO_SQUARE {
            s.key ^= zobrist::en_passant_key(s.en_passant);
            s.en_passant = NO_SQUARE;
        }

        match mv.kind() {
            MoveKind::Castling => {
                s.move_piece(piece, from, to);
                let (rook_from, rook_to) = match to {
                    6 => (7, 5),
                    2 => (0, 3),
                    62 => (63, 61),
                    _ => (56, 59),
                };
                s.move_piece(make_piece(us, ROOK), rook_from, rook_to);
            }
            MoveKind::EnPassant => {
                let cap_sq = if us == WHITE { to - 8 } else { to + 8 };
                s.remove_piece(make_piece(1 - us, PAWN), cap_sq);
                s.move_piece(piece, from, to);
                s.halfmove = 0;
            }
            MoveKind::Normal | MoveKind::Promotion => {
                let victim = s.board[to as usize] as usize;
                if victim != NO_PIECE {
                    s.remove_piece(victim, to);
                    s.halfmove = 0;
                }
                match mv.promo() {
                    Some(promo) => {
                        s.remove_piece(piece, from);
                        s.put_piece(make_piece(us, promo), to);
                    }
                    None => s.move_piece(piece, from, to),
                }

                if piece_type(piece) == PAWN {
                    s.halfmove = 0;
                    if (to as i32 - from as i32).abs() == 16 {
                        let ep_sq = (from + to) / 2;
                        s.en_passant = ep_sq;
                        s.key ^= zobrist::en_passant_key(ep_sq);
                    }
                }
            }
        }

        let rights = s.castling_rights & CASTLE_MASK[from as usize] & CASTLE_MASK[to as usize];
        if rights != s.castling_rights {
            s.key ^= zobrist::castling_key(s.castling_rights) ^ zobrist::castling_key(rights);
            s.castling_rights = rights;
        }

        if us == BLACK {
            s.fullmove += 1;
        }
        s.side_to_move = 1 - us;
        s.key ^= zobrist::side_key();
        s.last_move = Some(mv);
    }

    #[inline(always)]
    pub fn pop_move(&mut self) {
        debug_assert!(!self.history.is_empty(), "pop_move without a matching apply");
        if let Some(prev) = self.history.pop() {
            self.curr = prev;
        }
    }

    /// Parses a UCI long-algebraic move and checks it is legal here.
    pub fn move_from_uci(&self, s: &str) -> Result<Move, MoveParseError> {
        if s.len() < 4 || s.len() > 5 {
            return Err(MoveParseError::Malformed(s.to_string()));
        }
        let from = square_from_str(&s[0..2]).ok_or_else(|| MoveParseError::Malformed(s.to_string()))?;
        let to = square_from_str(&s[2..4]).ok_or_else(|| MoveParseError::Malformed(s.to_string()))?;
        let promo = match s.as_bytes().get(4) {
            None => None,
            Some(b'n') => Some(KNIGHT),
            Some(b'b') => Some(BISHOP),
            Some(b'r') => Some(ROOK),
            Some(b'q') => Some(QUEEN),
            Some(_) => return Err(MoveParseError::Malformed(s.to_string())),
        };

        let mut list = MoveList::new();
        movegen::generate_all(&mut list, self);
        let mut pos = self.clone();
        for &mv in list.iter() {
            if mv.source() == from && mv.target() == to && mv.promo() == promo {
                pos.apply_move_unchecked(mv);
                let illegal = pos.is_illegal();
                pos.pop_move();
                if !illegal {
                    return Ok(mv);
                }
            }
        }
        Err(MoveParseError::Illegal(s.to_string()))
    }

    /// Recomputes the hash keys from scratch. Used to validate incremental updates.
    pub fn compute_keys(&self) -> (u64, u64) {
        let s = &self.curr;
        let mut key = 0;
        let mut pawn_key = 0;
        for sq in 0..64u8 {
            let piece = s.board[sq as usize] as usize;
            if piece != NO_PIECE {
                key ^= zobrist::piece_key(piece, sq);
                if piece_type(piece) == PAWN {
                    pawn_key ^= zobrist::piece_key(piece, sq);
                }
            }
        }
        key ^= zobrist::castling_key(s.castling_rights);
        if s.en_passant != NO_SQUARE {
            key ^= zobrist::en_passant_key(s.en_passant);
        }
        if s.side_to_move == BLACK {
            key ^= zobrist::side_key();
        }
        (key, pawn_key)
    }
}

/// Scoped move application. Derefs to the position and reverts the move
/// when dropped, on every exit path.
pub struct MoveGuard<'a> {
    pos: &'a mut Position,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    #[inline(always)]
    fn deref(&self) -> &Position {
        self.pos
    }
}

impl DerefMut for MoveGuard<'_> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for MoveGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        self.pos.pop_move();
    }
}
