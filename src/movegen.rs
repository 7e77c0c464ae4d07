use crate::bitboard::{self, Bitboard};
use crate::history::{HistoryMove, HistoryTable};
use crate::position::{Position, BLACK_OO, BLACK_OOO, WHITE_OO, WHITE_OOO};
use crate::see::{self, see};
use crate::types::*;

pub const MAX_MOVES: usize = 256;

#[derive(Clone, Copy)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    count: usize,
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveList {
    pub fn new() -> Self {
        Self { moves: [Move::default(); MAX_MOVES], count: 0 }
    }

    #[inline(always)]
    pub fn push(&mut self, m: Move) {
        if self.count < MAX_MOVES {
            self.moves[self.count] = m;
            self.count += 1;
        }
    }

    #[inline(always)] pub fn len(&self) -> usize { self.count }
    #[inline(always)] pub fn is_empty(&self) -> bool { self.count == 0 }
    #[inline(always)] pub fn clear(&mut self) { self.count = 0; }
    #[inline(always)] pub fn get(&self, i: usize) -> Move { self.moves[i] }
    #[inline(always)] pub fn swap(&mut self, i: usize, j: usize) { self.moves.swap(i, j); }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves[..self.count].iter()
    }

    pub fn contains(&self, m: Move) -> bool {
        self.iter().any(|&x| x == m)
    }
}

// --- GENERATION ---

#[inline(always)]
fn push_promotions(list: &mut MoveList, src: u8, dst: u8) {
    for promo in [QUEEN, KNIGHT, ROOK, BISHOP] {
        list.push(Move::promotion(src, dst, promo));
    }
}

#[inline(always)]
fn push_targets(list: &mut MoveList, src: u8, targets: Bitboard) {
    for dst in targets {
        list.push(Move::new(src, dst));
    }
}

fn piece_attacks(pt: usize, sq: u8, occ: Bitboard) -> Bitboard {
    match pt {
        KNIGHT => bitboard::get_knight_attacks(sq),
        BISHOP => bitboard::get_bishop_attacks(sq, occ),
        ROOK => bitboard::get_rook_attacks(sq, occ),
        QUEEN => bitboard::get_queen_attacks(sq, occ),
        _ => bitboard::get_king_attacks(sq),
    }
}

/// Captures, en passant and every promotion.
pub fn generate_noisy(list: &mut MoveList, pos: &Position) {
    let us = pos.to_move();
    let them = 1 - us;
    let occ = pos.occupancy(BOTH);
    let enemy_king = pos.pieces(make_piece(them, KING));
    let victims = pos.occupancy(them) & !enemy_king;
    let promo_rank = if us == WHITE { 7 } else { 0 };

    for src in pos.pieces(make_piece(us, PAWN)) {
        let push = if us == WHITE { src + 8 } else { src - 8 };
        if push / 8 == promo_rank && !occ.get_bit(push) {
            push_promotions(list, src, push);
        }
        for dst in bitboard::get_pawn_attacks(src, us) & victims {
            if dst / 8 == promo_rank {
                push_promotions(list, src, dst);
            } else {
                list.push(Move::new(src, dst));
            }
        }
        let ep = pos.en_passant();
        if ep != NO_SQUARE && bitboard::get_pawn_attacks(src, us).get_bit(ep) {
            list.push(Move::en_passant(src, ep));
        }
    }

    for pt in KNIGHT..=KING {
        for src in pos.pieces(make_piece(us, pt)) {
            push_targets(list, src, piece_attacks(pt, src, occ) & victims);
        }
    }
}

/// Non-capturing, non-promoting moves including castling.
pub fn generate_quiet(list: &mut MoveList, pos: &Position) {
    let us = pos.to_move();
    let occ = pos.occupancy(BOTH);
    let empty = !occ;
    let (promo_rank, start_rank) = if us == WHITE { (7, 1) } else { (0, 6) };

    for src in pos.pieces(make_piece(us, PAWN)) {
        let push = if us == WHITE { src + 8 } else { src - 8 };
        if push / 8 == promo_rank || occ.get_bit(push) {
            continue;
        }
        list.push(Move::new(src, push));
        if src / 8 == start_rank {
            let double = if us == WHITE { src + 16 } else { src - 16 };
            if !occ.get_bit(double) {
                list.push(Move::new(src, double));
            }
        }
    }

    for pt in KNIGHT..=KING {
        for src in pos.pieces(make_piece(us, pt)) {
            push_targets(list, src, piece_attacks(pt, src, occ) & empty);
        }
    }

    for &mv in castling_moves(pos).iter() {
        list.push(mv);
    }
}

pub fn generate_all(list: &mut MoveList, pos: &Position) {
    generate_noisy(list, pos);
    generate_quiet(list, pos);
}

/// Castling moves available to the side to move. The king may not start in,
/// pass through or land on an attacked square.
pub fn castling_moves(pos: &Position) -> MoveList {
    let mut list = MoveList::new();
    let us = pos.to_move();
    let them = 1 - us;
    let occ = pos.occupancy(BOTH);
    let rights = pos.castling_rights();

    // (right, king from, king to, must be empty, must be safe)
    let options: [(u8, u8, u8, u64, [u8; 3]); 2] = if us == WHITE {
        [
            (WHITE_OO, 4, 6, 0x60, [4, 5, 6]),
            (WHITE_OOO, 4, 2, 0x0E, [4, 3, 2]),
        ]
    } else {
        [
            (BLACK_OO, 60, 62, 0x60 << 56, [60, 61, 62]),
            (BLACK_OOO, 60, 58, 0x0E << 56, [60, 59, 58]),
        ]
    };

    for (right, from, to, between, safe) in options {
        if rights & right == 0 || (occ.0 & between) != 0 {
            continue;
        }
        if pos.piece_at(from) != make_piece(us, KING) {
            continue;
        }
        if safe.iter().any(|&sq| pos.is_attacked(sq, them)) {
            continue;
        }
        list.push(Move::castling(from, to));
    }
    list
}

// --- STAGED MOVE GENERATOR ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Hash,
    GoodNoisy,
    Killer,
    Quiet,
    BadNoisy,
    End,
}

const COUNTERMOVE_BONUS: i32 = 8192;

/// Yields moves lazily in stages. Moves are pseudolegal; the caller rejects
/// moves that leave the king attacked.
pub struct MoveGenerator {
    stage: Stage,
    hash_move: Option<Move>,
    killers: [Option<Move>; 2],
    killer_idx: usize,
    prev: Option<HistoryMove>,
    prev_prev: Option<HistoryMove>,
    noisy_only: bool,

    moves: MoveList,
    scores: [i32; MAX_MOVES],
    idx: usize,
    bad_noisy: MoveList,
    bad_idx: usize,
}

impl MoveGenerator {
    pub fn new(
        hash_move: Option<Move>,
        killers: [Option<Move>; 2],
        prev: Option<HistoryMove>,
        prev_prev: Option<HistoryMove>,
    ) -> Self {
        Self {
            stage: Stage::Start,
            hash_move,
            killers,
            killer_idx: 0,
            prev,
            prev_prev,
            noisy_only: false,
            moves: MoveList::new(),
            scores: [0; MAX_MOVES],
            idx: 0,
            bad_noisy: MoveList::new(),
            bad_idx: 0,
        }
    }

    /// Hash move first, then noisy moves only.
    pub fn qsearch(hash_move: Option<Move>) -> Self {
        let mut gen = Self::new(hash_move, [None; 2], None, None);
        gen.noisy_only = true;
        gen
    }

    /// The stage that produced the most recently returned move.
    #[inline(always)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn next(&mut self, pos: &Position, history: &HistoryTable) -> Option<Move> {
        loop {
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Hash;
                    if let Some(mv) = self.hash_move {
                        return Some(mv);
                    }
                }
                Stage::Hash => {
                    self.stage = Stage::GoodNoisy;
                    self.moves.clear();
                    generate_noisy(&mut self.moves, pos);
                    self.score_noisy(pos);
                    self.idx = 0;
                }
                Stage::GoodNoisy => {
                    while let Some(mv) = self.select_next() {
                        if Some(mv) == self.hash_move {
                            continue;
                        }
                        if !see(pos, mv, 0) {
                            self.bad_noisy.push(mv);
                            continue;
                        }
                        return Some(mv);
                    }
                    if self.noisy_only {
                        self.stage = Stage::BadNoisy;
                        self.bad_idx = 0;
                        continue;
                    }
                    self.stage = Stage::Killer;
                    self.killer_idx = 0;
                }
                Stage::Killer => {
                    while self.killer_idx < self.killers.len() {
                        let slot = self.killer_idx;
                        self.killer_idx += 1;
                        let Some(killer) = self.killers[slot] else { continue };
                        if Some(killer) != self.hash_move
                            && (slot == 0 || self.killers[0] != Some(killer))
                            && !pos.is_noisy(killer)
                            && pos.is_pseudolegal(killer)
                        {
                            return Some(killer);
                        }
                    }
                    self.stage = Stage::Quiet;
                    self.moves.clear();
                    generate_quiet(&mut self.moves, pos);
                    self.score_quiet(pos, history);
                    self.idx = 0;
                }
                Stage::Quiet => {
                    while let Some(mv) = self.select_next() {
                        if Some(mv) == self.hash_move || self.killers.contains(&Some(mv)) {
                            continue;
                        }
                        return Some(mv);
                    }
                    self.stage = Stage::BadNoisy;
                    self.bad_idx = 0;
                }
                Stage::BadNoisy => {
                    if self.bad_idx < self.bad_noisy.len() {
                        let mv = self.bad_noisy.get(self.bad_idx);
                        self.bad_idx += 1;
                        return Some(mv);
                    }
                    self.stage = Stage::End;
                }
                Stage::End => return None,
            }
        }
    }

    fn score_noisy(&mut self, pos: &Position) {
        for i in 0..self.moves.len() {
            let mv = self.moves.get(i);
            let attacker = piece_type(pos.piece_at(mv.source()));
            let victim = match mv.kind() {
                MoveKind::EnPassant => PAWN,
                _ => {
                    let v = pos.piece_at(mv.target());
                    if v == NO_PIECE { NO_PIECE } else { piece_type(v) }
                }
            };
            let mut score = if victim == NO_PIECE { 0 } else { see::value(victim) * 8 - attacker as i32 };
            if let Some(promo) = mv.promo() {
                score += see::value(promo);
            }
            self.scores[i] = score;
        }
    }

    fn score_quiet(&mut self, pos: &Position, history: &HistoryTable) {
        let counter = history.countermove(self.prev);
        for i in 0..self.moves.len() {
            let mv = self.moves.get(i);
            let hm = HistoryMove::from(pos, mv);
            let mut score = history.quiet_score(hm, self.prev, self.prev_prev);
            if Some(mv) == counter {
                score += COUNTERMOVE_BONUS;
            }
            self.scores[i] = score;
        }
    }

    // Selection sort step: swap the best remaining move to `idx`.
    fn select_next(&mut self) -> Option<Move> {
        if self.idx >= self.moves.len() {
            return None;
        }
        let mut best = self.idx;
        for i in self.idx + 1..self.moves.len() {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(self.idx, best);
        self.scores.swap(self.idx, best);
        let mv = self.moves.get(self.idx);
        self.idx += 1;
        Some(mv)
    }
}
