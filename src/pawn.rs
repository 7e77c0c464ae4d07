use crate::bitboard::{self, Bitboard};
use crate::position::Position;
use crate::types::*;

// --- PAWN CACHE ---
// Per-thread, keyed by the position's pawn key.
const PAWN_CACHE_SIZE: usize = 16384;

const PASSED_BONUS: [i32; 8] = [0, 10, 20, 40, 70, 120, 200, 0];

#[derive(Clone, Copy, Default, Debug)]
pub struct PawnEntry {
    pub score_mg: i32,
    pub score_eg: i32,
    pub passed_pawns: [Bitboard; 2],
    pub pawn_attacks: [Bitboard; 2],
}

#[derive(Clone, Copy, Default)]
struct Slot {
    key: u64,
    valid: bool,
    entry: PawnEntry,
}

pub struct PawnCache {
    table: Vec<Slot>,
    hits: u64,
}

impl Default for PawnCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PawnCache {
    pub fn new() -> Self {
        Self { table: vec![Slot::default(); PAWN_CACHE_SIZE], hits: 0 }
    }

    pub fn probe(&mut self, pos: &Position) -> PawnEntry {
        let key = pos.pawn_key();
        let idx = (key as usize) & (PAWN_CACHE_SIZE - 1);
        let slot = &mut self.table[idx];
        if slot.valid && slot.key == key {
            self.hits += 1;
            return slot.entry;
        }

        let entry = evaluate_pawns(pos);
        *slot = Slot { key, valid: true, entry };
        entry
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.table.fill(Slot::default());
        self.hits = 0;
    }
}

/// Pawn structure terms from white's point of view.
pub fn evaluate_pawns(pos: &Position) -> PawnEntry {
    let mut entry = PawnEntry::default();
    let pawns = [pos.pieces(P), pos.pieces(p)];

    entry.pawn_attacks[WHITE] = bitboard::pawn_attacks(pawns[WHITE], WHITE);
    entry.pawn_attacks[BLACK] = bitboard::pawn_attacks(pawns[BLACK], BLACK);

    for side in [WHITE, BLACK] {
        let sign = if side == WHITE { 1 } else { -1 };
        let ours = pawns[side];
        let theirs = pawns[1 - side];

        for sq in ours {
            let sq = sq as usize;
            let rel_rank = if side == WHITE { sq / 8 } else { 7 - sq / 8 };

            // Connected
            if entry.pawn_attacks[side].get_bit(sq as u8) {
                entry.score_mg += sign * 10;
                entry.score_eg += sign * 15;
            }

            // Isolated
            if (ours & bitboard::adjacent_file_mask(sq)).is_empty() {
                entry.score_mg -= sign * 15;
                entry.score_eg -= sign * 20;
            }

            // Doubled
            if (ours & bitboard::file_mask(sq)).count_bits() > 1 {
                entry.score_mg -= sign * 10;
                entry.score_eg -= sign * 15;
            }

            // Passed
            if (bitboard::passed_pawn_mask(side, sq) & theirs).is_empty() {
                entry.passed_pawns[side].set_bit(sq as u8);
                entry.score_mg += sign * PASSED_BONUS[rel_rank] / 2;
                entry.score_eg += sign * PASSED_BONUS[rel_rank];
            }
        }
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_structure_cancels() {
        let pos = Position::from_fen("4k3/pp3ppp/8/8/8/8/PP3PPP/4K3 w - - 0 1").expect("valid fen");
        let entry = evaluate_pawns(&pos);
        assert_eq!(entry.score_mg, 0);
        assert_eq!(entry.score_eg, 0);
    }

    #[test]
    fn test_passed_pawn_detected() {
        let pos = Position::from_fen("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1").expect("valid fen");
        let entry = evaluate_pawns(&pos);
        assert!(entry.passed_pawns[WHITE].get_bit(35));
        assert!(entry.score_eg > 0);
    }

    #[test]
    fn test_cache_hits_on_same_pawn_key() {
        let pos = Position::startpos();
        let mut cache = PawnCache::new();
        let first = cache.probe(&pos);
        let second = cache.probe(&pos);
        assert_eq!(first.score_mg, second.score_mg);
        assert_eq!(cache.hits(), 1);
    }
}
