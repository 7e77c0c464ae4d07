use crate::position::Position;
use crate::types::*;

/// Scores saturate towards this magnitude under the gravity update.
pub const MAX_HISTORY: i32 = 16384;

/// A move as the ordering tables see it: the piece that moved and where it
/// landed. Castling is keyed by the king's destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryMove {
    pub piece: u8,
    pub dst: u8,
}

impl HistoryMove {
    #[inline(always)]
    pub fn from(pos: &Position, mv: Move) -> Self {
        HistoryMove { piece: pos.piece_at(mv.source()) as u8, dst: mv.target() }
    }

    #[inline(always)]
    fn idx(self) -> usize {
        self.piece as usize * 64 + self.dst as usize
    }
}

#[derive(Clone, Copy, Default)]
pub struct HistoryEntry {
    pub score: i32,
    pub countermove: Option<Move>,
}

#[inline(always)]
pub fn history_bonus(depth: i32) -> i32 {
    (depth * depth + depth - 1).min(MAX_HISTORY)
}

#[inline(always)]
fn apply_gravity(entry: &mut i32, adjustment: i32) {
    *entry += adjustment - *entry * adjustment.abs() / MAX_HISTORY;
}

// --- HISTORY TABLE ---
// Main table: [Piece][Dst] -> score + countermove.
// Continuation: [PrevPiece][PrevDst][Piece][Dst], flattened.
pub struct HistoryTable {
    main: Vec<HistoryEntry>,
    continuation: Vec<i32>,
}

const SLOTS: usize = 12 * 64;

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            main: vec![HistoryEntry::default(); SLOTS],
            continuation: vec![0; SLOTS * SLOTS],
        }
    }

    #[inline(always)]
    pub fn entry(&self, mv: HistoryMove) -> &HistoryEntry {
        &self.main[mv.idx()]
    }

    #[inline(always)]
    pub fn score(&self, mv: HistoryMove) -> i32 {
        self.main[mv.idx()].score
    }

    #[inline(always)]
    pub fn countermove(&self, prev: Option<HistoryMove>) -> Option<Move> {
        prev.and_then(|prev| self.main[prev.idx()].countermove)
    }

    #[inline(always)]
    pub fn cont_score(&self, prev: Option<HistoryMove>, mv: HistoryMove) -> i32 {
        match prev {
            Some(prev) => self.continuation[prev.idx() * SLOTS + mv.idx()],
            None => 0,
        }
    }

    /// Ordering score of a quiet move given the two previous moves.
    #[inline(always)]
    pub fn quiet_score(&self, mv: HistoryMove, prev: Option<HistoryMove>, prev_prev: Option<HistoryMove>) -> i32 {
        self.score(mv) + self.cont_score(prev, mv) + self.cont_score(prev_prev, mv)
    }

    /// Rewards `best` and punishes every quiet tried before it. The countermove
    /// slot of `prev` is pointed at `best_move`.
    pub fn update_cutoff(
        &mut self,
        best: HistoryMove,
        best_move: Move,
        tried: &[HistoryMove],
        prev: Option<HistoryMove>,
        prev_prev: Option<HistoryMove>,
        depth: i32,
    ) {
        let bonus = history_bonus(depth);

        self.adjust(best, prev, prev_prev, bonus);
        for &quiet in tried {
            self.adjust(quiet, prev, prev_prev, -bonus);
        }

        if let Some(prev) = prev {
            self.main[prev.idx()].countermove = Some(best_move);
        }
    }

    #[inline(always)]
    fn adjust(&mut self, mv: HistoryMove, prev: Option<HistoryMove>, prev_prev: Option<HistoryMove>, adjustment: i32) {
        apply_gravity(&mut self.main[mv.idx()].score, adjustment);
        for earlier in [prev, prev_prev].into_iter().flatten() {
            apply_gravity(&mut self.continuation[earlier.idx() * SLOTS + mv.idx()], adjustment);
        }
    }

    /// Decays scores between searches. Countermoves are kept.
    pub fn age(&mut self) {
        for e in self.main.iter_mut() {
            e.score /= 2;
        }
        for s in self.continuation.iter_mut() {
            *s /= 2;
        }
    }

    pub fn clear(&mut self) {
        self.main.fill(HistoryEntry::default());
        self.continuation.fill(0);
    }
}
