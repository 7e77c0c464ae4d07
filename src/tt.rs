use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::types::*;

pub const DEFAULT_HASH_MB: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Upper bound (fail low).
    Alpha = 1,
    /// Lower bound (fail high).
    Beta = 2,
    Exact = 3,
}

impl Bound {
    fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            1 => Some(Bound::Alpha),
            2 => Some(Bound::Beta),
            3 => Some(Bound::Exact),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtEntry {
    pub score: Score,
    pub depth: i32,
    pub mv: Option<Move>,
    pub bound: Bound,
}

// --- PACKED ENTRY (Atomic) ---
// data: [0..16) move, [16..32) score, [32..40) depth, [40..42) bound, [42..48) age
// check: key ^ data, so a torn write fails verification
#[derive(Default)]
struct TtSlot {
    check: AtomicU64,
    data: AtomicU64,
}

const AGE_MASK: u32 = 0x3F;

#[inline(always)]
fn pack(mv: Option<Move>, score: Score, depth: i32, bound: Bound, age: u32) -> u64 {
    let mv = mv.map_or(0, |m| m.raw()) as u64;
    let score = (score as i16) as u16 as u64;
    let depth = depth.clamp(0, 255) as u64;
    mv | (score << 16) | (depth << 32) | ((bound as u64) << 40) | (((age & AGE_MASK) as u64) << 42)
}

#[inline(always)]
fn unpack_score(data: u64) -> Score {
    ((data >> 16) as u16) as i16 as Score
}

#[inline(always)]
fn unpack_depth(data: u64) -> i32 {
    ((data >> 32) & 0xFF) as i32
}

#[inline(always)]
fn unpack_age(data: u64) -> u32 {
    ((data >> 42) as u32) & AGE_MASK
}

#[inline(always)]
fn score_to_tt(score: Score, ply: i32) -> Score {
    if score < -SCORE_WIN {
        score - ply
    } else if score > SCORE_WIN {
        score + ply
    } else {
        score
    }
}

#[inline(always)]
fn score_from_tt(score: Score, ply: i32) -> Score {
    if score < -SCORE_WIN {
        score + ply
    } else if score > SCORE_WIN {
        score - ply
    } else {
        score
    }
}

/// Lock-free table shared by every search thread. Races between threads
/// are tolerated; every read re-validates against the full key.
pub struct TranspositionTable {
    slots: Box<[TtSlot]>,
    mask: usize,
    age: AtomicU32,
    entries: AtomicUsize,
}

impl TranspositionTable {
    pub fn new(mb: usize) -> Self {
        let bytes = mb * 1024 * 1024;
        let wanted = bytes / std::mem::size_of::<TtSlot>();
        let capacity = if wanted == 0 { 0 } else { 1usize << (usize::BITS - 1 - wanted.leading_zeros()) };

        let slots: Box<[TtSlot]> = (0..capacity).map(|_| TtSlot::default()).collect();
        log::info!("TT: {} MB / {} entries", mb, capacity);

        Self {
            slots,
            mask: capacity.saturating_sub(1),
            age: AtomicU32::new(0),
            entries: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn slot(&self, key: u64) -> Option<&TtSlot> {
        if self.slots.is_empty() {
            return None;
        }
        Some(&self.slots[(key as usize) & self.mask])
    }

    /// Loads the verified data word for `key`, if present.
    #[inline(always)]
    fn load(&self, key: u64) -> Option<u64> {
        let slot = self.slot(key)?;
        let data = slot.data.load(Ordering::Relaxed);
        let check = slot.check.load(Ordering::Relaxed);
        if check ^ data == key && Bound::from_bits((data >> 40) & 0x3).is_some() {
            Some(data)
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        {
            if let Some(slot) = self.slot(key) {
                // SAFETY: prefetching is a hint and never dereferences the pointer
                unsafe {
                    core::arch::x86_64::_mm_prefetch(
                        slot as *const TtSlot as *const i8,
                        core::arch::x86_64::_MM_HINT_T0,
                    );
                }
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = key;
    }

    /// Returns `(hit, entry)`. `hit` is true when the entry is deep enough and
    /// its bound settles the window; bound hits report the window edge.
    /// `entry` is filled for any verified match so the caller can still use
    /// its move and score.
    pub fn probe(&self, key: u64, depth: i32, ply: i32, alpha: Score, beta: Score) -> (bool, Option<TtEntry>) {
        let Some(data) = self.load(key) else {
            return (false, None);
        };
        let Some(bound) = Bound::from_bits((data >> 40) & 0x3) else {
            return (false, None);
        };

        let mut entry = TtEntry {
            score: score_from_tt(unpack_score(data), ply),
            depth: unpack_depth(data),
            mv: Move::from_raw(data as u16),
            bound,
        };

        if entry.depth < depth {
            return (false, Some(entry));
        }

        let hit = match bound {
            Bound::Exact => true,
            Bound::Alpha => {
                if entry.score <= alpha {
                    entry.score = alpha;
                    true
                } else {
                    false
                }
            }
            Bound::Beta => {
                if entry.score >= beta {
                    entry.score = beta;
                    true
                } else {
                    false
                }
            }
        };
        (hit, Some(entry))
    }

    pub fn probe_move(&self, key: u64) -> Option<Move> {
        self.load(key).and_then(|data| Move::from_raw(data as u16))
    }

    pub fn put(&self, key: u64, score: Score, mv: Option<Move>, depth: i32, ply: i32, bound: Bound) {
        let Some(slot) = self.slot(key) else {
            return;
        };
        let age = self.age.load(Ordering::Relaxed);

        let old_data = slot.data.load(Ordering::Relaxed);
        let old_check = slot.check.load(Ordering::Relaxed);
        let empty = old_data == 0 && old_check == 0;
        let same_key = old_check ^ old_data == key;

        let replace = empty
            || bound == Bound::Exact
            || unpack_age(old_data) != (age & AGE_MASK)
            || unpack_depth(old_data) < depth + if same_key { 3 } else { 0 };
        if !replace {
            return;
        }

        debug_assert!(score.abs() <= SCORE_MAX, "out of range score {} stored", score);
        let data = pack(mv, score_to_tt(score, ply), depth, bound, age);
        slot.data.store(data, Ordering::Relaxed);
        slot.check.store(key ^ data, Ordering::Relaxed);

        if empty {
            self.entries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Occupancy in per-mille.
    pub fn full(&self) -> u32 {
        if self.slots.is_empty() {
            return 0;
        }
        let used = self.entries.load(Ordering::Relaxed).min(self.slots.len());
        ((used as f64 / self.slots.len() as f64) * 1000.0) as u32
    }

    pub fn age(&self) {
        self.age.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.check.store(0, Ordering::Relaxed);
            slot.data.store(0, Ordering::Relaxed);
        }
        self.entries.store(0, Ordering::Relaxed);
        self.age.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: u64 = 0x1234_5678_9ABC_DEF0;

    #[test]
    fn test_capacity_is_power_of_two() {
        let tt = TranspositionTable::new(1);
        assert!(tt.capacity().is_power_of_two());
        assert_eq!(tt.capacity(), 1024 * 1024 / 16);
        assert_eq!(TranspositionTable::new(0).capacity(), 0);
    }

    #[test]
    fn test_put_and_probe_exact() {
        let tt = TranspositionTable::new(1);
        let mv = Move::new(12, 28);
        tt.put(KEY, 42, Some(mv), 5, 0, Bound::Exact);

        let (hit, entry) = tt.probe(KEY, 5, 0, -100, 100);
        assert!(hit);
        let entry = entry.expect("entry present");
        assert_eq!(entry.score, 42);
        assert_eq!(entry.mv, Some(mv));
        assert_eq!(tt.probe_move(KEY), Some(mv));

        let (hit, entry) = tt.probe(KEY, 6, 0, -100, 100);
        assert!(!hit);
        assert!(entry.is_some());
    }

    #[test]
    fn test_bound_hits_return_window_edge() {
        let tt = TranspositionTable::new(1);
        tt.put(KEY, -300, None, 4, 0, Bound::Alpha);
        let (hit, entry) = tt.probe(KEY, 4, 0, -200, 200);
        assert!(hit);
        assert_eq!(entry.map(|e| e.score), Some(-200));

        let (hit, _) = tt.probe(KEY, 4, 0, -400, 200);
        assert!(!hit);
    }

    #[test]
    fn test_mate_scores_are_ply_adjusted() {
        let tt = TranspositionTable::new(1);
        let mate_in_3_from_ply_4 = SCORE_MATE - 7;
        tt.put(KEY, mate_in_3_from_ply_4, None, 8, 4, Bound::Exact);
        let (_, entry) = tt.probe(KEY, 0, 2, -SCORE_MAX, SCORE_MAX);
        assert_eq!(entry.map(|e| e.score), Some(SCORE_MATE - 5));
    }

    #[test]
    fn test_other_key_misses() {
        let tt = TranspositionTable::new(1);
        tt.put(KEY, 10, Some(Move::new(1, 18)), 3, 0, Bound::Exact);
        let other = KEY ^ (1 << 60);
        assert_eq!(tt.probe(other, 0, 0, -1, 1), (false, None));
        assert_eq!(tt.probe_move(other), None);
    }

    #[test]
    fn test_shallow_same_key_does_not_replace_deep_bound() {
        let tt = TranspositionTable::new(1);
        tt.put(KEY, 50, None, 10, 0, Bound::Beta);
        tt.put(KEY, 20, None, 2, 0, Bound::Alpha);
        let (_, entry) = tt.probe(KEY, 0, 0, -SCORE_MAX, SCORE_MAX);
        assert_eq!(entry.map(|e| e.depth), Some(10));

        tt.age();
        tt.put(KEY, 20, None, 2, 0, Bound::Alpha);
        let (_, entry) = tt.probe(KEY, 0, 0, -SCORE_MAX, SCORE_MAX);
        assert_eq!(entry.map(|e| e.depth), Some(2));
    }

    #[test]
    fn test_full_and_clear() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.full(), 0);
        for i in 0..(tt.capacity() as u64 / 2) {
            tt.put(i, 0, None, 1, 0, Bound::Exact);
        }
        assert_eq!(tt.full(), 500);
        tt.clear();
        assert_eq!(tt.full(), 0);
        assert_eq!(tt.probe_move(1), None);
    }
}
