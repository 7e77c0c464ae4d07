use smallvec::SmallVec;

use crate::history::{HistoryMove, HistoryTable};
use crate::pawn::PawnCache;
use crate::position::Position;
use crate::types::*;

/// Per-thread counters for the running search. Limiters only look at
/// `depth` and `nodes`.
#[derive(Clone, Debug, Default)]
pub struct SearchData {
    pub depth: i32,
    pub seldepth: i32,
    pub nodes: u64,
    /// Best root move of the iteration in flight.
    pub best_move: Option<Move>,
    /// Score of the last completed iteration.
    pub score: Score,
    pub null_move_attempts: u64,
    pub singular_searches: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SearchStackEntry {
    pub eval: Score,
    pub curr_move: Option<HistoryMove>,
    pub excluded: Option<Move>,
    /// Most recent quiet cutoff first.
    pub killers: [Option<Move>; 2],
    pub quiets_tried: SmallVec<[HistoryMove; 64]>,
}

impl SearchStackEntry {
    /// Records a quiet cutoff move, shifting the older killer down.
    pub fn push_killer(&mut self, mv: Move) {
        if self.killers[0] != Some(mv) {
            self.killers[1] = self.killers[0];
            self.killers[0] = Some(mv);
        }
    }

    pub fn reset(&mut self) {
        self.eval = 0;
        self.curr_move = None;
        self.excluded = None;
        self.killers = [None; 2];
        self.quiets_tried.clear();
    }
}

pub(crate) const STACK_SIZE: usize = MAX_DEPTH as usize + 4;

/// Everything one search thread owns. Nothing in here is shared.
pub struct ThreadData {
    pub id: usize,
    pub max_depth: i32,
    pub search: SearchData,
    pub stack: Vec<SearchStackEntry>,
    pub history: HistoryTable,
    pub pawn_cache: PawnCache,
    pub pos: Position,
}

impl ThreadData {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            max_depth: MAX_DEPTH,
            search: SearchData::default(),
            stack: vec![SearchStackEntry::default(); STACK_SIZE],
            history: HistoryTable::new(),
            pawn_cache: PawnCache::new(),
            pos: Position::startpos(),
        }
    }

    /// Per-search reset. History and the pawn cache carry over.
    pub fn prepare(&mut self, pos: &Position, max_depth: i32) {
        self.max_depth = max_depth.clamp(1, MAX_DEPTH);
        self.search = SearchData::default();
        self.pos = pos.clone();
        for entry in self.stack.iter_mut() {
            entry.reset();
        }
    }

    /// Forget everything learned, as for a new game.
    pub fn clear(&mut self) {
        self.search = SearchData::default();
        for entry in self.stack.iter_mut() {
            entry.reset();
        }
        self.history.clear();
        self.pawn_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_resets_stack_and_counters() {
        let mut td = ThreadData::new(3);
        td.search.nodes = 500;
        td.stack[7].push_killer(Move::new(12, 28));
        td.stack[7].quiets_tried.push(HistoryMove { piece: 0, dst: 28 });

        let pos = Position::from_fen("8/8/8/8/8/8/8/K6k w - - 0 1").expect("valid fen");
        td.prepare(&pos, 1000);

        assert_eq!(td.search.nodes, 0);
        assert_eq!(td.max_depth, MAX_DEPTH);
        assert_eq!(td.stack[7].killers, [None, None]);
        assert!(td.stack[7].quiets_tried.is_empty());
        assert_eq!(td.pos.key(), pos.key());
        assert_eq!(td.stack.len(), STACK_SIZE);
    }

    #[test]
    fn test_killers_are_most_recent_first() {
        let mut entry = SearchStackEntry::default();
        let (first, second, third) = (Move::new(12, 28), Move::new(6, 21), Move::new(1, 18));

        entry.push_killer(first);
        entry.push_killer(second);
        assert_eq!(entry.killers, [Some(second), Some(first)]);

        // repeating the newest killer keeps the older one
        entry.push_killer(second);
        assert_eq!(entry.killers, [Some(second), Some(first)]);

        entry.push_killer(third);
        assert_eq!(entry.killers, [Some(third), Some(second)]);
    }
}
