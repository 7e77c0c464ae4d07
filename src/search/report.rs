use std::fmt::Write;

use crate::position::Position;
use crate::types::*;

use super::Worker;

/// `cp X` or `mate N`, as the GUI expects it.
pub fn format_score(score: Score) -> String {
    if score > SCORE_WIN {
        format!("mate {}", (SCORE_MATE - score + 1) / 2)
    } else if score < -SCORE_WIN {
        format!("mate {}", -(SCORE_MATE + score) / 2)
    } else {
        format!("cp {}", score)
    }
}

/// Follows table moves from `root_move` for as long as they stay legal and
/// the walk does not revisit a position.
pub(crate) fn walk_pv(pos: &Position, root_move: Move, tt: &crate::tt::TranspositionTable) -> Vec<Move> {
    let mut pos = pos.clone();
    let mut pv = vec![root_move];
    let mut visited: Vec<u64> = Vec::with_capacity(MAX_DEPTH as usize);

    pos.apply_move_unchecked(root_move);
    visited.push(pos.key());

    while pv.len() < MAX_DEPTH as usize {
        let Some(mv) = tt.probe_move(pos.key()).filter(|&mv| pos.is_pseudolegal(mv)) else {
            break;
        };

        let mover = pos.to_move();
        pos.apply_move_unchecked(mv);

        if visited.contains(&pos.key()) || pos.is_attacked(pos.king(mover), pos.to_move()) {
            break;
        }

        pv.push(mv);
        visited.push(pos.key());
    }

    pv
}

impl Worker<'_> {
    /// Prints one `info` line. The score is clamped into the window and
    /// tagged as a bound when it sits on an edge.
    pub(crate) fn report(&self, pos: &Position, depth: i32, mv: Move, score: Score, alpha: Score, beta: Score) {
        let job = self.job;
        let time = job.elapsed();
        let nodes = job.total_nodes();

        let ms = (time * 1000.0) as u64;
        let nps = if time > 0.0 { (nodes as f64 / time) as u64 } else { 0 };

        let score = score.clamp(alpha, beta);

        let mut line = String::with_capacity(256);
        let _ = write!(
            line,
            "info depth {} seldepth {} time {} nodes {} nps {} score {}",
            depth,
            self.data.seldepth,
            ms,
            nodes,
            nps,
            format_score(score)
        );

        if score == alpha {
            line.push_str(" upperbound");
        } else if score == beta {
            line.push_str(" lowerbound");
        }

        let _ = write!(line, " hashfull {} pv", job.tt.full());
        for m in walk_pv(pos, mv, &job.tt) {
            let _ = write!(line, " {}", m);
        }

        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::{Bound, TranspositionTable};

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert_eq!(format_score(SCORE_MATE - 1), "mate 1");
        assert_eq!(format_score(SCORE_MATE - 3), "mate 2");
        assert_eq!(format_score(-SCORE_MATE + 2), "mate -1");
        assert_eq!(format_score(-SCORE_MATE + 4), "mate -2");
    }

    #[test]
    fn test_pv_follows_table() {
        let tt = TranspositionTable::new(1);
        let mut pos = Position::startpos();
        let line = ["e2e4", "e7e5", "g1f3"];

        let mut moves = Vec::new();
        for uci in line {
            let mv = pos.move_from_uci(uci).expect("legal");
            moves.push(mv);
            tt.put(pos.key(), 0, Some(mv), 5, 0, Bound::Exact);
            pos.apply_move_unchecked(mv);
        }

        let pv = walk_pv(&Position::startpos(), moves[0], &tt);
        assert_eq!(pv, moves);
    }

    #[test]
    fn test_pv_stops_on_cycle() {
        let tt = TranspositionTable::new(1);
        let mut pos = Position::startpos();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

        let mut moves = Vec::new();
        for uci in shuffle {
            let mv = pos.move_from_uci(uci).expect("legal");
            moves.push(mv);
            tt.put(pos.key(), 0, Some(mv), 5, 0, Bound::Exact);
            pos.apply_move_unchecked(mv);
        }

        // the start position's key now points back into the loop
        let pv = walk_pv(&Position::startpos(), moves[0], &tt);
        assert_eq!(pv.len(), 4);
    }
}
