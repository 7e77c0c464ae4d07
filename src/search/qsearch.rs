use crate::eval::static_eval;
use crate::movegen::MoveGenerator;
use crate::position::Position;
use crate::types::*;

use super::pvs::draw_score;
use super::Worker;

impl Worker<'_> {
    /// Captures and promotions only, on top of a stand-pat score. Fail-soft.
    pub(crate) fn qsearch(&mut self, pos: &mut Position, ply: i32, mut alpha: Score, beta: Score) -> Score {
        debug_assert!(alpha < beta);

        if self.should_stop(false) {
            return beta;
        }

        let stand_pat = if pos.is_check() { -SCORE_MATE } else { static_eval(pos, Some(&mut *self.pawn_cache)) };

        if stand_pat > alpha {
            if stand_pat >= beta {
                return stand_pat;
            }
            alpha = stand_pat;
        }

        if ply >= MAX_DEPTH {
            return stand_pat;
        }

        let tt = &*self.job.tt;
        let us = pos.to_move();
        let ply = ply + 1;

        if ply > self.data.seldepth {
            self.data.seldepth = ply;
        }

        let mut best_score = stand_pat;

        let hash_move = tt.probe_move(pos.key()).filter(|&mv| pos.is_pseudolegal(mv));
        let mut generator = MoveGenerator::qsearch(hash_move);

        while let Some(mv) = generator.next(pos, &*self.history) {
            let mut guard = pos.apply_move(mv, Some(tt));

            if guard.is_attacked(guard.king(us), guard.to_move()) {
                continue;
            }

            self.count_node();

            let score = if guard.is_drawn(false) {
                draw_score(self.data.nodes)
            } else {
                -self.qsearch(&mut guard, ply, -beta, -alpha)
            };

            if score > best_score {
                best_score = score;

                if score > alpha {
                    if score >= beta {
                        break;
                    }
                    alpha = score;
                }
            }
        }

        best_score
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    use super::*;
    use crate::eval::TEMPO;
    use crate::parameters::SearchParameters;
    use crate::search::{CancellationToken, SearchJob, ThreadData};
    use crate::time::{InfiniteLimiter, ManualClock};
    use crate::tt::TranspositionTable;

    fn job() -> SearchJob {
        SearchJob {
            tt: Arc::new(TranspositionTable::new(1)),
            params: Arc::new(SearchParameters::default()),
            limiter: Arc::new(InfiniteLimiter),
            clock: Arc::new(ManualClock::new()),
            start_time: 0.0,
            token: CancellationToken::new(),
            nodes: Box::new([AtomicU64::new(0)]),
            report: false,
        }
    }

    fn qsearch_fen(job: &SearchJob, fen: &str, alpha: Score, beta: Score) -> (Score, u64, i32) {
        let mut td = ThreadData::new(0);
        td.prepare(&Position::from_fen(fen).expect("valid fen"), 1);
        let (mut worker, pos) = Worker::split(&mut td, job);
        let score = worker.qsearch(pos, 0, alpha, beta);
        (score, worker.data.nodes, worker.data.seldepth)
    }

    #[test]
    fn test_quiet_position_stands_pat() {
        let job = job();
        let (score, nodes, _) = qsearch_fen(&job, crate::position::START_FEN, -SCORE_MAX, SCORE_MAX);
        assert_eq!(score, TEMPO);
        assert_eq!(nodes, 0);
    }

    #[test]
    fn test_stand_pat_cutoff() {
        let job = job();
        let (score, nodes, _) = qsearch_fen(&job, "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", -SCORE_MAX, -2000);
        assert!(score >= -2000);
        assert_eq!(nodes, 0);
    }

    #[test]
    fn test_resolves_capture() {
        let job = job();
        let fen = "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1";
        let pos = Position::from_fen(fen).expect("valid fen");
        let stand_pat = static_eval(&pos, None);
        let (score, nodes, seldepth) = qsearch_fen(&job, fen, -SCORE_MAX, SCORE_MAX);
        assert!(score > stand_pat + 500);
        assert!(nodes > 0);
        assert!(seldepth >= 1);
    }

    #[test]
    fn test_stopped_returns_beta() {
        let job = job();
        job.token.cancel();
        let (score, _, _) = qsearch_fen(&job, crate::position::START_FEN, -50, 50);
        assert_eq!(score, 50);
    }
}
