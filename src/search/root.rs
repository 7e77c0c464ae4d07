use crate::position::Position;
use crate::types::*;

use super::Worker;

/// Aspiration-window fail reports are held back until the search has run
/// this long, in seconds.
pub const MIN_REPORT_DELAY: f64 = 1.0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct RootResult {
    pub best: Option<Move>,
    pub score: Score,
    /// Deepest fully completed iteration.
    pub depth: i32,
    pub hit_soft_timeout: bool,
}

impl Worker<'_> {
    /// Iterative deepening with aspiration windows. Helpers start deeper
    /// than thread 0 so the pool spreads over several depths at once.
    pub(crate) fn search_root(&mut self, pos: &mut Position) -> RootResult {
        let job = self.job;
        let params = &*job.params;
        let report = job.report && self.id == 0;

        let mut best: Option<Move> = None;
        let mut score: Score = 0;
        let mut depth_completed = 0;
        let mut hit_soft_timeout = false;

        let mut depth = 1 + (self.id % 16) as i32;

        while depth <= self.max_depth {
            hit_soft_timeout = self.should_stop(true);
            if hit_soft_timeout {
                break;
            }

            self.data.depth = depth;
            self.data.seldepth = 0;

            let prev_best = best;
            let mut report_iteration = report;

            if depth < params.min_asp_depth {
                let new_score = self.search(pos, depth, 0, -SCORE_MAX, SCORE_MAX, false);
                depth_completed = depth;

                if (depth > 1 && self.stopped()) || self.data.best_move.is_none() {
                    break;
                }

                score = new_score;
                best = self.data.best_move;
                self.data.score = score;
            } else {
                let mut delta = params.initial_asp_window;
                let mut alpha = score - delta;
                let mut beta = score + delta;
                let mut asp_depth = depth;

                while !self.should_stop(false) {
                    asp_depth = asp_depth.max(depth - params.max_asp_reduction);

                    let new_score = self.search(pos, asp_depth, 0, alpha, beta, false);

                    if self.stopped() || self.data.best_move.is_none() {
                        report_iteration &= !self.stopped();
                        break;
                    }

                    score = new_score;

                    let failed = score <= alpha || score >= beta;
                    if report && failed && job.elapsed() > MIN_REPORT_DELAY {
                        if let Some(mv) = best.or(self.data.best_move) {
                            self.report(pos, depth, mv, score, alpha, beta);
                        }
                    }

                    delta += delta / 2;
                    if delta > params.max_asp_window {
                        delta = SCORE_MATE;
                    }

                    if score >= beta {
                        beta = (beta + delta).min(SCORE_MAX);
                        asp_depth -= 1;
                    } else if score <= alpha {
                        beta = (alpha + beta) / 2;
                        alpha = (alpha - delta).max(-SCORE_MATE);
                        asp_depth = depth;
                    } else {
                        best = self.data.best_move;
                        depth_completed = depth;
                        self.data.score = score;
                        break;
                    }
                }

                if self.stopped() {
                    report_iteration = false;
                } else if self.data.best_move.is_none() {
                    break;
                }
            }

            if self.id == 0 {
                job.limiter.update(&*self.data, prev_best == best);
            }

            if report_iteration && depth < self.max_depth {
                match best.or(self.data.best_move) {
                    Some(mv) => self.report(pos, depth, mv, score, -SCORE_MAX, SCORE_MAX),
                    None => {
                        println!("info string no legal moves");
                        break;
                    }
                }
            }

            depth += 1;
        }

        RootResult {
            best: best.or(self.data.best_move),
            score,
            depth: depth_completed,
            hit_soft_timeout,
        }
    }

    /// Final report and `bestmove`. Thread 0 calls this with the search
    /// mutex held.
    pub(crate) fn publish(&self, pos: &Position, result: &RootResult) {
        match result.best {
            Some(mv) => {
                if !result.hit_soft_timeout {
                    self.report(pos, result.depth.max(1), mv, result.score, -SCORE_MAX, SCORE_MAX);
                }
                println!("bestmove {}", mv);
                log::info!(
                    "bestmove {} score {} depth {} nodes {}",
                    mv,
                    result.score,
                    result.depth,
                    self.job.total_nodes()
                );
            }
            None => {
                println!("info string no legal moves");
                log::info!("no legal moves at root");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    use super::*;
    use crate::parameters::SearchParameters;
    use crate::search::{CancellationToken, SearchJob, ThreadData};
    use crate::time::{InfiniteLimiter, ManualClock};
    use crate::tt::TranspositionTable;

    fn job(report: bool) -> SearchJob {
        SearchJob {
            tt: Arc::new(TranspositionTable::new(1)),
            params: Arc::new(SearchParameters::default()),
            limiter: Arc::new(InfiniteLimiter),
            clock: Arc::new(ManualClock::new()),
            start_time: 0.0,
            token: CancellationToken::new(),
            nodes: Box::new([AtomicU64::new(0), AtomicU64::new(0)]),
            report,
        }
    }

    fn run(fen: &str, id: usize, depth: i32) -> (RootResult, ThreadData) {
        let job = job(false);
        let mut td = ThreadData::new(id);
        td.prepare(&Position::from_fen(fen).expect("valid fen"), depth);
        let result = {
            let (mut worker, pos) = Worker::split(&mut td, &job);
            worker.search_root(pos)
        };
        (result, td)
    }

    #[test]
    fn test_finds_mate_in_one() {
        let (result, _) = run("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 0, 4);
        assert_eq!(result.best.map(|m| m.to_uci()), Some("a1a8".to_string()));
        assert_eq!(result.score, SCORE_MATE - 1);
    }

    #[test]
    fn test_no_legal_moves_yields_no_move() {
        // stalemate
        let (result, _) = run("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 0, 5);
        assert!(result.best.is_none());
    }

    #[test]
    fn test_aspiration_iterations_complete() {
        let (result, td) = run(crate::position::START_FEN, 0, 7);
        assert_eq!(result.depth, 7);
        assert!(result.best.is_some());
        assert!(td.search.nodes > 0);
    }

    #[test]
    fn test_helper_skips_shallow_depths() {
        let (result, td) = run(crate::position::START_FEN, 3, 3);
        // start depth 4 is already past the limit
        assert!(result.best.is_none());
        assert_eq!(td.search.nodes, 0);
    }

    #[test]
    fn test_cancelled_before_first_iteration() {
        let job = job(false);
        let mut td = ThreadData::new(0);
        td.prepare(&Position::startpos(), 20);
        job.token.cancel();
        let (mut worker, pos) = Worker::split(&mut td, &job);
        let result = worker.search_root(pos);
        // the token is checked before the first iteration
        assert!(result.best.is_none());
        assert!(result.hit_soft_timeout);
    }
}
