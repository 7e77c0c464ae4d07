use crate::eval::{flip_tempo, static_eval};
use crate::history::HistoryMove;
use crate::movegen::{MoveGenerator, Stage};
use crate::position::Position;
use crate::see::see;
use crate::tt::Bound;
use crate::types::*;

use super::Worker;

/// Small node-dependent jitter keeps repetitions from looking identical.
#[inline(always)]
pub(crate) fn draw_score(nodes: u64) -> Score {
    2 - (nodes % 4) as Score
}

impl Worker<'_> {
    /// Principal variation search. `ply` 0 is the root.
    pub(crate) fn search(
        &mut self,
        pos: &mut Position,
        mut depth: i32,
        ply: i32,
        mut alpha: Score,
        mut beta: Score,
        cutnode: bool,
    ) -> Score {
        debug_assert!(alpha < beta);

        if depth > 1 && self.should_stop(false) {
            return beta;
        }

        if ply >= MAX_DEPTH {
            return static_eval(pos, Some(&mut *self.pawn_cache));
        }

        let in_check = pos.is_check();

        // check extension
        if in_check {
            depth += 1;
        }

        if depth <= 0 {
            return self.qsearch(pos, ply, alpha, beta);
        }

        let job = self.job;
        let params = &*job.params;
        let tt = &*job.tt;

        let us = pos.to_move();
        let root = ply == 0;
        let pv = root || beta - alpha > 1;
        let idx = ply as usize;

        if ply + 1 > self.data.seldepth {
            self.data.seldepth = ply + 1;
        }

        // --- MATE DISTANCE PRUNING ---
        if !pv {
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(SCORE_MATE - ply - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        // --- TT PROBE ---
        let excluded = self.stack[idx].excluded;
        let mut tt_entry = None;
        let mut hash_move = None;

        if excluded.is_none() {
            let (hit, entry) = tt.probe(pos.key(), depth, ply, alpha, beta);
            tt_entry = entry;
            if hit && !pv {
                if let Some(entry) = entry {
                    return entry.score;
                }
            }
            hash_move = entry.and_then(|e| e.mv).filter(|&mv| pos.is_pseudolegal(mv));

            // internal iterative reduction
            if !in_check && depth >= params.min_iir_depth && hash_move.is_none() && (pv || cutnode) {
                depth -= 1;
            }
        }

        // --- STATIC EVAL ---
        if !root && pos.last_move().is_none() {
            self.stack[idx].eval = flip_tempo(-self.stack[idx - 1].eval);
        } else if excluded.is_none() {
            self.stack[idx].eval = if in_check {
                0
            } else {
                match tt_entry {
                    Some(entry) if entry.score != 0 => entry.score,
                    _ => static_eval(pos, Some(&mut *self.pawn_cache)),
                }
            };
        }
        // a singular search keeps the eval of the node that launched it

        let eval = self.stack[idx].eval;
        self.stack[idx].curr_move = None;

        let improving = !in_check && ply > 1 && eval > self.stack[idx - 2].eval;

        // --- PRE-MOVE PRUNING ---
        if !pv && !in_check && excluded.is_none() {
            // reverse futility
            if depth <= params.max_rfp_depth
                && eval >= beta + params.rfp_margin * depth / if improving { 1 } else { 2 }
            {
                return eval;
            }

            // null move
            let tt_fails_low = matches!(tt_entry, Some(e) if e.bound == Bound::Alpha && e.score < beta);
            if depth >= params.min_nmp_depth
                && eval >= beta
                && !tt_fails_low
                && pos.last_move().is_some()
                && pos.non_pk(us).any()
            {
                let eval_reduction = ((eval - beta) / params.nmp_eval_scale).clamp(0, params.nmp_max_eval_reduction);
                let reduction = depth.min(params.nmp_base + depth / params.nmp_depth_scale + eval_reduction);

                self.data.null_move_attempts += 1;
                let score = {
                    let mut guard = pos.apply_null_move(Some(tt));
                    -self.search(&mut guard, depth - reduction, ply + 1, -beta, -beta + 1, !cutnode)
                };

                if score >= beta {
                    return if score > SCORE_WIN { beta } else { score };
                }
            }
        }

        // --- MOVE LOOP ---
        self.stack[idx].quiets_tried.clear();

        let prev_move = if root { None } else { self.stack[idx - 1].curr_move };
        let prev_prev_move = if ply > 1 { self.stack[idx - 2].curr_move } else { None };

        let mut best: Option<Move> = None;
        let mut best_score = -SCORE_MAX;
        let mut bound = Bound::Alpha;

        let mut generator = MoveGenerator::new(hash_move, self.stack[idx].killers, prev_move, prev_prev_move);
        let mut legal_moves = 0;

        while let Some(mv) = generator.next(pos, &*self.history) {
            if Some(mv) == excluded {
                continue;
            }

            let quiet_or_losing = generator.stage() > Stage::GoodNoisy;
            let base_lmr = params.lmr(depth, legal_moves + 1);

            if !root && quiet_or_losing && best_score > -SCORE_WIN {
                // futility
                if !in_check
                    && depth <= params.max_fp_depth
                    && alpha < SCORE_WIN
                    && eval + params.fp_margin + (depth - base_lmr).max(0) * params.fp_scale <= alpha
                {
                    break;
                }

                // SEE
                let threshold = if pos.is_noisy(mv) { params.noisy_see_threshold } else { params.quiet_see_threshold };
                if depth <= params.max_see_depth && !see(pos, mv, depth * threshold) {
                    continue;
                }
            }

            let mut extension = 0;

            // singular extension
            if !root && depth >= params.min_singular_depth && Some(mv) == hash_move && excluded.is_none() {
                if let Some(entry) = tt_entry {
                    if entry.depth >= depth - 3 && entry.bound != Bound::Alpha && entry.score.abs() < SCORE_WIN {
                        let s_beta = (entry.score - depth * 2).max(-SCORE_MATE);
                        let score = self.singular_search(pos, mv, depth, ply, s_beta, cutnode);

                        if score < s_beta {
                            extension = 1;
                        }
                    }
                }
            }

            let moving = HistoryMove::from(pos, mv);
            let noisy = pos.is_noisy(mv);
            let mut guard = pos.apply_move(mv, Some(tt));

            if guard.is_attacked(guard.king(us), guard.to_move()) {
                continue;
            }

            self.count_node();
            legal_moves += 1;

            self.stack[idx].curr_move = Some(moving);

            let score = if guard.is_drawn(false) {
                draw_score(self.data.nodes)
            } else {
                let mut reduction = 0;

                // late move reductions
                if depth >= params.min_lmr_depth && !in_check && !guard.is_check() && quiet_or_losing {
                    let lmr = base_lmr + if pv { 0 } else { 1 };
                    reduction = lmr.clamp(0, depth - 2);
                }

                let new_depth = depth - 1 + extension;

                if pv && legal_moves == 1 {
                    -self.search(&mut guard, new_depth - reduction, ply + 1, -beta, -alpha, false)
                } else {
                    let mut score = -self.search(&mut guard, new_depth - reduction, ply + 1, -alpha - 1, -alpha, true);

                    if score > alpha && reduction > 0 {
                        score = -self.search(&mut guard, new_depth, ply + 1, -alpha - 1, -alpha, !cutnode);
                    }

                    if score > alpha && score < beta {
                        score = -self.search(&mut guard, new_depth, ply + 1, -beta, -alpha, false);
                    }

                    score
                }
            };

            drop(guard);

            if score > best_score {
                best = Some(mv);
                best_score = score;

                if score > alpha {
                    if score >= beta {
                        if quiet_or_losing {
                            let entry = &mut self.stack[idx];
                            if !noisy {
                                entry.push_killer(mv);
                            }
                            self.history.update_cutoff(moving, mv, &entry.quiets_tried, prev_move, prev_prev_move, depth);
                        }

                        bound = Bound::Beta;
                        break;
                    }

                    alpha = score;
                    bound = Bound::Exact;
                }
            }

            if quiet_or_losing {
                self.stack[idx].quiets_tried.push(moving);
            }
        }

        if legal_moves == 0 {
            if excluded.is_some() {
                return alpha;
            }
            return if in_check { mated_in(ply) } else { 0 };
        }

        if excluded.is_none() {
            tt.put(pos.key(), best_score, best, if in_check { depth + 1 } else { depth }, ply, bound);
        }

        if root && (!self.stopped() || self.data.best_move.is_none()) {
            self.data.best_move = best;
        }

        best_score
    }

    /// Reduced null-window search of the node at `ply` with `mv` excluded.
    /// That search shares the node's stack slot, so the quiets it tries are
    /// dropped before the node resumes its own move loop.
    pub(crate) fn singular_search(
        &mut self,
        pos: &mut Position,
        mv: Move,
        depth: i32,
        ply: i32,
        s_beta: Score,
        cutnode: bool,
    ) -> Score {
        let idx = ply as usize;
        self.data.singular_searches += 1;

        self.stack[idx].excluded = Some(mv);
        let score = self.search(pos, (depth - 1) / 2, ply, s_beta - 1, s_beta, cutnode);
        self.stack[idx].excluded = None;
        self.stack[idx].quiets_tried.clear();

        score
    }
}
