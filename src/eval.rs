use crate::bitboard;
use crate::pawn::{self, PawnCache, PawnEntry};
use crate::position::Position;
use crate::types::*;

/// Bonus for the side to move.
pub const TEMPO: Score = 16;

/// Converts an eval from the opponent's point of view (negated by the caller)
/// into one for the side to move, moving the tempo bonus across.
#[inline(always)]
pub fn flip_tempo(score: Score) -> Score {
    score + 2 * TEMPO
}

// Material
const MG_VALS: [i32; 6] = [82, 337, 365, 477, 1025, 0];
const EG_VALS: [i32; 6] = [94, 281, 297, 512, 936, 0];

// Phase Weights
const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];
const TOTAL_PHASE: i32 = 24;

// King Safety Weights
const KING_TROPISM_PENALTY: [i32; 8] = [10, 8, 5, 2, 0, 0, 0, 0];
const SHIELD_MISSING_PENALTY: i32 = -20;
const SHIELD_OPEN_FILE_PENALTY: i32 = -30;
const PAWN_STORM_PENALTY: i32 = -50;

// Mobility [Knight, Bishop, Rook, Queen] -> (Offset, Weight)
const MOBILITY_BONUS: [(i32, i32); 4] = [(0, 4), (1, 4), (2, 4), (4, 4)];

// --- PIECE-SQUARE TABLES (PeSTO, a8 first) ---
#[rustfmt::skip] const MG_PAWN_TABLE: [i32; 64] = [ 0, 0, 0, 0, 0, 0, 0, 0, 98, 134, 61, 95, 68, 126, 34, -11, -6, 7, 26, 31, 65, 56, 25, -20, -14, 13, 6, 21, 23, 12, 17, -23, -27, -2, -5, 12, 17, 6, 10, -25, -26, -4, -4, -10, 3, 3, 33, -12, -35, -1, -20, -23, -15, 24, 38, -22, 0, 0, 0, 0, 0, 0, 0, 0 ];
#[rustfmt::skip] const EG_PAWN_TABLE: [i32; 64] = [ 0, 0, 0, 0, 0, 0, 0, 0, 178, 173, 158, 134, 147, 132, 165, 187, 94, 100, 85, 67, 56, 53, 82, 84, 32, 24, 13, 5, -2, 4, 17, 17, 13, 9, -3, -7, -7, -8, 3, -1, 4, 7, -6, 1, 0, -5, -1, -8, 13, 8, 8, 10, 13, 0, 2, -7, 0, 0, 0, 0, 0, 0, 0, 0 ];
#[rustfmt::skip] const MG_KNIGHT_TABLE: [i32; 64] = [ -167, -89, -34, -49, 61, -97, -15, -107, -73, -41, 72, 36, 23, 62, 7, -17, -47, 60, 37, 65, 84, 129, 73, 44, -9, 17, 19, 53, 37, 69, 18, 22, -13, 4, 16, 13, 28, 19, 21, -8, -23, -9, 12, 10, 19, 17, 25, -16, -29, -53, -12, -3, -1, 18, -14, -19, -105, -21, -58, -33, -17, -28, -19, -23 ];
#[rustfmt::skip] const EG_KNIGHT_TABLE: [i32; 64] = [ -58, -38, -13, -28, -31, -27, -63, -99, -25, -8, -25, -2, -9, -25, -24, -52, -24, -20, 10, 9, -1, -9, -19, -41, -17, 3, 22, 22, 22, 11, 8, -18, -18, -6, 16, 25, 16, 17, 4, -18, -23, -3, -1, 15, 10, -3, -20, -22, -42, -20, -10, -5, -2, -20, -23, -44, -29, -51, -23, -15, -22, -18, -50, -64 ];
#[rustfmt::skip] const MG_BISHOP_TABLE: [i32; 64] = [ -29, 4, -82, -37, -25, -42, 7, -8, -26, 16, -18, -13, 30, 59, 18, -47, -16, 37, 43, 40, 35, 50, 37, -2, -4, 5, 19, 50, 37, 37, 7, -2, -6, 13, 13, 26, 34, 12, 10, 4, 0, 15, 15, 15, 14, 27, 18, 10, 4, 15, 16, 0, 7, 21, 33, 1, -33, -3, -14, -21, -13, -12, -39, -21 ];
#[rustfmt::skip] const EG_BISHOP_TABLE: [i32; 64] = [ -14, -21, -11, -8, -7, -9, -17, -24, -8, -4, 7, -12, -3, -13, -4, -14, 2, -8, 0, -1, -2, 6, 0, 4, -3, 9, 12, 9, 14, 10, 3, 2, -6, 3, 13, 19, 7, 10, -3, -9, -12, -3, 5, 10, 10, -6, -7, -11, -17, -9, -4, -9, -4, -6, -17, -21, -17, -21, -8, -4, -6, -6, -8, -20 ];
#[rustfmt::skip] const MG_ROOK_TABLE: [i32; 64] = [ 32, 42, 32, 51, 63, 9, 31, 43, 27, 32, 58, 62, 80, 67, 26, 44, -5, 19, 26, 36, 17, 45, 61, 16, -24, -11, 7, 26, 24, 35, -8, -20, -36, -26, -12, -1, 9, -7, 6, -23, -45, -25, -16, -17, 3, 0, -5, -33, -44, -16, -20, -9, -1, 11, -6, -71, -19, -13, 1, 17, 16, 7, -37, -26 ];
#[rustfmt::skip] const EG_ROOK_TABLE: [i32; 64] = [ 13, 10, 18, 15, 12, 12, 8, 5, 11, 13, 13, 11, -3, 3, 8, 3, 7, 7, 7, 5, 4, -3, -5, -3, 4, 3, 13, 1, 2, 1, -1, 2, 3, 5, 8, 4, -5, -6, -8, -11, -4, 0, -5, -1, -7, -12, -8, -16, -6, -6, 0, 2, -9, -9, -11, -3, -9, 2, 3, -1, -5, -13, 4, -20 ];
#[rustfmt::skip] const MG_QUEEN_TABLE: [i32; 64] = [ -28, 0, 29, 12, 59, 44, 43, 45, -24, -39, -5, 1, -16, 57, 28, 54, -13, -17, 7, 8, 29, 56, 47, 57, -27, -27, -16, -16, -1, 17, -2, 1, -9, -26, -9, -10, -2, -4, 3, -3, -14, 2, -11, -2, -5, 2, 14, 5, -35, -8, 11, 2, 8, 15, -3, 1, -1, -18, -9, 10, -15, -25, -31, -50 ];
#[rustfmt::skip] const EG_QUEEN_TABLE: [i32; 64] = [ -9, 22, 22, 27, 27, 19, 10, 20, -17, 20, 32, 41, 58, 25, 30, 0, -20, 6, 9, 49, 47, 35, 19, 9, 3, 22, 24, 45, 43, 40, 36, 14, -18, 28, 19, 47, 31, 34, 39, 23, -16, -27, 15, 6, 9, 17, 10, 5, -22, -23, -30, -16, -16, -23, -36, -32, -33, -28, -22, -43, -5, -32, -20, -41 ];
#[rustfmt::skip] const MG_KING_TABLE: [i32; 64] = [ -65, 23, 16, -15, -56, -34, 2, 13, 29, -1, -20, -7, -8, -4, -38, -29, -9, 24, 2, -16, -20, 6, 22, -22, -17, -20, -12, -27, -30, -25, -14, -36, -49, -1, -27, -39, -46, -44, -33, -51, -14, -14, -22, -46, -44, -30, -15, -27, 1, 7, -8, -64, -43, -16, 9, 8, -15, 36, 12, -54, 8, -28, 24, 14 ];
#[rustfmt::skip] const EG_KING_TABLE: [i32; 64] = [ -74, -35, -18, -18, -11, 15, 4, -17, -12, 17, 14, 17, 17, 38, 23, 11, 10, 17, 23, 15, 20, 45, 44, 13, -8, 22, 24, 27, 26, 33, 26, 3, -18, -4, 21, 24, 27, 23, 9, -11, -19, -3, 11, 21, 23, 16, 7, -9, -27, -11, 4, 13, 14, 4, -5, -17, -53, -34, -21, -11, -28, -14, -24, -43 ];

const MG_TABLES: [&[i32; 64]; 6] = [&MG_PAWN_TABLE, &MG_KNIGHT_TABLE, &MG_BISHOP_TABLE, &MG_ROOK_TABLE, &MG_QUEEN_TABLE, &MG_KING_TABLE];
const EG_TABLES: [&[i32; 64]; 6] = [&EG_PAWN_TABLE, &EG_KNIGHT_TABLE, &EG_BISHOP_TABLE, &EG_ROOK_TABLE, &EG_QUEEN_TABLE, &EG_KING_TABLE];

#[inline(always)]
fn pst_index(sq: u8, side: usize) -> usize {
    if side == WHITE { sq as usize ^ 56 } else { sq as usize }
}

// --- MAIN EVAL ---

/// Tapered hand-crafted eval, relative to the side to move, including tempo.
/// Without a cache the pawn terms are computed from scratch.
pub fn static_eval(pos: &Position, cache: Option<&mut PawnCache>) -> Score {
    let pawn_entry = match cache {
        Some(cache) => cache.probe(pos),
        None => pawn::evaluate_pawns(pos),
    };

    let (mut mg, mut eg) = evaluate_fixed(pos);
    mg += pawn_entry.score_mg;
    eg += pawn_entry.score_eg;

    let (w_mob_mg, w_mob_eg) = evaluate_mobility(pos, WHITE);
    let (b_mob_mg, b_mob_eg) = evaluate_mobility(pos, BLACK);
    mg += w_mob_mg - b_mob_mg;
    eg += w_mob_eg - b_mob_eg;

    let (w_king_mg, w_king_eg) = evaluate_king(pos, WHITE, &pawn_entry);
    let (b_king_mg, b_king_eg) = evaluate_king(pos, BLACK, &pawn_entry);
    mg += w_king_mg - b_king_mg;
    eg += w_king_eg - b_king_eg;

    let mut phase = 0;
    for pt in PAWN..=KING {
        let count = (pos.pieces(make_piece(WHITE, pt)) | pos.pieces(make_piece(BLACK, pt))).count_bits() as i32;
        phase += count * PHASE_WEIGHTS[pt];
    }
    let phase = phase.clamp(0, TOTAL_PHASE);
    let score = (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE;

    let relative = if pos.to_move() == WHITE { score } else { -score };
    (relative + TEMPO).clamp(-SCORE_WIN + 1, SCORE_WIN - 1)
}

fn evaluate_fixed(pos: &Position) -> (i32, i32) {
    let mut mg = 0;
    let mut eg = 0;
    for side in [WHITE, BLACK] {
        let sign = if side == WHITE { 1 } else { -1 };
        for pt in PAWN..=KING {
            for sq in pos.pieces(make_piece(side, pt)) {
                let idx = pst_index(sq, side);
                mg += sign * (MG_VALS[pt] + MG_TABLES[pt][idx]);
                eg += sign * (EG_VALS[pt] + EG_TABLES[pt][idx]);
            }
        }
    }
    (mg, eg)
}

fn evaluate_mobility(pos: &Position, side: usize) -> (i32, i32) {
    let mut score = 0;
    let us_bb = pos.occupancy(side);
    let occ = pos.occupancy(BOTH);

    for (idx, pt) in [KNIGHT, BISHOP, ROOK, QUEEN].into_iter().enumerate() {
        for sq in pos.pieces(make_piece(side, pt)) {
            let attacks = match pt {
                KNIGHT => bitboard::get_knight_attacks(sq),
                BISHOP => bitboard::get_bishop_attacks(sq, occ),
                ROOK => bitboard::get_rook_attacks(sq, occ),
                _ => bitboard::get_queen_attacks(sq, occ),
            };
            let mob = (attacks & !us_bb).count_bits() as i32;
            let (offset, weight) = MOBILITY_BONUS[idx];
            score += (mob - offset) * weight;
        }
    }
    (score, score)
}

fn evaluate_king(pos: &Position, side: usize, pawn_entry: &PawnEntry) -> (i32, i32) {
    let mut mg = 0;
    let mut eg = 0;
    let king_sq = pos.king(side) as usize;
    let king_file = (king_sq % 8) as i32;
    let king_rank = (king_sq / 8) as i32;

    let my_pawns = pos.pieces(make_piece(side, PAWN));
    let enemy_pawns = pos.pieces(make_piece(1 - side, PAWN));

    // Shield
    if (side == WHITE && king_rank < 3) || (side == BLACK && king_rank > 4) {
        for f in (king_file - 1).max(0)..=(king_file + 1).min(7) {
            let file = bitboard::file_mask(f as usize);
            if (my_pawns & file).is_empty() {
                mg += SHIELD_MISSING_PENALTY;
                if (enemy_pawns & file).is_empty() {
                    mg += SHIELD_OPEN_FILE_PENALTY;
                }
            }
        }
    }

    // Storm
    if pawn_entry.pawn_attacks[1 - side].get_bit(king_sq as u8) {
        mg += PAWN_STORM_PENALTY;
    }

    // Tropism
    for pt in KNIGHT..=QUEEN {
        for sq in pos.pieces(make_piece(1 - side, pt)) {
            let dist_file = (king_file - (sq % 8) as i32).abs();
            let dist_rank = (king_rank - (sq / 8) as i32).abs();
            let dist = dist_file.max(dist_rank) as usize;
            mg -= KING_TROPISM_PENALTY[dist];
            eg -= KING_TROPISM_PENALTY[dist] / 2;
        }
    }

    (mg, eg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_is_tempo() {
        let pos = Position::startpos();
        assert_eq!(static_eval(&pos, None), TEMPO);
    }

    #[test]
    fn test_eval_is_side_relative() {
        let white = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").expect("valid fen");
        let black = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").expect("valid fen");
        let w = static_eval(&white, None);
        let black_score = static_eval(&black, None);
        assert!(w > 500);
        assert_eq!(w - TEMPO, -(black_score - TEMPO));
    }

    #[test]
    fn test_cache_does_not_change_result() {
        let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3").expect("valid fen");
        let mut cache = PawnCache::new();
        assert_eq!(static_eval(&pos, Some(&mut cache)), static_eval(&pos, None));
        assert_eq!(static_eval(&pos, Some(&mut cache)), static_eval(&pos, None));
    }
}
