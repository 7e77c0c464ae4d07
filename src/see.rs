use crate::bitboard::{self, Bitboard};
use crate::position::Position;
use crate::types::*;

// --- SEE (Static Exchange Evaluation) ---

const SEE_VALUES: [Score; 6] = [100, 300, 325, 600, 1100, 0];

#[inline(always)]
pub fn value(piece_type: usize) -> Score {
    SEE_VALUES[piece_type]
}

/// Material won by `mv` before any recapture.
fn gain(pos: &Position, mv: Move) -> Score {
    match mv.kind() {
        MoveKind::Castling => 0,
        MoveKind::EnPassant => value(PAWN),
        kind => {
            let victim = pos.piece_at(mv.target());
            let mut score = if victim == NO_PIECE { 0 } else { value(piece_type(victim)) };
            if kind == MoveKind::Promotion {
                if let Some(promo) = mv.promo() {
                    score += value(promo) - value(PAWN);
                }
            }
            score
        }
    }
}

fn pop_least_valuable(pos: &Position, occ: &mut Bitboard, attackers: Bitboard, color: usize) -> usize {
    for pt in PAWN..=KING {
        let board = attackers & pos.pieces(make_piece(color, pt));
        if board.any() {
            occ.pop_bit(board.get_lsb_index() as u8);
            return pt;
        }
    }
    NO_PIECE
}

/// True if the exchange sequence started by `mv` nets at least `threshold`
/// for the side to move.
pub fn see(pos: &Position, mv: Move, threshold: Score) -> bool {
    let color = pos.to_move();
    let square = mv.target();

    let mut score = gain(pos, mv) - threshold;
    if score < 0 {
        return false;
    }

    let mut next = mv.promo().unwrap_or_else(|| piece_type(pos.piece_at(mv.source())));
    score -= value(next);
    if score >= 0 {
        return true;
    }

    let mut occupancy = pos.occupancy(BOTH) ^ Bitboard::from_square(mv.source()) ^ Bitboard::from_square(square);
    if mv.kind() == MoveKind::EnPassant {
        let captured = if color == WHITE { square - 8 } else { square + 8 };
        occupancy.pop_bit(captured);
    }

    let queens = pos.pieces(Q) | pos.pieces(q);
    let bishops = queens | pos.pieces(B) | pos.pieces(b);
    let rooks = queens | pos.pieces(R) | pos.pieces(r);

    let mut attackers = pos.attackers_to(square, occupancy) & occupancy;
    let mut us = 1 - color;

    loop {
        let ours = attackers & pos.occupancy(us);
        if ours.is_empty() {
            break;
        }

        next = pop_least_valuable(pos, &mut occupancy, ours, us);

        if next == PAWN || next == BISHOP || next == QUEEN {
            attackers |= bitboard::get_bishop_attacks(square, occupancy) & bishops;
        }
        if next == ROOK || next == QUEEN {
            attackers |= bitboard::get_rook_attacks(square, occupancy) & rooks;
        }
        attackers &= occupancy;

        score = -score - 1 - value(next);
        us = 1 - us;

        if score >= 0 {
            // The king cannot recapture into a defended square
            if next == KING && (attackers & pos.occupancy(us)).any() {
                us = 1 - us;
            }
            break;
        }
    }

    color != us
}
