use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

use crate::types::{BLACK, WHITE};

// --- GLOBAL CONSTANTS ---
pub const FILE_A: u64 = 0x0101010101010101;
pub const FILE_H: u64 = 0x8080808080808080;
pub const RANK_1: u64 = 0x00000000000000FF;
pub const RANK_8: u64 = 0xFF00000000000000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitboard(pub u64);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);

    #[inline(always)] pub fn from_square(square: u8) -> Self { Bitboard(1u64 << square) }
    #[inline(always)] pub fn set_bit(&mut self, square: u8) { self.0 |= 1u64 << square; }
    #[inline(always)] pub fn get_bit(&self, square: u8) -> bool { (self.0 & (1u64 << square)) != 0 }
    #[inline(always)] pub fn pop_bit(&mut self, square: u8) { self.0 &= !(1u64 << square); }
    #[inline(always)] pub fn count_bits(&self) -> u32 { self.0.count_ones() }
    #[inline(always)] pub fn get_lsb_index(&self) -> u32 { self.0.trailing_zeros() }
    #[inline(always)] pub fn is_empty(&self) -> bool { self.0 == 0 }
    #[inline(always)] pub fn any(&self) -> bool { self.0 != 0 }

    #[inline(always)]
    pub fn pop_lsb(&mut self) -> u8 {
        let sq = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        sq
    }

    pub fn print(&self) {
        println!("  a b c d e f g h");
        for rank in (0..8).rev() {
            print!("{} ", rank + 1);
            for file in 0..8 {
                let bit = if self.get_bit(rank * 8 + file) { "X" } else { "." };
                print!("{} ", bit);
            }
            println!();
        }
        println!("  Bitboard: {:#018x}", self.0);
    }
}

impl Iterator for Bitboard {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 { None } else { Some(self.pop_lsb()) }
    }
}

impl std::ops::BitOr for Bitboard { type Output = Self; fn bitor(self, rhs: Self) -> Self { Bitboard(self.0 | rhs.0) } }
impl std::ops::BitAnd for Bitboard { type Output = Self; fn bitand(self, rhs: Self) -> Self { Bitboard(self.0 & rhs.0) } }
impl std::ops::BitXor for Bitboard { type Output = Self; fn bitxor(self, rhs: Self) -> Self { Bitboard(self.0 ^ rhs.0) } }
impl std::ops::Not for Bitboard { type Output = Self; fn not(self) -> Self { Bitboard(!self.0) } }
impl std::ops::BitOrAssign for Bitboard { fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; } }
impl std::ops::BitAndAssign for Bitboard { fn bitand_assign(&mut self, rhs: Self) { self.0 &= rhs.0; } }
impl std::ops::BitXorAssign for Bitboard { fn bitxor_assign(&mut self, rhs: Self) { self.0 ^= rhs.0; } }

// --- SAFE GLOBAL STORAGE ---

#[derive(Clone, Copy, Default)]
struct Magic {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    #[inline(always)]
    fn index(&self, occupancy: Bitboard) -> usize {
        self.offset + (((occupancy.0 & self.mask).wrapping_mul(self.magic)) >> self.shift) as usize
    }
}

struct AttackTables {
    rook: [Magic; 64],
    bishop: [Magic; 64],
    sliders: Vec<Bitboard>,
    knight: [Bitboard; 64],
    king: [Bitboard; 64],
    pawn: [[Bitboard; 64]; 2],
}

// Evaluation masks, bundled so they initialize together
struct EvalMasks {
    file_masks: [Bitboard; 64],
    adjacent_file_masks: [Bitboard; 64],
    passed_pawn_masks: [[Bitboard; 64]; 2],
}

static ATTACKS: OnceLock<AttackTables> = OnceLock::new();
static EVAL_MASKS: OnceLock<EvalMasks> = OnceLock::new();

// Fixed seed so the table layout is identical between runs
const MAGIC_SEED: u64 = 1804289383;

/// Builds every lookup table up front. Lookups also build lazily, so calling
/// this is only needed to keep the one-time cost out of timed code.
pub fn init_magic_tables() {
    attacks();
    eval_masks();
    log::debug!("Attack tables initialized");
}

#[inline(always)]
fn attacks() -> &'static AttackTables {
    ATTACKS.get_or_init(compute_attack_tables)
}

#[inline(always)]
fn eval_masks() -> &'static EvalMasks {
    EVAL_MASKS.get_or_init(compute_eval_masks)
}

// --- PUBLIC SAFE GETTERS ---

#[inline(always)]
pub fn get_rook_attacks(square: u8, occupancy: Bitboard) -> Bitboard {
    let tables = attacks();
    tables.sliders[tables.rook[square as usize].index(occupancy)]
}

#[inline(always)]
pub fn get_bishop_attacks(square: u8, occupancy: Bitboard) -> Bitboard {
    let tables = attacks();
    tables.sliders[tables.bishop[square as usize].index(occupancy)]
}

#[inline(always)]
pub fn get_queen_attacks(square: u8, occupancy: Bitboard) -> Bitboard {
    get_rook_attacks(square, occupancy) | get_bishop_attacks(square, occupancy)
}

#[inline(always)]
pub fn get_knight_attacks(square: u8) -> Bitboard {
    attacks().knight[square as usize]
}

#[inline(always)]
pub fn get_king_attacks(square: u8) -> Bitboard {
    attacks().king[square as usize]
}

/// Squares attacked by a pawn of `side` standing on `square`.
#[inline(always)]
pub fn get_pawn_attacks(square: u8, side: usize) -> Bitboard {
    attacks().pawn[side][square as usize]
}

/// Set-wise pawn attacks for every pawn in `pawns`.
#[inline(always)]
pub fn pawn_attacks(pawns: Bitboard, side: usize) -> Bitboard {
    if side == WHITE {
        Bitboard(((pawns.0 << 7) & !FILE_H) | ((pawns.0 << 9) & !FILE_A))
    } else {
        Bitboard(((pawns.0 >> 9) & !FILE_H) | ((pawns.0 >> 7) & !FILE_A))
    }
}

pub fn file_mask(sq: usize) -> Bitboard {
    eval_masks().file_masks[sq]
}

pub fn adjacent_file_mask(sq: usize) -> Bitboard {
    eval_masks().adjacent_file_masks[sq]
}

pub fn passed_pawn_mask(side: usize, sq: usize) -> Bitboard {
    eval_masks().passed_pawn_masks[side][sq]
}

// --- INITIALIZATION ---

fn compute_attack_tables() -> AttackTables {
    let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
    let mut sliders = Vec::with_capacity(107_648);

    let mut rook = [Magic::default(); 64];
    let mut bishop = [Magic::default(); 64];

    for square in 0..64u8 {
        rook[square as usize] = build_magic(square, false, &mut rng, &mut sliders);
        bishop[square as usize] = build_magic(square, true, &mut rng, &mut sliders);
    }

    let mut knight = [Bitboard(0); 64];
    let mut king = [Bitboard(0); 64];
    let mut pawn = [[Bitboard(0); 64]; 2];
    for square in 0..64u8 {
        knight[square as usize] = mask_knight_attacks(square);
        king[square as usize] = mask_king_attacks(square);
        pawn[WHITE][square as usize] = pawn_attacks(Bitboard::from_square(square), WHITE);
        pawn[BLACK][square as usize] = pawn_attacks(Bitboard::from_square(square), BLACK);
    }

    AttackTables { rook, bishop, sliders, knight, king, pawn }
}

fn build_magic(square: u8, is_bishop: bool, rng: &mut StdRng, sliders: &mut Vec<Bitboard>) -> Magic {
    let mask = if is_bishop { mask_bishop_attacks(square) } else { mask_rook_attacks(square) };
    let bits = mask.count_bits();
    let variations = 1usize << bits;

    let mut occupancies = Vec::with_capacity(variations);
    let mut attacks = Vec::with_capacity(variations);
    for i in 0..variations {
        let occ = set_occupancy(i as u32, bits, mask);
        occupancies.push(occ);
        attacks.push(if is_bishop {
            generate_bishop_attacks_on_the_fly(square, occ)
        } else {
            generate_rook_attacks_on_the_fly(square, occ)
        });
    }

    let shift = 64 - bits;
    let mut used = vec![Bitboard(0); variations];
    let mut filled = vec![false; variations];

    loop {
        let magic = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if ((mask.0.wrapping_mul(magic)) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }

        filled.iter_mut().for_each(|f| *f = false);
        let mut fail = false;
        for i in 0..variations {
            let idx = ((occupancies[i].0.wrapping_mul(magic)) >> shift) as usize;
            if !filled[idx] {
                filled[idx] = true;
                used[idx] = attacks[i];
            } else if used[idx] != attacks[i] {
                fail = true;
                break;
            }
        }

        if !fail {
            let offset = sliders.len();
            sliders.extend_from_slice(&used);
            return Magic { mask: mask.0, magic, shift, offset };
        }
    }
}

fn compute_eval_masks() -> EvalMasks {
    let mut file_masks = [Bitboard(0); 64];
    let mut adjacent_file_masks = [Bitboard(0); 64];
    let mut passed_pawn_masks = [[Bitboard(0); 64]; 2];

    for r in 0..8 {
        for f in 0..8 {
            let sq = r * 8 + f;
            file_masks[sq] = Bitboard(FILE_A << f);

            let mut adjacent = 0;
            if f > 0 { adjacent |= FILE_A << (f - 1); }
            if f < 7 { adjacent |= FILE_A << (f + 1); }
            adjacent_file_masks[sq] = Bitboard(adjacent);

            let span = (FILE_A << f) | adjacent;
            let ahead_white = if r < 7 { !0u64 << ((r + 1) * 8) } else { 0 };
            let ahead_black = if r > 0 { !0u64 >> ((8 - r) * 8) } else { 0 };
            passed_pawn_masks[WHITE][sq] = Bitboard(span & ahead_white);
            passed_pawn_masks[BLACK][sq] = Bitboard(span & ahead_black);
        }
    }

    EvalMasks { file_masks, adjacent_file_masks, passed_pawn_masks }
}

pub fn mask_rook_attacks(square: u8) -> Bitboard {
    let mut attacks = Bitboard(0);
    let r = square / 8;
    let f = square % 8;
    for r_itr in 1..7 { if r_itr != r { attacks.set_bit(r_itr * 8 + f); } }
    for f_itr in 1..7 { if f_itr != f { attacks.set_bit(r * 8 + f_itr); } }
    attacks
}

pub fn mask_bishop_attacks(square: u8) -> Bitboard {
    let mut attacks = Bitboard(0);
    let rank = (square / 8) as i8;
    let file = (square % 8) as i8;
    for (r_step, f_step) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let mut r = rank + r_step;
        let mut f = file + f_step;
        while r > 0 && r < 7 && f > 0 && f < 7 {
            attacks.set_bit((r * 8 + f) as u8);
            r += r_step;
            f += f_step;
        }
    }
    attacks
}

pub fn mask_knight_attacks(square: u8) -> Bitboard {
    leaper_attacks(square, &[(2, 1), (1, 2), (-1, 2), (-2, 1), (-2, -1), (-1, -2), (1, -2), (2, -1)])
}

pub fn mask_king_attacks(square: u8) -> Bitboard {
    leaper_attacks(square, &[(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)])
}

fn leaper_attacks(square: u8, offsets: &[(i8, i8)]) -> Bitboard {
    let mut attacks = Bitboard(0);
    let rank = (square / 8) as i8;
    let file = (square % 8) as i8;
    for &(r_off, f_off) in offsets {
        let tr = rank + r_off;
        let tf = file + f_off;
        if (0..8).contains(&tr) && (0..8).contains(&tf) {
            attacks.set_bit((tr * 8 + tf) as u8);
        }
    }
    attacks
}

fn slider_attacks(square: u8, blockers: Bitboard, directions: &[(i8, i8)]) -> Bitboard {
    let mut attacks = Bitboard(0);
    let rank = (square / 8) as i8;
    let file = (square % 8) as i8;
    for &(r_step, f_step) in directions {
        let mut r = rank + r_step;
        let mut f = file + f_step;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let target = (r * 8 + f) as u8;
            attacks.set_bit(target);
            if blockers.get_bit(target) { break; }
            r += r_step;
            f += f_step;
        }
    }
    attacks
}

pub fn generate_rook_attacks_on_the_fly(square: u8, blockers: Bitboard) -> Bitboard {
    slider_attacks(square, blockers, &[(1, 0), (-1, 0), (0, 1), (0, -1)])
}

pub fn generate_bishop_attacks_on_the_fly(square: u8, blockers: Bitboard) -> Bitboard {
    slider_attacks(square, blockers, &[(1, 1), (1, -1), (-1, 1), (-1, -1)])
}

pub fn set_occupancy(index: u32, bits_in_mask: u32, mut attack_mask: Bitboard) -> Bitboard {
    let mut occupancy = Bitboard(0);
    for count in 0..bits_in_mask {
        let square = attack_mask.pop_lsb();
        if (index & (1 << count)) != 0 { occupancy.set_bit(square); }
    }
    occupancy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_lookup_matches_slow_generation() {
        let occupancies = [0u64, 0x0000_1008_2400_4200, 0xFFFF_0000_0000_FFFF, 0x0042_0018_1800_4200];
        for square in 0..64u8 {
            for &occ in &occupancies {
                let occ = Bitboard(occ);
                assert_eq!(get_rook_attacks(square, occ), generate_rook_attacks_on_the_fly(square, occ));
                assert_eq!(get_bishop_attacks(square, occ), generate_bishop_attacks_on_the_fly(square, occ));
            }
        }
    }

    #[test]
    fn test_pawn_attacks_do_not_wrap() {
        // a2 pawn attacks only b3, h2 pawn attacks only g3
        assert_eq!(get_pawn_attacks(8, WHITE), Bitboard::from_square(17));
        assert_eq!(get_pawn_attacks(15, WHITE), Bitboard::from_square(22));
        assert_eq!(get_pawn_attacks(55, BLACK), Bitboard::from_square(46));
    }

    #[test]
    fn test_passed_pawn_mask() {
        // e4 white: d5-f8 span
        let mask = passed_pawn_mask(WHITE, 28);
        assert!(mask.get_bit(35) && mask.get_bit(36) && mask.get_bit(61));
        assert!(!mask.get_bit(28) && !mask.get_bit(20));
        let mask = passed_pawn_mask(BLACK, 36);
        assert!(mask.get_bit(27) && mask.get_bit(4));
        assert!(!mask.get_bit(44));
    }
}
