use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

// --- ZOBRIST KEYS ---
pub struct ZobristKeys {
    // [Piece][Square]
    pub pieces: [[u64; 64]; 12],
    // [Castling Rights]
    pub castling: [u64; 16],
    // [File 0-7]
    pub en_passant: [u64; 8],
    // Black to move
    pub side: u64,
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

// Fixed seed so keys (and therefore bench node counts) are reproducible
const ZOBRIST_SEED: u64 = 1070372;

#[inline(always)]
pub fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut keys = ZobristKeys {
            pieces: [[0; 64]; 12],
            castling: [0; 16],
            en_passant: [0; 8],
            side: 0,
        };
        for piece in keys.pieces.iter_mut() {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }
        for key in keys.castling.iter_mut() { *key = rng.gen(); }
        for key in keys.en_passant.iter_mut() { *key = rng.gen(); }
        keys.side = rng.gen();
        keys
    })
}

pub fn init_zobrist() {
    keys();
    log::debug!("Zobrist keys initialized");
}

#[inline(always)]
pub fn piece_key(piece: usize, square: u8) -> u64 {
    keys().pieces[piece][square as usize]
}

#[inline(always)]
pub fn castling_key(rights: u8) -> u64 {
    keys().castling[rights as usize]
}

#[inline(always)]
pub fn en_passant_key(square: u8) -> u64 {
    keys().en_passant[(square % 8) as usize]
}

#[inline(always)]
pub fn side_key() -> u64 {
    keys().side
}
