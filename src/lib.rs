pub mod bitboard;
pub mod error;
pub mod eval;
pub mod history;
pub mod logging;
pub mod movegen;
pub mod parameters;
pub mod pawn;
pub mod perft;
pub mod position;
pub mod search;
pub mod see;
pub mod time;
pub mod tt;
pub mod types;
pub mod zobrist;

pub use error::{FenError, MoveParseError, SearchError};
pub use parameters::SearchParameters;
pub use position::Position;
pub use search::{BenchData, CancellationToken, SearchData, SearchOutcome, Searcher};
pub use time::{Clock, InfiniteLimiter, Limiter, ManualClock, MoveTimeLimiter, NodeLimiter, SystemClock, TimeManager};
pub use types::{Move, Score};

/// Builds the attack and hashing tables up front so the first search does
/// not pay for it.
pub fn init_tables() {
    zobrist::init_zobrist();
    bitboard::init_magic_tables();
}
