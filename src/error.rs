use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected at least 4 FEN fields, found {0}")]
    MissingFields(usize),
    #[error("invalid piece placement: {0}")]
    BadPlacement(String),
    #[error("invalid side to move: {0}")]
    BadSide(String),
    #[error("invalid castling rights: {0}")]
    BadCastling(String),
    #[error("invalid en passant square: {0}")]
    BadEnPassant(String),
    #[error("invalid move clock: {0}")]
    BadClock(String),
    #[error("position must have exactly one king per side")]
    BadKings,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("malformed move string: {0}")]
    Malformed(String),
    #[error("move {0} is not legal in this position")]
    Illegal(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search started without a limiter")]
    MissingLimiter,
    #[error("thread count must be at least 1")]
    InvalidThreadCount,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid search parameters: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid search parameter: {0}")]
    InvalidParameter(String),
}
