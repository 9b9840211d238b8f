use thiserror::Error;

/// Why a raw guess could not be turned into a [`Location`](crate::location::Location).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No coordinates entered.")]
    Empty,

    #[error("Please enter exactly two numbers (lat and lon), got {0}.")]
    WrongArity(usize),

    #[error("'{0}' is not a number.")]
    NotANumber(String),

    #[error("Invalid coordinate ranges: latitude must be within [-90, 90] and longitude within [-180, 180].")]
    OutOfRange,
}

/// Failures at the dataset boundary. Any of these prevents a round from starting.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("no target location for round index {0}")]
    NotFound(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid coordinate record on line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("score decay width must be positive and finite, got {0}")]
    InvalidSigma(f64),

    #[error("map size must be non-zero, got {width}x{height}")]
    InvalidMapSize { width: u32, height: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
