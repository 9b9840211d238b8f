// Library surface for the host binary and integration tests.
pub mod aggregate;
pub mod app_dirs;
pub mod config;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod format;
pub mod history;
pub mod location;
pub mod logging;
pub mod machine;
pub mod parser;
pub mod projection;
pub mod score;
pub mod session;

pub use aggregate::{AverageRounding, ScoreAggregator};
pub use dataset::{CsvDataset, ShuffledTargets, TargetProvider};
pub use distance::distance;
pub use error::{ConfigError, DatasetError, ParseError};
pub use location::Location;
pub use machine::RoundStateMachine;
pub use parser::parse;
pub use projection::{project, PixelPoint};
pub use score::ScoreCalculator;
pub use session::{GameSession, Round, RoundMode, ScoredRound, SessionSummary};
