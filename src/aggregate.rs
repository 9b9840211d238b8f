use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::session::GameSession;

/// How the running average is stored after each round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AverageRounding {
    /// Keep the exact mean.
    #[default]
    Fractional,
    /// Round the mean to a whole number after every update. Rounding error
    /// compounds across rounds.
    RoundEachUpdate,
}

/// Incremental mean of round scores, O(1) per round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreAggregator {
    rounding: AverageRounding,
}

impl ScoreAggregator {
    pub fn new(rounding: AverageRounding) -> Self {
        Self { rounding }
    }

    pub fn rounding(&self) -> AverageRounding {
        self.rounding
    }

    /// Fold `score` into the session average and return the new average.
    pub fn update(&self, session: &mut GameSession, score: u32) -> f64 {
        let n = session.round_count as f64;
        let mut average = (session.running_average * n + score as f64) / (n + 1.0);
        if self.rounding == AverageRounding::RoundEachUpdate {
            average = average.round();
        }

        session.running_average = average;
        session.round_count += 1;
        average
    }
}
