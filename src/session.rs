use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Which phase the current round is in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RoundMode {
    #[default]
    Guessing,
    Scored,
    InputError { message: String },
}

/// Guess, distance and score of a confirmed round. Set together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub guess: Location,
    pub distance_meters: f64,
    pub score: u32,
}

/// One guess-and-reveal cycle against a single target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    index: usize,
    target: Location,
    outcome: Option<RoundOutcome>,
}

impl Round {
    pub(crate) fn new(index: usize, target: Location) -> Self {
        Self {
            index,
            target,
            outcome: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn target(&self) -> Location {
        self.target
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    pub fn guess(&self) -> Option<Location> {
        self.outcome.map(|o| o.guess)
    }

    pub fn distance_meters(&self) -> Option<f64> {
        self.outcome.map(|o| o.distance_meters)
    }

    pub fn score(&self) -> Option<u32> {
        self.outcome.map(|o| o.score)
    }

    pub fn is_scored(&self) -> bool {
        self.outcome.is_some()
    }

    /// Returns false (and leaves the round alone) if it was already scored.
    pub(crate) fn record(&mut self, outcome: RoundOutcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }
}

/// Result handed back to the host after a guess is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredRound {
    pub index: usize,
    pub target: Location,
    pub guess: Location,
    pub distance_meters: f64,
    pub score: u32,
    pub running_average: f64,
}

/// Read-only snapshot of the scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub round_count: usize,
    pub running_average: f64,
    pub last_round: Option<Round>,
}

/// All mutable game state. Owned by the host and passed into every call.
#[derive(Debug, Clone, Default)]
pub struct GameSession {
    pub(crate) rounds: Vec<Round>,
    pub(crate) mode: RoundMode,
    pub(crate) running_average: f64,
    pub(crate) round_count: usize,
    // pending guess text, editable while guessing
    pub(crate) input: String,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn mode(&self) -> &RoundMode {
        &self.mode
    }

    pub fn running_average(&self) -> f64 {
        self.running_average
    }

    /// Number of scored rounds. Skipped rounds are not counted.
    pub fn round_count(&self) -> usize {
        self.round_count
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            round_count: self.round_count,
            running_average: self.running_average,
            last_round: self.rounds.last().cloned(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
