use tracing::{debug, warn};

use crate::aggregate::ScoreAggregator;
use crate::dataset::TargetProvider;
use crate::distance::distance;
use crate::error::{DatasetError, ParseError};
use crate::parser::parse;
use crate::score::ScoreCalculator;
use crate::session::{GameSession, Round, RoundMode, RoundOutcome, ScoredRound};

/// Drives a round through guessing, scoring and input errors.
///
/// Holds only the scoring rules; all mutable state lives in the
/// [`GameSession`] passed to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundStateMachine {
    scorer: ScoreCalculator,
    aggregator: ScoreAggregator,
}

impl RoundStateMachine {
    pub fn new(scorer: ScoreCalculator, aggregator: ScoreAggregator) -> Self {
        Self { scorer, aggregator }
    }

    pub fn scorer(&self) -> &ScoreCalculator {
        &self.scorer
    }

    pub fn current_mode<'a>(&self, session: &'a GameSession) -> &'a RoundMode {
        &session.mode
    }

    /// Confirm `raw` as the guess for the current round.
    ///
    /// Returns `Ok(None)` without touching the session unless the mode is
    /// `Guessing` and the current round is still open; a guess can only be
    /// confirmed once per round. A parse failure moves the session to
    /// `InputError` and leaves the round and the typed text as they were.
    pub fn submit_guess(
        &self,
        session: &mut GameSession,
        raw: &str,
    ) -> Result<Option<ScoredRound>, ParseError> {
        if session.mode != RoundMode::Guessing {
            debug!(mode = ?session.mode, "ignoring guess outside of guessing mode");
            return Ok(None);
        }
        let (index, target) = match session.rounds.last() {
            Some(round) if !round.is_scored() => (round.index(), round.target()),
            Some(_) => return Ok(None),
            None => {
                warn!("ignoring guess before any round was started");
                return Ok(None);
            }
        };

        let guess = match parse(raw) {
            Ok(loc) => loc,
            Err(e) => {
                debug!(error = %e, "rejected guess");
                session.mode = RoundMode::InputError {
                    message: e.to_string(),
                };
                return Err(e);
            }
        };

        let distance_meters = distance(&guess, &target);
        let score = self.scorer.score(distance_meters);

        let recorded = session.rounds.last_mut().is_some_and(|round| {
            round.record(RoundOutcome {
                guess,
                distance_meters,
                score,
            })
        });
        if !recorded {
            return Ok(None);
        }
        let running_average = self.aggregator.update(session, score);
        session.input.clear();
        session.mode = RoundMode::Scored;

        debug!(index, distance_meters, score, running_average, "round scored");

        Ok(Some(ScoredRound {
            index,
            target,
            guess,
            distance_meters,
            score,
            running_average,
        }))
    }

    /// Confirm whatever is in the session's pending input buffer.
    pub fn submit_pending(
        &self,
        session: &mut GameSession,
    ) -> Result<Option<ScoredRound>, ParseError> {
        let raw = session.input.clone();
        self.submit_guess(session, &raw)
    }

    /// Start a new round at index `rounds.len()`, from any mode.
    ///
    /// If the provider has no target the error is returned and the session
    /// is left exactly as it was.
    pub fn start_next_round<'a, P: TargetProvider + ?Sized>(
        &self,
        session: &'a mut GameSession,
        provider: &P,
    ) -> Result<&'a Round, DatasetError> {
        let index = session.rounds.len();
        let target = provider.target_location_for(index)?;

        if let Some(prev) = session.rounds.last() {
            if !prev.is_scored() {
                debug!(index = prev.index(), "skipping unscored round");
            }
        }

        session.input.clear();
        session.mode = RoundMode::Guessing;
        session.rounds.push(Round::new(index, target));
        debug!(index, "round started");

        Ok(&session.rounds[index])
    }

    /// Dismiss an input error. No-op in any other mode.
    pub fn acknowledge_error(&self, session: &mut GameSession) {
        if matches!(session.mode, RoundMode::InputError { .. }) {
            session.mode = RoundMode::Guessing;
        }
    }

    /// Append to the pending guess. Editing clears an input error.
    pub fn type_char(&self, session: &mut GameSession, c: char) {
        if self.begin_edit(session) {
            session.input.push(c);
        }
    }

    pub fn backspace(&self, session: &mut GameSession) {
        if self.begin_edit(session) {
            session.input.pop();
        }
    }

    fn begin_edit(&self, session: &mut GameSession) -> bool {
        match session.mode {
            RoundMode::Scored => false,
            RoundMode::Guessing => true,
            RoundMode::InputError { .. } => {
                session.mode = RoundMode::Guessing;
                true
            }
        }
    }
}
