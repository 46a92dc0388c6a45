//! Tournament participants

use std::fmt;

use crate::error::DecideError;
use crate::random::SeededRng;
use crate::strategy::{Builtin, Move, Strategy, Turn};

/// A named participant with its decision capability and running score.
///
/// `cumulative_score` starts at zero and only changes when a finished match
/// is committed (or when it is explicitly reset).
pub struct Agent {
    name: String,
    cumulative_score: i64,
    strategy: Box<dyn Strategy>,
}

impl Agent {
    pub fn new(name: impl Into<String>, strategy: impl Strategy + 'static) -> Self {
        Self {
            name: name.into(),
            cumulative_score: 0,
            strategy: Box::new(strategy),
        }
    }

    pub fn builtin(name: impl Into<String>, strategy: Builtin) -> Self {
        Self::new(name, strategy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cumulative_score(&self) -> i64 {
        self.cumulative_score
    }

    pub fn reset_score(&mut self) {
        self.cumulative_score = 0;
    }

    pub fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError> {
        self.strategy.decide(history, rng)
    }

    pub(crate) fn commit(&mut self, score: i64) {
        self.cumulative_score += score;
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("cumulative_score", &self.cumulative_score)
            .finish_non_exhaustive()
    }
}
