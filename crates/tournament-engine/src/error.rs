//! Error taxonomy for matches and tournaments

use thiserror::Error;

/// A textual move outside the closed `Cooperate` / `Defect` set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unrecognised move symbol {symbol:?} (expected cooperate or defect)")]
pub struct MoveParseError {
    pub symbol: String,
}

/// Failure reported by a strategy's decide call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecideError {
    #[error(transparent)]
    InvalidMove(#[from] MoveParseError),

    #[error("strategy failed: {0}")]
    Failed(String),

    #[error("strategy panicked: {0}")]
    Panicked(String),
}

/// Why a single match was aborted. Nothing is committed to either agent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("agent {agent:?} violated the strategy contract in round {round} of {agent_a:?} vs {agent_b:?}: {source}")]
    StrategyViolation {
        agent: String,
        agent_a: String,
        agent_b: String,
        round: u32,
        #[source]
        source: DecideError,
    },

    #[error("agent {agent:?} exhausted the time limit in round {round} of {agent_a:?} vs {agent_b:?}")]
    Exhausted {
        agent: String,
        agent_a: String,
        agent_b: String,
        round: u32,
    },

    #[error("match {agent_a:?} vs {agent_b:?} cancelled before round {round}")]
    Cancelled {
        agent_a: String,
        agent_b: String,
        round: u32,
    },
}

impl MatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MatchError::Cancelled { .. })
    }
}

/// Problems detected before any simulation work begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate agent name {0:?} in roster")]
    DuplicateName(String),

    #[error("agent at roster index {0} has an empty name")]
    EmptyName(usize),

    #[error("tournament has already run; reset scores before running it again")]
    AlreadyRun,

    #[error("agent {agent:?} carries a score of {score}; reset scores before running")]
    ScoresNotReset { agent: String, score: i64 },

    #[error("zero-round matches are disallowed by this host")]
    ZeroRounds,

    #[error("invalid round range: min {min} > max {max}")]
    InvalidRoundRange { min: u32, max: u32 },

    #[error("end probability {0} is not a percentage (0-100)")]
    InvalidEndProbability(u8),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a whole round-robin run.
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("match {pair_index} ({agent_a:?} vs {agent_b:?}) aborted")]
    MatchAborted {
        pair_index: usize,
        agent_a: String,
        agent_b: String,
        #[source]
        source: MatchError,
    },
}
