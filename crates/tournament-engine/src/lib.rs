//! Tournament engine for the Iterated Prisoner's Dilemma
//!
//! Runs a round-robin between strategy agents: every unordered pair plays one
//! repeated game, each side deciding from its own first-person view of the
//! match so far. Results come back as immutable snapshots (per-round logs,
//! per-pair totals and per-agent cumulative scores) for export and reporting
//! layers to consume.
//!
//! ```
//! use tournament_engine::{run_round_robin, Agent, Builtin, PayoffTable, StrategyBase};
//!
//! let roster = vec![
//!     Agent::builtin("AllC", Builtin::new(StrategyBase::AlwaysCooperate)),
//!     Agent::builtin("AllD", Builtin::new(StrategyBase::AlwaysDefect)),
//!     Agent::builtin("TFT", Builtin::new(StrategyBase::TitForTat)),
//! ];
//! let results = run_round_robin(PayoffTable::CANONICAL, roster, 1).unwrap();
//! assert_eq!(results.score_of("AllD"), Some(10));
//! ```

mod agent;
mod config;
mod error;
mod game;
mod pairing;
mod payoff;
mod random;
mod strategy;
mod tournament;

pub use agent::Agent;
pub use config::{AgentSpec, TournamentConfig};
pub use error::{ConfigError, DecideError, MatchError, MoveParseError, TournamentError};
pub use game::{run_match, CancelToken, MatchEngine, MatchHistory, MatchResult, Round, RoundPolicy, Side};
pub use pairing::{calculate_match_count, generate_all_pairings, get_pairing_for_match, match_index_of};
pub use payoff::PayoffTable;
pub use random::SeededRng;
pub use strategy::{Builtin, FnStrategy, Move, Strategy, StrategyBase, StrategyParams, SymbolStrategy, Turn};
pub use tournament::{run_round_robin, PairResult, Standing, Tournament, TournamentResults};

/// Canonical payoff matrix for the Prisoner's Dilemma
/// Returns (score_a, score_b)
pub fn payoff(a: Move, b: Move) -> (i32, i32) {
    PayoffTable::CANONICAL.payoff(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1, 1));
    }
}
