//! Tournament configuration
//!
//! A roster of builtin strategies plus the rules of play, deserialized from
//! JSON:
//!
//! ```json
//! {
//!   "rounds": {"kind": "uniform", "min": 90, "max": 110},
//!   "seed": [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
//!            7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7],
//!   "roster": [
//!     {"name": "Tit for Tat", "strategy": "TitForTat"},
//!     {"name": "Random", "strategy": {"base": "Random", "params": {"cooperate_bias": 50}}}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use crate::agent::Agent;
use crate::error::{ConfigError, TournamentError};
use crate::game::RoundPolicy;
use crate::payoff::PayoffTable;
use crate::strategy::Builtin;
use crate::tournament::{Tournament, TournamentResults};

/// One roster entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub strategy: Builtin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TournamentConfig {
    pub rounds: RoundPolicy,
    #[serde(default)]
    pub payoff: PayoffTable,
    #[serde(default)]
    pub seed: [u8; 32],
    #[serde(default = "default_allow_zero_rounds")]
    pub allow_zero_rounds: bool,
    #[serde(default)]
    pub roster: Vec<AgentSpec>,
}

fn default_allow_zero_rounds() -> bool {
    true
}

impl TournamentConfig {
    /// Fixed round count, canonical payoffs, zero seed, empty roster.
    pub fn new(round_count: u32) -> Self {
        Self {
            rounds: RoundPolicy::fixed(round_count),
            payoff: PayoffTable::CANONICAL,
            seed: [0u8; 32],
            allow_zero_rounds: default_allow_zero_rounds(),
            roster: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TournamentConfig = serde_json::from_str(json)?;
        config.rounds.validate(config.allow_zero_rounds)?;
        Ok(config)
    }

    pub fn with_agent(mut self, name: impl Into<String>, strategy: Builtin) -> Self {
        self.roster.push(AgentSpec { name: name.into(), strategy });
        self
    }

    /// Instantiate the roster and validate it.
    pub fn build(&self) -> Result<Tournament, ConfigError> {
        self.rounds.validate(self.allow_zero_rounds)?;

        let roster = self
            .roster
            .iter()
            .map(|spec| Agent::builtin(spec.name.clone(), spec.strategy))
            .collect();

        Ok(Tournament::new(self.payoff, roster)?
            .with_seed(self.seed)
            .allow_zero_rounds(self.allow_zero_rounds))
    }

    /// Build the tournament and run it once under the configured round policy.
    pub fn run(&self) -> Result<TournamentResults, TournamentError> {
        self.build()?.run_with_policy(&self.rounds)
    }
}
