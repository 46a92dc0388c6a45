//! Round-robin tournament driver
//!
//! Runs one match per unordered pair of the roster in canonical order, then
//! commits every agent's total in a single reduction pass. A run either
//! commits all matches or none of them.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use crate::agent::Agent;
use crate::error::{ConfigError, TournamentError};
use crate::game::{CancelToken, MatchEngine, MatchHistory, RoundPolicy};
use crate::pairing::{calculate_match_count, generate_all_pairings};
use crate::payoff::PayoffTable;
use crate::random::SeededRng;

/// Stream reserved for the per-run round count; pair streams use the pair index.
const ROUND_COUNT_STREAM: u64 = u64::MAX;

/// Outcome of one finished match, oriented as it was played.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PairResult {
    /// Position in canonical pair order
    pub pair_index: usize,
    pub index_a: usize,
    pub index_b: usize,
    pub agent_a: String,
    pub agent_b: String,
    pub total_score_a: i64,
    pub total_score_b: i64,
    pub history: MatchHistory,
}

impl PairResult {
    pub fn involves(&self, name: &str) -> bool {
        self.agent_a == name || self.agent_b == name
    }

    /// Match total of `name` in this pair, if it played here.
    pub fn score_for(&self, name: &str) -> Option<i64> {
        if self.agent_a == name {
            Some(self.total_score_a)
        } else if self.agent_b == name {
            Some(self.total_score_b)
        } else {
            None
        }
    }
}

impl fmt::Display for PairResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {}: {} - {}",
            self.agent_a, self.agent_b, self.total_score_a, self.total_score_b
        )
    }
}

/// Name and cumulative score of one roster entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub name: String,
    pub cumulative_score: i64,
}

/// Immutable snapshot of a finished round-robin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TournamentResults {
    standings: Vec<Standing>,
    pairs: Vec<PairResult>,
}

impl TournamentResults {
    /// Roster order
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    /// Highest score first; ties keep roster order.
    pub fn ranking(&self) -> Vec<&Standing> {
        let mut ranked: Vec<&Standing> = self.standings.iter().collect();
        ranked.sort_by(|a, b| b.cumulative_score.cmp(&a.cumulative_score));
        ranked
    }

    /// Canonical pair order
    pub fn pairs(&self) -> &[PairResult] {
        &self.pairs
    }

    pub fn match_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn score_of(&self, name: &str) -> Option<i64> {
        self.standings
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.cumulative_score)
    }

    /// The match between `a` and `b`, whichever seat each of them had.
    pub fn pair(&self, a: &str, b: &str) -> Option<&PairResult> {
        self.pairs
            .iter()
            .find(|p| (p.agent_a == a && p.agent_b == b) || (p.agent_a == b && p.agent_b == a))
    }

    /// `(score of a, score of b)` in their match.
    pub fn head_to_head(&self, a: &str, b: &str) -> Option<(i64, i64)> {
        let pair = self.pair(a, b)?;
        Some((pair.score_for(a)?, pair.score_for(b)?))
    }
}

/// A roster plus the rules it plays under.
pub struct Tournament {
    payoff: PayoffTable,
    roster: Vec<Agent>,
    seed: [u8; 32],
    allow_zero_rounds: bool,
    cancel: Option<CancelToken>,
    time_limit: Option<Duration>,
    completed: bool,
}

impl Tournament {
    /// Validate the roster. Names must be non-empty and unique.
    pub fn new(payoff: PayoffTable, roster: Vec<Agent>) -> Result<Self, ConfigError> {
        let mut names = HashSet::with_capacity(roster.len());
        for (index, agent) in roster.iter().enumerate() {
            if agent.name().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !names.insert(agent.name()) {
                return Err(ConfigError::DuplicateName(agent.name().to_string()));
            }
        }

        if !payoff.is_dilemma() {
            warn!("payoff table {:?} is not a prisoner's dilemma", payoff);
        }

        Ok(Self {
            payoff,
            roster,
            seed: [0u8; 32],
            allow_zero_rounds: true,
            cancel: None,
            time_limit: None,
            completed: false,
        })
    }

    /// Seed for every match's random streams
    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.seed = seed;
        self
    }

    /// Host policy on zero-round matches (allowed by default).
    pub fn allow_zero_rounds(mut self, allow: bool) -> Self {
        self.allow_zero_rounds = allow;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Per-match wall-clock budget
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn payoff(&self) -> &PayoffTable {
        &self.payoff
    }

    pub fn roster(&self) -> &[Agent] {
        &self.roster
    }

    pub fn match_count(&self) -> usize {
        calculate_match_count(self.roster.len())
    }

    pub fn standings(&self) -> Vec<Standing> {
        self.roster
            .iter()
            .map(|agent| Standing {
                name: agent.name().to_string(),
                cumulative_score: agent.cumulative_score(),
            })
            .collect()
    }

    /// Zero every agent's score so the tournament may run again.
    pub fn reset_scores(&mut self) {
        for agent in &mut self.roster {
            agent.reset_score();
        }
        self.completed = false;
    }

    /// Round-robin with a fixed number of rounds per match.
    pub fn run(&mut self, round_count: u32) -> Result<TournamentResults, TournamentError> {
        self.run_with_policy(&RoundPolicy::fixed(round_count))
    }

    pub fn run_with_policy(&mut self, policy: &RoundPolicy) -> Result<TournamentResults, TournamentError> {
        let (pairs, round_count) = self.prepare(policy)?;
        let results = pairs
            .iter()
            .enumerate()
            .map(|(pair_index, &(i, j))| self.play_pair(pair_index, i, j, round_count))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.finish(results))
    }

    /// Same as [`Tournament::run`], with matches spread over the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&mut self, round_count: u32) -> Result<TournamentResults, TournamentError> {
        self.run_parallel_with_policy(&RoundPolicy::fixed(round_count))
    }

    /// Results are identical to the sequential run; when several matches
    /// fail, the lowest pair index is reported.
    #[cfg(feature = "parallel")]
    pub fn run_parallel_with_policy(&mut self, policy: &RoundPolicy) -> Result<TournamentResults, TournamentError> {
        use rayon::prelude::*;

        let (pairs, round_count) = self.prepare(policy)?;
        let outcomes: Vec<Result<PairResult, TournamentError>> = pairs
            .par_iter()
            .enumerate()
            .map(|(pair_index, &(i, j))| self.play_pair(pair_index, i, j, round_count))
            .collect();
        let results = first_failure(outcomes)?;
        Ok(self.finish(results))
    }

    /// Check the run may start, then fix the pair list and the round count
    /// every pair will play.
    fn prepare(&self, policy: &RoundPolicy) -> Result<(Vec<(usize, usize)>, u32), ConfigError> {
        policy.validate(self.allow_zero_rounds)?;

        if self.completed {
            return Err(ConfigError::AlreadyRun);
        }
        if let Some(agent) = self.roster.iter().find(|a| a.cumulative_score() != 0) {
            return Err(ConfigError::ScoresNotReset {
                agent: agent.name().to_string(),
                score: agent.cumulative_score(),
            });
        }

        let round_count = policy.resolve(&mut SeededRng::new(&self.seed, ROUND_COUNT_STREAM));
        info!(
            "round-robin: {} agents, {} matches, {} rounds each ({:?})",
            self.roster.len(),
            self.match_count(),
            round_count,
            policy
        );
        Ok((generate_all_pairings(self.roster.len()), round_count))
    }

    fn play_pair(
        &self,
        pair_index: usize,
        i: usize,
        j: usize,
        round_count: u32,
    ) -> Result<PairResult, TournamentError> {
        let agent_a = &self.roster[i];
        let agent_b = &self.roster[j];

        let rng = SeededRng::new(&self.seed, pair_index as u64);
        let mut engine = MatchEngine::new(&self.payoff, rng);
        if let Some(token) = &self.cancel {
            engine = engine.with_cancel(token.clone());
        }
        if let Some(limit) = self.time_limit {
            engine = engine.with_time_limit(limit);
        }

        let result = engine
            .play(agent_a, agent_b, round_count)
            .map_err(|source| {
                warn!("match {} aborted: {}", pair_index, source);
                TournamentError::MatchAborted {
                    pair_index,
                    agent_a: agent_a.name().to_string(),
                    agent_b: agent_b.name().to_string(),
                    source,
                }
            })?;

        Ok(PairResult {
            pair_index,
            index_a: i,
            index_b: j,
            agent_a: agent_a.name().to_string(),
            agent_b: agent_b.name().to_string(),
            total_score_a: result.total_score_a,
            total_score_b: result.total_score_b,
            history: result.history,
        })
    }

    /// Sum each agent's match totals and commit them in one pass.
    fn finish(&mut self, pairs: Vec<PairResult>) -> TournamentResults {
        let mut totals = vec![0i64; self.roster.len()];
        for pair in &pairs {
            totals[pair.index_a] += pair.total_score_a;
            totals[pair.index_b] += pair.total_score_b;
        }
        for (agent, total) in self.roster.iter_mut().zip(totals) {
            agent.commit(total);
        }
        self.completed = true;

        let standings = self.standings();
        if let Some(leader) = standings.iter().max_by_key(|s| s.cumulative_score) {
            info!(
                "round-robin finished: {} matches, leader {} with {}",
                pairs.len(),
                leader.name,
                leader.cumulative_score
            );
        }

        TournamentResults { standings, pairs }
    }
}

#[cfg(feature = "parallel")]
fn first_failure(
    outcomes: Vec<Result<PairResult, TournamentError>>,
) -> Result<Vec<PairResult>, TournamentError> {
    fn cancelled(err: &TournamentError) -> bool {
        matches!(err, TournamentError::MatchAborted { source, .. } if source.is_cancelled())
    }

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failure: Option<TournamentError> = None;
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                // a real violation outranks a cancellation it may have caused
                let replace = match &failure {
                    None => true,
                    Some(current) => cancelled(current) && !cancelled(&err),
                };
                if replace {
                    failure = Some(err);
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

/// Build a tournament from `roster` and run it once with a fixed round count.
pub fn run_round_robin(
    payoff: PayoffTable,
    roster: Vec<Agent>,
    round_count: u32,
) -> Result<TournamentResults, TournamentError> {
    Tournament::new(payoff, roster)?.run(round_count)
}
