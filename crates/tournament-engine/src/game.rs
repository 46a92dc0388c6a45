//! Match execution engine

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::agent::Agent;
use crate::error::{ConfigError, DecideError, MatchError};
use crate::payoff::PayoffTable;
use crate::random::SeededRng;
use crate::strategy::{Move, Turn};

/// Seat of an agent within one match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub(crate) fn lane(self) -> u64 {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based
    pub round_number: u32,
    pub move_a: Move,
    pub move_b: Move,
    pub score_a: i32,
    pub score_b: i32,
    pub cumulative_a: i64,
    pub cumulative_b: i64,
}

/// Ordered round log of one match, always oriented from agent A's seat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchHistory {
    rounds: Vec<Round>,
}

impl MatchHistory {
    fn with_capacity(capacity: usize) -> Self {
        Self { rounds: Vec::with_capacity(capacity) }
    }

    fn push(&mut self, round: Round) {
        self.rounds.push(round);
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Round> {
        self.rounds.iter()
    }

    /// History view one side was given when deciding `round` (1-based):
    /// every earlier round as (own, opponent), oldest first.
    pub fn view_for(&self, side: Side, round: u32) -> Vec<Turn> {
        let before = (round.saturating_sub(1) as usize).min(self.rounds.len());
        self.rounds[..before]
            .iter()
            .map(|r| {
                let turn = Turn::new(r.move_a, r.move_b);
                match side {
                    Side::A => turn,
                    Side::B => turn.flipped(),
                }
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a MatchHistory {
    type Item = &'a Round;
    type IntoIter = std::slice::Iter<'a, Round>;

    fn into_iter(self) -> Self::IntoIter {
        self.rounds.iter()
    }
}

/// Result of a complete match
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub total_score_a: i64,
    pub total_score_b: i64,
    pub history: MatchHistory,
}

impl MatchResult {
    pub fn round_count(&self) -> u32 {
        self.history.len() as u32
    }
}

/// How many rounds each match lasts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundPolicy {
    Fixed { rounds: u32 },
    /// Uniform over the inclusive range
    Uniform { min: u32, max: u32 },
    /// Play `min` rounds, then continue each round unless a percent draw
    /// falls under `end_probability`, never beyond `max`.
    Geometric { min: u32, max: u32, end_probability: u8 },
}

impl RoundPolicy {
    pub fn fixed(rounds: u32) -> Self {
        RoundPolicy::Fixed { rounds }
    }

    /// Geometric preset: 20..=50 rounds, ~35 on average
    pub fn standard() -> Self {
        RoundPolicy::Geometric { min: 20, max: 50, end_probability: 5 }
    }

    /// Shorter geometric preset: 10..=30 rounds, ~20 on average
    pub fn compressed() -> Self {
        RoundPolicy::Geometric { min: 10, max: 30, end_probability: 7 }
    }

    /// Smallest count this policy can produce
    pub fn min_rounds(&self) -> u32 {
        match *self {
            RoundPolicy::Fixed { rounds } => rounds,
            RoundPolicy::Uniform { min, .. } | RoundPolicy::Geometric { min, .. } => min,
        }
    }

    pub fn validate(&self, allow_zero_rounds: bool) -> Result<(), ConfigError> {
        match *self {
            RoundPolicy::Fixed { .. } => {}
            RoundPolicy::Uniform { min, max } => {
                if min > max {
                    return Err(ConfigError::InvalidRoundRange { min, max });
                }
            }
            RoundPolicy::Geometric { min, max, end_probability } => {
                if min > max {
                    return Err(ConfigError::InvalidRoundRange { min, max });
                }
                if end_probability > 100 {
                    return Err(ConfigError::InvalidEndProbability(end_probability));
                }
            }
        }

        if !allow_zero_rounds && self.min_rounds() == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        Ok(())
    }

    /// Draw a round count from `rng`.
    ///
    /// A tournament calls this once per run, so every pair plays the same
    /// number of rounds.
    pub fn resolve(&self, rng: &mut SeededRng) -> u32 {
        match *self {
            RoundPolicy::Fixed { rounds } => rounds,
            RoundPolicy::Uniform { min, max } => rng.next_in_range(min, max),
            RoundPolicy::Geometric { min, max, end_probability } => {
                let mut rounds = min;
                while rounds < max {
                    if rng.chance(end_probability) {
                        break;
                    }
                    rounds += 1;
                }
                rounds
            }
        }
    }
}

const PREALLOCATED_ROUNDS: u32 = 1024;

/// Cooperative cancellation flag shared with in-flight matches.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs repeated games over one payoff table.
///
/// [`MatchEngine::play`] only computes a result; [`MatchEngine::run`] also
/// commits the match totals to both agents.
#[derive(Clone, Debug)]
pub struct MatchEngine<'a> {
    payoff: &'a PayoffTable,
    rng: SeededRng,
    cancel: Option<CancelToken>,
    time_limit: Option<Duration>,
}

impl<'a> MatchEngine<'a> {
    pub fn new(payoff: &'a PayoffTable, rng: SeededRng) -> Self {
        Self {
            payoff,
            rng,
            cancel: None,
            time_limit: None,
        }
    }

    /// Check `token` before every round.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Wall-clock budget for the whole match. A decide call that returns
    /// after the deadline exhausts the match; a call that never returns
    /// cannot be interrupted.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Play `round_count` rounds between `agent_a` and `agent_b` without
    /// touching either agent's score.
    pub fn play(&self, agent_a: &Agent, agent_b: &Agent, round_count: u32) -> Result<MatchResult, MatchError> {
        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        // grow past this on demand; a huge count must still reach the cancel check
        let capacity = round_count.min(PREALLOCATED_ROUNDS) as usize;

        // A's view matches storage order; B sees every round flipped
        let mut view_a: Vec<Turn> = Vec::with_capacity(capacity);
        let mut view_b: Vec<Turn> = Vec::with_capacity(capacity);
        let mut history = MatchHistory::with_capacity(capacity);
        let mut total_a = 0i64;
        let mut total_b = 0i64;

        for round in 1..=round_count {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(MatchError::Cancelled {
                    agent_a: agent_a.name().to_string(),
                    agent_b: agent_b.name().to_string(),
                    round,
                });
            }

            let move_a = self.decide(agent_a, Side::A, &view_a, round, agent_a, agent_b, deadline)?;
            let move_b = self.decide(agent_b, Side::B, &view_b, round, agent_a, agent_b, deadline)?;

            let (score_a, score_b) = self.payoff.payoff(move_a, move_b);
            total_a += score_a as i64;
            total_b += score_b as i64;

            history.push(Round {
                round_number: round,
                move_a,
                move_b,
                score_a,
                score_b,
                cumulative_a: total_a,
                cumulative_b: total_b,
            });

            let turn = Turn::new(move_a, move_b);
            view_a.push(turn);
            view_b.push(turn.flipped());
        }

        debug!(
            "{} vs {} -> {} : {} over {} rounds",
            agent_a.name(),
            agent_b.name(),
            total_a,
            total_b,
            round_count
        );

        Ok(MatchResult {
            total_score_a: total_a,
            total_score_b: total_b,
            history,
        })
    }

    /// Play the match and, only if it completes, add the totals to both agents.
    pub fn run(&self, agent_a: &mut Agent, agent_b: &mut Agent, round_count: u32) -> Result<MatchResult, MatchError> {
        let result = self.play(agent_a, agent_b, round_count)?;
        agent_a.commit(result.total_score_a);
        agent_b.commit(result.total_score_b);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn decide(
        &self,
        agent: &Agent,
        side: Side,
        view: &[Turn],
        round: u32,
        agent_a: &Agent,
        agent_b: &Agent,
        deadline: Option<Instant>,
    ) -> Result<Move, MatchError> {
        let mut rng = self.rng.for_decision(round, side);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| agent.decide(view, &mut rng)))
            .unwrap_or_else(|payload| Err(DecideError::Panicked(panic_message(payload.as_ref()))));

        let chosen = match outcome {
            Ok(chosen) => chosen,
            Err(source) => {
                warn!(
                    "{} broke in round {} of {} vs {}: {}",
                    agent.name(),
                    round,
                    agent_a.name(),
                    agent_b.name(),
                    source
                );
                return Err(MatchError::StrategyViolation {
                    agent: agent.name().to_string(),
                    agent_a: agent_a.name().to_string(),
                    agent_b: agent_b.name().to_string(),
                    round,
                    source,
                });
            }
        };

        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            warn!("{} ran out of time in round {}", agent.name(), round);
            return Err(MatchError::Exhausted {
                agent: agent.name().to_string(),
                agent_a: agent_a.name().to_string(),
                agent_b: agent_b.name().to_string(),
                round,
            });
        }

        Ok(chosen)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run a complete match and commit its totals.
///
/// Decisions draw from streams derived from `seed` and `match_index`, so the
/// same inputs always replay the same match.
pub fn run_match(
    payoff: &PayoffTable,
    agent_a: &mut Agent,
    agent_b: &mut Agent,
    round_count: u32,
    seed: &[u8; 32],
    match_index: u64,
) -> Result<MatchResult, MatchError> {
    MatchEngine::new(payoff, SeededRng::new(seed, match_index)).run(agent_a, agent_b, round_count)
}
