//! Moves, history views and the strategy capability

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use crate::error::{DecideError, MoveParseError};
use crate::random::SeededRng;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    #[serde(alias = "cooperate")]
    Cooperate,
    #[serde(alias = "defect")]
    Defect,
}

impl Move {
    pub fn opposite(self) -> Move {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cooperate" | "c" => Ok(Move::Cooperate),
            "defect" | "d" => Ok(Move::Defect),
            _ => Err(MoveParseError { symbol: s.to_string() }),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Cooperate => f.write_str("cooperate"),
            Move::Defect => f.write_str("defect"),
        }
    }
}

/// One prior round as seen by the deciding agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub own: Move,
    pub opponent: Move,
}

impl Turn {
    pub fn new(own: Move, opponent: Move) -> Self {
        Self { own, opponent }
    }

    /// The same round from the other player's seat.
    pub fn flipped(self) -> Turn {
        Turn { own: self.opponent, opponent: self.own }
    }
}

/// Decision capability of an agent.
///
/// `history[i]` is round `i + 1` of the current match from the caller's own
/// perspective; it is empty on the first round. Randomness must come from
/// `rng` only, which keeps a run reproducible for a fixed tournament seed.
pub trait Strategy: Send + Sync {
    fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError> {
        (**self).decide(history, rng)
    }
}

/// Strategy backed by a closure that always produces a valid move.
pub struct FnStrategy<F>(F);

impl<F> FnStrategy<F>
where
    F: Fn(&[Turn], &mut SeededRng) -> Move + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&[Turn], &mut SeededRng) -> Move + Send + Sync,
{
    fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError> {
        Ok((self.0)(history, rng))
    }
}

/// Strategy backed by a closure that answers with a textual symbol.
///
/// The symbol is parsed here; anything other than cooperate/defect is
/// reported as [`DecideError::InvalidMove`] rather than coerced.
pub struct SymbolStrategy<F>(F);

impl<F, S> SymbolStrategy<F>
where
    F: Fn(&[Turn], &mut SeededRng) -> S + Send + Sync,
    S: AsRef<str>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, S> Strategy for SymbolStrategy<F>
where
    F: Fn(&[Turn], &mut SeededRng) -> S + Send + Sync,
    S: AsRef<str>,
{
    fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError> {
        let symbol = (self.0)(history, rng);
        Ok(symbol.as_ref().parse::<Move>()?)
    }
}

// ── Builtin catalog ──────────────────────────────────────────────────

/// Base behaviour of a builtin strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyBase {
    /// Copy opponent's last move. Start with cooperate.
    TitForTat,
    /// Always defect, never cooperate.
    AlwaysDefect,
    /// Always cooperate, never defect.
    AlwaysCooperate,
    /// Cooperate until opponent defects once, then always defect.
    GrimTrigger,
    /// Win-stay, lose-switch. Repeat move if good outcome.
    Pavlov,
    /// Tit-for-Tat but start with defect.
    SuspiciousTitForTat,
    /// Random choice each round.
    Random,
    /// Defect only if opponent defected twice in a row.
    TitForTwoTats,
    /// Retaliate with increasing defection streaks, then forgive.
    Gradual,
}

/// Tuning knobs shared by the builtins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Percentage chance to cooperate after opponent defects (0-100)
    pub forgiveness: u8,
    /// Number of opponent defections GrimTrigger ignores before triggering
    pub noise_tolerance: u8,
    /// Bias toward cooperation for Random strategy (0-100)
    pub cooperate_bias: u8,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            forgiveness: 0,
            noise_tolerance: 0,
            cooperate_bias: 50,
        }
    }
}

/// A builtin strategy: base behaviour plus parameters.
///
/// Deserializes either from a bare base name (`"TitForTat"`) or from
/// `{"base": "TitForTat", "params": {...}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BuiltinRepr")]
pub struct Builtin {
    pub base: StrategyBase,
    pub params: StrategyParams,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuiltinRepr {
    Bare(StrategyBase),
    Full {
        base: StrategyBase,
        #[serde(default)]
        params: StrategyParams,
    },
}

impl From<BuiltinRepr> for Builtin {
    fn from(repr: BuiltinRepr) -> Self {
        match repr {
            BuiltinRepr::Bare(base) => Builtin::new(base),
            BuiltinRepr::Full { base, params } => Builtin::with_params(base, params),
        }
    }
}

impl Builtin {
    pub fn new(base: StrategyBase) -> Self {
        Self { base, params: StrategyParams::default() }
    }

    pub fn with_params(base: StrategyBase, params: StrategyParams) -> Self {
        Self { base, params }
    }

    /// Pick the next move; total over every history length.
    pub fn choose(&self, history: &[Turn], rng: &mut SeededRng) -> Move {
        match self.base {
            StrategyBase::TitForTat => reciprocate(history, Move::Cooperate, &self.params, rng),
            StrategyBase::AlwaysDefect => Move::Defect,
            StrategyBase::AlwaysCooperate => Move::Cooperate,
            StrategyBase::GrimTrigger => grim_trigger(history, &self.params),
            StrategyBase::Pavlov => pavlov(history),
            StrategyBase::SuspiciousTitForTat => reciprocate(history, Move::Defect, &self.params, rng),
            StrategyBase::Random => {
                if rng.chance(self.params.cooperate_bias) {
                    Move::Cooperate
                } else {
                    Move::Defect
                }
            }
            StrategyBase::TitForTwoTats => tit_for_two_tats(history),
            StrategyBase::Gradual => gradual(history),
        }
    }
}

impl Default for Builtin {
    fn default() -> Self {
        Self::new(StrategyBase::TitForTat)
    }
}

impl Strategy for Builtin {
    fn decide(&self, history: &[Turn], rng: &mut SeededRng) -> Result<Move, DecideError> {
        Ok(self.choose(history, rng))
    }
}

/// Tit-for-Tat family: open with `opening`, then mirror the opponent,
/// forgiving a defection with `params.forgiveness` percent chance.
fn reciprocate(history: &[Turn], opening: Move, params: &StrategyParams, rng: &mut SeededRng) -> Move {
    match history.last() {
        None => opening,
        Some(turn) if turn.opponent == Move::Cooperate => Move::Cooperate,
        Some(_) => {
            if params.forgiveness > 0 && rng.chance(params.forgiveness) {
                Move::Cooperate
            } else {
                Move::Defect
            }
        }
    }
}

fn grim_trigger(history: &[Turn], params: &StrategyParams) -> Move {
    let defections = history.iter().filter(|t| t.opponent == Move::Defect).count();
    if defections > params.noise_tolerance as usize {
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Win-stay, lose-switch against the canonical table: a last-round score of
/// 3 or more repeats the move, anything less switches.
fn pavlov(history: &[Turn]) -> Move {
    let Some(last) = history.last() else {
        return Move::Cooperate;
    };

    let (my_score, _) = crate::payoff(last.own, last.opponent);
    if my_score >= 3 {
        last.own
    } else {
        last.own.opposite()
    }
}

fn tit_for_two_tats(history: &[Turn]) -> Move {
    match history {
        [.., a, b] if a.opponent == Move::Defect && b.opponent == Move::Defect => Move::Defect,
        _ => Move::Cooperate,
    }
}

/// After N opponent defections we should have defected N(N+1)/2 times.
fn gradual(history: &[Turn]) -> Move {
    let theirs = history.iter().filter(|t| t.opponent == Move::Defect).count();
    let mine = history.iter().filter(|t| t.own == Move::Defect).count();

    if mine < theirs * (theirs + 1) / 2 {
        Move::Defect
    } else {
        Move::Cooperate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: Move = Move::Cooperate;
    const D: Move = Move::Defect;

    fn make_rng() -> SeededRng {
        SeededRng::new(&[42u8; 32], 0)
    }

    /// History built from (own, opponent) pairs
    fn hist(turns: &[(Move, Move)]) -> Vec<Turn> {
        turns.iter().map(|&(own, opponent)| Turn::new(own, opponent)).collect()
    }

    fn decide(base: StrategyBase, history: &[Turn]) -> Move {
        Builtin::new(base).choose(history, &mut make_rng())
    }

    #[test]
    fn test_move_parse() {
        assert_eq!("cooperate".parse::<Move>(), Ok(C));
        assert_eq!("Defect".parse::<Move>(), Ok(D));
        assert_eq!(" c ".parse::<Move>(), Ok(C));
        assert_eq!("D".parse::<Move>(), Ok(D));
    }

    #[test]
    fn test_move_parse_rejects_other_symbols() {
        let err = "betray".parse::<Move>().unwrap_err();
        assert_eq!(err.symbol, "betray");
        assert!("".parse::<Move>().is_err());
    }

    #[test]
    fn test_move_serde_rejects_unknown_variant() {
        assert_eq!(serde_json::from_str::<Move>("\"defect\"").unwrap(), D);
        assert!(serde_json::from_str::<Move>("\"Abstain\"").is_err());
    }

    #[test]
    fn test_turn_flip() {
        let turn = Turn::new(C, D);
        assert_eq!(turn.flipped(), Turn::new(D, C));
        assert_eq!(turn.flipped().flipped(), turn);
    }

    #[test]
    fn test_tit_for_tat_first_move() {
        assert_eq!(decide(StrategyBase::TitForTat, &[]), C);
    }

    #[test]
    fn test_tit_for_tat_copies() {
        assert_eq!(decide(StrategyBase::TitForTat, &hist(&[(C, C)])), C);
        assert_eq!(decide(StrategyBase::TitForTat, &hist(&[(C, D)])), D);
        assert_eq!(decide(StrategyBase::TitForTat, &hist(&[(D, D), (D, C)])), C);
    }

    #[test]
    fn test_always_defect_and_cooperate() {
        let long = hist(&[(C, D); 12]);
        for len in 0..long.len() {
            assert_eq!(decide(StrategyBase::AlwaysDefect, &long[..len]), D);
            assert_eq!(decide(StrategyBase::AlwaysCooperate, &long[..len]), C);
        }
    }

    #[test]
    fn test_grim_trigger() {
        assert_eq!(decide(StrategyBase::GrimTrigger, &hist(&[(C, C), (C, C)])), C);
        assert_eq!(decide(StrategyBase::GrimTrigger, &hist(&[(C, D), (D, C)])), D);
    }

    #[test]
    fn test_grim_trigger_noise_tolerance() {
        let strategy = Builtin::with_params(
            StrategyBase::GrimTrigger,
            StrategyParams { noise_tolerance: 1, ..Default::default() },
        );
        let mut rng = make_rng();

        assert_eq!(strategy.choose(&hist(&[(C, D)]), &mut rng), C);
        assert_eq!(strategy.choose(&hist(&[(C, D), (C, D)]), &mut rng), D);
    }

    #[test]
    fn test_pavlov_win_stay() {
        assert_eq!(decide(StrategyBase::Pavlov, &[]), C);
        // mutual cooperation (3 points): stay
        assert_eq!(decide(StrategyBase::Pavlov, &hist(&[(C, C)])), C);
        // temptation (5 points): stay with defect
        assert_eq!(decide(StrategyBase::Pavlov, &hist(&[(D, C)])), D);
    }

    #[test]
    fn test_pavlov_lose_switch() {
        // sucker (0 points): switch to defect
        assert_eq!(decide(StrategyBase::Pavlov, &hist(&[(C, D)])), D);
        // punishment (1 point): switch to cooperate
        assert_eq!(decide(StrategyBase::Pavlov, &hist(&[(D, D)])), C);
    }

    #[test]
    fn test_suspicious_tft() {
        assert_eq!(decide(StrategyBase::SuspiciousTitForTat, &[]), D);
        assert_eq!(decide(StrategyBase::SuspiciousTitForTat, &hist(&[(D, C)])), C);
        assert_eq!(decide(StrategyBase::SuspiciousTitForTat, &hist(&[(D, D)])), D);
    }

    #[test]
    fn test_tit_for_two_tats() {
        assert_eq!(decide(StrategyBase::TitForTwoTats, &[]), C);
        assert_eq!(decide(StrategyBase::TitForTwoTats, &hist(&[(C, D)])), C);
        assert_eq!(decide(StrategyBase::TitForTwoTats, &hist(&[(C, C), (C, D)])), C);
        assert_eq!(decide(StrategyBase::TitForTwoTats, &hist(&[(C, D), (C, D)])), D);
    }

    #[test]
    fn test_gradual_escalates() {
        // one opponent defection: owe one defection
        assert_eq!(decide(StrategyBase::Gradual, &hist(&[(C, D)])), D);
        assert_eq!(decide(StrategyBase::Gradual, &hist(&[(C, D), (D, C)])), C);
        // two opponent defections: owe three in total
        assert_eq!(decide(StrategyBase::Gradual, &hist(&[(C, D), (D, D), (D, C)])), D);
    }

    #[test]
    fn test_cooperate_bias_extremes() {
        let never = Builtin::with_params(
            StrategyBase::Random,
            StrategyParams { cooperate_bias: 0, ..Default::default() },
        );
        let always = Builtin::with_params(
            StrategyBase::Random,
            StrategyParams { cooperate_bias: 100, ..Default::default() },
        );
        let mut rng = make_rng();
        for _ in 0..20 {
            assert_eq!(never.choose(&[], &mut rng), D);
            assert_eq!(always.choose(&[], &mut rng), C);
        }
    }

    #[test]
    fn test_full_forgiveness_always_cooperates() {
        let strategy = Builtin::with_params(
            StrategyBase::TitForTat,
            StrategyParams { forgiveness: 100, ..Default::default() },
        );
        let mut rng = make_rng();
        for _ in 0..20 {
            assert_eq!(strategy.choose(&hist(&[(C, D)]), &mut rng), C);
        }
    }

    #[test]
    fn test_builtin_deserializes_bare_and_full() {
        let bare: Builtin = serde_json::from_str("\"GrimTrigger\"").unwrap();
        assert_eq!(bare, Builtin::new(StrategyBase::GrimTrigger));

        let full: Builtin =
            serde_json::from_str(r#"{"base": "Random", "params": {"cooperate_bias": 80}}"#).unwrap();
        assert_eq!(full.base, StrategyBase::Random);
        assert_eq!(full.params.cooperate_bias, 80);
        assert_eq!(full.params.forgiveness, 0);

        assert!(serde_json::from_str::<Builtin>("\"Sneaky\"").is_err());
    }

    #[test]
    fn test_symbol_strategy_parses_at_boundary() {
        let ok = SymbolStrategy::new(|_: &[Turn], _: &mut SeededRng| "defect");
        assert_eq!(ok.decide(&[], &mut make_rng()), Ok(D));

        let bad = SymbolStrategy::new(|_: &[Turn], _: &mut SeededRng| String::from("maybe"));
        assert_eq!(
            bad.decide(&[], &mut make_rng()),
            Err(DecideError::InvalidMove(MoveParseError { symbol: "maybe".into() }))
        );
    }

    #[test]
    fn test_fn_strategy_sees_history() {
        let mirror = FnStrategy::new(|h: &[Turn], _: &mut SeededRng| {
            h.last().map_or(C, |t| t.opponent)
        });
        assert_eq!(mirror.decide(&hist(&[(C, D)]), &mut make_rng()), Ok(D));
    }
}
