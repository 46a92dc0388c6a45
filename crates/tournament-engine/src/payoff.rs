//! Stage-game payoff table

use serde::{Deserialize, Serialize};
use crate::strategy::Move;

/// Payoff matrix for one 2x2 stage game.
///
/// Each cell holds `(score_a, score_b)` for the row player A and the column
/// player B. The table is total and cannot be changed once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffTable {
    cooperate_cooperate: (i32, i32),
    cooperate_defect: (i32, i32),
    defect_cooperate: (i32, i32),
    defect_defect: (i32, i32),
}

impl PayoffTable {
    /// The standard iterated-dilemma payoffs: R=3, S=0, T=5, P=1.
    pub const CANONICAL: PayoffTable = PayoffTable::symmetric(3, 0, 5, 1);

    /// Build a table from its four cells, in row-major order.
    pub const fn new(
        cooperate_cooperate: (i32, i32),
        cooperate_defect: (i32, i32),
        defect_cooperate: (i32, i32),
        defect_defect: (i32, i32),
    ) -> Self {
        Self {
            cooperate_cooperate,
            cooperate_defect,
            defect_cooperate,
            defect_defect,
        }
    }

    /// Symmetric game from reward, sucker, temptation and punishment.
    pub const fn symmetric(reward: i32, sucker: i32, temptation: i32, punishment: i32) -> Self {
        Self::new(
            (reward, reward),
            (sucker, temptation),
            (temptation, sucker),
            (punishment, punishment),
        )
    }

    /// Returns (score_a, score_b)
    pub fn payoff(&self, a: Move, b: Move) -> (i32, i32) {
        match (a, b) {
            (Move::Cooperate, Move::Cooperate) => self.cooperate_cooperate,
            (Move::Cooperate, Move::Defect) => self.cooperate_defect,
            (Move::Defect, Move::Cooperate) => self.defect_cooperate,
            (Move::Defect, Move::Defect) => self.defect_defect,
        }
    }

    /// Whether this is a symmetric prisoner's dilemma: T > R > P > S and 2R > T + S.
    pub fn is_dilemma(&self) -> bool {
        let symmetric = self.cooperate_cooperate.0 == self.cooperate_cooperate.1
            && self.defect_defect.0 == self.defect_defect.1
            && self.cooperate_defect == (self.defect_cooperate.1, self.defect_cooperate.0);
        if !symmetric {
            return false;
        }

        // widened so cells near i32::MAX cannot overflow the sum
        let reward = i64::from(self.cooperate_cooperate.0);
        let punishment = i64::from(self.defect_defect.0);
        let (sucker, temptation) = (
            i64::from(self.cooperate_defect.0),
            i64::from(self.cooperate_defect.1),
        );

        temptation > reward
            && reward > punishment
            && punishment > sucker
            && 2 * reward > temptation + sucker
    }
}

impl Default for PayoffTable {
    fn default() -> Self {
        Self::CANONICAL
    }
}
