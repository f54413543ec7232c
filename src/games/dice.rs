//! Roll-under dice

use crate::games::paytable::{DiceTable, PayoutTables};
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{GameData, GameType, Resolution};
use crate::games::Resolver;
use rust_decimal::Decimal;

/// Wins when a 1..=100 roll lands at or under `target`
#[derive(Debug, Clone, PartialEq)]
pub struct DiceBet {
    pub amount: Decimal,
    pub target: u8,
}

impl Resolver for DiceBet {
    fn game_type(&self) -> GameType {
        GameType::Dice
    }

    fn wager(&self) -> Decimal {
        self.amount
    }

    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution {
        let roll = rng.uniform_int(DiceTable::ROLL_MIN, DiceTable::ROLL_MAX) as u8;
        let data = GameData::Dice {
            target: self.target,
            roll,
        };

        if roll <= self.target {
            Resolution::with_multiplier(self.amount, tables.dice.multiplier(self.target), data)
        } else {
            Resolution::loss(self.amount, data)
        }
    }
}
