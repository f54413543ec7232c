//! Plinko: a ball bounces left or right once per row and lands in the bucket
//! counted by its rightward bounces.

use crate::games::paytable::PayoutTables;
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{Bounce, GameData, GameType, PlinkoRisk, Resolution};
use crate::games::Resolver;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct PlinkoDrop {
    pub amount: Decimal,
    pub risk: PlinkoRisk,
    pub rows: u8,
}

impl Resolver for PlinkoDrop {
    fn game_type(&self) -> GameType {
        GameType::Plinko
    }

    fn wager(&self) -> Decimal {
        self.amount
    }

    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution {
        let path: Vec<Bounce> = (0..self.rows)
            .map(|_| {
                if rng.coin_flip() {
                    Bounce::Right
                } else {
                    Bounce::Left
                }
            })
            .collect();
        let bucket = bucket_for(&path);
        let multiplier = tables
            .plinko
            .multiplier(self.risk, self.rows, bucket)
            .unwrap_or(Decimal::ZERO);

        let data = GameData::Plinko {
            risk: self.risk,
            rows: self.rows,
            path,
            bucket,
        };
        Resolution::with_multiplier(self.amount, multiplier, data)
    }
}

pub fn bucket_for(path: &[Bounce]) -> u8 {
    path.iter().filter(|&&b| b == Bounce::Right).count() as u8
}
