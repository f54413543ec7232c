//! Single-zero roulette
//!
//! A round is a set of bets scored against one spin. Each bet is priced on its
//! own and the payouts are summed before anything is credited.

use crate::games::paytable::{PayoutTables, RouletteTable, EUROPEAN_WHEEL};
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{
    GameData, GameType, PocketColor, Resolution, RouletteBet, RouletteBetType, ScoredRouletteBet,
};
use crate::games::Resolver;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct RouletteSpin {
    pub bets: Vec<RouletteBet>,
}

impl Resolver for RouletteSpin {
    fn game_type(&self) -> GameType {
        GameType::Roulette
    }

    fn wager(&self) -> Decimal {
        self.bets.iter().map(|bet| bet.amount).sum()
    }

    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution {
        let pocket_index = rng.uniform_int(0, (EUROPEAN_WHEEL.len() - 1) as u32) as usize;
        let number = EUROPEAN_WHEEL[pocket_index];
        let table = &tables.roulette;

        let scored: Vec<ScoredRouletteBet> = self
            .bets
            .iter()
            .map(|bet| ScoredRouletteBet {
                bet_type: bet.bet_type,
                numbers: bet.numbers.clone(),
                amount: bet.amount,
                payout: if bet_wins(bet, number, table) {
                    bet.amount * table.multiplier(bet.bet_type)
                } else {
                    Decimal::ZERO
                },
            })
            .collect();

        let wagered = self.wager();
        let payout: Decimal = scored.iter().map(|bet| bet.payout).sum();
        let multiplier = if wagered.is_zero() {
            Decimal::ZERO
        } else {
            (payout / wagered).round_dp_with_strategy(4, RoundingStrategy::ToZero)
        };

        Resolution {
            wagered,
            payout,
            multiplier,
            data: GameData::Roulette {
                pocket_index: pocket_index as u8,
                number,
                color: table.color(number),
                bets: scored,
            },
        }
    }
}

/// Whether `bet` wins when the ball lands on `number`. Zero only pays bets
/// that name it explicitly.
pub fn bet_wins(bet: &RouletteBet, number: u8, table: &RouletteTable) -> bool {
    let selector = bet.numbers.first().copied().unwrap_or(0);
    match bet.bet_type {
        RouletteBetType::Straight | RouletteBetType::Split => bet.numbers.contains(&number),
        _ if number == 0 => false,
        RouletteBetType::Red => table.color(number) == PocketColor::Red,
        RouletteBetType::Black => table.color(number) == PocketColor::Black,
        RouletteBetType::Even => number % 2 == 0,
        RouletteBetType::Odd => number % 2 == 1,
        RouletteBetType::Low => (1..=18).contains(&number),
        RouletteBetType::High => (19..=36).contains(&number),
        RouletteBetType::Dozen => (number - 1) / 12 + 1 == selector,
        RouletteBetType::Column => (number - 1) % 3 + 1 == selector,
    }
}

/// Two numbers share an edge on the betting layout
pub fn is_split_adjacent(a: u8, b: u8) -> bool {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    if low == 0 {
        return (1..=3).contains(&high);
    }
    if high > RouletteTable::MAX_NUMBER {
        return false;
    }
    high == low + 3 || (high == low + 1 && low % 3 != 0)
}
