//! Bet validation
//!
//! Runs before any balance mutation or random draw. Checks go in a fixed
//! order: amount bounds, then funds, then game-specific parameters.

use crate::config::CasinoConfig;
use crate::errors::{CasinoError, CasinoResult, ValidationError};
use crate::games::paytable::RouletteTable;
use crate::games::roulette::is_split_adjacent;
use crate::games::types::{RouletteBet, RouletteBetType};
use crate::games::{BetRequest, Resolver};
use rust_decimal::Decimal;

const MAX_AMOUNT_SCALE: u32 = 2;

pub struct BetValidator<'a> {
    config: &'a CasinoConfig,
}

impl<'a> BetValidator<'a> {
    pub fn new(config: &'a CasinoConfig) -> Self {
        Self { config }
    }

    /// Validate a single-shot bet against the caller's balance, returning the
    /// total amount to debit.
    pub fn validate(&self, request: &BetRequest, balance: Decimal) -> CasinoResult<Decimal> {
        if let BetRequest::Roulette(spin) = request {
            self.check_roulette_amounts(&spin.bets)?;
        }
        let wager = request.wager();
        self.check_amount(wager)?;
        self.check_funds(wager, balance)?;

        match request {
            BetRequest::Slots(_) => {}
            BetRequest::Dice(bet) => self.check_dice_target(bet.target)?,
            BetRequest::Roulette(spin) => self.check_roulette_bets(&spin.bets)?,
            BetRequest::Plinko(drop) => self.check_plinko_rows(drop.rows)?,
        }
        Ok(wager)
    }

    pub fn validate_crash_start(
        &self,
        amount: Decimal,
        auto_cashout: Option<Decimal>,
        balance: Decimal,
    ) -> CasinoResult<()> {
        self.check_amount(amount)?;
        self.check_funds(amount, balance)?;
        self.check_auto_cashout(auto_cashout)?;
        Ok(())
    }

    pub fn validate_blackjack_start(&self, amount: Decimal, balance: Decimal) -> CasinoResult<()> {
        self.check_amount(amount)?;
        self.check_funds(amount, balance)
    }

    pub fn check_amount(&self, amount: Decimal) -> Result<(), ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        if amount.normalize().scale() > MAX_AMOUNT_SCALE {
            return Err(ValidationError::TooPrecise(amount));
        }
        let betting = &self.config.betting;
        if amount < betting.min_bet {
            return Err(ValidationError::BelowMinimum {
                amount,
                min: betting.min_bet,
            });
        }
        if amount > betting.max_bet {
            return Err(ValidationError::AboveMaximum {
                amount,
                max: betting.max_bet,
            });
        }
        Ok(())
    }

    pub fn check_funds(&self, amount: Decimal, balance: Decimal) -> CasinoResult<()> {
        if balance < amount {
            return Err(CasinoError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }
        Ok(())
    }

    pub fn check_dice_target(&self, target: u8) -> Result<(), ValidationError> {
        let dice = &self.config.dice;
        if target <= dice.target_low || target >= dice.target_high {
            return Err(ValidationError::DiceTargetOutOfRange {
                target,
                low: dice.target_low,
                high: dice.target_high,
            });
        }
        Ok(())
    }

    /// Per-bet amount checks; the summed total goes through `check_amount`
    pub fn check_roulette_amounts(&self, bets: &[RouletteBet]) -> Result<(), ValidationError> {
        if bets.is_empty() {
            return Err(ValidationError::NoRouletteBets);
        }
        let max = self.config.betting.max_roulette_bets;
        if bets.len() > max {
            return Err(ValidationError::TooManyRouletteBets {
                count: bets.len(),
                max,
            });
        }
        for bet in bets {
            if bet.amount <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveAmount(bet.amount));
            }
            if bet.amount.normalize().scale() > MAX_AMOUNT_SCALE {
                return Err(ValidationError::TooPrecise(bet.amount));
            }
        }
        Ok(())
    }

    /// Bet type must agree with the numbers supplied
    pub fn check_roulette_bets(&self, bets: &[RouletteBet]) -> Result<(), ValidationError> {
        for bet in bets {
            check_roulette_bet(bet)?;
        }
        Ok(())
    }

    pub fn check_plinko_rows(&self, rows: u8) -> Result<(), ValidationError> {
        let plinko = &self.config.plinko;
        if rows < plinko.min_rows || rows > plinko.max_rows {
            return Err(ValidationError::PlinkoRowsOutOfRange {
                rows,
                min: plinko.min_rows,
                max: plinko.max_rows,
            });
        }
        Ok(())
    }

    /// Auto targets are multipliers, so they share the crash curve's 2dp grid
    pub fn check_auto_cashout(&self, auto_cashout: Option<Decimal>) -> Result<(), ValidationError> {
        let Some(requested) = auto_cashout else {
            return Ok(());
        };
        let crash = &self.config.crash;
        if requested < crash.min_auto_cashout {
            return Err(ValidationError::AutoCashoutTooLow {
                requested,
                min: crash.min_auto_cashout,
            });
        }
        if requested > crash.max_crash_point {
            return Err(ValidationError::AutoCashoutTooHigh {
                requested,
                max: crash.max_crash_point,
            });
        }
        if requested.normalize().scale() > MAX_AMOUNT_SCALE {
            return Err(ValidationError::AutoCashoutTooPrecise(requested));
        }
        Ok(())
    }
}

fn check_roulette_bet(bet: &RouletteBet) -> Result<(), ValidationError> {
    let expected = match bet.bet_type {
        RouletteBetType::Straight | RouletteBetType::Dozen | RouletteBetType::Column => 1,
        RouletteBetType::Split => 2,
        RouletteBetType::Red
        | RouletteBetType::Black
        | RouletteBetType::Even
        | RouletteBetType::Odd
        | RouletteBetType::Low
        | RouletteBetType::High => 0,
    };
    if bet.numbers.len() != expected {
        return Err(ValidationError::RouletteNumberCount {
            bet_type: bet.bet_type.to_string(),
            expected,
            actual: bet.numbers.len(),
        });
    }

    match bet.bet_type {
        RouletteBetType::Straight | RouletteBetType::Split => {
            if let Some(&n) = bet.numbers.iter().find(|&&n| n > RouletteTable::MAX_NUMBER) {
                return Err(ValidationError::RouletteNumberOutOfRange(n));
            }
            if let &[a, b] = bet.numbers.as_slice() {
                if !is_split_adjacent(a, b) {
                    return Err(ValidationError::RouletteSplitNotAdjacent(a, b));
                }
            }
        }
        RouletteBetType::Dozen | RouletteBetType::Column => {
            let selector = bet.numbers[0];
            if !(1..=3).contains(&selector) {
                return Err(ValidationError::RouletteSelectorOutOfRange {
                    bet_type: bet.bet_type.to_string(),
                    selector,
                });
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{DiceBet, PlinkoDrop, RouletteSpin, SlotsBet};
    use crate::games::types::PlinkoRisk;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn roulette(bets: Vec<(RouletteBetType, Vec<u8>, &str)>) -> BetRequest {
        BetRequest::Roulette(RouletteSpin {
            bets: bets
                .into_iter()
                .map(|(bet_type, numbers, amount)| RouletteBet {
                    bet_type,
                    numbers,
                    amount: dec(amount),
                })
                .collect(),
        })
    }

    #[test]
    fn test_amount_bounds() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);

        assert!(validator.check_amount(dec("1")).is_ok());
        assert!(matches!(
            validator.check_amount(Decimal::ZERO),
            Err(ValidationError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            validator.check_amount(dec("-5")),
            Err(ValidationError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            validator.check_amount(dec("0.001")),
            Err(ValidationError::TooPrecise(_))
        ));
        assert!(matches!(
            validator.check_amount(dec("10000.01")),
            Err(ValidationError::AboveMaximum { .. })
        ));
        // trailing zeros are not extra precision
        assert!(validator.check_amount(dec("2.500")).is_ok());
    }

    #[test]
    fn test_amount_checked_before_funds() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);
        let bet = BetRequest::Slots(SlotsBet { amount: dec("-1") });

        assert!(matches!(
            validator.validate(&bet, Decimal::ZERO),
            Err(CasinoError::Validation(ValidationError::NonPositiveAmount(_)))
        ));
    }

    #[test]
    fn test_funds_checked_before_game_parameters() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);
        let bet = BetRequest::Dice(DiceBet {
            amount: dec("100"),
            target: 0,
        });

        assert!(matches!(
            validator.validate(&bet, dec("50")),
            Err(CasinoError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            validator.validate(&bet, dec("500")),
            Err(CasinoError::Validation(ValidationError::DiceTargetOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_dice_target_range() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);

        assert!(validator.check_dice_target(1).is_ok());
        assert!(validator.check_dice_target(98).is_ok());
        assert!(validator.check_dice_target(0).is_err());
        assert!(validator.check_dice_target(99).is_err());
        assert!(validator.check_dice_target(100).is_err());
    }

    #[test]
    fn test_roulette_rules() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);
        let balance = dec("1000");

        let ok = roulette(vec![
            (RouletteBetType::Straight, vec![0], "5"),
            (RouletteBetType::Split, vec![8, 11], "5"),
            (RouletteBetType::Red, vec![], "10"),
            (RouletteBetType::Dozen, vec![3], "10"),
        ]);
        assert_eq!(validator.validate(&ok, balance).unwrap(), dec("30"));

        let cases = vec![
            roulette(vec![]),
            roulette(vec![(RouletteBetType::Straight, vec![37], "1")]),
            roulette(vec![(RouletteBetType::Straight, vec![1, 2], "1")]),
            roulette(vec![(RouletteBetType::Split, vec![3, 4], "1")]),
            roulette(vec![(RouletteBetType::Red, vec![1], "1")]),
            roulette(vec![(RouletteBetType::Column, vec![4], "1")]),
            roulette(vec![(RouletteBetType::Odd, vec![], "0")]),
        ];
        for case in cases {
            assert!(
                matches!(validator.validate(&case, balance), Err(CasinoError::Validation(_))),
                "{:?} should be rejected",
                case
            );
        }
    }

    #[test]
    fn test_roulette_total_is_bounded() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);

        let over = roulette(vec![
            (RouletteBetType::Red, vec![], "6000"),
            (RouletteBetType::Black, vec![], "6000"),
        ]);
        assert!(matches!(
            validator.validate(&over, dec("100000")),
            Err(CasinoError::Validation(ValidationError::AboveMaximum { .. }))
        ));

        let too_many = roulette(vec![(RouletteBetType::Red, vec![], "1"); 21]);
        assert!(matches!(
            validator.validate(&too_many, dec("1000")),
            Err(CasinoError::Validation(ValidationError::TooManyRouletteBets { .. }))
        ));
    }

    #[test]
    fn test_plinko_rows() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);
        let drop = |rows| {
            BetRequest::Plinko(PlinkoDrop {
                amount: dec("1"),
                risk: PlinkoRisk::Medium,
                rows,
            })
        };

        assert!(validator.validate(&drop(8), dec("10")).is_ok());
        assert!(validator.validate(&drop(16), dec("10")).is_ok());
        assert!(validator.validate(&drop(7), dec("10")).is_err());
        assert!(validator.validate(&drop(17), dec("10")).is_err());
    }

    #[test]
    fn test_auto_cashout_minimum() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);

        assert!(validator.validate_crash_start(dec("1"), None, dec("10")).is_ok());
        assert!(validator.validate_crash_start(dec("1"), Some(dec("1.01")), dec("10")).is_ok());
        assert!(matches!(
            validator.validate_crash_start(dec("1"), Some(dec("1.00")), dec("10")),
            Err(CasinoError::Validation(ValidationError::AutoCashoutTooLow { .. }))
        ));
    }

    #[test]
    fn test_auto_cashout_grid_and_ceiling() {
        let config = CasinoConfig::default();
        let validator = BetValidator::new(&config);

        assert!(validator.check_auto_cashout(Some(dec("2.50"))).is_ok());
        assert!(validator.check_auto_cashout(Some(dec("10000"))).is_ok());
        assert!(matches!(
            validator.check_auto_cashout(Some(dec("1.015"))),
            Err(ValidationError::AutoCashoutTooPrecise(_))
        ));
        assert!(matches!(
            validator.check_auto_cashout(Some(dec("10000.01"))),
            Err(ValidationError::AutoCashoutTooHigh { .. })
        ));
    }
}
