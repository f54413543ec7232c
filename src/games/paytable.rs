//! Payout tables
//!
//! Static multiplier data for every game plus the lookup logic around it.
//! Nothing in here holds state or draws randomness; resolvers combine these
//! tables with the outcome generator.

use crate::config::CasinoConfig;
use crate::games::types::{PlinkoRisk, PocketColor, RouletteBetType, SlotSymbol};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Version stamped on every transaction settled against these tables
pub const PAYTABLE_VERSION: &str = "2026.1";

/// Every game's payout data, built once from configuration
#[derive(Debug, Clone)]
pub struct PayoutTables {
    pub version: String,
    pub slots: SlotsTable,
    pub dice: DiceTable,
    pub roulette: RouletteTable,
    pub plinko: PlinkoTable,
    pub crash: CrashTable,
}

impl PayoutTables {
    pub fn from_config(config: &CasinoConfig) -> Self {
        Self {
            version: PAYTABLE_VERSION.to_string(),
            slots: SlotsTable::default(),
            dice: DiceTable {
                house_numerator: config.dice.house_numerator,
            },
            roulette: RouletteTable,
            plinko: PlinkoTable,
            crash: CrashTable::new(
                config.crash.house_edge,
                config.crash.growth_rate_per_ms,
                config.crash.max_crash_point,
            ),
        }
    }
}

impl Default for PayoutTables {
    fn default() -> Self {
        Self::from_config(&CasinoConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// One reel symbol: draw weight and three-of-a-kind multiplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlotEntry {
    pub symbol: SlotSymbol,
    pub weight: u32,
    pub three_of_a_kind: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotsTable {
    pub entries: Vec<SlotEntry>,
    /// Two matching symbols anywhere on the payline
    pub any_pair: Decimal,
    /// All nine cells show the same symbol; replaces the payline win
    pub full_grid: Decimal,
}

impl Default for SlotsTable {
    fn default() -> Self {
        let entry = |symbol, weight, three_of_a_kind: i64| SlotEntry {
            symbol,
            weight,
            three_of_a_kind: Decimal::new(three_of_a_kind, 0),
        };
        Self {
            entries: vec![
                entry(SlotSymbol::Cherry, 30, 4),
                entry(SlotSymbol::Lemon, 25, 8),
                entry(SlotSymbol::Orange, 20, 15),
                entry(SlotSymbol::Plum, 12, 40),
                entry(SlotSymbol::Bell, 8, 100),
                entry(SlotSymbol::Bar, 4, 400),
                entry(SlotSymbol::Seven, 1, 2500),
            ],
            any_pair: Decimal::new(5, 1),
            full_grid: Decimal::new(10_000, 0),
        }
    }
}

impl SlotsTable {
    pub fn weights(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    pub fn symbol_at(&self, index: usize) -> Option<SlotSymbol> {
        self.entries.get(index).map(|e| e.symbol)
    }

    pub fn three_of_a_kind(&self, symbol: SlotSymbol) -> Decimal {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.three_of_a_kind)
            .unwrap_or(Decimal::ZERO)
    }

    /// Analytic return-to-player of the table
    pub fn expected_return(&self) -> f64 {
        let total: u32 = self.entries.iter().map(|e| e.weight).sum();
        if total == 0 {
            return 0.0;
        }
        let any_pair = self.any_pair.to_f64().unwrap_or(0.0);
        let full_grid = self.full_grid.to_f64().unwrap_or(0.0);

        self.entries
            .iter()
            .map(|e| {
                let p = e.weight as f64 / total as f64;
                let triple = e.three_of_a_kind.to_f64().unwrap_or(0.0);
                let p_grid = p.powi(9);
                let p_triple = p.powi(3) - p_grid;
                let p_pair = 3.0 * p * p * (1.0 - p);
                p_grid * full_grid + p_triple * triple + p_pair * any_pair
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Dice
// ---------------------------------------------------------------------------

/// Roll 1..=100, win on `roll <= target`, pays `house_numerator / target`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiceTable {
    pub house_numerator: u32,
}

impl DiceTable {
    pub const ROLL_MIN: u32 = 1;
    pub const ROLL_MAX: u32 = 100;

    /// Multiplier truncated to 4 decimal places. Zero target yields zero.
    pub fn multiplier(&self, target: u8) -> Decimal {
        if target == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.house_numerator) / Decimal::from(target))
            .round_dp_with_strategy(4, RoundingStrategy::ToZero)
    }

    pub fn win_chance(&self, target: u8) -> f64 {
        target.min(100) as f64 / 100.0
    }
}

// ---------------------------------------------------------------------------
// Roulette
// ---------------------------------------------------------------------------

/// Pocket order of the single-zero European wheel, clockwise from zero
pub const EUROPEAN_WHEEL: [u8; 37] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouletteTable;

impl RouletteTable {
    pub const MAX_NUMBER: u8 = 36;

    pub fn color(&self, number: u8) -> PocketColor {
        if number == 0 {
            PocketColor::Green
        } else if RED_NUMBERS.contains(&number) {
            PocketColor::Red
        } else {
            PocketColor::Black
        }
    }

    /// Quoted odds, e.g. 35 for "35 to 1"
    pub fn payout_ratio(&self, bet_type: RouletteBetType) -> u32 {
        match bet_type {
            RouletteBetType::Straight => 35,
            RouletteBetType::Split => 17,
            RouletteBetType::Dozen | RouletteBetType::Column => 2,
            RouletteBetType::Red
            | RouletteBetType::Black
            | RouletteBetType::Even
            | RouletteBetType::Odd
            | RouletteBetType::Low
            | RouletteBetType::High => 1,
        }
    }

    /// Total return on a winning bet, stake included
    pub fn multiplier(&self, bet_type: RouletteBetType) -> Decimal {
        Decimal::from(self.payout_ratio(bet_type) + 1)
    }
}

// ---------------------------------------------------------------------------
// Plinko
// ---------------------------------------------------------------------------

// Multipliers in tenths, indexed [rows - 8][bucket]
const PLINKO_LOW: [&[u16]; 9] = [
    &[56, 21, 11, 10, 5, 10, 11, 21, 56],
    &[56, 20, 16, 10, 7, 7, 10, 16, 20, 56],
    &[89, 30, 14, 11, 10, 5, 10, 11, 14, 30, 89],
    &[84, 30, 19, 13, 10, 7, 7, 10, 13, 19, 30, 84],
    &[100, 30, 16, 14, 11, 10, 5, 10, 11, 14, 16, 30, 100],
    &[81, 40, 30, 19, 12, 9, 7, 7, 9, 12, 19, 30, 40, 81],
    &[71, 40, 19, 14, 13, 11, 10, 5, 10, 11, 13, 14, 19, 40, 71],
    &[150, 80, 30, 20, 15, 11, 10, 7, 7, 10, 11, 15, 20, 30, 80, 150],
    &[160, 90, 20, 14, 14, 12, 11, 10, 5, 10, 11, 12, 14, 14, 20, 90, 160],
];

const PLINKO_MEDIUM: [&[u16]; 9] = [
    &[130, 30, 13, 7, 4, 7, 13, 30, 130],
    &[180, 40, 17, 9, 5, 5, 9, 17, 40, 180],
    &[220, 50, 20, 14, 6, 4, 6, 14, 20, 50, 220],
    &[240, 60, 30, 18, 7, 5, 5, 7, 18, 30, 60, 240],
    &[330, 110, 40, 20, 11, 6, 3, 6, 11, 20, 40, 110, 330],
    &[430, 130, 60, 30, 13, 7, 4, 4, 7, 13, 30, 60, 130, 430],
    &[580, 150, 70, 40, 19, 10, 5, 2, 5, 10, 19, 40, 70, 150, 580],
    &[880, 180, 110, 50, 30, 13, 5, 3, 3, 5, 13, 30, 50, 110, 180, 880],
    &[1100, 410, 100, 50, 30, 15, 10, 5, 3, 5, 10, 15, 30, 50, 100, 410, 1100],
];

const PLINKO_HIGH: [&[u16]; 9] = [
    &[290, 40, 15, 3, 2, 3, 15, 40, 290],
    &[430, 70, 20, 6, 2, 2, 6, 20, 70, 430],
    &[760, 100, 30, 9, 3, 2, 3, 9, 30, 100, 760],
    &[1200, 140, 52, 14, 4, 2, 2, 4, 14, 52, 140, 1200],
    &[1700, 240, 81, 20, 7, 2, 2, 2, 7, 20, 81, 240, 1700],
    &[2600, 370, 110, 40, 10, 2, 2, 2, 2, 10, 40, 110, 370, 2600],
    &[4200, 560, 180, 50, 19, 3, 2, 2, 2, 3, 19, 50, 180, 560, 4200],
    &[6200, 830, 270, 80, 30, 5, 2, 2, 2, 2, 5, 30, 80, 270, 830, 6200],
    &[10000, 1300, 260, 90, 40, 20, 2, 2, 2, 2, 2, 20, 40, 90, 260, 1300, 10000],
];

/// Bucket multipliers per (risk, rows). The bucket is the number of rightward
/// bounces, so it follows Binomial(rows, 1/2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlinkoTable;

impl PlinkoTable {
    pub const MIN_ROWS: u8 = 8;
    pub const MAX_ROWS: u8 = 16;

    /// Raw tenths for one board, `rows + 1` buckets
    pub fn tenths(&self, risk: PlinkoRisk, rows: u8) -> Option<&'static [u16]> {
        if !(Self::MIN_ROWS..=Self::MAX_ROWS).contains(&rows) {
            return None;
        }
        let index = (rows - Self::MIN_ROWS) as usize;
        Some(match risk {
            PlinkoRisk::Low => PLINKO_LOW[index],
            PlinkoRisk::Medium => PLINKO_MEDIUM[index],
            PlinkoRisk::High => PLINKO_HIGH[index],
        })
    }

    pub fn multipliers(&self, risk: PlinkoRisk, rows: u8) -> Option<Vec<Decimal>> {
        self.tenths(risk, rows)
            .map(|row| row.iter().map(|&t| Decimal::new(t as i64, 1)).collect())
    }

    pub fn multiplier(&self, risk: PlinkoRisk, rows: u8, bucket: u8) -> Option<Decimal> {
        self.tenths(risk, rows)?
            .get(bucket as usize)
            .map(|&t| Decimal::new(t as i64, 1))
    }

    /// Binomial expected return of one board
    pub fn expected_return(&self, risk: PlinkoRisk, rows: u8) -> Option<f64> {
        let row = self.tenths(risk, rows)?;
        let n = rows as u32;
        let denominator = 2f64.powi(n as i32);
        let ev = row
            .iter()
            .enumerate()
            .map(|(k, &t)| binomial(n, k as u32) * (t as f64 / 10.0) / denominator)
            .sum();
        Some(ev)
    }
}

fn binomial(n: u32, k: u32) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

// ---------------------------------------------------------------------------
// Crash
// ---------------------------------------------------------------------------

/// Crash-point distribution and the shared multiplier-over-time curve.
///
/// The crash point is `floor(100 * (1 - edge) / (1 - u)) / 100` for uniform
/// `u`, clamped to `[1.00, max_crash_point]`. `P(crash > m)` is then close to
/// `(1 - edge) / m`, so cashing out at any fixed target returns `1 - edge`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashTable {
    pub house_edge: f64,
    pub growth_rate_per_ms: f64,
    max_hundredths: i64,
}

impl CrashTable {
    const MIN_HUNDREDTHS: i64 = 100;

    pub fn new(house_edge: f64, growth_rate_per_ms: f64, max_crash_point: Decimal) -> Self {
        let max_hundredths = (max_crash_point * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(i64::MAX)
            .max(Self::MIN_HUNDREDTHS);
        Self {
            house_edge,
            growth_rate_per_ms,
            max_hundredths,
        }
    }

    pub fn max_crash_point(&self) -> Decimal {
        Decimal::new(self.max_hundredths, 2)
    }

    /// Map a uniform draw in [0, 1) to a crash point with 2 decimal places
    pub fn crash_point_from_uniform(&self, u: f64) -> Decimal {
        let tail = (1.0 - u).max(f64::MIN_POSITIVE);
        let raw = ((1.0 - self.house_edge) * 100.0 / tail).floor();
        Decimal::new(self.clamp_hundredths(raw), 2)
    }

    /// Server-side multiplier `e^(rate * t)`, truncated to 2 decimal places
    pub fn multiplier_at(&self, elapsed_ms: i64) -> Decimal {
        let elapsed = elapsed_ms.max(0) as f64;
        let raw = ((self.growth_rate_per_ms * elapsed).exp() * 100.0).floor();
        Decimal::new(self.clamp_hundredths(raw), 2)
    }

    /// Smallest elapsed time at which the curve shows at least `multiplier`
    pub fn elapsed_ms_to_reach(&self, multiplier: Decimal) -> i64 {
        let target = multiplier.to_f64().unwrap_or(1.0).max(1.0);
        if self.growth_rate_per_ms <= 0.0 {
            return i64::MAX;
        }
        let mut ms = (target.ln() / self.growth_rate_per_ms).ceil() as i64;
        // float rounding can leave the floored curve one hundredth short
        while self.multiplier_at(ms) < multiplier && ms < i64::MAX / 2 {
            ms += 1;
        }
        ms
    }

    /// Return to a player who always cashes out at `target`
    pub fn expected_return_at(&self, target: Decimal) -> f64 {
        let target_hundredths = (target * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(i64::MAX);
        if target_hundredths >= self.max_hundredths {
            return 0.0;
        }
        // crash_point > target  <=>  floor(100(1-e)/(1-u)) >= target_hundredths + 1
        let survive = ((1.0 - self.house_edge) * 100.0 / (target_hundredths + 1) as f64).min(1.0);
        target_hundredths as f64 / 100.0 * survive
    }

    fn clamp_hundredths(&self, raw: f64) -> i64 {
        if raw.is_nan() {
            return Self::MIN_HUNDREDTHS;
        }
        raw.clamp(Self::MIN_HUNDREDTHS as f64, self.max_hundredths as f64) as i64
    }
}
