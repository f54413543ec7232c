//! 3x3 slots with a single centre payline

use crate::games::paytable::{PayoutTables, SlotsTable};
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{GameData, GameType, Resolution, SlotSymbol, SlotsWin};
use crate::games::Resolver;
use rust_decimal::Decimal;

pub type SlotsGrid = [[SlotSymbol; 3]; 3];

#[derive(Debug, Clone, PartialEq)]
pub struct SlotsBet {
    pub amount: Decimal,
}

impl Resolver for SlotsBet {
    fn game_type(&self) -> GameType {
        GameType::Slots
    }

    fn wager(&self) -> Decimal {
        self.amount
    }

    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution {
        let grid = spin_grid(rng, &tables.slots);
        let win = evaluate_grid(&grid);
        let data = GameData::Slots { grid, win };

        match win_multiplier(win, &tables.slots) {
            Some(multiplier) => Resolution::with_multiplier(self.amount, multiplier, data),
            None => Resolution::loss(self.amount, data),
        }
    }
}

/// Draw every cell independently from the weighted reel strip
pub fn spin_grid(rng: &OutcomeGenerator, table: &SlotsTable) -> SlotsGrid {
    let weights = table.weights();
    let mut grid = [[SlotSymbol::Cherry; 3]; 3];
    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            *cell = rng
                .weighted_pick(&weights)
                .and_then(|index| table.symbol_at(index))
                .unwrap_or(SlotSymbol::Cherry);
        }
    }
    grid
}

pub fn evaluate_grid(grid: &SlotsGrid) -> SlotsWin {
    let first = grid[0][0];
    if grid.iter().flatten().all(|&cell| cell == first) {
        return SlotsWin::FullGrid { symbol: first };
    }

    let [a, b, c] = grid[1];
    if a == b && b == c {
        SlotsWin::ThreeOfAKind { symbol: a }
    } else if a == b || a == c {
        SlotsWin::Pair { symbol: a }
    } else if b == c {
        SlotsWin::Pair { symbol: b }
    } else {
        SlotsWin::Nothing
    }
}

fn win_multiplier(win: SlotsWin, table: &SlotsTable) -> Option<Decimal> {
    match win {
        SlotsWin::FullGrid { .. } => Some(table.full_grid),
        SlotsWin::ThreeOfAKind { symbol } => Some(table.three_of_a_kind(symbol)),
        SlotsWin::Pair { .. } => Some(table.any_pair),
        SlotsWin::Nothing => None,
    }
}
