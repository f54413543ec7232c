//! Crash round machine
//!
//! The crash point is drawn when the round starts and never leaves the server.
//! Every decision compares the server-side curve at the current instant with
//! that point; whichever of cash-out, auto cash-out or the crash is reached
//! first decides the round.

use crate::games::paytable::CrashTable;
use crate::games::rng::OutcomeGenerator;
use crate::games::types::{CrashView, GameData, Resolution, RoundSnapshot, RoundStatus};
use crate::games::{RoundContext, RoundEnd, RoundMachine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashRound {
    pub amount_wagered: Decimal,
    pub crash_point: Decimal,
    pub auto_cashout: Option<Decimal>,
}

/// Result of a player cash-out request
#[derive(Debug, Clone, PartialEq)]
pub enum CashOut {
    /// Paid at the current multiplier, or at the auto target if that was hit first
    Honored(RoundEnd),
    /// The curve reached the crash point first; the carried end is the loss to settle
    Crashed(RoundEnd),
}

impl CrashRound {
    pub fn start(
        amount: Decimal,
        auto_cashout: Option<Decimal>,
        rng: &OutcomeGenerator,
        table: &CrashTable,
    ) -> Self {
        Self {
            amount_wagered: amount,
            crash_point: table.crash_point_from_uniform(rng.uniform()),
            auto_cashout,
        }
    }

    pub fn current_multiplier(&self, ctx: &RoundContext<'_>) -> Decimal {
        ctx.tables.crash.multiplier_at(ctx.elapsed_ms())
    }

    pub fn cash_out(&self, ctx: &RoundContext<'_>) -> CashOut {
        match self.poll(ctx) {
            Some(end) if end.status == RoundStatus::Resolved => CashOut::Honored(end),
            Some(end) => CashOut::Crashed(end),
            None => CashOut::Honored(self.won_at(self.current_multiplier(ctx))),
        }
    }

    fn won_at(&self, multiplier: Decimal) -> RoundEnd {
        RoundEnd {
            status: RoundStatus::Resolved,
            resolution: Resolution::with_multiplier(
                self.amount_wagered,
                multiplier,
                self.game_data(Some(multiplier)),
            ),
        }
    }

    fn crashed(&self) -> RoundEnd {
        RoundEnd {
            status: RoundStatus::Expired,
            resolution: Resolution::loss(self.amount_wagered, self.game_data(None)),
        }
    }

    fn game_data(&self, cashout_multiplier: Option<Decimal>) -> GameData {
        GameData::Crash {
            crash_point: self.crash_point,
            cashout_multiplier,
            auto_cashout: self.auto_cashout,
        }
    }
}

impl RoundMachine for CrashRound {
    fn poll(&self, ctx: &RoundContext<'_>) -> Option<RoundEnd> {
        let current = self.current_multiplier(ctx);

        if let Some(auto) = self.auto_cashout {
            if auto < self.crash_point && current >= auto {
                return Some(self.won_at(auto));
            }
        }
        if current >= self.crash_point {
            return Some(self.crashed());
        }
        None
    }

    fn snapshot(&self, ctx: &RoundContext<'_>) -> RoundSnapshot {
        RoundSnapshot::Crash(CrashView {
            round_id: ctx.round_id,
            amount_wagered: self.amount_wagered,
            started_at: ctx.started_at,
            growth_rate_per_ms: ctx.tables.crash.growth_rate_per_ms,
            current_multiplier: self.current_multiplier(ctx),
            auto_cashout: self.auto_cashout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CasinoConfig;
    use crate::games::paytable::PayoutTables;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn round(crash_point: i64, auto: Option<i64>) -> CrashRound {
        CrashRound {
            amount_wagered: Decimal::new(100, 0),
            crash_point: Decimal::new(crash_point, 2),
            auto_cashout: auto.map(|a| Decimal::new(a, 2)),
        }
    }

    fn at<'a>(elapsed_ms: i64, config: &'a CasinoConfig, tables: &'a PayoutTables) -> RoundContext<'a> {
        let started_at = Utc::now();
        RoundContext {
            round_id: Uuid::new_v4(),
            started_at,
            updated_at: started_at,
            now: started_at + Duration::milliseconds(elapsed_ms),
            config,
            tables,
        }
    }

    #[test]
    fn test_cash_out_below_crash_point_pays_current() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let crash = round(300, None);
        let ms = tables.crash.elapsed_ms_to_reach(Decimal::new(2, 0));
        let ctx = at(ms, &config, &tables);

        match crash.cash_out(&ctx) {
            CashOut::Honored(end) => {
                assert_eq!(end.status, RoundStatus::Resolved);
                assert_eq!(end.resolution.multiplier, crash.current_multiplier(&ctx));
                assert_eq!(
                    end.resolution.payout,
                    Decimal::new(100, 0) * end.resolution.multiplier
                );
            }
            other => panic!("expected honored cash-out, got {:?}", other),
        }
    }

    #[test]
    fn test_cash_out_at_or_past_crash_point_fails() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let crash = round(150, None);
        let ms = tables.crash.elapsed_ms_to_reach(Decimal::new(150, 2));

        match crash.cash_out(&at(ms, &config, &tables)) {
            CashOut::Crashed(end) => {
                assert_eq!(end.status, RoundStatus::Expired);
                assert_eq!(end.resolution.payout, Decimal::ZERO);
            }
            other => panic!("expected crash, got {:?}", other),
        }
        assert!(crash.poll(&at(ms - 1, &config, &tables)).is_none());
    }

    #[test]
    fn test_auto_cashout_wins_even_when_touched_late() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let crash = round(500, Some(200));

        let end = crash.poll(&at(600_000, &config, &tables)).unwrap();
        assert_eq!(end.status, RoundStatus::Resolved);
        assert_eq!(end.resolution.multiplier, Decimal::new(2, 0));
        assert_eq!(end.resolution.payout, Decimal::new(200, 0));
    }

    #[test]
    fn test_auto_cashout_above_crash_point_loses() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let crash = round(180, Some(200));

        let end = crash.poll(&at(600_000, &config, &tables)).unwrap();
        assert_eq!(end.status, RoundStatus::Expired);
        assert_eq!(end.resolution.payout, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_hides_crash_point() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let crash = round(777, None);

        let snapshot = crash.snapshot(&at(0, &config, &tables));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("crash_point"));
        assert!(!json.contains("7.77"));
    }
}
