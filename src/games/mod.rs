//! Game resolution
//!
//! Single-shot games (slots, dice, roulette, plinko) implement [`Resolver`]:
//! one call draws the outcome and prices it. Multi-step games (crash,
//! blackjack) keep a [`RoundPayload`] in the repository and implement
//! [`RoundMachine`] so the engine can settle them when they are next touched.
//! Both seams dispatch over closed enums, so adding a game is a compile error
//! until every match handles it.

pub mod blackjack;
pub mod crash;
pub mod dice;
pub mod paytable;
pub mod plinko;
pub mod rng;
pub mod roulette;
pub mod slots;
pub mod types;
pub mod validator;

use crate::config::CasinoConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use blackjack::{BlackjackAction, BlackjackOutcome, BlackjackRound, Card, Suit};
pub use crash::{CashOut, CrashRound};
pub use dice::DiceBet;
pub use paytable::PayoutTables;
pub use plinko::PlinkoDrop;
pub use rng::OutcomeGenerator;
pub use roulette::RouletteSpin;
pub use slots::SlotsBet;
pub use types::*;
pub use validator::BetValidator;

/// A single-shot game: one draw, one price, no state left behind
pub trait Resolver {
    fn game_type(&self) -> GameType;

    /// Total amount debited for this bet
    fn wager(&self) -> Decimal;

    /// Draw the outcome and price it. Must not touch balances.
    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution;
}

/// Every single-shot bet the engine accepts
#[derive(Debug, Clone, PartialEq)]
pub enum BetRequest {
    Slots(SlotsBet),
    Dice(DiceBet),
    Roulette(RouletteSpin),
    Plinko(PlinkoDrop),
}

impl Resolver for BetRequest {
    fn game_type(&self) -> GameType {
        match self {
            BetRequest::Slots(bet) => bet.game_type(),
            BetRequest::Dice(bet) => bet.game_type(),
            BetRequest::Roulette(bet) => bet.game_type(),
            BetRequest::Plinko(bet) => bet.game_type(),
        }
    }

    fn wager(&self) -> Decimal {
        match self {
            BetRequest::Slots(bet) => bet.wager(),
            BetRequest::Dice(bet) => bet.wager(),
            BetRequest::Roulette(bet) => bet.wager(),
            BetRequest::Plinko(bet) => bet.wager(),
        }
    }

    fn resolve(&self, rng: &OutcomeGenerator, tables: &PayoutTables) -> Resolution {
        match self {
            BetRequest::Slots(bet) => bet.resolve(rng, tables),
            BetRequest::Dice(bet) => bet.resolve(rng, tables),
            BetRequest::Roulette(bet) => bet.resolve(rng, tables),
            BetRequest::Plinko(bet) => bet.resolve(rng, tables),
        }
    }
}

/// Everything a round machine may consult when deciding its fate
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    pub round_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub config: &'a CasinoConfig,
    pub tables: &'a PayoutTables,
}

impl<'a> RoundContext<'a> {
    pub fn for_round(
        round: &RoundState,
        now: DateTime<Utc>,
        config: &'a CasinoConfig,
        tables: &'a PayoutTables,
    ) -> Self {
        Self {
            round_id: round.round_id,
            started_at: round.started_at,
            updated_at: round.updated_at,
            now,
            config,
            tables,
        }
    }

    /// Milliseconds since the round started, never negative
    pub fn elapsed_ms(&self) -> i64 {
        (self.now - self.started_at).num_milliseconds().max(0)
    }

    /// Seconds since the last player action
    pub fn idle_secs(&self) -> i64 {
        (self.now - self.updated_at).num_seconds().max(0)
    }
}

/// Terminal state a round reached and the outcome to settle
#[derive(Debug, Clone, PartialEq)]
pub struct RoundEnd {
    pub status: RoundStatus,
    pub resolution: Resolution,
}

/// A multi-step game stored between requests
pub trait RoundMachine {
    /// Terminal outcome reached without player input (crash, auto cash-out,
    /// idle timeout), if any.
    fn poll(&self, ctx: &RoundContext<'_>) -> Option<RoundEnd>;

    /// Client-safe view of the live round
    fn snapshot(&self, ctx: &RoundContext<'_>) -> RoundSnapshot;
}

impl RoundMachine for RoundPayload {
    fn poll(&self, ctx: &RoundContext<'_>) -> Option<RoundEnd> {
        match self {
            RoundPayload::Crash(round) => round.poll(ctx),
            RoundPayload::Blackjack(round) => round.poll(ctx),
        }
    }

    fn snapshot(&self, ctx: &RoundContext<'_>) -> RoundSnapshot {
        match self {
            RoundPayload::Crash(round) => round.snapshot(ctx),
            RoundPayload::Blackjack(round) => round.snapshot(ctx),
        }
    }
}
