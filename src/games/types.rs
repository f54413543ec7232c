use crate::games::blackjack::{BlackjackOutcome, BlackjackRound, Card};
use crate::games::crash::CrashRound;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Slots,
    Dice,
    Roulette,
    Plinko,
    Crash,
    Blackjack,
}

impl GameType {
    /// Games whose rounds span several requests
    pub fn is_multi_step(&self) -> bool {
        matches!(self, GameType::Crash | GameType::Blackjack)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Slots => write!(f, "slots"),
            GameType::Dice => write!(f, "dice"),
            GameType::Roulette => write!(f, "roulette"),
            GameType::Plinko => write!(f, "plinko"),
            GameType::Crash => write!(f, "crash"),
            GameType::Blackjack => write!(f, "blackjack"),
        }
    }
}

/// Net result of a settled round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Push,
}

impl GameOutcome {
    pub fn from_amounts(wagered: Decimal, payout: Decimal) -> Self {
        if payout > wagered {
            GameOutcome::Win
        } else if payout == wagered {
            GameOutcome::Push
        } else {
            GameOutcome::Loss
        }
    }
}

// ---------------------------------------------------------------------------
// Game-specific vocabulary
// ---------------------------------------------------------------------------

/// Reel symbols, lowest to highest value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SlotSymbol {
    Cherry,
    Lemon,
    Orange,
    Plum,
    Bell,
    Bar,
    Seven,
}

/// Which paytable line a spin matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotsWin {
    FullGrid { symbol: SlotSymbol },
    ThreeOfAKind { symbol: SlotSymbol },
    Pair { symbol: SlotSymbol },
    Nothing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RouletteBetType {
    Straight,
    Split,
    Red,
    Black,
    Even,
    Odd,
    Low,
    High,
    Dozen,
    Column,
}

impl fmt::Display for RouletteBetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouletteBetType::Straight => "straight",
            RouletteBetType::Split => "split",
            RouletteBetType::Red => "red",
            RouletteBetType::Black => "black",
            RouletteBetType::Even => "even",
            RouletteBetType::Odd => "odd",
            RouletteBetType::Low => "low",
            RouletteBetType::High => "high",
            RouletteBetType::Dozen => "dozen",
            RouletteBetType::Column => "column",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PocketColor {
    Green,
    Red,
    Black,
}

/// One roulette wager as placed by the player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouletteBet {
    pub bet_type: RouletteBetType,
    /// Covered numbers for inside bets, the 1-based selector for dozen/column,
    /// empty for even-money bets
    #[serde(default)]
    pub numbers: Vec<u8>,
    pub amount: Decimal,
}

/// A roulette bet after scoring against the spin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRouletteBet {
    pub bet_type: RouletteBetType,
    pub numbers: Vec<u8>,
    pub amount: Decimal,
    pub payout: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlinkoRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Bounce {
    Left,
    Right,
}

/// Game-specific data recorded with each transaction (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameData {
    Slots {
        /// Rows top to bottom; the middle row is the payline
        grid: [[SlotSymbol; 3]; 3],
        win: SlotsWin,
    },
    Dice {
        target: u8,
        roll: u8,
    },
    Roulette {
        pocket_index: u8,
        number: u8,
        color: PocketColor,
        bets: Vec<ScoredRouletteBet>,
    },
    Plinko {
        risk: PlinkoRisk,
        rows: u8,
        path: Vec<Bounce>,
        bucket: u8,
    },
    Crash {
        crash_point: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        cashout_multiplier: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_cashout: Option<Decimal>,
    },
    Blackjack {
        player_hand: Vec<Card>,
        dealer_hand: Vec<Card>,
        doubled: bool,
        outcome: BlackjackOutcome,
    },
}

impl GameData {
    pub fn game_type(&self) -> GameType {
        match self {
            GameData::Slots { .. } => GameType::Slots,
            GameData::Dice { .. } => GameType::Dice,
            GameData::Roulette { .. } => GameType::Roulette,
            GameData::Plinko { .. } => GameType::Plinko,
            GameData::Crash { .. } => GameType::Crash,
            GameData::Blackjack { .. } => GameType::Blackjack,
        }
    }
}

/// Outcome computed by a resolver or a round machine, before any balance change
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Total amount at risk, including a blackjack double
    pub wagered: Decimal,
    pub payout: Decimal,
    pub multiplier: Decimal,
    pub data: GameData,
}

impl Resolution {
    pub fn loss(wagered: Decimal, data: GameData) -> Self {
        Self {
            wagered,
            payout: Decimal::ZERO,
            multiplier: Decimal::ZERO,
            data,
        }
    }

    pub fn with_multiplier(wagered: Decimal, multiplier: Decimal, data: GameData) -> Self {
        Self {
            wagered,
            payout: wagered * multiplier,
            multiplier,
            data,
        }
    }
}

/// Immutable record of one settled round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub game_type: GameType,
    pub amount: Decimal,
    pub payout: Decimal,
    /// `payout / amount` on the game's precision grid. Every game pays exactly
    /// `amount * multiplier` except roulette: a multi-bet round pays the sum of
    /// its per-bet payouts and records that ratio truncated to 4dp.
    pub multiplier: Decimal,
    pub is_win: bool,
    pub outcome: GameOutcome,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<Uuid>,
    pub table_version: String,
    pub metadata: GameData,
}

impl TransactionRecord {
    pub fn from_resolution(
        user_id: &str,
        resolution: Resolution,
        timestamp: DateTime<Utc>,
        round_id: Option<Uuid>,
        table_version: &str,
    ) -> Self {
        let outcome = GameOutcome::from_amounts(resolution.wagered, resolution.payout);
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            game_type: resolution.data.game_type(),
            amount: resolution.wagered,
            payout: resolution.payout,
            multiplier: resolution.multiplier,
            is_win: outcome == GameOutcome::Win,
            outcome,
            timestamp,
            round_id,
            table_version: table_version.to_string(),
            metadata: resolution.data,
        }
    }
}

// ---------------------------------------------------------------------------
// Multi-step round state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Active,
    Resolved,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RoundPayload {
    Crash(CrashRound),
    Blackjack(BlackjackRound),
}

impl RoundPayload {
    pub fn game_type(&self) -> GameType {
        match self {
            RoundPayload::Crash(_) => GameType::Crash,
            RoundPayload::Blackjack(_) => GameType::Blackjack,
        }
    }
}

/// Server-side state of a live crash or blackjack round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundState {
    pub round_id: Uuid,
    pub user_id: String,
    pub game_type: GameType,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RoundStatus,
    pub payload: RoundPayload,
}

impl RoundState {
    pub fn new(user_id: &str, payload: RoundPayload, now: DateTime<Utc>) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            game_type: payload.game_type(),
            started_at: now,
            updated_at: now,
            status: RoundStatus::Active,
            payload,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }
}

// ---------------------------------------------------------------------------
// Responses handed back to the API layer
// ---------------------------------------------------------------------------

/// Settled round plus the balance after settlement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BetReceipt {
    pub transaction: TransactionRecord,
    pub balance: Decimal,
}

/// What the client may see of a live crash round. The crash point is never included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashView {
    pub round_id: Uuid,
    pub amount_wagered: Decimal,
    pub started_at: DateTime<Utc>,
    pub growth_rate_per_ms: f64,
    pub current_multiplier: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cashout: Option<Decimal>,
}

/// What the client may see of a live blackjack round. The hole card stays hidden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackjackView {
    pub round_id: Uuid,
    pub amount_wagered: Decimal,
    pub player_hand: Vec<Card>,
    pub player_total: u8,
    pub dealer_up_card: Card,
    pub can_double: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RoundSnapshot {
    Crash(CrashView),
    Blackjack(BlackjackView),
}

/// Response for multi-step game requests (can be in progress or settled)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundUpdate {
    InProgress { round: RoundSnapshot },
    Settled { receipt: BetReceipt },
}

impl RoundUpdate {
    pub fn receipt(&self) -> Option<&BetReceipt> {
        match self {
            RoundUpdate::Settled { receipt } => Some(receipt),
            RoundUpdate::InProgress { .. } => None,
        }
    }

    pub fn snapshot(&self) -> Option<&RoundSnapshot> {
        match self {
            RoundUpdate::InProgress { round } => Some(round),
            RoundUpdate::Settled { .. } => None,
        }
    }
}
