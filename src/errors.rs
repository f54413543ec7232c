//! Error types for the casino engine
//!
//! Every failure the engine can produce is typed. Callers match on variants,
//! never on message text.

use crate::games::types::GameType;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// Bad bet parameters; nothing was debited or drawn
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Balance too low at debit time
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("A {game_type} round is already active for this user")]
    RoundAlreadyActive { game_type: GameType },

    #[error("Round not found: {0}")]
    RoundNotFound(Uuid),

    /// The rocket crashed before the cash-out was honoured
    #[error("Round already crashed at {crash_point}x")]
    RoundAlreadyCrashed { crash_point: Decimal },

    #[error("Round already resolved: {0}")]
    RoundAlreadyResolved(Uuid),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The repository failed; any debit performed by the operation was rolled back
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl CasinoError {
    /// True when the caller sent something the engine refused, as opposed to
    /// the engine or its store failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CasinoError::Persistence(_) | CasinoError::Configuration(_)
        )
    }
}

/// Bet parameter validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Bet amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Bet amount {amount} is below the minimum of {min}")]
    BelowMinimum { amount: Decimal, min: Decimal },

    #[error("Bet amount {amount} exceeds the maximum of {max}")]
    AboveMaximum { amount: Decimal, max: Decimal },

    #[error("Bet amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),

    #[error("Dice target {target} must be strictly between {low} and {high}")]
    DiceTargetOutOfRange { target: u8, low: u8, high: u8 },

    #[error("Roulette round has no bets")]
    NoRouletteBets,

    #[error("Too many roulette bets: {count} (max {max})")]
    TooManyRouletteBets { count: usize, max: usize },

    #[error("Roulette number {0} is not on the wheel")]
    RouletteNumberOutOfRange(u8),

    #[error("Roulette {bet_type} bet expects {expected} number(s), got {actual}")]
    RouletteNumberCount {
        bet_type: String,
        expected: usize,
        actual: usize,
    },

    #[error("Roulette split numbers {0} and {1} are not adjacent")]
    RouletteSplitNotAdjacent(u8, u8),

    #[error("Roulette {bet_type} selector must be 1, 2 or 3, got {selector}")]
    RouletteSelectorOutOfRange { bet_type: String, selector: u8 },

    #[error("Plinko rows {rows} outside {min}..={max}")]
    PlinkoRowsOutOfRange { rows: u8, min: u8, max: u8 },

    #[error("Auto cash-out {requested} is below the minimum of {min}")]
    AutoCashoutTooLow { requested: Decimal, min: Decimal },

    #[error("Auto cash-out {requested} exceeds the maximum multiplier of {max}")]
    AutoCashoutTooHigh { requested: Decimal, max: Decimal },

    #[error("Auto cash-out {0} has more than 2 decimal places")]
    AutoCashoutTooPrecise(Decimal),

    #[error("Blackjack action not allowed: {0}")]
    IllegalAction(String),
}

/// Repository failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The balance adjustment would have driven the balance negative
    #[error("Balance {balance} cannot cover {requested}")]
    InsufficientBalance { balance: Decimal, requested: Decimal },

    /// Uniqueness violation, e.g. a second active round at the same key
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Configuration and validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;
pub type StorageResult<T> = Result<T, StorageError>;
