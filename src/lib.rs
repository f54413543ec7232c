//! Casino Engine - wagering and round resolution for a virtual-currency casino
//!
//! Accepts bets on slots, dice, roulette, plinko, crash and blackjack, draws
//! outcomes from a single seedable generator, prices them against versioned
//! payout tables and settles them through an atomic balance ledger. Crash and
//! blackjack rounds live in the repository between requests and are settled
//! exactly once, whichever of player action, timeout or sweep gets there first.

pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod storage;
pub mod telemetry;

pub use common::{CasinoRepository, Clock, ManualClock, SystemClock, UserAccount};
pub use config::{CasinoConfig, ConfigLoader};
pub use engine::{CasinoEngine, EngineBuilder, SweeperHandle};
pub use errors::{CasinoError, CasinoResult, ConfigurationError, StorageError, ValidationError};
pub use games::{
    BetReceipt, BlackjackAction, GameData, GameType, OutcomeGenerator, PayoutTables, PlinkoRisk,
    RouletteBet, RouletteBetType, RoundSnapshot, RoundUpdate, TransactionRecord,
};
pub use ledger::BalanceLedger;
pub use storage::InMemoryRepository;
