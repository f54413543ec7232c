//! Shared traits and interfaces
//!
//! The engine only talks to storage and time through these traits so the
//! persistent store and the wall clock can be swapped in tests.

use crate::common::types::UserAccount;
use crate::errors::StorageResult;
use crate::games::types::{GameType, RoundState, RoundStatus, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Persistent store for balances, transaction history and live rounds
#[async_trait]
pub trait CasinoRepository: Send + Sync {
    /// Fetch a user's account
    async fn get_user(&self, user_id: &str) -> StorageResult<Option<UserAccount>>;

    /// Atomically add `delta` (may be negative) to the balance and return the
    /// new balance. Fails with `InsufficientBalance` rather than going below zero.
    async fn adjust_balance(&self, user_id: &str, delta: Decimal) -> StorageResult<Decimal>;

    /// Append an immutable transaction record
    async fn create_transaction(&self, record: &TransactionRecord) -> StorageResult<()>;

    /// Most recent transactions first
    async fn list_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<TransactionRecord>>;

    /// The transaction a multi-step round settled into, if it has settled
    async fn get_round_transaction(&self, round_id: Uuid)
        -> StorageResult<Option<TransactionRecord>>;

    async fn get_round(&self, round_id: Uuid) -> StorageResult<Option<RoundState>>;

    /// The active round at `(user, game)`, if any
    async fn get_active_round(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> StorageResult<Option<RoundState>>;

    /// Store a new active round. Fails with `Conflict` if one already exists
    /// at the same `(user, game)` key.
    async fn insert_round(&self, round: &RoundState) -> StorageResult<()>;

    /// Overwrite an existing round's state
    async fn save_round(&self, round: &RoundState) -> StorageResult<()>;

    /// Compare-and-set on the round status. Returns `true` only for the caller
    /// that moved the round out of `from`.
    async fn transition_round(
        &self,
        round_id: Uuid,
        from: RoundStatus,
        to: RoundStatus,
    ) -> StorageResult<bool>;

    async fn delete_round(&self, round_id: Uuid) -> StorageResult<()>;

    /// Every round still marked active, for the sweeper
    async fn active_rounds(&self) -> StorageResult<Vec<RoundState>>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
