//! Balance ledger
//!
//! Owns every balance mutation. Debits and credits go through the
//! repository's atomic `adjust_balance`; settlement pairs the credit with the
//! transaction record and undoes the credit if the record cannot be written.
//!
//! The ledger also hands out per-user async locks. The engine holds a user's
//! lock across validate, debit, resolve and settle, which serialises all
//! mutating work for that user while leaving other users fully concurrent.

use crate::common::traits::CasinoRepository;
use crate::errors::{CasinoError, CasinoResult, StorageError};
use crate::games::types::TransactionRecord;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

pub struct BalanceLedger {
    repository: Arc<dyn CasinoRepository>,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BalanceLedger {
    pub fn new(repository: Arc<dyn CasinoRepository>) -> Self {
        Self {
            repository,
            user_locks: DashMap::new(),
        }
    }

    /// Acquire the user's mutation lock. Held for the whole bet lifecycle.
    pub async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop lock entries nobody is holding or waiting on
    pub fn prune_idle_locks(&self) -> usize {
        let before = self.user_locks.len();
        // Holders and waiters each keep a clone of the Arc
        self.user_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.user_locks.len())
    }

    pub async fn balance(&self, user_id: &str) -> CasinoResult<Decimal> {
        self.repository
            .get_user(user_id)
            .await?
            .map(|user| user.balance)
            .ok_or_else(|| CasinoError::UnknownUser(user_id.to_string()))
    }

    /// Atomically remove `amount`; fails with `InsufficientFunds` and leaves
    /// the balance untouched when it does not cover the amount.
    pub async fn debit(&self, user_id: &str, amount: Decimal) -> CasinoResult<Decimal> {
        let balance = self
            .repository
            .adjust_balance(user_id, -amount)
            .await
            .map_err(|e| map_balance_error(user_id, e))?;
        debug!(user_id, %amount, %balance, "debit");
        Ok(balance)
    }

    pub async fn credit(&self, user_id: &str, amount: Decimal) -> CasinoResult<Decimal> {
        let balance = self
            .repository
            .adjust_balance(user_id, amount)
            .await
            .map_err(|e| map_balance_error(user_id, e))?;
        debug!(user_id, %amount, %balance, "credit");
        Ok(balance)
    }

    /// Credit the payout and append the record as one unit. If the record
    /// cannot be written the credit is reversed and the storage error returned.
    pub async fn settle(&self, record: &TransactionRecord) -> CasinoResult<Decimal> {
        let user_id = record.user_id.as_str();
        let balance = if record.payout > Decimal::ZERO {
            self.credit(user_id, record.payout).await?
        } else {
            self.balance(user_id).await?
        };

        if let Err(e) = self.repository.create_transaction(record).await {
            warn!(user_id, transaction_id = %record.id, error = %e, "transaction write failed, reversing credit");
            if record.payout > Decimal::ZERO {
                if let Err(rollback) = self.repository.adjust_balance(user_id, -record.payout).await {
                    error!(user_id, payout = %record.payout, error = %rollback, "credit reversal failed");
                }
            }
            return Err(CasinoError::Persistence(e));
        }
        Ok(balance)
    }

    /// Return a wager whose round could not be completed
    pub async fn refund(&self, user_id: &str, amount: Decimal) {
        match self.repository.adjust_balance(user_id, amount).await {
            Ok(balance) => debug!(user_id, %amount, %balance, "wager refunded"),
            Err(e) => error!(user_id, %amount, error = %e, "wager refund failed"),
        }
    }
}

fn map_balance_error(user_id: &str, error: StorageError) -> CasinoError {
    match error {
        StorageError::InsufficientBalance { balance, requested } => {
            CasinoError::InsufficientFunds { balance, requested }
        }
        StorageError::NotFound(_) => CasinoError::UnknownUser(user_id.to_string()),
        other => CasinoError::Persistence(other),
    }
}
