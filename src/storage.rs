//! In-memory repository
//!
//! DashMap-backed implementation of [`CasinoRepository`]. Every balance change
//! happens under the shard lock of the user's entry, so `adjust_balance` is a
//! single check-and-mutate step. Active rounds are indexed by `(user, game)`
//! and the index entry is claimed atomically on insert.

use crate::common::traits::CasinoRepository;
use crate::common::types::UserAccount;
use crate::errors::{StorageError, StorageResult};
use crate::games::types::{GameType, RoundState, RoundStatus, TransactionRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

type RoundKey = (String, GameType);

#[derive(Default)]
pub struct InMemoryRepository {
    users: DashMap<String, UserAccount>,
    // Per-user history, oldest first
    transactions: DashMap<String, Vec<TransactionRecord>>,
    round_transactions: DashMap<Uuid, TransactionRecord>,
    rounds: DashMap<Uuid, RoundState>,
    active_index: DashMap<RoundKey, Uuid>,
    failing_transaction_writes: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding of a user account
    pub fn with_user(self, user_id: &str, balance: Decimal) -> Self {
        self.create_user(user_id, balance);
        self
    }

    pub fn create_user(&self, user_id: &str, balance: Decimal) {
        self.users
            .insert(user_id.to_string(), UserAccount::new(user_id, balance));
    }

    /// Make the next `count` calls to `create_transaction` fail with a backend
    /// error, for exercising rollback paths.
    pub fn fail_next_transaction_writes(&self, count: usize) {
        self.failing_transaction_writes.store(count, Ordering::SeqCst);
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.iter().map(|entry| entry.value().len()).sum()
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_transaction_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn is_live(&self, round_id: &Uuid) -> bool {
        self.rounds
            .get(round_id)
            .map(|round| round.is_active())
            .unwrap_or(false)
    }
}

#[async_trait]
impl CasinoRepository for InMemoryRepository {
    async fn get_user(&self, user_id: &str) -> StorageResult<Option<UserAccount>> {
        Ok(self.users.get(user_id).map(|user| user.clone()))
    }

    async fn adjust_balance(&self, user_id: &str, delta: Decimal) -> StorageResult<Decimal> {
        let mut account = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;

        let next = account.balance + delta;
        if next < Decimal::ZERO {
            return Err(StorageError::InsufficientBalance {
                balance: account.balance,
                requested: -delta,
            });
        }
        account.balance = next;
        account.updated_at = Utc::now();
        Ok(next)
    }

    async fn create_transaction(&self, record: &TransactionRecord) -> StorageResult<()> {
        if self.take_injected_failure() {
            return Err(StorageError::Backend("injected transaction write failure".to_string()));
        }
        if let Some(round_id) = record.round_id {
            match self.round_transactions.entry(round_id) {
                Entry::Occupied(_) => {
                    return Err(StorageError::Conflict(format!(
                        "round {} already has a transaction",
                        round_id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                }
            }
        }
        self.transactions
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<TransactionRecord>> {
        Ok(self
            .transactions
            .get(user_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_round_transaction(
        &self,
        round_id: Uuid,
    ) -> StorageResult<Option<TransactionRecord>> {
        Ok(self.round_transactions.get(&round_id).map(|r| r.clone()))
    }

    async fn get_round(&self, round_id: Uuid) -> StorageResult<Option<RoundState>> {
        Ok(self.rounds.get(&round_id).map(|round| round.clone()))
    }

    async fn get_active_round(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> StorageResult<Option<RoundState>> {
        let round_id = match self.active_index.get(&(user_id.to_string(), game_type)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self
            .rounds
            .get(&round_id)
            .filter(|round| round.is_active())
            .map(|round| round.clone()))
    }

    async fn insert_round(&self, round: &RoundState) -> StorageResult<()> {
        let key = (round.user_id.clone(), round.game_type);
        match self.active_index.entry(key) {
            Entry::Occupied(mut slot) => {
                if self.is_live(slot.get()) {
                    return Err(StorageError::Conflict(format!(
                        "active {} round exists for {}",
                        round.game_type, round.user_id
                    )));
                }
                slot.insert(round.round_id);
            }
            Entry::Vacant(slot) => {
                slot.insert(round.round_id);
            }
        }
        self.rounds.insert(round.round_id, round.clone());
        debug!(round_id = %round.round_id, user_id = %round.user_id, "round inserted");
        Ok(())
    }

    async fn save_round(&self, round: &RoundState) -> StorageResult<()> {
        match self.rounds.get_mut(&round.round_id) {
            Some(mut stored) => {
                *stored = round.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("round {}", round.round_id))),
        }
    }

    async fn transition_round(
        &self,
        round_id: Uuid,
        from: RoundStatus,
        to: RoundStatus,
    ) -> StorageResult<bool> {
        let mut round = self
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| StorageError::NotFound(format!("round {}", round_id)))?;
        if round.status != from {
            return Ok(false);
        }
        round.status = to;
        Ok(true)
    }

    async fn delete_round(&self, round_id: Uuid) -> StorageResult<()> {
        if let Some((_, round)) = self.rounds.remove(&round_id) {
            self.active_index
                .remove_if(&(round.user_id, round.game_type), |_, id| *id == round_id);
        }
        Ok(())
    }

    async fn active_rounds(&self) -> StorageResult<Vec<RoundState>> {
        Ok(self
            .rounds
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
