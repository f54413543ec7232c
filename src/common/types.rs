//! Shared type definitions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A player's wallet row as held by the repository
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub user_id: String,
    /// Never negative; only changed through `adjust_balance`
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(user_id: impl Into<String>, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}
