//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts
//! arrive loosely typed from clients and are validated by the handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =========================================================================
// RedeemCommand
// =========================================================================

/// Command to spend points on a catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCommand {
    pub user_id: Uuid,
    pub item_name: String,
    /// Price as sent by the client (number or numeric string)
    pub item_price: Option<Value>,
    /// Game account the item is gifted to
    pub target_username: String,
}

impl RedeemCommand {
    pub fn new(user_id: Uuid, item_name: String, target_username: String) -> Self {
        Self {
            user_id,
            item_name,
            item_price: None,
            target_username,
        }
    }

    pub fn with_price(mut self, item_price: Value) -> Self {
        self.item_price = Some(item_price);
        self
    }
}

// =========================================================================
// DepositCommand
// =========================================================================

/// Command to credit points to a user identified by email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub target_email: String,
    pub amount: Option<Value>,
}

impl DepositCommand {
    pub fn new(target_email: String) -> Self {
        Self {
            target_email,
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: Value) -> Self {
        self.amount = Some(amount);
        self
    }
}

// =========================================================================
// TopUpRequestCommand
// =========================================================================

/// Command announcing an off-platform payment for a points package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequestCommand {
    pub user_id: Uuid,
    pub amount: Option<Value>,
}

impl TopUpRequestCommand {
    pub fn new(user_id: Uuid, amount: Value) -> Self {
        Self {
            user_id,
            amount: Some(amount),
        }
    }
}

// =========================================================================
// SetStatusCommand
// =========================================================================

/// Command to overwrite the status of a transaction or purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusCommand {
    pub id: Uuid,
    pub status: String,
}

impl SetStatusCommand {
    pub fn new(id: Uuid, status: impl Into<String>) -> Self {
        Self {
            id,
            status: status.into(),
        }
    }
}

/// Result of a successful redemption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemResult {
    pub balance: i64,
    pub transaction_id: Uuid,
    pub purchase_id: Uuid,
}

/// Result of a successful deposit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResult {
    pub user_id: Uuid,
    pub email: String,
    pub amount: i64,
    pub balance: i64,
    pub transaction_id: Uuid,
}
