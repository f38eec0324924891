//! Stored records
//!
//! Rows of the wallet, ledger and support tables as the rest of the
//! crate sees them. Storage backends build these; API handlers serialize them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Points, PurchaseStatus, TransactionKind, TransactionStatus};

/// Per-user wallet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// Catalog item a redemption refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub item_name: String,
    pub item_price: Points,
    pub target_username: String,
}

/// Ledger entry ("transaction") to be recorded
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Points,
    pub item: Option<ItemDetails>,
}

impl NewLedgerEntry {
    pub fn new(user_id: Uuid, kind: TransactionKind, amount: Points) -> Self {
        Self {
            user_id,
            kind,
            amount,
            item: None,
        }
    }

    pub fn with_item(mut self, item: ItemDetails) -> Self {
        self.item = Some(item);
        self
    }

    /// Materialize the entry with its kind's initial status
    pub fn into_entry(self, id: Uuid, created_at: DateTime<Utc>) -> LedgerEntry {
        let status = self.kind.initial_status();
        let (item_name, item_price, target_username) = match self.item {
            Some(item) => (
                Some(item.item_name),
                Some(item.item_price.value()),
                Some(item.target_username),
            ),
            None => (None, None, None),
        };

        LedgerEntry {
            id,
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount.value(),
            item_name,
            item_price,
            target_username,
            status,
            created_at,
        }
    }
}

/// Balance-affecting event. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub item_name: Option<String>,
    pub item_price: Option<i64>,
    pub target_username: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry joined with its owner's email, for the admin table
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryView {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub email: String,
}

/// Redemption fulfilment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_name: String,
    pub item_price: i64,
    pub target_username: String,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn pending(id: Uuid, user_id: Uuid, item: &ItemDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            item_name: item.item_name.clone(),
            item_price: item.item_price.value(),
            target_username: item.target_username.clone(),
            status: PurchaseStatus::Pending,
            created_at,
        }
    }
}

/// Outcome of an atomically committed redemption
#[derive(Debug, Clone)]
pub struct RedemptionReceipt {
    pub balance: i64,
    pub entry: LedgerEntry,
    pub purchase: Purchase,
}

/// Outcome of an atomically committed top-up
#[derive(Debug, Clone)]
pub struct TopUpReceipt {
    pub balance: i64,
    pub entry: LedgerEntry,
}

/// Support chat thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat thread as listed in the admin inbox
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: Chat,
    pub user_email: String,
    pub last_message: String,
}

/// Message in a chat or purchase thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// User-to-staff notification note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ItemDetails {
        ItemDetails {
            item_name: "Renegade Raider".to_string(),
            item_price: Points::new(1200).unwrap(),
            target_username: "ninja".to_string(),
        }
    }

    #[test]
    fn test_redeem_entry_starts_pending_with_item() {
        let user_id = Uuid::new_v4();
        let entry = NewLedgerEntry::new(user_id, TransactionKind::Redeem, Points::new(1200).unwrap())
            .with_item(item())
            .into_entry(Uuid::new_v4(), Utc::now());

        assert_eq!(entry.status, TransactionStatus::Pending);
        assert_eq!(entry.amount, 1200);
        assert_eq!(entry.item_price, Some(1200));
        assert_eq!(entry.target_username.as_deref(), Some("ninja"));
    }

    #[test]
    fn test_top_up_entry_starts_completed() {
        let entry = NewLedgerEntry::new(Uuid::new_v4(), TransactionKind::TopUp, Points::new(500).unwrap())
            .into_entry(Uuid::new_v4(), Utc::now());

        assert_eq!(entry.status, TransactionStatus::Completed);
        assert!(entry.item_name.is_none());
    }

    #[test]
    fn test_ledger_view_flattens_entry() {
        let entry = NewLedgerEntry::new(Uuid::new_v4(), TransactionKind::TopUp, Points::new(5).unwrap())
            .into_entry(Uuid::new_v4(), Utc::now());
        let view = LedgerEntryView {
            entry,
            email: "a@x.com".to_string(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["kind"], "top-up");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["email"], "a@x.com");
    }
}
