//! Storage module
//!
//! The relational tables behind the wallet, the ledger and support
//! messaging, expressed as traits so handlers do not care whether rows
//! live in PostgreSQL or in memory.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Chat, ChatSummary, ItemDetails, LedgerEntry, LedgerEntryView, Message, NewLedgerEntry,
    Notification, Points, Profile, Purchase, PurchaseStatus, RedemptionReceipt, TopUpReceipt,
    TransactionStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Which purchases a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseScope {
    Owner(Uuid),
    All,
}

/// Balances, ledger entries and purchases.
///
/// `adjust_balance` and the `commit_*` operations are atomic per user:
/// a debit never drives a balance below zero, and the composite commits
/// write the balance change together with their records or not at all.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Create the zero-balance profile on first sight, refreshing the email.
    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> StoreResult<()>;

    /// Case-insensitive exact email match.
    async fn find_profiles_by_email(&self, email: &str) -> StoreResult<Vec<Profile>>;

    /// Current balance; unknown users hold zero.
    async fn get_balance(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Apply a signed delta and return the new balance.
    async fn adjust_balance(&self, user_id: Uuid, delta: i64) -> StoreResult<i64>;

    /// Insert a ledger entry in its kind's initial status.
    async fn record_entry(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry>;

    /// Unconditional status overwrite.
    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<LedgerEntry>;

    /// Every ledger entry, newest first, with the owner's email.
    async fn list_transactions(&self) -> StoreResult<Vec<LedgerEntryView>>;

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>>;

    /// Purchases newest first.
    async fn list_purchases(&self, scope: PurchaseScope) -> StoreResult<Vec<Purchase>>;

    /// Unconditional status overwrite.
    async fn set_purchase_status(&self, id: Uuid, status: PurchaseStatus)
        -> StoreResult<Purchase>;

    /// Debit the price and write the redeem entry plus the purchase, atomically.
    async fn commit_redemption(
        &self,
        user_id: Uuid,
        item: &ItemDetails,
    ) -> StoreResult<RedemptionReceipt>;

    /// Credit the amount and write a completed top-up entry, atomically.
    async fn commit_top_up(&self, user_id: Uuid, amount: Points) -> StoreResult<TopUpReceipt>;
}

/// Chats, purchase threads and notifications.
#[async_trait]
pub trait SupportStore: Send + Sync {
    async fn latest_chat_for(&self, user_id: Uuid) -> StoreResult<Option<Chat>>;

    async fn create_chat(&self, user_id: Uuid) -> StoreResult<Chat>;

    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>>;

    /// All chats, most recently active first.
    async fn list_chats(&self) -> StoreResult<Vec<ChatSummary>>;

    /// Messages oldest first.
    async fn list_chat_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>>;

    /// Append a message and bump the chat's activity time.
    async fn insert_chat_message(
        &self,
        chat_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message>;

    /// Messages oldest first.
    async fn list_purchase_messages(&self, purchase_id: Uuid) -> StoreResult<Vec<Message>>;

    async fn insert_purchase_message(
        &self,
        purchase_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message>;

    /// The latest `limit` notifications sent or received by the user, oldest first.
    async fn list_notifications(&self, user_id: Uuid, limit: i64)
        -> StoreResult<Vec<Notification>>;

    async fn insert_notification(&self, sender_id: Uuid, content: &str)
        -> StoreResult<Notification>;
}

/// Everything the service needs from storage
pub trait Store: WalletStore + SupportStore {}

impl<T: WalletStore + SupportStore> Store for T {}
