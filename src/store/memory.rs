//! In-memory storage
//!
//! Used when no database is configured and by the test suite. A single
//! write lock guards all tables, which makes every operation atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Chat, ChatSummary, ItemDetails, LedgerEntry, LedgerEntryView, Message, NewLedgerEntry,
    Notification, Points, Profile, Purchase, PurchaseStatus, RedemptionReceipt, TopUpReceipt,
    TransactionKind, TransactionStatus,
};

use super::{PurchaseScope, StoreError, StoreResult, SupportStore, WalletStore};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    transactions: Vec<LedgerEntry>,
    purchases: Vec<Purchase>,
    chats: Vec<Chat>,
    messages: Vec<Message>,
    purchase_messages: Vec<Message>,
    notifications: Vec<Notification>,
    #[cfg(test)]
    fail_ledger_writes: bool,
}

impl Tables {
    fn apply_delta(&mut self, user_id: Uuid, delta: i64) -> StoreResult<i64> {
        let Some(profile) = self.profiles.get_mut(&user_id) else {
            if delta < 0 {
                return Err(StoreError::InsufficientFunds {
                    required: -delta,
                    available: 0,
                });
            }
            return Err(StoreError::not_found("Profile", user_id));
        };

        let next = profile
            .points
            .checked_add(delta)
            .filter(|v| *v >= 0)
            .ok_or(StoreError::InsufficientFunds {
                required: -delta,
                available: profile.points,
            })?;
        profile.points = next;
        Ok(next)
    }

    fn insert_entry(&mut self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        #[cfg(test)]
        if self.fail_ledger_writes {
            return Err(StoreError::Corrupt("ledger write rejected".to_string()));
        }

        let entry = entry.into_entry(Uuid::new_v4(), Utc::now());
        self.transactions.push(entry.clone());
        Ok(entry)
    }

    fn email_of(&self, user_id: Uuid) -> String {
        self.profiles
            .get(&user_id)
            .map(|p| p.email.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Store that keeps every table in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn fail_ledger_writes(&self, fail: bool) {
        self.tables.write().await.fail_ledger_writes = fail;
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .profiles
            .entry(user_id)
            .and_modify(|p| {
                if p.email != email {
                    p.email = email.to_string();
                }
            })
            .or_insert_with(|| Profile {
                id: user_id,
                email: email.to_string(),
                points: 0,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn find_profiles_by_email(&self, email: &str) -> StoreResult<Vec<Profile>> {
        let needle = email.trim().to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|p| p.email.to_lowercase() == needle)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, user_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&user_id).map(|p| p.points).unwrap_or(0))
    }

    async fn adjust_balance(&self, user_id: Uuid, delta: i64) -> StoreResult<i64> {
        self.tables.write().await.apply_delta(user_id, delta)
    }

    async fn record_entry(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        self.tables.write().await.insert_entry(entry)
    }

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<LedgerEntry> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("Transaction", id))?;
        entry.status = status;
        Ok(entry.clone())
    }

    async fn list_transactions(&self) -> StoreResult<Vec<LedgerEntryView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .rev()
            .map(|entry| LedgerEntryView {
                entry: entry.clone(),
                email: tables.email_of(entry.user_id),
            })
            .collect())
    }

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let tables = self.tables.read().await;
        Ok(tables.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn list_purchases(&self, scope: PurchaseScope) -> StoreResult<Vec<Purchase>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .rev()
            .filter(|p| match scope {
                PurchaseScope::Owner(user_id) => p.user_id == user_id,
                PurchaseScope::All => true,
            })
            .cloned()
            .collect())
    }

    async fn set_purchase_status(
        &self,
        id: Uuid,
        status: PurchaseStatus,
    ) -> StoreResult<Purchase> {
        let mut tables = self.tables.write().await;
        let purchase = tables
            .purchases
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("Purchase", id))?;
        purchase.status = status;
        Ok(purchase.clone())
    }

    async fn commit_redemption(
        &self,
        user_id: Uuid,
        item: &ItemDetails,
    ) -> StoreResult<RedemptionReceipt> {
        let mut tables = self.tables.write().await;
        let before = tables.profiles.get(&user_id).map(|p| p.points);

        let balance = tables.apply_delta(user_id, -item.item_price.value())?;
        let entry = match tables.insert_entry(
            NewLedgerEntry::new(user_id, TransactionKind::Redeem, item.item_price)
                .with_item(item.clone()),
        ) {
            Ok(entry) => entry,
            Err(e) => {
                // roll back the debit
                if let (Some(points), Some(profile)) = (before, tables.profiles.get_mut(&user_id)) {
                    profile.points = points;
                }
                return Err(e);
            }
        };

        let purchase = Purchase::pending(Uuid::new_v4(), user_id, item, Utc::now());
        tables.purchases.push(purchase.clone());

        Ok(RedemptionReceipt {
            balance,
            entry,
            purchase,
        })
    }

    async fn commit_top_up(&self, user_id: Uuid, amount: Points) -> StoreResult<TopUpReceipt> {
        let mut tables = self.tables.write().await;
        let before = tables.profiles.get(&user_id).map(|p| p.points);

        let balance = tables.apply_delta(user_id, amount.value())?;
        let entry = match tables.insert_entry(NewLedgerEntry::new(
            user_id,
            TransactionKind::TopUp,
            amount,
        )) {
            Ok(entry) => entry,
            Err(e) => {
                if let (Some(points), Some(profile)) = (before, tables.profiles.get_mut(&user_id)) {
                    profile.points = points;
                }
                return Err(e);
            }
        };

        Ok(TopUpReceipt { balance, entry })
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn latest_chat_for(&self, user_id: Uuid) -> StoreResult<Option<Chat>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chats
            .iter()
            .rev()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn create_chat(&self, user_id: Uuid) -> StoreResult<Chat> {
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id,
            status: "open".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.chats.push(chat.clone());
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>> {
        let tables = self.tables.read().await;
        Ok(tables.chats.iter().find(|c| c.id == chat_id).cloned())
    }

    async fn list_chats(&self) -> StoreResult<Vec<ChatSummary>> {
        let tables = self.tables.read().await;
        let mut chats: Vec<ChatSummary> = tables
            .chats
            .iter()
            .map(|chat| ChatSummary {
                chat: chat.clone(),
                user_email: tables.email_of(chat.user_id),
                last_message: tables
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.thread_id == chat.id)
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
            })
            .collect();
        // later inserts win timestamp ties
        chats.reverse();
        chats.sort_by(|a, b| b.chat.updated_at.cmp(&a.chat.updated_at));
        Ok(chats)
    }

    async fn list_chat_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.thread_id == chat_id)
            .cloned()
            .collect())
    }

    async fn insert_chat_message(
        &self,
        chat_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let chat = tables
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| StoreError::not_found("Chat", chat_id))?;
        chat.updated_at = now;

        let message = Message {
            id: Uuid::new_v4(),
            thread_id: chat_id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            is_read: false,
            created_at: now,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_purchase_messages(&self, purchase_id: Uuid) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchase_messages
            .iter()
            .filter(|m| m.thread_id == purchase_id)
            .cloned()
            .collect())
    }

    async fn insert_purchase_message(
        &self,
        purchase_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message> {
        let mut tables = self.tables.write().await;
        if !tables.purchases.iter().any(|p| p.id == purchase_id) {
            return Err(StoreError::not_found("Purchase", purchase_id));
        }

        let message = Message {
            id: Uuid::new_v4(),
            thread_id: purchase_id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        tables.purchase_messages.push(message.clone());
        Ok(message)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut latest: Vec<Notification> = tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.sender_id == user_id || n.receiver_id == Some(user_id))
            .take(limit)
            .cloned()
            .collect();
        latest.reverse();
        Ok(latest)
    }

    async fn insert_notification(
        &self,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id: None,
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64) -> ItemDetails {
        ItemDetails {
            item_name: "Peely".to_string(),
            item_price: Points::new(price).unwrap(),
            target_username: "banana_fan".to_string(),
        }
    }

    async fn store_with(user_id: Uuid, points: i64) -> MemoryStore {
        let store = MemoryStore::new();
        store.ensure_profile(user_id, "a@x.com").await.unwrap();
        if points > 0 {
            store.adjust_balance(user_id, points).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_unknown_user_has_zero_balance() {
        let store = MemoryStore::new();
        assert_eq!(store.get_balance(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_balance_rejects_overdraft() {
        let user_id = Uuid::new_v4();
        let store = store_with(user_id, 100).await;

        let err = store.adjust_balance(user_id, -101).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientFunds {
                required: 101,
                available: 100
            }
        ));
        assert_eq!(store.get_balance(user_id).await.unwrap(), 100);
        assert_eq!(store.adjust_balance(user_id, -100).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_ledger_write_rolls_back_debit() {
        let user_id = Uuid::new_v4();
        let store = store_with(user_id, 1000).await;
        store.fail_ledger_writes(true).await;

        assert!(store.commit_redemption(user_id, &item(400)).await.is_err());

        assert_eq!(store.get_balance(user_id).await.unwrap(), 1000);
        assert!(store.list_purchases(PurchaseScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive_and_exact() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        store.ensure_profile(user_id, "Player@Example.com").await.unwrap();
        store.ensure_profile(Uuid::new_v4(), "player@example.co").await.unwrap();

        let found = store.find_profiles_by_email("player@EXAMPLE.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, user_id);
    }

    #[tokio::test]
    async fn test_ensure_profile_keeps_balance() {
        let user_id = Uuid::new_v4();
        let store = store_with(user_id, 300).await;
        store.ensure_profile(user_id, "new@x.com").await.unwrap();

        assert_eq!(store.get_balance(user_id).await.unwrap(), 300);
        assert_eq!(store.find_profiles_by_email("new@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notifications_latest_window_oldest_first() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        for i in 0..5 {
            store
                .insert_notification(user_id, &format!("note {}", i))
                .await
                .unwrap();
        }
        store.insert_notification(Uuid::new_v4(), "someone else").await.unwrap();

        let notes = store.list_notifications(user_id, 3).await.unwrap();
        let contents: Vec<&str> = notes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["note 2", "note 3", "note 4"]);
    }
}
