//! PostgreSQL storage
//!
//! Tables are created by `migrations/0001_init.sql`. Balance changes are
//! single conditional UPDATEs so two debits for the same user serialize
//! on the profile row; composite commits run in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Chat, ChatSummary, ItemDetails, LedgerEntry, LedgerEntryView, Message, NewLedgerEntry,
    Notification, Points, Profile, Purchase, PurchaseStatus, RedemptionReceipt, TopUpReceipt,
    TransactionKind, TransactionStatus,
};

use super::{PurchaseScope, StoreError, StoreResult, SupportStore, WalletStore};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Transaction-scoped helpers
    // =========================================================================

    /// Apply a signed delta inside `tx`, refusing to go below zero
    async fn apply_delta(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        delta: i64,
    ) -> StoreResult<i64> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE profiles
            SET points = points + $2, updated_at = NOW()
            WHERE id = $1 AND points + $2 >= 0
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(points) = updated {
            return Ok(points);
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT points FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientFunds {
                required: -delta,
                available,
            }),
            None if delta < 0 => Err(StoreError::InsufficientFunds {
                required: -delta,
                available: 0,
            }),
            None => Err(StoreError::not_found("Profile", user_id)),
        }
    }

    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        entry: NewLedgerEntry,
    ) -> StoreResult<LedgerEntry> {
        let entry = entry.into_entry(Uuid::new_v4(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, user_id, kind, amount, item_name, item_price, target_username, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.item_name)
        .bind(entry.item_price)
        .bind(&entry.target_username)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(entry)
    }

    async fn insert_purchase(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        item: &ItemDetails,
    ) -> StoreResult<Purchase> {
        let purchase = Purchase::pending(Uuid::new_v4(), user_id, item, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO purchases
                (id, user_id, item_name, item_price, target_username, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.user_id)
        .bind(&purchase.item_name)
        .bind(purchase.item_price)
        .bind(&purchase.target_username)
        .bind(purchase.status.as_str())
        .bind(purchase.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(purchase)
    }
}

// =========================================================================
// Row types
// =========================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    points: i64,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            email: row.email,
            points: row.points,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    amount: i64,
    item_name: Option<String>,
    item_price: Option<i64>,
    target_username: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let kind: TransactionKind = row
            .kind
            .parse()
            .map_err(|e: crate::domain::ParseStatusError| StoreError::Corrupt(e.to_string()))?;
        let status: TransactionStatus = row
            .status
            .parse()
            .map_err(|e: crate::domain::ParseStatusError| StoreError::Corrupt(e.to_string()))?;

        Ok(LedgerEntry {
            id: row.id,
            user_id: row.user_id,
            kind,
            amount: row.amount,
            item_name: row.item_name,
            item_price: row.item_price,
            target_username: row.target_username,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerViewRow {
    #[sqlx(flatten)]
    entry: LedgerRow,
    email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: Uuid,
    item_name: String,
    item_price: i64,
    target_username: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = StoreError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let status: PurchaseStatus = row
            .status
            .parse()
            .map_err(|e: crate::domain::ParseStatusError| StoreError::Corrupt(e.to_string()))?;

        Ok(Purchase {
            id: row.id,
            user_id: row.user_id,
            item_name: row.item_name,
            item_price: row.item_price,
            target_username: row.target_username,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Chat {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatSummaryRow {
    #[sqlx(flatten)]
    chat: ChatRow,
    user_email: String,
    last_message: String,
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    thread_id: Uuid,
    sender_id: String,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            thread_id: row.thread_id,
            sender_id: row.sender_id,
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Option<Uuid>,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

// =========================================================================
// Wallet
// =========================================================================

#[async_trait]
impl WalletStore for PgStore {
    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, points)
            VALUES ($1, $2, 0)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email, updated_at = NOW()
                WHERE profiles.email IS DISTINCT FROM EXCLUDED.email
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_profiles_by_email(&self, email: &str) -> StoreResult<Vec<Profile>> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            r#"
            SELECT id, email, points, created_at
            FROM profiles
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn get_balance(&self, user_id: Uuid) -> StoreResult<i64> {
        let balance: Option<i64> = sqlx::query_scalar("SELECT points FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(balance.unwrap_or(0))
    }

    async fn adjust_balance(&self, user_id: Uuid, delta: i64) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance = Self::apply_delta(&mut tx, user_id, delta).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn record_entry(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        let mut tx = self.pool.begin().await?;
        let entry = Self::insert_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<LedgerEntry> {
        let row: Option<LedgerRow> = sqlx::query_as(
            r#"
            UPDATE transactions
            SET status = $2
            WHERE id = $1
            RETURNING id, user_id, kind, amount, item_name, item_price, target_username, status, created_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::not_found("Transaction", id))?
            .try_into()
    }

    async fn list_transactions(&self) -> StoreResult<Vec<LedgerEntryView>> {
        let rows: Vec<LedgerViewRow> = sqlx::query_as(
            r#"
            SELECT
                t.id, t.user_id, t.kind, t.amount, t.item_name, t.item_price,
                t.target_username, t.status, t.created_at,
                COALESCE(p.email, 'Unknown') AS email
            FROM transactions t
            LEFT JOIN profiles p ON p.id = t.user_id
            ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LedgerEntryView {
                    entry: row.entry.try_into()?,
                    email: row.email,
                })
            })
            .collect()
    }

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, item_name, item_price, target_username, status, created_at
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn list_purchases(&self, scope: PurchaseScope) -> StoreResult<Vec<Purchase>> {
        let rows: Vec<PurchaseRow> = match scope {
            PurchaseScope::Owner(user_id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, user_id, item_name, item_price, target_username, status, created_at
                    FROM purchases
                    WHERE user_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            PurchaseScope::All => {
                sqlx::query_as(
                    r#"
                    SELECT id, user_id, item_name, item_price, target_username, status, created_at
                    FROM purchases
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Purchase::try_from).collect()
    }

    async fn set_purchase_status(
        &self,
        id: Uuid,
        status: PurchaseStatus,
    ) -> StoreResult<Purchase> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            UPDATE purchases
            SET status = $2
            WHERE id = $1
            RETURNING id, user_id, item_name, item_price, target_username, status, created_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::not_found("Purchase", id))?
            .try_into()
    }

    async fn commit_redemption(
        &self,
        user_id: Uuid,
        item: &ItemDetails,
    ) -> StoreResult<RedemptionReceipt> {
        let mut tx = self.pool.begin().await?;

        let balance = Self::apply_delta(&mut tx, user_id, -item.item_price.value()).await?;
        let entry = Self::insert_entry(
            &mut tx,
            NewLedgerEntry::new(user_id, TransactionKind::Redeem, item.item_price)
                .with_item(item.clone()),
        )
        .await?;
        let purchase = Self::insert_purchase(&mut tx, user_id, item).await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            transaction_id = %entry.id,
            purchase_id = %purchase.id,
            balance,
            "Redemption committed"
        );

        Ok(RedemptionReceipt {
            balance,
            entry,
            purchase,
        })
    }

    async fn commit_top_up(&self, user_id: Uuid, amount: Points) -> StoreResult<TopUpReceipt> {
        let mut tx = self.pool.begin().await?;

        let balance = Self::apply_delta(&mut tx, user_id, amount.value()).await?;
        let entry = Self::insert_entry(
            &mut tx,
            NewLedgerEntry::new(user_id, TransactionKind::TopUp, amount),
        )
        .await?;

        tx.commit().await?;

        Ok(TopUpReceipt { balance, entry })
    }
}

// =========================================================================
// Support
// =========================================================================

#[async_trait]
impl SupportStore for PgStore {
    async fn latest_chat_for(&self, user_id: Uuid) -> StoreResult<Option<Chat>> {
        let row: Option<ChatRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, status, created_at, updated_at
            FROM chats
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Chat::from))
    }

    async fn create_chat(&self, user_id: Uuid) -> StoreResult<Chat> {
        let row: ChatRow = sqlx::query_as(
            r#"
            INSERT INTO chats (id, user_id, status)
            VALUES ($1, $2, 'open')
            RETURNING id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>> {
        let row: Option<ChatRow> = sqlx::query_as(
            "SELECT id, user_id, status, created_at, updated_at FROM chats WHERE id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Chat::from))
    }

    async fn list_chats(&self) -> StoreResult<Vec<ChatSummary>> {
        let rows: Vec<ChatSummaryRow> = sqlx::query_as(
            r#"
            SELECT
                c.id, c.user_id, c.status, c.created_at, c.updated_at,
                COALESCE(p.email, 'Unknown') AS user_email,
                COALESCE((
                    SELECT m.content FROM messages m
                    WHERE m.chat_id = c.id
                    ORDER BY m.created_at DESC
                    LIMIT 1
                ), '') AS last_message
            FROM chats c
            LEFT JOIN profiles p ON p.id = c.user_id
            ORDER BY c.updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChatSummary {
                chat: row.chat.into(),
                user_email: row.user_email,
                last_message: row.last_message,
            })
            .collect())
    }

    async fn list_chat_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, chat_id AS thread_id, sender_id, content, is_read, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn insert_chat_message(
        &self,
        chat_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message> {
        let mut tx = self.pool.begin().await?;

        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, is_read)
            VALUES ($1, $2, $3, $4, false)
            RETURNING id, chat_id AS thread_id, sender_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list_purchase_messages(&self, purchase_id: Uuid) -> StoreResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, purchase_id AS thread_id, sender_id, content, is_read, created_at
            FROM purchase_messages
            WHERE purchase_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn insert_purchase_message(
        &self,
        purchase_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<Message> {
        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO purchase_messages (id, purchase_id, sender_id, content, is_read)
            VALUES ($1, $2, $3, $4, false)
            RETURNING id, purchase_id AS thread_id, sender_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(purchase_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, is_read, created_at
            FROM notifications
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut notifications: Vec<Notification> =
            rows.into_iter().map(Notification::from).collect();
        notifications.reverse();
        Ok(notifications)
    }

    async fn insert_notification(
        &self,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Notification> {
        let row: NotificationRow = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, sender_id, content, is_read)
            VALUES ($1, $2, $3, false)
            RETURNING id, sender_id, receiver_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
