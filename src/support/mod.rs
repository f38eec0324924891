//! Support Messaging
//!
//! Chats between a user and the operators, message threads attached to
//! a purchase, and a small notification feed. Threads are plain rows;
//! clients stay current by re-fetching them (see [`ThreadPoller`]).

mod poller;

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AdminGrant, AdminPolicy};
use crate::domain::{Caller, Chat, ChatSummary, DomainError, Message, Notification};
use crate::error::AppError;
use crate::store::{Store, SupportStore, WalletStore};

pub use poller::{PollerConfig, PollerHandle, PollerState, ThreadPoller};

/// Sender id written on messages an operator posts in someone else's thread
pub const ADMIN_SENDER_ID: &str = "admin";

/// How many notifications a user sees
pub const NOTIFICATION_WINDOW: i64 = 20;

/// Chats, purchase threads and notifications
pub struct SupportService {
    store: Arc<dyn Store>,
    policy: Arc<AdminPolicy>,
}

impl SupportService {
    pub fn new(store: Arc<dyn Store>, policy: Arc<AdminPolicy>) -> Self {
        Self { store, policy }
    }

    // =====================================================================
    // Chats
    // =====================================================================

    /// The caller's most recent chat, created on first use
    pub async fn open_chat(&self, caller: &Caller) -> Result<Chat, AppError> {
        if let Some(chat) = self.store.latest_chat_for(caller.user_id).await? {
            return Ok(chat);
        }

        let chat = self.store.create_chat(caller.user_id).await?;
        tracing::info!(chat_id = %chat.id, user_id = %caller.user_id, "Support chat opened");
        Ok(chat)
    }

    /// Messages of a chat, oldest first
    pub async fn list_chat_messages(
        &self,
        caller: &Caller,
        chat_id: Uuid,
    ) -> Result<Vec<Message>, AppError> {
        self.chat_for(caller, chat_id).await?;
        Ok(self.store.list_chat_messages(chat_id).await?)
    }

    pub async fn send_chat_message(
        &self,
        caller: &Caller,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Message, AppError> {
        let content = message_content(content)?;
        let chat = self.chat_for(caller, chat_id).await?;
        let sender_id = self.sender_id(caller, chat.user_id);

        let message = self
            .store
            .insert_chat_message(chat_id, &sender_id, content)
            .await?;

        tracing::debug!(chat_id = %chat_id, sender_id = %sender_id, "Chat message sent");
        Ok(message)
    }

    /// Operator inbox, most recently active first
    pub async fn list_chats(&self, _grant: &AdminGrant) -> Result<Vec<ChatSummary>, AppError> {
        Ok(self.store.list_chats().await?)
    }

    async fn chat_for(&self, caller: &Caller, chat_id: Uuid) -> Result<Chat, AppError> {
        let chat = self
            .store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Chat", chat_id))?;

        self.ensure_participant(caller, chat.user_id)?;
        Ok(chat)
    }

    // =====================================================================
    // Purchase threads
    // =====================================================================

    pub async fn list_purchase_messages(
        &self,
        caller: &Caller,
        purchase_id: Uuid,
    ) -> Result<Vec<Message>, AppError> {
        self.purchase_owner(caller, purchase_id).await?;
        Ok(self.store.list_purchase_messages(purchase_id).await?)
    }

    pub async fn send_purchase_message(
        &self,
        caller: &Caller,
        purchase_id: Uuid,
        content: &str,
    ) -> Result<Message, AppError> {
        let content = message_content(content)?;
        let owner = self.purchase_owner(caller, purchase_id).await?;
        let sender_id = self.sender_id(caller, owner);

        let message = self
            .store
            .insert_purchase_message(purchase_id, &sender_id, content)
            .await?;

        tracing::debug!(purchase_id = %purchase_id, sender_id = %sender_id, "Purchase message sent");
        Ok(message)
    }

    async fn purchase_owner(&self, caller: &Caller, purchase_id: Uuid) -> Result<Uuid, AppError> {
        let purchase = self
            .store
            .get_purchase(purchase_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Purchase", purchase_id))?;

        self.ensure_participant(caller, purchase.user_id)?;
        Ok(purchase.user_id)
    }

    // =====================================================================
    // Notifications
    // =====================================================================

    /// The latest notifications the caller sent or received, oldest first
    pub async fn list_notifications(&self, caller: &Caller) -> Result<Vec<Notification>, AppError> {
        Ok(self
            .store
            .list_notifications(caller.user_id, NOTIFICATION_WINDOW)
            .await?)
    }

    pub async fn send_notification(
        &self,
        caller: &Caller,
        content: &str,
    ) -> Result<Notification, AppError> {
        let content = message_content(content)?;
        Ok(self.store.insert_notification(caller.user_id, content).await?)
    }

    // =====================================================================
    // Live views
    // =====================================================================

    /// Keep a chat's message list current for a participant
    pub async fn watch_chat(
        &self,
        caller: &Caller,
        chat_id: Uuid,
        config: PollerConfig,
    ) -> Result<PollerHandle<Vec<Message>>, AppError> {
        self.chat_for(caller, chat_id).await?;

        let store = self.store.clone();
        Ok(ThreadPoller::spawn(config, move || {
            let store = store.clone();
            async move { store.list_chat_messages(chat_id).await }
        }))
    }

    /// Keep a purchase thread current for a participant
    pub async fn watch_purchase_thread(
        &self,
        caller: &Caller,
        purchase_id: Uuid,
        config: PollerConfig,
    ) -> Result<PollerHandle<Vec<Message>>, AppError> {
        self.purchase_owner(caller, purchase_id).await?;

        let store = self.store.clone();
        Ok(ThreadPoller::spawn(config, move || {
            let store = store.clone();
            async move { store.list_purchase_messages(purchase_id).await }
        }))
    }

    /// Keep the caller's notification feed current
    pub fn watch_notifications(
        &self,
        caller: &Caller,
        config: PollerConfig,
    ) -> PollerHandle<Vec<Notification>> {
        let store = self.store.clone();
        let user_id = caller.user_id;
        ThreadPoller::spawn(config, move || {
            let store = store.clone();
            async move { store.list_notifications(user_id, NOTIFICATION_WINDOW).await }
        })
    }

    // =====================================================================
    // Helpers
    // =====================================================================

    fn ensure_participant(&self, caller: &Caller, owner: Uuid) -> Result<(), AppError> {
        if caller.user_id == owner || self.policy.is_admin(caller) {
            return Ok(());
        }
        Err(DomainError::Unauthorized("Not a participant of this thread".to_string()).into())
    }

    fn sender_id(&self, caller: &Caller, owner: Uuid) -> String {
        if caller.user_id == owner {
            caller.sender_id()
        } else {
            ADMIN_SENDER_ID.to_string()
        }
    }
}

fn message_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidRequest(
            "Message content is required".to_string(),
        ));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemDetails, Points};
    use crate::store::MemoryStore;

    const ADMIN: &str = "ops@store.gg";

    fn service() -> (SupportService, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let policy = Arc::new(AdminPolicy::new([ADMIN]));
        (SupportService::new(store.clone(), policy), store)
    }

    async fn user(store: &Arc<dyn Store>, email: &str) -> Caller {
        let caller = Caller::new(Uuid::new_v4(), email);
        store.ensure_profile(caller.user_id, email).await.unwrap();
        caller
    }

    #[tokio::test]
    async fn test_open_chat_reuses_latest() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;

        let first = support.open_chat(&player).await.unwrap();
        let second = support.open_chat(&player).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.user_id, player.user_id);
    }

    #[tokio::test]
    async fn test_chat_sender_ids() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let admin = user(&store, ADMIN).await;
        let chat = support.open_chat(&player).await.unwrap();

        support
            .send_chat_message(&player, chat.id, " hi, my gift never arrived ")
            .await
            .unwrap();
        support
            .send_chat_message(&admin, chat.id, "checking now")
            .await
            .unwrap();

        let messages = support.list_chat_messages(&player, chat.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_id, player.user_id.to_string());
        assert_eq!(messages[0].content, "hi, my gift never arrived");
        assert_eq!(messages[1].sender_id, ADMIN_SENDER_ID);
        assert!(!messages[1].is_read);
    }

    #[tokio::test]
    async fn test_strangers_cannot_read_or_write() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let stranger = user(&store, "stranger@store.gg").await;
        let chat = support.open_chat(&player).await.unwrap();

        let err = support
            .list_chat_messages(&stranger, chat.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Unauthorized(_))));

        let err = support
            .send_chat_message(&stranger, chat.id, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_blank_message_and_unknown_chat() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let chat = support.open_chat(&player).await.unwrap();

        let err = support
            .send_chat_message(&player, chat.id, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = support
            .list_chat_messages(&player, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_purchase_thread() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let admin = user(&store, ADMIN).await;
        store.adjust_balance(player.user_id, 500).await.unwrap();
        let item = ItemDetails {
            item_name: "Peely".to_string(),
            item_price: Points::new(500).unwrap(),
            target_username: "banana".to_string(),
        };
        let receipt = store.commit_redemption(player.user_id, &item).await.unwrap();
        let purchase_id = receipt.purchase.id;

        support
            .send_purchase_message(&player, purchase_id, "when?")
            .await
            .unwrap();
        support
            .send_purchase_message(&admin, purchase_id, "gifted")
            .await
            .unwrap();

        let messages = support
            .list_purchase_messages(&admin, purchase_id)
            .await
            .unwrap();
        let player_sender = player.sender_id();
        let senders: Vec<_> = messages.iter().map(|m| m.sender_id.as_str()).collect();
        assert_eq!(senders, vec![player_sender.as_str(), ADMIN_SENDER_ID]);
    }

    #[tokio::test]
    async fn test_notifications_are_caller_scoped() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let other = user(&store, "other@store.gg").await;

        support.send_notification(&player, "mine").await.unwrap();
        support.send_notification(&other, "theirs").await.unwrap();

        let feed = support.list_notifications(&player).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].content, "mine");
        assert_eq!(feed[0].sender_id, player.user_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_chat_sees_new_messages() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let chat = support.open_chat(&player).await.unwrap();

        let handle = support
            .watch_chat(&player, chat.id, PollerConfig::threads())
            .await
            .unwrap();
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), PollerState::Ready(Vec::new()));

        support.send_chat_message(&player, chat.id, "ping").await.unwrap();
        rx.changed().await.unwrap();
        match &*rx.borrow() {
            PollerState::Ready(messages) => assert_eq!(messages.len(), 1),
            other => panic!("unexpected state: {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_watch_refused_for_strangers() {
        let (support, store) = service();
        let player = user(&store, "player@store.gg").await;
        let stranger = user(&store, "stranger@store.gg").await;
        let chat = support.open_chat(&player).await.unwrap();

        let result = support
            .watch_chat(&stranger, chat.id, PollerConfig::threads())
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::Unauthorized(_)))
        ));

        let handle = support.watch_notifications(&stranger, PollerConfig::notifications());
        assert_eq!(handle.latest(), PollerState::Loading);
    }
}
