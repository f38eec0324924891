//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::extract::ApiJson;
use crate::catalog::CatalogItem;
use crate::domain::{
    Caller, Chat, ChatSummary, LedgerEntry, LedgerEntryView, Message, Notification,
    OperationContext, Purchase,
};
use crate::error::AppError;
use crate::handlers::{
    BalanceService, DepositCommand, DepositHandler, Ledger, PurchaseBook, RedeemCommand,
    RedeemHandler, SetStatusCommand, TopUpRequestCommand,
};
use crate::state::AppState;
use crate::support::SupportService;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub item_name: String,
    /// Number or numeric string
    #[serde(default)]
    pub item_price: Option<Value>,
    #[serde(default)]
    pub target_username: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub balance: i64,
    pub transaction_id: Uuid,
    pub purchase_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub target_email: String,
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub email: String,
    pub balance: i64,
    pub transaction_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<LedgerEntryView>,
}

#[derive(Debug, Serialize)]
pub struct PurchasesResponse {
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct ShopItemsResponse {
    pub items: Vec<CatalogItem>,
}

// =========================================================================
// API Routers
// =========================================================================

/// Routes that require an authenticated caller
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Wallet
        .route("/balance", get(get_balance))
        .route("/redeem", post(redeem))
        .route("/topup-requests", post(request_top_up))
        .route("/purchases", get(list_purchases))
        .route(
            "/purchases/:purchase_id/messages",
            get(list_purchase_messages).post(send_purchase_message),
        )
        // Support
        .route("/chat", get(open_chat))
        .route(
            "/chats/:chat_id/messages",
            get(list_chat_messages).post(send_chat_message),
        )
        .route(
            "/notifications",
            get(list_notifications).post(send_notification),
        )
        // Admin
        .route("/admin/deposit", post(deposit))
        .route("/admin/balance", get(admin_balance))
        .route("/admin/transactions", get(list_transactions))
        .route(
            "/admin/transactions/:transaction_id/status",
            post(set_transaction_status),
        )
        .route(
            "/admin/purchases/:purchase_id/status",
            post(set_purchase_status),
        )
        .route("/admin/chats", get(list_chats))
}

/// Routes open to anonymous visitors
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/shop", get(get_shop))
        .route("/shop/items", get(get_shop_items))
}

fn support(state: &AppState) -> SupportService {
    SupportService::new(state.store.clone(), state.policy.clone())
}

// =========================================================================
// Wallet
// =========================================================================

/// GET /balance
async fn get_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = BalanceService::new(state.store.clone())
        .get_balance(caller.user_id)
        .await?;

    Ok(Json(BalanceResponse {
        user_id: caller.user_id,
        email: None,
        balance: balance.value(),
    }))
}

/// POST /redeem
async fn redeem(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Extension(caller): Extension<Caller>,
    ApiJson(request): ApiJson<RedeemRequest>,
) -> Result<Json<RedeemResponse>, AppError> {
    let handler = RedeemHandler::new(state.store.clone());

    let command = RedeemCommand::new(caller.user_id, request.item_name, request.target_username);
    let command = match request.item_price {
        Some(price) => command.with_price(price),
        None => command,
    };

    let result = handler.execute(command, &context).await?;

    Ok(Json(RedeemResponse {
        success: true,
        balance: result.balance,
        transaction_id: result.transaction_id,
        purchase_id: result.purchase_id,
        message: "Redemption recorded, delivery pending".to_string(),
    }))
}

/// POST /topup-requests
async fn request_top_up(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(request): ApiJson<TopUpRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), AppError> {
    let command = TopUpRequestCommand {
        user_id: caller.user_id,
        amount: request.amount,
    };

    let entry = Ledger::new(state.store.clone())
        .request_top_up(command)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /purchases
async fn list_purchases(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PurchasesResponse>, AppError> {
    let purchases = PurchaseBook::new(state.store.clone())
        .list_for(&caller, &state.policy)
        .await?;

    Ok(Json(PurchasesResponse { purchases }))
}

/// GET /purchases/:purchase_id/messages
async fn list_purchase_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = support(&state)
        .list_purchase_messages(&caller, purchase_id)
        .await?;

    Ok(Json(MessagesResponse { messages }))
}

/// POST /purchases/:purchase_id/messages
async fn send_purchase_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(purchase_id): Path<Uuid>,
    ApiJson(request): ApiJson<MessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = support(&state)
        .send_purchase_message(&caller, purchase_id, &request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

// =========================================================================
// Support
// =========================================================================

/// GET /chat
async fn open_chat(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Chat>, AppError> {
    Ok(Json(support(&state).open_chat(&caller).await?))
}

/// GET /chats/:chat_id/messages
async fn list_chat_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = support(&state).list_chat_messages(&caller, chat_id).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// POST /chats/:chat_id/messages
async fn send_chat_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(chat_id): Path<Uuid>,
    ApiJson(request): ApiJson<MessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = support(&state)
        .send_chat_message(&caller, chat_id, &request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /notifications
async fn list_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = support(&state).list_notifications(&caller).await?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// POST /notifications
async fn send_notification(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(request): ApiJson<MessageRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = support(&state)
        .send_notification(&caller, &request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

// =========================================================================
// Admin
// =========================================================================

/// POST /admin/deposit
async fn deposit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Extension(caller): Extension<Caller>,
    ApiJson(request): ApiJson<DepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let command = DepositCommand::new(request.target_email);
    let command = match request.amount {
        Some(amount) => command.with_amount(amount),
        None => command,
    };

    let result = DepositHandler::new(state.store.clone())
        .execute(&grant, command, &context)
        .await?;

    Ok(Json(DepositResponse {
        success: true,
        message: format!("Added {} points to {}", result.amount, result.email),
        user_id: result.user_id,
        email: result.email,
        balance: result.balance,
        transaction_id: result.transaction_id,
    }))
}

/// GET /admin/balance?email=
async fn admin_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let (profile, balance) = BalanceService::new(state.store.clone())
        .balance_for_email(&grant, &query.email)
        .await?;

    Ok(Json(BalanceResponse {
        user_id: profile.id,
        email: Some(profile.email),
        balance: balance.value(),
    }))
}

/// GET /admin/transactions
async fn list_transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let transactions = Ledger::new(state.store.clone()).list_all(&grant).await?;

    Ok(Json(TransactionsResponse { transactions }))
}

/// POST /admin/transactions/:transaction_id/status
async fn set_transaction_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(transaction_id): Path<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<LedgerEntry>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let entry = Ledger::new(state.store.clone())
        .advance_transaction_status(&grant, SetStatusCommand::new(transaction_id, request.status))
        .await?;

    Ok(Json(entry))
}

/// POST /admin/purchases/:purchase_id/status
async fn set_purchase_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(purchase_id): Path<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<Purchase>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let purchase = PurchaseBook::new(state.store.clone())
        .advance_purchase_status(&grant, SetStatusCommand::new(purchase_id, request.status))
        .await?;

    Ok(Json(purchase))
}

/// GET /admin/chats
async fn list_chats(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ChatsResponse>, AppError> {
    let grant = state.policy.authorize(&caller)?;

    let chats = support(&state).list_chats(&grant).await?;

    Ok(Json(ChatsResponse { chats }))
}

// =========================================================================
// Catalog
// =========================================================================

/// GET /shop - raw upstream document
async fn get_shop(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let document = state.catalog.snapshot().await?;
    Ok(Json(Value::clone(&document)))
}

/// GET /shop/items
async fn get_shop_items(
    State(state): State<AppState>,
) -> Result<Json<ShopItemsResponse>, AppError> {
    let items = state.catalog.items().await?;
    Ok(Json(ShopItemsResponse { items }))
}
