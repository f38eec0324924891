//! PostgreSQL store tests
//!
//! Need a reachable database: `DATABASE_URL=... cargo test -- --ignored`

use uuid::Uuid;

use skin_store::db;
use skin_store::domain::{ItemDetails, Points, PurchaseStatus, TransactionStatus};
use skin_store::store::{PgStore, PurchaseScope, StoreError, SupportStore, WalletStore};

async fn store() -> PgStore {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = db::connect(&database_url, 5)
        .await
        .expect("Failed to connect to DB");
    db::apply_schema(&pool).await.expect("Failed to apply schema");
    assert!(db::check_schema(&pool).await.unwrap());

    PgStore::new(pool)
}

async fn funded_user(store: &PgStore, points: i64) -> Uuid {
    let user_id = Uuid::new_v4();
    let email = format!("{}@test.local", user_id.simple());
    store.ensure_profile(user_id, &email).await.unwrap();
    store.commit_top_up(user_id, Points::new(points).unwrap()).await.unwrap();
    user_id
}

fn item(price: i64) -> ItemDetails {
    ItemDetails {
        item_name: "Renegade Raider".to_string(),
        item_price: Points::new(price).unwrap(),
        target_username: "raider_main".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn test_redemption_is_atomic() {
    let store = store().await;
    let user_id = funded_user(&store, 1000).await;

    let receipt = store.commit_redemption(user_id, &item(1000)).await.unwrap();
    assert_eq!(receipt.balance, 0);
    assert_eq!(receipt.entry.status, TransactionStatus::Pending);
    assert_eq!(receipt.purchase.status, PurchaseStatus::Pending);

    let err = store.commit_redemption(user_id, &item(1)).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientFunds {
            required: 1,
            available: 0
        }
    ));

    let purchases = store.list_purchases(PurchaseScope::Owner(user_id)).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(store.get_balance(user_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_redemptions_never_overdraw() {
    let store = std::sync::Arc::new(store().await);
    let user_id = funded_user(&store, 500).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.commit_redemption(user_id, &item(100)).await.is_ok()
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        if task.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(store.get_balance(user_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_status_overwrite_and_threads() {
    let store = store().await;
    let user_id = funded_user(&store, 300).await;
    let receipt = store.commit_redemption(user_id, &item(300)).await.unwrap();

    let purchase = store
        .set_purchase_status(receipt.purchase.id, PurchaseStatus::Completed)
        .await
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Completed);

    let message = store
        .insert_purchase_message(receipt.purchase.id, "admin", "sent")
        .await
        .unwrap();
    assert_eq!(message.sender_id, "admin");

    let messages = store.list_purchase_messages(receipt.purchase.id).await.unwrap();
    assert_eq!(messages.len(), 1);

    let missing = store
        .set_transaction_status(Uuid::new_v4(), TransactionStatus::Completed)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
}
