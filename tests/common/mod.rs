//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use skin_store::api::build_router;
use skin_store::auth::{AdminPolicy, Claims, TokenVerifier};
use skin_store::catalog::CatalogClient;
use skin_store::store::{MemoryStore, WalletStore};
use skin_store::AppState;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const AUDIENCE: &str = "authenticated";
pub const ADMIN_EMAIL: &str = "ops@store.gg";

/// A router backed by the in-memory store and a mock catalog
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub catalog: MockServer,
}

/// A signed-in identity
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let catalog = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());

        let state = AppState::new(
            store.clone(),
            AdminPolicy::new([ADMIN_EMAIL]),
            TokenVerifier::new(JWT_SECRET, AUDIENCE),
            CatalogClient::new(catalog.uri(), None, Duration::from_secs(30)).unwrap(),
        );

        Self {
            router: build_router(state),
            store,
            catalog,
        }
    }

    /// A user whose profile already exists with `points`
    pub async fn user(&self, email: &str, points: i64) -> TestUser {
        let user = TestUser::new(email);
        self.store.ensure_profile(user.id, email).await.unwrap();
        if points > 0 {
            self.store.adjust_balance(user.id, points).await.unwrap();
        }
        user
    }

    pub async fn admin(&self) -> TestUser {
        self.user(ADMIN_EMAIL, 0).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(&user.token), Some(body)).await
    }
}

impl TestUser {
    pub fn new(email: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            email: email.to_string(),
            token: mint_token(id, Some(email), JWT_SECRET),
        }
    }
}

/// Sign an access token the way the auth provider does
pub fn mint_token(user_id: Uuid, email: Option<&str>, secret: &str) -> String {
    let claims = Claims {
        sub: user_id,
        email: email.map(str::to_string),
        aud: AUDIENCE.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
