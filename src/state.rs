//! Shared application state

use std::sync::Arc;

use crate::auth::{AdminPolicy, TokenVerifier};
use crate::catalog::CatalogClient;
use crate::store::Store;

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub policy: Arc<AdminPolicy>,
    pub verifier: Arc<TokenVerifier>,
    pub catalog: Arc<CatalogClient>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        policy: AdminPolicy,
        verifier: TokenVerifier,
        catalog: CatalogClient,
    ) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            verifier: Arc::new(verifier),
            catalog: Arc::new(catalog),
        }
    }
}
