//! Balance Store access
//!
//! The only path through which handlers read or move a balance.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::AdminGrant;
use crate::domain::{Balance, DomainError, Profile};
use crate::error::AppError;
use crate::store::{Store, WalletStore};

/// Reads and adjusts per-user point balances
pub struct BalanceService {
    store: Arc<dyn Store>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current balance; users never seen before hold zero
    pub async fn get_balance(&self, user_id: Uuid) -> Result<Balance, AppError> {
        let points = self.store.get_balance(user_id).await?;
        to_balance(points)
    }

    /// Apply a signed delta atomically; a debit below zero fails with `InsufficientFunds`.
    ///
    /// Standalone primitive: it writes no ledger entry. Redemptions and
    /// deposits go through `commit_redemption` / `commit_top_up`, which run
    /// the same conditional delta inside the transaction that records them.
    pub async fn adjust_balance(&self, user_id: Uuid, delta: i64) -> Result<Balance, AppError> {
        let points = self.store.adjust_balance(user_id, delta).await?;

        tracing::debug!(user_id = %user_id, delta = delta, balance = points, "Balance adjusted");

        to_balance(points)
    }

    /// Resolve an email to exactly one profile (case-insensitive)
    pub async fn resolve_email(&self, email: &str) -> Result<Profile, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::InvalidRequest("Email is required".to_string()));
        }

        let mut matches = self.store.find_profiles_by_email(email).await?;
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(DomainError::UserNotFound(email.to_string()).into()),
            n => {
                tracing::warn!(email = %email, matches = n, "Ambiguous email lookup");
                Err(DomainError::UserNotFound(email.to_string()).into())
            }
        }
    }

    /// Balance of the user behind `email`, for operators
    pub async fn balance_for_email(
        &self,
        _grant: &AdminGrant,
        email: &str,
    ) -> Result<(Profile, Balance), AppError> {
        let profile = self.resolve_email(email).await?;
        let balance = self.get_balance(profile.id).await?;
        Ok((profile, balance))
    }
}

fn to_balance(points: i64) -> Result<Balance, AppError> {
    Balance::new(points).map_err(|_| AppError::Internal(format!("negative balance stored: {points}")))
}
