//! Deposit Handler
//!
//! Admin top-up: credits points to the user behind an email address.

use std::sync::Arc;

use crate::auth::AdminGrant;
use crate::domain::{OperationContext, Points};
use crate::error::AppError;
use crate::store::{Store, WalletStore};

use super::{BalanceService, DepositCommand, DepositResult};

/// Handler for admin deposits
pub struct DepositHandler {
    balances: BalanceService,
    store: Arc<dyn Store>,
}

impl DepositHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            balances: BalanceService::new(store.clone()),
            store,
        }
    }

    /// Execute the deposit command
    pub async fn execute(
        &self,
        grant: &AdminGrant,
        command: DepositCommand,
        context: &OperationContext,
    ) -> Result<DepositResult, AppError> {
        let amount = Points::from_json(command.amount.as_ref())
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        let profile = self.balances.resolve_email(&command.target_email).await?;

        let receipt = self.store.commit_top_up(profile.id, amount).await?;

        tracing::info!(
            user_id = %profile.id,
            amount = amount.value(),
            balance = receipt.balance,
            transaction_id = %receipt.entry.id,
            admin = %grant.email(),
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Deposit committed"
        );

        Ok(DepositResult {
            user_id: profile.id,
            email: profile.email,
            amount: amount.value(),
            balance: receipt.balance,
            transaction_id: receipt.entry.id,
        })
    }
}
