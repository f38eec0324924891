//! Redeem Handler
//!
//! Spends points on a catalog item. The debit, the ledger entry and the
//! purchase record are committed together by the store.

use std::sync::Arc;

use crate::domain::{DomainError, ItemDetails, OperationContext, Points};
use crate::error::AppError;
use crate::store::{Store, WalletStore};

use super::{BalanceService, RedeemCommand, RedeemResult};

/// Handler for point redemptions
pub struct RedeemHandler {
    balances: BalanceService,
    store: Arc<dyn Store>,
}

impl RedeemHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            balances: BalanceService::new(store.clone()),
            store,
        }
    }

    /// Execute the redeem command
    pub async fn execute(
        &self,
        command: RedeemCommand,
        context: &OperationContext,
    ) -> Result<RedeemResult, AppError> {
        // Callers only ever spend their own points
        match context.user_id() {
            Some(user_id) if user_id == command.user_id => {}
            Some(_) => {
                return Err(DomainError::Unauthorized(
                    "Cannot redeem on behalf of another user".to_string(),
                )
                .into())
            }
            None => return Err(AppError::Unauthenticated("No authenticated user".to_string())),
        }

        let item = validate(&command)?;
        let price = item.item_price;

        let balance = self.balances.get_balance(command.user_id).await?;
        if !balance.is_sufficient_for(price) {
            tracing::info!(
                user_id = %command.user_id,
                price = price.value(),
                balance = balance.value(),
                correlation_id = ?context.correlation_id,
                client_ip = ?context.client_ip,
                "Redemption refused: insufficient funds"
            );
            return Err(DomainError::insufficient_funds(price.value(), balance.value()).into());
        }

        // commit_redemption re-checks the balance atomically
        let receipt = self
            .store
            .commit_redemption(command.user_id, &item)
            .await?;

        tracing::info!(
            user_id = %command.user_id,
            transaction_id = %receipt.entry.id,
            purchase_id = %receipt.purchase.id,
            price = price.value(),
            balance = receipt.balance,
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Redemption committed"
        );

        Ok(RedeemResult {
            balance: receipt.balance,
            transaction_id: receipt.entry.id,
            purchase_id: receipt.purchase.id,
        })
    }
}

fn validate(command: &RedeemCommand) -> Result<ItemDetails, AppError> {
    let item_price = Points::from_json(command.item_price.as_ref())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid item_price: {}", e)))?;

    let item_name = command.item_name.trim();
    if item_name.is_empty() {
        return Err(AppError::InvalidRequest("item_name is required".to_string()));
    }

    let target_username = command.target_username.trim();
    if target_username.is_empty() {
        return Err(AppError::InvalidRequest(
            "target_username is required".to_string(),
        ));
    }

    Ok(ItemDetails {
        item_name: item_name.to_string(),
        item_price,
        target_username: target_username.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_validate_trims_fields() {
        let cmd = RedeemCommand::new(Uuid::new_v4(), " Peely ".to_string(), " fan ".to_string())
            .with_price(json!("800"));

        let item = validate(&cmd).unwrap();
        assert_eq!(item.item_name, "Peely");
        assert_eq!(item.target_username, "fan");
        assert_eq!(item.item_price.value(), 800);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let user = Uuid::new_v4();

        let no_price = RedeemCommand::new(user, "Peely".to_string(), "fan".to_string());
        assert!(matches!(validate(&no_price), Err(AppError::InvalidRequest(_))));

        let zero = no_price.clone().with_price(json!(0));
        assert!(matches!(validate(&zero), Err(AppError::InvalidRequest(_))));

        let blank_name = RedeemCommand::new(user, "  ".to_string(), "fan".to_string())
            .with_price(json!(100));
        assert!(matches!(validate(&blank_name), Err(AppError::InvalidRequest(_))));

        let blank_target = RedeemCommand::new(user, "Peely".to_string(), "".to_string())
            .with_price(json!(100));
        assert!(matches!(validate(&blank_target), Err(AppError::InvalidRequest(_))));
    }
}
