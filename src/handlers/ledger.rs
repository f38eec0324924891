//! Ledger and purchase records
//!
//! Entries are written once; afterwards only their status moves, and it
//! moves through exactly one entry point per record type. There is no
//! transition guard: any status may follow any other.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AdminGrant, AdminPolicy};
use crate::domain::{
    Caller, ItemDetails, LedgerEntry, LedgerEntryView, NewLedgerEntry, Points, Purchase,
    PurchaseStatus, TransactionKind, TransactionStatus,
};
use crate::error::AppError;
use crate::store::{PurchaseScope, Store, WalletStore};

use super::{SetStatusCommand, TopUpRequestCommand};

// =========================================================================
// Ledger
// =========================================================================

/// Append-only record of balance-affecting events
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert an entry in its kind's initial status
    pub async fn record(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        amount: Points,
        item: Option<ItemDetails>,
    ) -> Result<LedgerEntry, AppError> {
        let mut entry = NewLedgerEntry::new(user_id, kind, amount);
        if let Some(item) = item {
            entry = entry.with_item(item);
        }

        let entry = self.store.record_entry(entry).await?;

        tracing::info!(
            transaction_id = %entry.id,
            user_id = %user_id,
            kind = %kind,
            amount = entry.amount,
            "Ledger entry recorded"
        );

        Ok(entry)
    }

    /// Record a pending `purchase` entry for an off-platform points payment.
    /// The balance is untouched until an operator deposits.
    pub async fn request_top_up(
        &self,
        command: TopUpRequestCommand,
    ) -> Result<LedgerEntry, AppError> {
        let amount = Points::from_json(command.amount.as_ref())
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        self.record(command.user_id, TransactionKind::Purchase, amount, None)
            .await
    }

    /// The single status overwrite for ledger entries
    pub async fn set_status(
        &self,
        grant: &AdminGrant,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<LedgerEntry, AppError> {
        let entry = self
            .store
            .set_transaction_status(transaction_id, status)
            .await?;

        tracing::info!(
            transaction_id = %transaction_id,
            status = %status,
            admin = %grant.email(),
            "Transaction status set"
        );

        Ok(entry)
    }

    /// Parse and apply an admin status change
    pub async fn advance_transaction_status(
        &self,
        grant: &AdminGrant,
        command: SetStatusCommand,
    ) -> Result<LedgerEntry, AppError> {
        let status: TransactionStatus = command
            .status
            .trim()
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("{}", e)))?;

        self.set_status(grant, command.id, status).await
    }

    /// Every entry of every user, newest first
    pub async fn list_all(&self, _grant: &AdminGrant) -> Result<Vec<LedgerEntryView>, AppError> {
        Ok(self.store.list_transactions().await?)
    }
}

// =========================================================================
// PurchaseBook
// =========================================================================

/// Redemption fulfilment records
pub struct PurchaseBook {
    store: Arc<dyn Store>,
}

impl PurchaseBook {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The caller's purchases, or everyone's for an admin
    pub async fn list_for(
        &self,
        caller: &Caller,
        policy: &AdminPolicy,
    ) -> Result<Vec<Purchase>, AppError> {
        let scope = if policy.is_admin(caller) {
            PurchaseScope::All
        } else {
            PurchaseScope::Owner(caller.user_id)
        };

        Ok(self.store.list_purchases(scope).await?)
    }

    /// The single status overwrite for purchases
    pub async fn set_status(
        &self,
        grant: &AdminGrant,
        purchase_id: Uuid,
        status: PurchaseStatus,
    ) -> Result<Purchase, AppError> {
        let purchase = self.store.set_purchase_status(purchase_id, status).await?;

        tracing::info!(
            purchase_id = %purchase_id,
            status = %status,
            admin = %grant.email(),
            "Purchase status set"
        );

        Ok(purchase)
    }

    /// Parse and apply an admin status change
    pub async fn advance_purchase_status(
        &self,
        grant: &AdminGrant,
        command: SetStatusCommand,
    ) -> Result<Purchase, AppError> {
        let status: PurchaseStatus = command
            .status
            .trim()
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("{}", e)))?;

        self.set_status(grant, command.id, status).await
    }
}
