//! Domain module
//!
//! Core domain types and business rules.

pub mod context;
pub mod error;
pub mod points;
pub mod records;
pub mod status;

pub use context::{Caller, OperationContext};
pub use error::DomainError;
pub use points::{Balance, Points, PointsError};
pub use records::{
    Chat, ChatSummary, ItemDetails, LedgerEntry, LedgerEntryView, Message, NewLedgerEntry,
    Notification, Profile, Purchase, RedemptionReceipt, TopUpReceipt,
};
pub use status::{ParseStatusError, PurchaseStatus, TransactionKind, TransactionStatus};
