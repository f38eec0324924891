//! Ledger kinds and status values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unknown kind or status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {field}: {value}")]
pub struct ParseStatusError {
    pub field: &'static str,
    pub value: String,
}

/// What produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    /// Admin-issued credit
    TopUp,
    /// Points spent on a catalog item
    Redeem,
    /// User announcement of an off-platform points package payment
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::TopUp => "top-up",
            TransactionKind::Redeem => "redeem",
            TransactionKind::Purchase => "purchase",
        }
    }

    /// Status a freshly recorded entry of this kind starts in
    pub fn initial_status(&self) -> TransactionStatus {
        match self {
            TransactionKind::TopUp => TransactionStatus::Completed,
            TransactionKind::Redeem | TransactionKind::Purchase => TransactionStatus::Pending,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-up" => Ok(TransactionKind::TopUp),
            "redeem" => Ok(TransactionKind::Redeem),
            "purchase" => Ok(TransactionKind::Purchase),
            _ => Err(ParseStatusError {
                field: "transaction kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            _ => Err(ParseStatusError {
                field: "transaction status",
                value: s.to_string(),
            }),
        }
    }
}

/// Fulfilment status of a redeemed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Processing => "processing",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseStatus::Pending),
            "processing" => Ok(PurchaseStatus::Processing),
            "completed" => Ok(PurchaseStatus::Completed),
            "cancelled" => Ok(PurchaseStatus::Cancelled),
            _ => Err(ParseStatusError {
                field: "purchase status",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_per_kind() {
        assert_eq!(TransactionKind::TopUp.initial_status(), TransactionStatus::Completed);
        assert_eq!(TransactionKind::Redeem.initial_status(), TransactionStatus::Pending);
        assert_eq!(TransactionKind::Purchase.initial_status(), TransactionStatus::Pending);
    }

    #[test]
    fn test_kind_wire_format() {
        assert_eq!(serde_json::to_string(&TransactionKind::TopUp).unwrap(), "\"top-up\"");
        assert_eq!("top-up".parse::<TransactionKind>().unwrap(), TransactionKind::TopUp);
    }

    #[test]
    fn test_purchase_status_accepts_processing() {
        assert_eq!("processing".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Processing);
        assert!("processing".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_unknown_status_error_message() {
        let err = "shipped".parse::<PurchaseStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown purchase status: shipped");
    }
}
