//! Points type
//!
//! Domain primitive for store points. Points are whole units; every
//! positive quantity that moves a balance is validated at construction
//! time so an invalid price or deposit can never reach the ledger.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Largest quantity accepted in a single operation
const MAX_POINTS: i64 = 1_000_000_000;

/// Points represents a validated, strictly positive quantity of points.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Value never exceeds one billion
///
/// # Example
/// ```
/// use skin_store::domain::Points;
///
/// let price = Points::new(1200).unwrap();
/// assert_eq!(price.value(), 1200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Points(i64);

/// Errors that can occur when creating Points
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointsError {
    #[error("Points must be positive (got {0})")]
    NotPositive(i64),

    #[error("Points must be a whole number")]
    NotWhole,

    #[error("Points exceed maximum allowed value ({MAX_POINTS})")]
    Overflow,

    #[error("Invalid points format: {0}")]
    ParseError(String),

    #[error("Points value is missing")]
    Missing,
}

impl Points {
    /// Create new Points with validation.
    pub fn new(value: i64) -> Result<Self, PointsError> {
        if value <= 0 {
            return Err(PointsError::NotPositive(value));
        }
        if value > MAX_POINTS {
            return Err(PointsError::Overflow);
        }
        Ok(Self(value))
    }

    /// Parse points out of a loosely typed JSON value.
    ///
    /// Accepts integers, floats without a fractional part, and numeric strings.
    pub fn from_json(value: Option<&Value>) -> Result<Self, PointsError> {
        match value {
            None | Some(Value::Null) => Err(PointsError::Missing),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Points::new(i);
                }
                let f = n
                    .as_f64()
                    .ok_or_else(|| PointsError::ParseError(n.to_string()))?;
                if f.fract() != 0.0 {
                    return Err(PointsError::NotWhole);
                }
                if f <= 0.0 {
                    return Err(PointsError::NotPositive(f as i64));
                }
                if f > MAX_POINTS as f64 {
                    return Err(PointsError::Overflow);
                }
                Points::new(f as i64)
            }
            Some(Value::String(s)) => s.trim().parse(),
            Some(other) => Err(PointsError::ParseError(other.to_string())),
        }
    }

    /// Get the underlying value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Points {
    type Err = PointsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|_| PointsError::ParseError(s.to_string()))?;
        Points::new(value)
    }
}

impl TryFrom<i64> for Points {
    type Error = PointsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Points::new(value)
    }
}

impl From<Points> for i64 {
    fn from(points: Points) -> Self {
        points.0
    }
}

/// Balance is a user's spendable total. Unlike Points, a balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(i64);

impl Balance {
    /// Create a balance (zero or positive)
    pub fn new(value: i64) -> Result<Self, PointsError> {
        if value < 0 {
            return Err(PointsError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if the balance covers a debit of `points`
    pub fn is_sufficient_for(&self, points: Points) -> bool {
        self.0 >= points.value()
    }

    /// Apply a signed delta, refusing to go below zero
    pub fn apply(&self, delta: i64) -> Option<Balance> {
        self.0
            .checked_add(delta)
            .filter(|v| *v >= 0)
            .map(Balance)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
