//! skin_store Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod state;
pub mod store;
pub mod support;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
pub use domain::{Balance, Caller, DomainError, OperationContext, Points, PointsError};
