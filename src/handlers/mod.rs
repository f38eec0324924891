//! Command Handlers module
//!
//! Handlers that orchestrate wallet operations on top of the store:
//! balance access, the ledger, redemptions and admin deposits.

mod balance;
mod commands;
mod deposit_handler;
mod ledger;
mod redeem_handler;


pub use balance::BalanceService;
pub use commands::*;
pub use deposit_handler::DepositHandler;
pub use ledger::{Ledger, PurchaseBook};
pub use redeem_handler::RedeemHandler;
