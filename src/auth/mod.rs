//! Authentication and authorization
//!
//! Bearer tokens issued by the hosted auth provider identify the caller;
//! the admin allowlist decides what that caller may do.

mod policy;
mod token;

pub use policy::{AdminGrant, AdminPolicy};
pub use token::{bearer_token, AuthError, Claims, TokenVerifier};
