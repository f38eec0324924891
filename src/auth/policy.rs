//! Admin authorization policy

use std::collections::HashSet;

use crate::domain::{Caller, DomainError};

/// Allowlist of operator emails, built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    emails: HashSet<String>,
}

/// Proof that the caller passed the admin check.
///
/// Privileged handlers take a grant as a parameter; only
/// [`AdminPolicy::authorize`] can produce one.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    email: String,
}

impl AdminGrant {
    /// Email of the admin the grant was issued to
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl AdminPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn is_admin(&self, caller: &Caller) -> bool {
        self.emails.contains(&caller.email.trim().to_lowercase())
    }

    /// Check the caller against the allowlist
    pub fn authorize(&self, caller: &Caller) -> Result<AdminGrant, DomainError> {
        if !self.is_admin(caller) {
            tracing::warn!(
                user_id = %caller.user_id,
                "Privileged operation refused for non-admin caller"
            );
            return Err(DomainError::Unauthorized(
                "Admin privileges required".to_string(),
            ));
        }

        Ok(AdminGrant {
            email: caller.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_admin_match_is_case_insensitive() {
        let policy = AdminPolicy::new(["Ops@Store.gg "]);
        let caller = Caller::new(Uuid::new_v4(), "ops@store.GG");

        assert!(policy.is_admin(&caller));
        let grant = policy.authorize(&caller).unwrap();
        assert_eq!(grant.email(), "ops@store.GG");
    }

    #[test]
    fn test_non_admin_refused() {
        let policy = AdminPolicy::new(["ops@store.gg"]);
        let caller = Caller::new(Uuid::new_v4(), "player@store.gg");

        assert!(matches!(
            policy.authorize(&caller),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_empty_policy_refuses_everyone() {
        let policy = AdminPolicy::default();
        assert!(!policy.is_admin(&Caller::new(Uuid::new_v4(), "")));
    }
}
