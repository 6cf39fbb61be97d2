use crate::backend::AccountId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Login status of a known account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginStatus {
    Active,
    LoggedOut,
}

/// Known account handles, in the order they were first seen
#[derive(Debug, Default, Clone)]
pub struct AccountRegistry {
    accounts: IndexMap<AccountId, LoginStatus>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working set with the accounts that passed the liveness check
    pub fn reset(&mut self, active: impl IntoIterator<Item = AccountId>) {
        self.accounts = active
            .into_iter()
            .map(|id| (id, LoginStatus::Active))
            .collect();
    }

    /// Mark an account active. Returns false if it already was.
    pub fn activate(&mut self, account: AccountId) -> bool {
        let previous = self.accounts.insert(account, LoginStatus::Active);
        previous != Some(LoginStatus::Active)
    }

    /// Mark an account logged out. Returns false for unknown or already
    /// logged-out accounts so redundant logout events become no-ops.
    pub fn deactivate(&mut self, account: AccountId) -> bool {
        match self.accounts.get_mut(&account) {
            Some(status) if *status == LoginStatus::Active => {
                *status = LoginStatus::LoggedOut;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, account: AccountId) -> bool {
        self.accounts.get(&account) == Some(&LoginStatus::Active)
    }

    pub fn status(&self, account: AccountId) -> Option<LoginStatus> {
        self.accounts.get(&account).copied()
    }

    pub fn active_ids(&self) -> Vec<AccountId> {
        self.accounts
            .iter()
            .filter(|(_, status)| **status == LoginStatus::Active)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.accounts.values().any(|s| *s == LoginStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_and_deactivate() {
        let mut registry = AccountRegistry::new();
        let a = AccountId::new(1);
        let b = AccountId::new(2);

        assert!(registry.activate(a));
        assert!(!registry.activate(a));
        assert!(registry.activate(b));
        assert_eq!(registry.active_ids(), vec![a, b]);

        assert!(registry.deactivate(a));
        assert!(!registry.deactivate(a));
        assert_eq!(registry.status(a), Some(LoginStatus::LoggedOut));
        assert_eq!(registry.active_ids(), vec![b]);
    }

    #[test]
    fn test_unknown_account_logout_is_noop() {
        let mut registry = AccountRegistry::new();
        assert!(!registry.deactivate(AccountId::new(9)));
        assert!(!registry.has_active());
    }

    #[test]
    fn test_reset_drops_previous_set() {
        let mut registry = AccountRegistry::new();
        registry.activate(AccountId::new(1));
        registry.reset([AccountId::new(3), AccountId::new(4)]);

        assert!(!registry.is_active(AccountId::new(1)));
        assert_eq!(
            registry.active_ids(),
            vec![AccountId::new(3), AccountId::new(4)]
        );
    }

    #[test]
    fn test_relogin_after_logout() {
        let mut registry = AccountRegistry::new();
        let a = AccountId::new(1);
        registry.activate(a);
        registry.deactivate(a);
        assert!(registry.activate(a));
        assert!(registry.is_active(a));
    }
}
