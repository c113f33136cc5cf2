// 🗂️ Identity Index - Lookups over external accounts
//
// Built once, read-only afterwards. Accounts are stored once in input order;
// both maps hold positions into that vector so every lookup returns accounts
// in a deterministic order.

use crate::entities::ExternalAccount;
use std::collections::HashMap;

pub struct IdentityIndex {
    accounts: Vec<ExternalAccount>,
    by_name_key: HashMap<String, Vec<usize>>,
    by_email: HashMap<String, Vec<usize>>,
}

impl IdentityIndex {
    /// Build both lookups in a single pass
    ///
    /// Empty name keys and empty emails are never inserted, so they can
    /// never act as join keys.
    pub fn build(accounts: Vec<ExternalAccount>) -> Self {
        let mut by_name_key: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_email: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, account) in accounts.iter().enumerate() {
            if !account.name_key.is_empty() {
                by_name_key
                    .entry(account.name_key.clone())
                    .or_default()
                    .push(pos);
            }
            if !account.email.is_empty() {
                by_email.entry(account.email.clone()).or_default().push(pos);
            }
        }

        IdentityIndex {
            accounts,
            by_name_key,
            by_email,
        }
    }

    /// All accounts sharing a name key (empty key → none)
    pub fn by_name_key(&self, key: &str) -> Vec<&ExternalAccount> {
        if key.is_empty() {
            return Vec::new();
        }
        self.resolve(self.by_name_key.get(key))
    }

    /// All accounts with this email; duplicates in the source are tolerated
    pub fn by_email(&self, email: &str) -> Vec<&ExternalAccount> {
        if email.is_empty() {
            return Vec::new();
        }
        self.resolve(self.by_email.get(email))
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&ExternalAccount> {
        positions
            .map(|ps| ps.iter().map(|&p| &self.accounts[p]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> &[ExternalAccount] {
        &self.accounts
    }

    pub fn ghost_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.is_ghost).count()
    }

    /// Accounts the name strategy can never reach
    pub fn unkeyed_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.name_key.is_empty()).count()
    }

    /// Name keys shared by more than one account, sorted
    pub fn ambiguous_name_keys(&self) -> Vec<(&str, usize)> {
        Self::shared_keys(&self.by_name_key)
    }

    /// Emails shared by more than one account, sorted
    pub fn duplicate_emails(&self) -> Vec<(&str, usize)> {
        Self::shared_keys(&self.by_email)
    }

    fn shared_keys(map: &HashMap<String, Vec<usize>>) -> Vec<(&str, usize)> {
        let mut shared: Vec<(&str, usize)> = map
            .iter()
            .filter(|(_, ps)| ps.len() > 1)
            .map(|(k, ps)| (k.as_str(), ps.len()))
            .collect();
        shared.sort();
        shared
    }
}

// ============================================================================
// TESTS
// ============================================================================
