// 🎭 External Account Entity - Usage-tracking system identity
//
// Emails in the secondary system are unreliable: front desk staff book on
// behalf of members with club addresses, and the booking vendor substitutes
// an anonymous address when the guest declines to share one. Those accounts
// are flagged as "ghost" but still linked and counted.

use crate::normalize::{name_key, normalize_email, normalize_name};
use serde::{Deserialize, Serialize};

// ============================================================================
// GHOST POLICY
// ============================================================================

/// Rules for recognizing placeholder / anonymized emails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostPolicy {
    /// Exact addresses used as placeholders
    pub placeholder_emails: Vec<String>,

    /// Domains whose addresses are all placeholders (without the "@").
    /// Matched as an "@domain" substring.
    pub placeholder_domains: Vec<String>,

    /// Substrings that mark an anonymized address
    pub anonymized_markers: Vec<String>,
}

impl GhostPolicy {
    /// Policy that flags nothing
    pub fn none() -> Self {
        GhostPolicy {
            placeholder_emails: Vec::new(),
            placeholder_domains: Vec::new(),
            anonymized_markers: Vec::new(),
        }
    }

    /// Check a normalized email against the policy
    pub fn is_ghost(&self, email: &str) -> bool {
        if email.is_empty() {
            return false;
        }

        if self.placeholder_emails.iter().any(|p| p.eq_ignore_ascii_case(email)) {
            return true;
        }

        // "@domain" anywhere in the address, so subdomain forms also match
        let lowered = email.to_lowercase();
        let in_placeholder_domain = self
            .placeholder_domains
            .iter()
            .filter(|d| !d.is_empty())
            .any(|d| lowered.contains(&format!("@{}", d.to_lowercase())));
        if in_placeholder_domain {
            return true;
        }

        self.anonymized_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| email.contains(m.to_lowercase().as_str()))
    }
}

impl Default for GhostPolicy {
    fn default() -> Self {
        GhostPolicy {
            placeholder_emails: vec![
                "anonymous@yourgolfbooking.com".to_string(),
                "booking@evenhouse.club".to_string(),
                "bookings@evenhouse.club".to_string(),
            ],
            placeholder_domains: vec!["evenhouse.club".to_string()],
            anonymized_markers: vec!["anonymous".to_string()],
        }
    }
}

// ============================================================================
// EXTERNAL ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    /// Lowercased + trimmed
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Derived: alphabetic-only lowercase of first + last
    pub name_key: String,

    /// Derived: email matches a placeholder/anonymization pattern
    pub is_ghost: bool,
}

impl ExternalAccount {
    pub fn new(email: &str, first_name: &str, last_name: &str, policy: &GhostPolicy) -> Self {
        let email = normalize_email(Some(email));
        let first_name = normalize_name(Some(first_name));
        let last_name = normalize_name(Some(last_name));
        let name_key = name_key(&first_name, &last_name);
        let is_ghost = policy.is_ghost(&email);

        ExternalAccount {
            email,
            first_name,
            last_name,
            name_key,
            is_ghost,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
