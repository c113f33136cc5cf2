// 👤 Member Entity - Source of truth identity
//
// The membership id is the only stable identifier we trust. Email is
// normalized for Strategy B lookups, names are kept for display and folded
// into `name_key` for Strategy A lookups.

use crate::normalize::{name_key, normalize_email, normalize_name, split_client_name};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,

    /// Lowercased + trimmed
    pub email: String,

    pub phone: String,
    pub tier: String,
    pub joined_on: String,

    /// Derived: alphabetic-only lowercase of first + last
    pub name_key: String,
}

impl MemberRecord {
    /// Build a member from already-split name parts
    pub fn new(
        id: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        phone: &str,
        tier: &str,
        joined_on: &str,
    ) -> Self {
        let first_name = normalize_name(Some(first_name));
        let last_name = normalize_name(Some(last_name));
        let name_key = name_key(&first_name, &last_name);

        MemberRecord {
            id: id.trim().to_string(),
            first_name,
            last_name,
            email: normalize_email(Some(email)),
            phone: phone.trim().to_string(),
            tier: tier.trim().to_string(),
            joined_on: joined_on.trim().to_string(),
            name_key,
        }
    }

    /// Build a member from a single "Client Name" cell (membership export shape)
    pub fn from_client_name(
        id: &str,
        client_name: &str,
        email: &str,
        phone: &str,
        tier: &str,
        joined_on: &str,
    ) -> Self {
        let (first, last) = split_client_name(client_name);
        Self::new(id, &first, &last, email, phone, tier, joined_on)
    }

    /// Members with a blank name can only ever be linked by email
    pub fn has_name_key(&self) -> bool {
        !self.name_key.is_empty()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
