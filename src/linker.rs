// 🔗 Linker - Attach external accounts to source-of-truth members
// Two strategies, always both run, results unioned:
//   A. Name match  - primary join, since secondary-system emails are often fake
//   B. Email match - recall booster for accounts where the real email was used
//
// Known limitation: two different people with the same name collapse to the
// same key and both get linked. Accepted, not corrected here.

use crate::entities::MemberRecord;
use crate::identity_index::IdentityIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// ============================================================================
// MATCH PROVENANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchProvenance {
    /// Found through the normalized name key
    NameMatch,

    /// Found through the member's own email
    EmailMatch,
}

impl MatchProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchProvenance::NameMatch => "name_match",
            MatchProvenance::EmailMatch => "email_match",
        }
    }
}

// ============================================================================
// LINKED PROFILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub email: String,
    pub provenance: MatchProvenance,
    pub is_ghost: bool,
}

/// A member plus every distinct external email linked to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedProfile {
    pub member: MemberRecord,

    /// Distinct by email, in discovery order (Strategy A hits first)
    pub links: Vec<LinkedIdentity>,
}

impl LinkedProfile {
    pub fn linked_emails(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.email.as_str())
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    pub fn count_by(&self, provenance: MatchProvenance) -> usize {
        self.links.iter().filter(|l| l.provenance == provenance).count()
    }
}

// ============================================================================
// LINKER
// ============================================================================

pub struct Linker<'a> {
    index: &'a IdentityIndex,
}

impl<'a> Linker<'a> {
    pub fn new(index: &'a IdentityIndex) -> Self {
        Linker { index }
    }

    /// Link one member. Zero matches is a valid result.
    pub fn link(&self, member: &MemberRecord) -> LinkedProfile {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut links = Vec::new();

        // Strategy A: name key (by_name_key already refuses the empty key)
        for account in self.index.by_name_key(&member.name_key) {
            if !account.email.is_empty() && seen.insert(account.email.as_str()) {
                links.push(LinkedIdentity {
                    email: account.email.clone(),
                    provenance: MatchProvenance::NameMatch,
                    is_ghost: account.is_ghost,
                });
            }
        }

        // Strategy B: exact email, only adds what A didn't already find
        for account in self.index.by_email(&member.email) {
            if seen.insert(account.email.as_str()) {
                links.push(LinkedIdentity {
                    email: account.email.clone(),
                    provenance: MatchProvenance::EmailMatch,
                    is_ghost: account.is_ghost,
                });
            }
        }

        debug!(
            member_id = %member.id,
            name_key = %member.name_key,
            links = links.len(),
            "linked member"
        );

        LinkedProfile {
            member: member.clone(),
            links,
        }
    }

    /// Link every member, keeping input order
    pub fn link_all(&self, members: &[MemberRecord], parallel: bool) -> Vec<LinkedProfile> {
        if parallel {
            members.par_iter().map(|m| self.link(m)).collect()
        } else {
            members.iter().map(|m| self.link(m)).collect()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
