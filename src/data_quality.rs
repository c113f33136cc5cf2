// ✅ Data Quality Report - What the pipeline degraded through
//
// Nothing here changes linkage results. The engine records every irregularity
// the pipeline absorbed (blank names, ghost accounts, undated events, shared
// name keys) so a reviewer can judge how much to trust the output.

use crate::entities::MemberRecord;
use crate::identity_index::IdentityIndex;
use crate::loader::LoadStats;
use crate::reconciliation::ConsolidatedProfile;
use crate::usage::AggregationStats;
use serde::{Deserialize, Serialize};

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,    // Accepted behavior worth knowing about
    Warning, // Data degraded, results may under-count
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub code: String,
    pub count: usize,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,

    /// Name keys shared by several external accounts (sample, sorted)
    pub ambiguous_name_keys: Vec<String>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Issues: {} ({} warnings)",
            self.issues.len(),
            self.warning_count()
        )
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn find(&self, code: &str) -> Option<&QualityIssue> {
        self.issues.iter().find(|i| i.code == code)
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Max ambiguous keys listed in the report
    sample_size: usize,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine { sample_size: 20 }
    }

    pub fn with_sample_size(sample_size: usize) -> Self {
        DataQualityEngine { sample_size }
    }

    pub fn assess(
        &self,
        members: &[MemberRecord],
        index: &IdentityIndex,
        load: &LoadStats,
        usage: &AggregationStats,
        profiles: &[ConsolidatedProfile],
    ) -> QualityReport {
        let mut issues = Vec::new();

        // Rule 1: rows that failed to deserialize
        push_if(
            &mut issues,
            load.malformed_rows,
            Severity::Warning,
            "malformed_rows",
            "rows could not be parsed and were degraded to empty fields",
            "Check the source exports for broken quoting or encoding",
        );

        // Rule 2: members the name strategy can never reach
        push_if(
            &mut issues,
            members.iter().filter(|m| !m.has_name_key()).count(),
            Severity::Warning,
            "member_without_name_key",
            "members have no alphabetic name and can only link by email",
            "Fill in Client Name in the membership system",
        );

        // Rule 3: members without an email
        push_if(
            &mut issues,
            members.iter().filter(|m| m.email.is_empty()).count(),
            Severity::Warning,
            "member_without_email",
            "members have no email and can only link by name",
            "Fill in Email Address in the membership system",
        );

        // Rule 4: ghost accounts (tracked, still linked)
        push_if(
            &mut issues,
            index.ghost_count(),
            Severity::Info,
            "ghost_account",
            "external accounts use a placeholder or anonymized email",
            "Ask staff to book with the member's real email",
        );

        // Rule 5: shared name keys → every member with that name gets all of them
        let ambiguous = index.ambiguous_name_keys();
        push_if(
            &mut issues,
            ambiguous.len(),
            Severity::Info,
            "ambiguous_name_key",
            "name keys are shared by more than one external account",
            "Review members with common names for merged visit counts",
        );

        // Rule 6: duplicate emails in the secondary system
        push_if(
            &mut issues,
            index.duplicate_emails().len(),
            Severity::Info,
            "duplicate_account_email",
            "emails appear on more than one external account",
            "Merge duplicate accounts in the usage-tracking system",
        );

        // Rule 7: counted events without a usable date
        push_if(
            &mut issues,
            usage.undated_counted + usage.undated_dropped,
            Severity::Warning,
            "undated_event",
            "counted events have a missing or unparseable start date",
            "Last visit may be earlier than reality for affected members",
        );

        // Rule 8: counted events without an email
        push_if(
            &mut issues,
            usage.unkeyed_events,
            Severity::Warning,
            "event_without_email",
            "counted events have no user email and cannot be attributed",
            "Check the booking report export for blank user emails",
        );

        // Rule 9: external accounts linked to more than one member
        push_if(
            &mut issues,
            shared_link_count(profiles),
            Severity::Info,
            "shared_external_account",
            "external emails are linked to more than one member",
            "Confirm shared household logins; visits count for each member",
        );

        QualityReport {
            issues,
            ambiguous_name_keys: ambiguous
                .into_iter()
                .take(self.sample_size)
                .map(|(k, _)| k.to_string())
                .collect(),
        }
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn push_if(
    issues: &mut Vec<QualityIssue>,
    count: usize,
    severity: Severity,
    code: &str,
    issue: &str,
    recommendation: &str,
) {
    if count == 0 {
        return;
    }
    issues.push(QualityIssue {
        severity,
        code: code.to_string(),
        count,
        issue: format!("{} {}", count, issue),
        recommendation: recommendation.to_string(),
    });
}

fn shared_link_count(profiles: &[ConsolidatedProfile]) -> usize {
    let mut owners: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for p in profiles {
        for email in p.linked_emails() {
            *owners.entry(email).or_insert(0) += 1;
        }
    }
    owners.values().filter(|&&n| n > 1).count()
}

// ============================================================================
// TESTS
// ============================================================================
