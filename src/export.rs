// 📤 Exporters - Ranked profiles → flat table
//
// The CSV is rendered to memory first so the run digest covers exactly the
// bytes written to disk.

use crate::error::LinkageResult;
use crate::reconciliation::ConsolidatedProfile;
use chrono::{NaiveDateTime, Timelike};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

pub const BASE_COLUMNS: &[&str] = &[
    "member_id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "tier",
    "joined_on",
    "total_visits",
    "last_visit",
    "linked_emails",
];

pub const PROVENANCE_COLUMN: &str = "link_provenance";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_provenance: bool,
}

/// `YYYY-MM-DD` for midnight (date-only sources), full timestamp otherwise
pub fn format_visit(visit: Option<NaiveDateTime>) -> String {
    match visit {
        None => String::new(),
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Render ranked profiles as CSV bytes
pub fn render_csv(
    profiles: &[ConsolidatedProfile],
    options: ExportOptions,
) -> LinkageResult<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());

    let mut headers: Vec<&str> = BASE_COLUMNS.to_vec();
    if options.include_provenance {
        headers.push(PROVENANCE_COLUMN);
    }
    w.write_record(&headers)?;

    for p in profiles {
        let linked = p.linked_emails().collect::<Vec<_>>().join(", ");
        let mut record = vec![
            p.member.id.clone(),
            p.member.first_name.clone(),
            p.member.last_name.clone(),
            p.member.email.clone(),
            p.member.phone.clone(),
            p.member.tier.clone(),
            p.member.joined_on.clone(),
            p.total_visits.to_string(),
            format_visit(p.last_visit),
            linked,
        ];
        if options.include_provenance {
            record.push(
                p.links
                    .iter()
                    .map(|l| format!("{}:{}", l.email, l.provenance.as_str()))
                    .collect::<Vec<_>>()
                    .join("; "),
            );
        }
        w.write_record(&record)?;
    }

    let bytes = w
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(bytes)
}

/// Hex SHA-256 of the exported bytes
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write the CSV and return its digest
pub fn write_csv(
    profiles: &[ConsolidatedProfile],
    path: &Path,
    options: ExportOptions,
) -> LinkageResult<String> {
    let bytes = render_csv(profiles, options)?;
    std::fs::write(path, &bytes)?;
    Ok(digest(&bytes))
}

// ============================================================================
// EMAIL MAPPING (read back by downstream importers)
// ============================================================================

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    linked_emails: Option<String>,
}

/// linked email → member email, from a previously exported CSV
///
/// Lets a booking importer rewrite placeholder addresses to the member's real
/// one. When two members link the same address the later row wins.
pub fn read_email_mapping(path: &Path) -> LinkageResult<HashMap<String, String>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut mapping = HashMap::new();

    for result in rdr.deserialize::<MappingRow>() {
        let row = result?;
        let real = row.email.unwrap_or_default().trim().to_lowercase();
        if real.is_empty() {
            continue;
        }
        for linked in row.linked_emails.unwrap_or_default().split(',') {
            let linked = linked.trim().to_lowercase();
            if !linked.is_empty() {
                mapping.insert(linked, real.clone());
            }
        }
    }

    Ok(mapping)
}

// ============================================================================
// TESTS
// ============================================================================
