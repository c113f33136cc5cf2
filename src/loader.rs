// 📥 Loader - CSV exports → typed entities
//
// Three sources, all required. Availability is checked up front so a missing
// table aborts the run before anything is parsed, naming every missing source.
// Row-level problems never abort: a row that fails to deserialize becomes an
// all-empty row and still flows through the pipeline.

use crate::config::SourceConfig;
use crate::entities::{BookingEvent, ExternalAccount, GhostPolicy, MemberRecord};
use crate::error::{LinkageError, LinkageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// RAW ROW SHAPES (header names as exported by each system)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RawMemberRow {
    #[serde(rename = "BarcodeID", default)]
    pub barcode_id: Option<String>,

    #[serde(rename = "Client Name", default)]
    pub client_name: Option<String>,

    #[serde(rename = "Email Address", default)]
    pub email: Option<String>,

    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,

    #[serde(rename = "Membership Tier", default)]
    pub tier: Option<String>,

    #[serde(rename = "Joined On", default)]
    pub joined_on: Option<String>,
}

impl RawMemberRow {
    pub fn into_member(self) -> MemberRecord {
        MemberRecord::from_client_name(
            self.barcode_id.as_deref().unwrap_or_default(),
            self.client_name.as_deref().unwrap_or_default(),
            self.email.as_deref().unwrap_or_default(),
            self.phone.as_deref().unwrap_or_default(),
            self.tier.as_deref().unwrap_or_default(),
            self.joined_on.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAccountRow {
    #[serde(rename = "email", default)]
    pub email: Option<String>,

    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,

    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
}

impl RawAccountRow {
    pub fn into_account(self, policy: &GhostPolicy) -> ExternalAccount {
        ExternalAccount::new(
            self.email.as_deref().unwrap_or_default(),
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default(),
            policy,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBookingRow {
    #[serde(rename = "booking id", default)]
    pub booking_id: Option<String>,

    #[serde(rename = "user email", default)]
    pub user_email: Option<String>,

    #[serde(rename = "status", default)]
    pub status: Option<String>,

    #[serde(rename = "start date", default)]
    pub start_date: Option<String>,
}

impl RawBookingRow {
    pub fn into_event(self) -> BookingEvent {
        BookingEvent::new(
            self.booking_id.as_deref().unwrap_or_default(),
            self.user_email.as_deref().unwrap_or_default(),
            self.status.as_deref().unwrap_or_default(),
            self.start_date.as_deref().unwrap_or_default(),
        )
    }
}

// ============================================================================
// LOAD RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub member_rows: usize,
    pub account_rows: usize,
    pub booking_rows: usize,

    /// Rows that failed to deserialize and were degraded to empty fields
    pub malformed_rows: usize,

    /// Sources that were not valid UTF-8 and were decoded as Latin-1
    pub latin1_sources: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub members: Vec<MemberRecord>,
    pub accounts: Vec<ExternalAccount>,
    pub bookings: Vec<BookingEvent>,
    pub stats: LoadStats,
}

impl SourceTables {
    /// Load all three tables, or fail with every missing source named
    pub fn load(sources: &SourceConfig, policy: &GhostPolicy) -> LinkageResult<Self> {
        check_available(sources)?;

        let mut stats = LoadStats::default();

        let members: Vec<MemberRecord> =
            read_source::<RawMemberRow>("members", &sources.members, &mut stats)?
            .into_iter()
            .map(RawMemberRow::into_member)
            .collect();

        let accounts: Vec<ExternalAccount> =
            read_source::<RawAccountRow>("accounts", &sources.accounts, &mut stats)?
            .into_iter()
            .map(|row| row.into_account(policy))
            .collect();

        let bookings: Vec<BookingEvent> =
            read_source::<RawBookingRow>("bookings", &sources.bookings, &mut stats)?
            .into_iter()
            .map(RawBookingRow::into_event)
            .collect();

        stats.member_rows = members.len();
        stats.account_rows = accounts.len();
        stats.booking_rows = bookings.len();

        info!(
            members = stats.member_rows,
            accounts = stats.account_rows,
            bookings = stats.booking_rows,
            malformed = stats.malformed_rows,
            "loaded source tables"
        );

        Ok(SourceTables {
            members,
            accounts,
            bookings,
            stats,
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn check_available(sources: &SourceConfig) -> LinkageResult<()> {
    let missing: Vec<String> = sources
        .named()
        .iter()
        .filter(|(_, path)| !path.is_file())
        .map(|(label, path)| format!("{} ({})", label, path.display()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LinkageError::source_unavailable(missing))
    }
}

fn read_source<T>(label: &str, path: &Path, stats: &mut LoadStats) -> LinkageResult<Vec<T>>
where
    T: DeserializeOwned + Default,
{
    let bytes = std::fs::read(path)?;
    let (text, was_latin1) = decode_text(bytes);
    if was_latin1 {
        stats.latin1_sources.push(label.to_string());
    }

    let (rows, malformed) = parse_rows::<T>(label, &text)?;
    stats.malformed_rows += malformed;
    Ok(rows)
}

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to the same code point)
pub fn decode_text(bytes: Vec<u8>) -> (String, bool) {
    let (text, was_latin1) = match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(err) => (err.into_bytes().iter().map(|&b| b as char).collect(), true),
    };

    match text.strip_prefix('\u{feff}') {
        Some(stripped) => (stripped.to_string(), was_latin1),
        None => (text, was_latin1),
    }
}

/// Deserialize every row; returns (rows, malformed count)
pub fn parse_rows<T>(label: &str, text: &str) -> LinkageResult<(Vec<T>, usize)>
where
    T: DeserializeOwned + Default,
{
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    // Surface an unreadable header row as a hard csv error
    rdr.headers()?;

    let mut rows = Vec::new();
    let mut malformed = 0;

    for (line, result) in rdr.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                warn!(
                    source = label,
                    row = line + 1,
                    error = %err,
                    "malformed row degraded to empty fields"
                );
                malformed += 1;
                rows.push(T::default());
            }
        }
    }

    Ok((rows, malformed))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MEMBERS_CSV: &str = "BarcodeID,Client Name,Email Address,Phone,Membership Tier,Joined On\n\
1001,Jane Doe, Jane@Real.com ,555-0100,Core,2023-01-15\n\
1002,Cher,cher@x.com,,Social,2023-02-01\n";

    const ACCOUNTS_CSV: &str = "email,firstName,lastName\n\
x1@ghost.club,Jane,Doe\n\
anonymous@yourgolfbooking.com,Guest,\n";

    const BOOKINGS_CSV: &str = "booking id,user email,status,start date\n\
b1,x1@ghost.club,attended,2024-05-01 10:00\n\
b2,x1@ghost.club,cancelled,2024-05-02 10:00\n";

    fn write_sources(dir: &TempDir) -> SourceConfig {
        let config = SourceConfig {
            members: dir.path().join("members.csv"),
            accounts: dir.path().join("accounts.csv"),
            bookings: dir.path().join("bookings.csv"),
        };
        fs::write(&config.members, MEMBERS_CSV).unwrap();
        fs::write(&config.accounts, ACCOUNTS_CSV).unwrap();
        fs::write(&config.bookings, BOOKINGS_CSV).unwrap();
        config
    }

    #[test]
    fn test_load_all_sources() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(&dir);

        let tables = SourceTables::load(&sources, &GhostPolicy::default()).unwrap();

        assert_eq!(tables.members.len(), 2);
        assert_eq!(tables.members[0].email, "jane@real.com");
        assert_eq!(tables.members[0].name_key, "janedoe");
        assert_eq!(tables.members[1].last_name, "");

        assert_eq!(tables.accounts.len(), 2);
        assert!(tables.accounts[1].is_ghost);

        assert_eq!(tables.bookings.len(), 2);
        assert!(!tables.bookings[1].is_counted());
        assert_eq!(tables.stats.malformed_rows, 0);
    }

    #[test]
    fn test_missing_sources_named_together() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(&dir);
        fs::remove_file(&sources.members).unwrap();
        fs::remove_file(&sources.bookings).unwrap();

        let err = SourceTables::load(&sources, &GhostPolicy::default()).unwrap_err();
        match err {
            LinkageError::SourceUnavailable { sources: missing } => {
                assert_eq!(missing.len(), 2);
                assert!(missing[0].starts_with("members"));
                assert!(missing[1].starts_with("bookings"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_latin1_fallback() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(&dir);
        let mut bytes = b"BarcodeID,Client Name,Email Address\n7,Jos".to_vec();
        bytes.push(0xE9); // é in Latin-1
        bytes.extend_from_slice(b" Nunez,jose@x.com\n");
        fs::write(&sources.members, bytes).unwrap();

        let tables = SourceTables::load(&sources, &GhostPolicy::default()).unwrap();
        assert_eq!(tables.members[0].first_name, "José");
        assert_eq!(tables.members[0].name_key, "josnunez");
        assert_eq!(tables.stats.latin1_sources, vec!["members".to_string()]);
    }

    #[test]
    fn test_missing_columns_degrade_to_empty() {
        let (rows, malformed) =
            parse_rows::<RawAccountRow>("accounts", "email\nonly@x.com\n").unwrap();
        assert_eq!(malformed, 0);
        let acct = rows.into_iter().next().unwrap().into_account(&GhostPolicy::default());
        assert_eq!(acct.email, "only@x.com");
        assert_eq!(acct.name_key, "");
    }

    #[test]
    fn test_short_and_long_rows_are_tolerated() {
        let text = "booking id,user email,status,start date\nb1,a@x.com\nb2,b@x.com,attended,2024-01-01,extra\n";
        let (rows, malformed) = parse_rows::<RawBookingRow>("bookings", text).unwrap();
        assert_eq!(malformed, 0);
        assert_eq!(rows.len(), 2);
        let first = rows.into_iter().next().unwrap().into_event();
        assert_eq!(first.email, "a@x.com");
        assert_eq!(first.date, None);
    }

    #[test]
    fn test_undeserializable_row_is_kept_empty() {
        // A repeated header column makes every row fail to deserialize
        let text = "email,firstName,lastName,email\nx1@ghost.club,Jane,Doe,other@x.com\n";
        let (rows, malformed) = parse_rows::<RawAccountRow>("accounts", text).unwrap();
        assert_eq!(malformed, 1);
        assert_eq!(rows.len(), 1);

        let acct = rows.into_iter().next().unwrap().into_account(&GhostPolicy::default());
        assert_eq!(acct.email, "");
        assert_eq!(acct.first_name, "");
        assert_eq!(acct.last_name, "");
        assert_eq!(acct.name_key, "");
        assert!(!acct.is_ghost);
    }

    #[test]
    fn test_malformed_rows_counted_in_load_stats() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(&dir);
        fs::write(
            &sources.members,
            "BarcodeID,Client Name,Email Address,Email Address\n1001,Jane Doe,jane@real.com,jd@x.com\n",
        )
        .unwrap();

        let tables = SourceTables::load(&sources, &GhostPolicy::default()).unwrap();

        assert_eq!(tables.stats.malformed_rows, 1);
        assert_eq!(tables.members.len(), 1);
        assert_eq!(tables.members[0].id, "");
        assert_eq!(tables.members[0].name_key, "");
        assert!(!tables.members[0].has_name_key());
    }

    #[test]
    fn test_bom_is_stripped() {
        let (text, latin1) = decode_text("\u{feff}email\n".as_bytes().to_vec());
        assert_eq!(text, "email\n");
        assert!(!latin1);
    }
}
