// 🗄️ SQLite exporter - Final profiles + link audit trail
//
// Only the final ranked output of a run is stored. Each write replaces the
// profile and link rows of the previous run, so nothing carries over between
// runs except the run log itself.

use crate::error::LinkageResult;
use crate::export::format_visit;
use crate::pipeline::PipelineRun;
use rusqlite::{params, Connection};

pub fn setup_database(conn: &Connection) -> LinkageResult<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    // ==========================================================================
    // Run log (one row per pipeline run)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reconciliation_runs (
            run_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            member_count INTEGER NOT NULL,
            linked_member_count INTEGER NOT NULL,
            total_visits INTEGER NOT NULL,
            output_digest TEXT,
            summary TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Consolidated profiles (ranked)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reconciled_profiles (
            member_id TEXT NOT NULL,
            rank INTEGER NOT NULL,
            run_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            tier TEXT NOT NULL,
            joined_on TEXT NOT NULL,
            total_visits INTEGER NOT NULL,
            last_visit TEXT,
            PRIMARY KEY (rank)
        )",
        [],
    )?;

    // ==========================================================================
    // Links with provenance (audit trail for every accepted match)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profile_links (
            rank INTEGER NOT NULL,
            member_id TEXT NOT NULL,
            email TEXT NOT NULL,
            provenance TEXT NOT NULL,
            is_ghost INTEGER NOT NULL,
            run_id TEXT NOT NULL,
            PRIMARY KEY (rank, email)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_profile_links_email ON profile_links(email)",
        [],
    )?;

    Ok(())
}

/// Replace stored profiles with this run's output; returns profiles written
///
/// Rows are keyed by rank rather than member id: the membership export does
/// not guarantee unique ids and every row must survive.
pub fn write_run(conn: &mut Connection, run: &PipelineRun) -> LinkageResult<usize> {
    setup_database(conn)?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM profile_links", [])?;
    tx.execute("DELETE FROM reconciled_profiles", [])?;

    for (rank, profile) in run.profiles.iter().enumerate() {
        let last_visit = profile.last_visit.map(|d| format_visit(Some(d)));
        tx.execute(
            "INSERT INTO reconciled_profiles (
                member_id, rank, run_id, first_name, last_name, email, phone, tier,
                joined_on, total_visits, last_visit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                profile.member.id,
                rank as i64 + 1,
                run.run_id,
                profile.member.first_name,
                profile.member.last_name,
                profile.member.email,
                profile.member.phone,
                profile.member.tier,
                profile.member.joined_on,
                profile.total_visits as i64,
                last_visit,
            ],
        )?;

        for link in &profile.links {
            tx.execute(
                "INSERT INTO profile_links (rank, member_id, email, provenance, is_ghost, run_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    rank as i64 + 1,
                    profile.member.id,
                    link.email,
                    link.provenance.as_str(),
                    link.is_ghost,
                    run.run_id,
                ],
            )?;
        }
    }

    let summary_json = serde_json::to_string(&run.summary)?;
    tx.execute(
        "INSERT OR REPLACE INTO reconciliation_runs (
            run_id, started_at, member_count, linked_member_count, total_visits,
            output_digest, summary
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            run.run_id,
            run.summary.started_at.to_rfc3339(),
            run.summary.members as i64,
            run.summary.linked_members as i64,
            run.summary.total_visits as i64,
            run.summary.output_digest,
            summary_json,
        ],
    )?;

    tx.commit()?;
    Ok(run.profiles.len())
}

/// Members a given external email is linked to (rank order)
pub fn members_for_email(conn: &Connection, email: &str) -> LinkageResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT member_id FROM profile_links WHERE email = ?1 ORDER BY rank")?;
    let ids = stmt
        .query_map(params![email], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn count_profiles(conn: &Connection) -> LinkageResult<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM reconciled_profiles", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_runs(conn: &Connection) -> LinkageResult<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM reconciliation_runs", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkageConfig;
    use crate::entities::{BookingEvent, ExternalAccount, GhostPolicy, MemberRecord};
    use crate::loader::SourceTables;
    use crate::pipeline::Pipeline;

    fn create_test_run() -> PipelineRun {
        let policy = GhostPolicy::default();
        let tables = SourceTables {
            members: vec![
                MemberRecord::from_client_name("1", "Jane Doe", "jane@real.com", "", "Core", ""),
                MemberRecord::from_client_name("2", "Sam Lee", "sam@x.com", "", "Core", ""),
                MemberRecord::from_client_name("3", "Sam Lee", "other@x.com", "", "Core", ""),
            ],
            accounts: vec![
                ExternalAccount::new("x1@ghost.club", "Jane", "Doe", &policy),
                ExternalAccount::new("shared@evenhouse.club", "Sam", "Lee", &policy),
            ],
            bookings: vec![
                BookingEvent::new("b1", "x1@ghost.club", "attended", "2024-05-01"),
                BookingEvent::new("b2", "shared@evenhouse.club", "attended", "2024-05-02"),
                BookingEvent::new("b3", "shared@evenhouse.club", "confirmed", "2024-05-03"),
            ],
            ..SourceTables::default()
        };
        Pipeline::new(LinkageConfig::default()).run(tables)
    }

    #[test]
    fn test_write_run() {
        let mut conn = Connection::open_in_memory().unwrap();
        let run = create_test_run();

        let written = write_run(&mut conn, &run).unwrap();
        assert_eq!(written, 3);
        assert_eq!(count_profiles(&conn).unwrap(), 3);
        assert_eq!(count_runs(&conn).unwrap(), 1);

        let top: (String, i64) = conn
            .query_row(
                "SELECT member_id, total_visits FROM reconciled_profiles WHERE rank = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(top, ("2".to_string(), 2));

        let ghost: bool = conn
            .query_row(
                "SELECT is_ghost FROM profile_links WHERE email = 'shared@evenhouse.club' LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(ghost);
    }

    #[test]
    fn test_rewrite_replaces_previous_profiles() {
        let mut conn = Connection::open_in_memory().unwrap();
        write_run(&mut conn, &create_test_run()).unwrap();
        write_run(&mut conn, &create_test_run()).unwrap();

        assert_eq!(count_profiles(&conn).unwrap(), 3);
        assert_eq!(count_runs(&conn).unwrap(), 2);
    }

    #[test]
    fn test_shared_account_is_non_exclusive() {
        let mut conn = Connection::open_in_memory().unwrap();
        write_run(&mut conn, &create_test_run()).unwrap();

        let members = members_for_email(&conn, "shared@evenhouse.club").unwrap();
        assert_eq!(members, vec!["2".to_string(), "3".to_string()]);
    }
}
