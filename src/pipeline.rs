// 🔄 Pipeline - Load → index/aggregate → link → reconcile → rank → export
//
// `run` is pure over already-loaded tables. `execute` wraps it with the
// loader and exporters; a missing source aborts before anything is written.

use crate::config::LinkageConfig;
use crate::data_quality::{DataQualityEngine, QualityReport};
use crate::db;
use crate::error::LinkageResult;
use crate::export::{self, ExportOptions};
use crate::identity_index::IdentityIndex;
use crate::linker::{Linker, MatchProvenance};
use crate::loader::{LoadStats, SourceTables};
use crate::ranking::rank_profiles;
use crate::reconciliation::{ConsolidatedProfile, ReconciliationEngine};
use crate::usage::{AggregationStats, UsageAggregator};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// RUN RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,

    pub members: usize,
    pub accounts: usize,
    pub bookings: usize,

    pub linked_members: usize,
    pub unlinked_members: usize,
    pub name_links: usize,
    pub email_links: usize,
    pub ghost_links: usize,
    pub total_visits: u64,

    pub load: LoadStats,
    pub aggregation: AggregationStats,
    pub quality: QualityReport,

    /// SHA-256 of the exported CSV, set once it has been written
    pub output_digest: Option<String>,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} members ({} linked, {} unlinked), {} links ({} by name, {} by email, {} ghost), {} visits",
            self.members,
            self.linked_members,
            self.unlinked_members,
            self.name_links + self.email_links,
            self.name_links,
            self.email_links,
            self.ghost_links,
            self.total_visits
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: String,

    /// Ranked by total visits, descending
    pub profiles: Vec<ConsolidatedProfile>,

    pub summary: RunSummary,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: LinkageConfig,
}

impl Pipeline {
    pub fn new(config: LinkageConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &LinkageConfig {
        &self.config
    }

    /// Load the sources named in the config
    pub fn load(&self) -> LinkageResult<SourceTables> {
        SourceTables::load(&self.config.sources, &self.config.ghost)
    }

    /// Pure linkage over loaded tables. Never fails.
    pub fn run(&self, tables: SourceTables) -> PipelineRun {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let parallel = self.config.parallel;

        let SourceTables {
            members,
            accounts,
            bookings,
            stats: load,
        } = tables;
        let account_count = accounts.len();

        // Built once, read-only from here on
        let index = IdentityIndex::build(accounts);
        let usage = UsageAggregator::with_policy(&bookings, &self.config.aggregation);
        info!(
            accounts = index.len(),
            ghosts = index.ghost_count(),
            usage_emails = usage.len(),
            "built identity index and usage summaries"
        );

        let linked = Linker::new(&index).link_all(&members, parallel);
        let reconciled = ReconciliationEngine::new(&usage).reconcile_all(linked, parallel);
        let profiles = rank_profiles(reconciled);

        let quality =
            DataQualityEngine::new().assess(&members, &index, &load, usage.stats(), &profiles);

        let linked_members = profiles.iter().filter(|p| !p.links.is_empty()).count();
        let summary = RunSummary {
            run_id: run_id.clone(),
            started_at,
            members: members.len(),
            accounts: account_count,
            bookings: bookings.len(),
            linked_members,
            unlinked_members: profiles.len() - linked_members,
            name_links: profiles
                .iter()
                .map(|p| p.count_by(MatchProvenance::NameMatch))
                .sum(),
            email_links: profiles
                .iter()
                .map(|p| p.count_by(MatchProvenance::EmailMatch))
                .sum(),
            ghost_links: profiles.iter().map(|p| p.ghost_link_count()).sum(),
            total_visits: profiles.iter().map(|p| p.total_visits).sum(),
            load,
            aggregation: usage.stats().clone(),
            quality,
            output_digest: None,
        };

        info!(run_id = %run_id, "{}", summary.summary());

        PipelineRun {
            run_id,
            profiles,
            summary,
        }
    }

    /// Write every configured output; fills in the output digest
    pub fn export(&self, run: &mut PipelineRun) -> LinkageResult<()> {
        let output = &self.config.output;
        let options = ExportOptions {
            include_provenance: output.include_provenance,
        };

        let digest = export::write_csv(&run.profiles, &output.csv_path, options)?;
        info!(path = %output.csv_path.display(), digest = %digest, "wrote csv");
        run.summary.output_digest = Some(digest);

        if let Some(sqlite_path) = &output.sqlite_path {
            let mut conn = Connection::open(sqlite_path)?;
            let written = db::write_run(&mut conn, run)?;
            info!(path = %sqlite_path.display(), profiles = written, "wrote sqlite");
        }

        if let Some(report_path) = &output.report_path {
            let json = serde_json::to_string_pretty(&run.summary)?;
            std::fs::write(report_path, json)?;
            info!(path = %report_path.display(), "wrote run report");
        }

        Ok(())
    }

    /// Load, link, export. A missing source aborts with nothing written.
    pub fn execute(&self) -> LinkageResult<PipelineRun> {
        let tables = self.load()?;
        let mut run = self.run(tables);
        self.export(&mut run)?;
        Ok(run)
    }
}

// ============================================================================
// TESTS
// ============================================================================
