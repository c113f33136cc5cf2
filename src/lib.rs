// Member Linkage - Core Library
// Links membership records to usage-tracking accounts and folds booking
// history into one consolidated profile per member.

pub mod normalize;      // Canonical keys from noisy name/email fields
pub mod entities;       // MemberRecord, ExternalAccount, BookingEvent
pub mod identity_index; // Lookups by name key and email
pub mod usage;          // Per-email usage summaries
pub mod linker;         // Two-strategy matching + dedup
pub mod reconciliation; // Per-member fold of usage summaries
pub mod ranking;        // Stable sort by visits
pub mod data_quality;   // What the run degraded through
pub mod loader;         // CSV sources → entities
pub mod export;         // CSV output + email mapping reader
pub mod db;             // SQLite output
pub mod pipeline;       // End-to-end run
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use normalize::{name_key, normalize_email, normalize_name, parse_event_date, split_client_name};
pub use entities::{BookingEvent, BookingStatus, ExternalAccount, GhostPolicy, MemberRecord};
pub use identity_index::IdentityIndex;
pub use usage::{AggregationPolicy, AggregationStats, UsageAggregator, UsageSummary};
pub use linker::{LinkedIdentity, LinkedProfile, Linker, MatchProvenance};
pub use reconciliation::{ConsolidatedProfile, ReconciliationEngine};
pub use ranking::rank_profiles;
pub use data_quality::{DataQualityEngine, QualityIssue, QualityReport, Severity};
pub use loader::{LoadStats, SourceTables};
pub use export::{read_email_mapping, render_csv, write_csv, ExportOptions};
pub use pipeline::{Pipeline, PipelineRun, RunSummary};
pub use config::{LinkageConfig, OutputConfig, SourceConfig};
pub use error::{LinkageError, LinkageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
