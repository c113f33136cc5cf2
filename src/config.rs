// ⚙️ Linkage Config - Source paths, outputs, ghost and aggregation policy
//
// Loaded from JSON; every section falls back to its defaults, and CLI flags
// override on top.

use crate::entities::GhostPolicy;
use crate::error::{LinkageError, LinkageResult};
use crate::usage::AggregationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete run configuration; every section falls back to its defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkageConfig {
    pub sources: SourceConfig,
    pub output: OutputConfig,
    pub ghost: GhostPolicy,
    pub aggregation: AggregationPolicy,

    /// Link and reconcile members on the rayon pool
    pub parallel: bool,
}

/// The three required input tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Membership export (source of truth)
    pub members: PathBuf,

    /// Usage-tracking system customer export
    pub accounts: PathBuf,

    /// Booking history report
    pub bookings: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            members: PathBuf::from("mindbody-report.csv"),
            accounts: PathBuf::from("trackmancustomers.csv"),
            bookings: PathBuf::from("basic-booking-report.csv"),
        }
    }
}

impl SourceConfig {
    /// (label, path) pairs in load order
    pub fn named(&self) -> [(&'static str, &Path); 3] {
        [
            ("members", self.members.as_path()),
            ("accounts", self.accounts.as_path()),
            ("bookings", self.bookings.as_path()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: PathBuf,

    /// Optional SQLite database receiving the final profiles
    pub sqlite_path: Option<PathBuf>,

    /// Optional JSON run report
    pub report_path: Option<PathBuf>,

    /// Append an `email:provenance` column to the CSV
    pub include_provenance: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            csv_path: PathBuf::from("reconciled_member_data.csv"),
            sqlite_path: None,
            report_path: None,
            include_provenance: false,
        }
    }
}

impl LinkageConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> LinkageResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LinkageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: LinkageConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LinkageResult<()> {
        for (label, path) in self.sources.named() {
            if path.as_os_str().is_empty() {
                return Err(LinkageError::Config(format!("{} source path is empty", label)));
            }
        }
        if self.output.csv_path.as_os_str().is_empty() {
            return Err(LinkageError::Config("output csv_path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LinkageConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.aggregation.count_undated_events);
        assert!(!config.parallel);
        assert_eq!(config.sources.named()[0].0, "members");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "parallel": true, "sources": {{ "bookings": "history.csv" }} }}"#
        )
        .unwrap();

        let config = LinkageConfig::from_file(file.path()).unwrap();
        assert!(config.parallel);
        assert_eq!(config.sources.bookings, PathBuf::from("history.csv"));
        assert_eq!(config.sources.members, PathBuf::from("mindbody-report.csv"));
        assert_eq!(config.ghost, GhostPolicy::default());
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut config = LinkageConfig::default();
        config.sources.accounts = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("accounts source path is empty"));
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = LinkageConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LinkageError::Config(_)));
    }
}
