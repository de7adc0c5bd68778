use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::read_to_string;
use tracing::debug;

pub const DEFAULT_PLOT_FILE: &str = "latency_comparison_plot.png";
pub const DEFAULT_REPORT_FILE: &str = "benchmark_report.md";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("Database {0} is listed more than once")]
    DuplicateDatabase(String),
    #[error("No databases configured")]
    NoDatabases,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub databases: Vec<DatabaseEntry>,
    #[serde(default = "default_plot_file")]
    pub plot_file: PathBuf,
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,
    /// Dump every parsed record here as json
    pub results_json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    pub file: PathBuf,
}

impl DatabaseEntry {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

fn default_plot_file() -> PathBuf {
    PathBuf::from(DEFAULT_PLOT_FILE)
}

fn default_report_file() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_FILE)
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            name: "ycsb-workload-a".to_owned(),
            databases: vec![
                DatabaseEntry::new("PostgreSQL", "postgresql_results.txt"),
                DatabaseEntry::new("CockroachDB", "cockroachdb_results.txt"),
                DatabaseEntry::new("FoundationDB", "foundationdb_results.txt"),
                DatabaseEntry::new("SQLite", "sqlite_results.txt"),
                DatabaseEntry::new("DuckDB", "duckdb_results.txt"),
            ],
            plot_file: default_plot_file(),
            report_file: default_report_file(),
            results_json: None,
        }
    }
}

impl ReportConfig {
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config = Self::from_yaml(&data)?;
        debug!(
            "Loaded config {} with {} databases",
            config.name,
            config.databases.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::NoDatabases);
        }
        let mut seen = HashSet::new();
        for db in &self.databases {
            if !seen.insert(db.name.as_str()) {
                return Err(ConfigError::DuplicateDatabase(db.name.clone()));
            }
        }
        Ok(())
    }

    /// Database entries with relative files joined onto `base_dir`, in config order
    pub fn resolve_files(&self, base_dir: &Path) -> Vec<DatabaseEntry> {
        self.databases
            .iter()
            .map(|db| DatabaseEntry {
                name: db.name.clone(),
                file: if db.file.is_absolute() {
                    db.file.clone()
                } else {
                    base_dir.join(&db.file)
                },
            })
            .collect()
    }
}
