use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::read_to_string;
use tracing::{trace, warn};

pub const OVERALL_MARKER: &str = "[OVERALL]";
pub const UPDATE_MARKER: &str = "[UPDATE]";
pub const READ_MARKER: &str = "[READ]";

/// Upper bound on the observations a histogram may expand to
pub const MAX_OBSERVATIONS: u64 = 50_000_000;

/// Bare `latency,count` rows plus the overflow bucket row. Any line starting with a
/// digit and containing a comma qualifies.
static HISTOGRAM_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:0,|>1000|\d.*,)").unwrap());

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Could not read {0}: {1}")]
    FileUnavailable(PathBuf, std::io::Error),
    #[error("Line {line}: invalid value '{value}' for {label}")]
    InvalidValue {
        line: usize,
        label: String,
        value: String,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Histogram holds {0} observations, at most {MAX_OBSERVATIONS} can be expanded")]
pub struct TooManyObservations(pub u128);

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub runtime_ms: Option<f64>,
    pub throughput_ops_per_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl OverallMetrics {
    fn set(&mut self, label: &str, value: f64) {
        match label {
            "RunTime(ms)" => self.runtime_ms = Some(value),
            "Throughput(ops/sec)" => self.throughput_ops_per_sec = Some(value),
            _ => {
                self.extra.insert(label.to_owned(), value);
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpSection {
    pub operation_count: Option<f64>,
    pub average_latency_us: Option<f64>,
    pub min_latency_us: Option<f64>,
    pub max_latency_us: Option<f64>,
    pub p95_latency_us: Option<f64>,
    pub p99_latency_us: Option<f64>,
    pub return_ok_count: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    /// `(latency_us, count)` buckets in file order
    pub latency_distribution: Vec<(i64, i64)>,
}

impl OpSection {
    fn set(&mut self, label: &str, value: f64) {
        let field = match label {
            "Operations" => &mut self.operation_count,
            "AverageLatency(us)" => &mut self.average_latency_us,
            "MinLatency(us)" => &mut self.min_latency_us,
            "MaxLatency(us)" => &mut self.max_latency_us,
            "95thPercentileLatency(us)" => &mut self.p95_latency_us,
            "99thPercentileLatency(us)" => &mut self.p99_latency_us,
            "Return=OK" => &mut self.return_ok_count,
            _ => {
                self.extra.insert(label.to_owned(), value);
                return;
            }
        };
        *field = Some(value);
    }

    /// Every bucket repeated `count` times, negative counts contribute nothing
    pub fn latencies(&self) -> Result<Vec<i64>, TooManyObservations> {
        expand_distribution(&self.latency_distribution)
    }
}

/// Sum of the non-negative bucket counts, wide enough that no histogram overflows it
pub fn observation_count(distribution: &[(i64, i64)]) -> u128 {
    distribution
        .iter()
        .filter_map(|&(_, count)| u128::try_from(count).ok())
        .sum()
}

pub fn expand_distribution(
    distribution: &[(i64, i64)],
) -> Result<Vec<i64>, TooManyObservations> {
    let total = observation_count(distribution);
    let capacity = u64::try_from(total)
        .ok()
        .filter(|&n| n <= MAX_OBSERVATIONS)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(TooManyObservations(total))?;
    let mut latencies = Vec::with_capacity(capacity);
    for &(latency, count) in distribution {
        if let Ok(count) = usize::try_from(count) {
            latencies.extend(std::iter::repeat_n(latency, count));
        }
    }
    Ok(latencies)
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub overall: OverallMetrics,
    pub update: OpSection,
    pub read: OpSection,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Section {
    #[default]
    None,
    Update,
    Read,
}

impl Section {
    fn from_marker(line: &str) -> Option<Self> {
        if line.starts_with(UPDATE_MARKER) {
            Some(Self::Update)
        } else if line.starts_with(READ_MARKER) {
            Some(Self::Read)
        } else {
            None
        }
    }
}

fn parse_value(line: usize, label: &str, value: &str) -> Result<f64, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue {
        line,
        label: label.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_histogram_row(line: &str) -> Option<(i64, i64)> {
    let (latency, count) = line.split_once(',')?;
    if count.contains(',') {
        return None;
    }
    Some((latency.trim().parse().ok()?, count.trim().parse().ok()?))
}

pub fn parse_output(output: &str) -> Result<MetricsRecord, ParseError> {
    let mut record = MetricsRecord::default();
    let mut current = Section::None;

    for (idx, line) in output.lines().enumerate() {
        let line = line.trim();
        let line_no = idx + 1;

        if line.starts_with(OVERALL_MARKER) {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() == 3 {
                let value = parse_value(line_no, parts[1], parts[2])?;
                record.overall.set(parts[1], value);
            }
        } else if let Some(section) = Section::from_marker(line) {
            current = section;
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() >= 3 {
                let value = parse_value(line_no, parts[1], parts[2])?;
                let target = match section {
                    Section::Update => &mut record.update,
                    _ => &mut record.read,
                };
                target.set(parts[1], value);
            }
        } else if current != Section::None && HISTOGRAM_ROW.is_match(line) {
            let target = match current {
                Section::Update => &mut record.update,
                _ => &mut record.read,
            };
            match parse_histogram_row(line) {
                Some(bucket) => target.latency_distribution.push(bucket),
                None => trace!("Dropping histogram row {line_no}: {line}"),
            }
        }
    }
    Ok(record)
}

pub async fn read_results(path: &Path) -> Result<MetricsRecord, ParseError> {
    let data = read_to_string(path)
        .await
        .map_err(|e| ParseError::FileUnavailable(path.to_path_buf(), e))?;
    parse_output(&data)
}

/// Parses one results file, any failure is logged and reported as `None`
pub async fn parse_file(path: &Path) -> Option<MetricsRecord> {
    match read_results(path).await {
        Ok(record) => Some(record),
        Err(err @ ParseError::FileUnavailable(..)) => {
            warn!("{err}");
            None
        }
        Err(err) => {
            warn!("Error parsing {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_row_shapes() {
        assert!(HISTOGRAM_ROW.is_match("0,12"));
        assert!(HISTOGRAM_ROW.is_match("17,3"));
        assert!(HISTOGRAM_ROW.is_match(">1000,0"));
        assert!(!HISTOGRAM_ROW.is_match("[UPDATE], Operations, 5"));
        assert!(!HISTOGRAM_ROW.is_match("12"));
        assert!(!HISTOGRAM_ROW.is_match(""));
    }

    #[test]
    fn histogram_row_needs_two_integers() {
        assert_eq!(parse_histogram_row("3, 40"), Some((3, 40)));
        assert_eq!(parse_histogram_row(">1000,0"), None);
        assert_eq!(parse_histogram_row("1,2,3"), None);
        assert_eq!(parse_histogram_row("1.5,2"), None);
    }

    #[test]
    fn expansion_ignores_negative_counts() {
        assert_eq!(
            expand_distribution(&[(4, 2), (9, -1), (1, 1)]),
            Ok(vec![4, 4, 1])
        );
        assert_eq!(observation_count(&[(4, 2), (9, -1), (1, 1)]), 3);
    }
}
