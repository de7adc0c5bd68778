use serde::{Deserialize, Serialize};

/// Geometry of one box in the latency box plot. Whiskers stop at the most extreme
/// observation within 1.5 IQR of the box, anything past them is an outlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
}

impl BoxStats {
    pub fn from_observations(label: &str, observations: &[i64]) -> Option<Self> {
        if observations.is_empty() {
            return None;
        }
        let mut sorted = observations.to_vec();
        sorted.sort_unstable();

        let q1 = percentile_of_sorted(&sorted, 25.0);
        let median = percentile_of_sorted(&sorted, 50.0);
        let q3 = percentile_of_sorted(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let whisker_low = sorted
            .iter()
            .map(|&v| v as f64)
            .find(|&v| v >= lower_fence)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .map(|&v| v as f64)
            .find(|&v| v <= upper_fence)
            .unwrap_or(q3);

        Some(Self {
            label: label.to_owned(),
            count: sorted.len(),
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
        })
    }
}

/// Linear interpolation between closest ranks, `sorted` must be non-empty
fn percentile_of_sorted(sorted: &[i64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let d = rank - lower as f64;
    let lo = sorted[lower] as f64;
    match sorted.get(lower + 1) {
        Some(&hi) => lo + d * (hi as f64 - lo),
        None => lo,
    }
}
