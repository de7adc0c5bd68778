use std::{fmt::Write as _, fs, path::Path};

use common::util::{ensure_parent_dir, format_optional};
use eyre::{Context, Result};
use tracing::info;
use ycsb::YcsbResults;

const TABLE_HEADER: &str = "| Database         | Overall Throughput (ops/sec) | UPDATE Avg Latency (us) | READ Avg Latency (us) |\n\
                            |------------------|------------------------------|-------------------------|-----------------------|\n";

const NOTES: &[&str] = &[
    "**Workload**: YCSB Workload A (50% Read, 50% Update).",
    "**Latency Data**: The box plot visualizes the 0-1000us range primarily. Quartiles are \
     derived from YCSB's coarse one-bucket-per-millisecond histogram, so finer percentiles \
     need `measurementtype=hdrhistogram` or `timeseries` and post-processing of the raw output.",
    "**FoundationDB**: Results for FoundationDB come from its own YCSB binding, which may \
     report metrics differently than the JDBC binding used for the other databases.",
];

/// Markdown summary with one table row per database sorted by name, followed by the
/// plot reference and static notes
pub fn render_markdown(results: &YcsbResults, plot_path: &Path) -> String {
    let mut md = String::new();
    md.push_str("# YCSB Benchmark Comparison Report\n\n");
    md.push_str("This report summarizes the YCSB Workload A results for various databases.\n\n");

    md.push_str("## Overall Performance Summary\n\n");
    md.push_str(TABLE_HEADER);
    for (name, metrics) in results.sorted() {
        let throughput = format_optional(metrics.and_then(|m| m.overall.throughput_ops_per_sec));
        let update = format_optional(metrics.and_then(|m| m.update.average_latency_us));
        let read = format_optional(metrics.and_then(|m| m.read.average_latency_us));
        _ = writeln!(
            md,
            "| {name:<16} | {throughput:<28} | {update:<23} | {read:<21} |"
        );
    }
    md.push('\n');

    md.push_str("## UPDATE Latency Distribution\n\n");
    match plot_path.file_name().filter(|_| plot_path.exists()) {
        Some(file_name) => {
            _ = writeln!(
                md,
                "![UPDATE Latency Box Plot]({})\n",
                file_name.to_string_lossy()
            );
            md.push_str(
                "*The box plot above shows the distribution of UPDATE latencies (in microseconds). \
                 Outliers are not shown for clarity.*\n",
            );
        }
        None => md.push_str("Latency plot could not be generated.\n"),
    }

    md.push_str("\n## Notes\n");
    for note in NOTES {
        _ = writeln!(md, "- {note}");
    }
    md
}

pub fn write_markdown_report(
    results: &YcsbResults,
    plot_path: &Path,
    out_path: &Path,
) -> Result<()> {
    ensure_parent_dir(out_path)?;
    fs::write(out_path, render_markdown(results, plot_path))
        .context(format!("Write markdown report {}", out_path.display()))?;
    info!("Report covers {} databases", results.len());
    println!("Markdown report generated: {}", out_path.display());
    Ok(())
}
