use std::path::{Path, PathBuf};

use common::config::ReportConfig;
use eyre::Result;
use tracing::{debug, info};
use ycsb::{YcsbResults, load_results};
use ycsb_basic::{PlotOutcome, render_latency_plot, write_markdown_report};

/// Prefix of the key/value lines read back by the CI workflow
pub const OUTPUT_MARKER: &str = "::set-output name=";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutputs {
    pub plot_file: PathBuf,
    pub report_file: PathBuf,
    pub plot: PlotOutcome,
    pub results: YcsbResults,
}

impl ReportOutputs {
    pub fn pipeline_lines(&self) -> [String; 2] {
        [
            format!("{OUTPUT_MARKER}report_file::{}", self.report_file.display()),
            format!("{OUTPUT_MARKER}plot_file::{}", self.plot_file.display()),
        ]
    }
}

/// Parses every configured database, then writes the plot followed by the markdown
/// report that links to it. Only failures to write an output are returned as errors.
pub async fn run_report(config: &ReportConfig, base_dir: &Path) -> Result<ReportOutputs> {
    let databases = config.resolve_files(base_dir);
    debug!("Reading results for {} databases", databases.len());
    let results = load_results(&databases).await;
    let available = results.iter().filter(|(_, m)| m.is_some()).count();
    info!("{available}/{} databases have results", results.len());

    if let Some(json) = &config.results_json {
        results.write_json(json)?;
        debug!("Results written to {}", json.display());
    }

    let plot = render_latency_plot(&results, &config.plot_file)?;
    write_markdown_report(&results, &config.plot_file, &config.report_file)?;

    Ok(ReportOutputs {
        plot_file: config.plot_file.clone(),
        report_file: config.report_file.clone(),
        plot,
        results,
    })
}
