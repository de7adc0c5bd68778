use std::path::PathBuf;

use clap::Parser;
use common::config::ReportConfig;
use eyre::Result;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &["common", "ycsb", "ycsb_basic"];

/// Summarize YCSB results for several databases into a latency plot and a markdown report
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// YAML config listing the databases and their results files
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory relative results files are read from
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
    #[arg(long)]
    plot_file: Option<PathBuf>,
    #[arg(long)]
    report_file: Option<PathBuf>,
    /// Also dump the parsed results as json
    #[arg(long)]
    results_json: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "ycsb-report.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("ycsb_report={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let mut config = match &args.config {
        Some(path) => ReportConfig::load(path).await?,
        None => ReportConfig::default(),
    };
    if let Some(plot_file) = args.plot_file {
        config.plot_file = plot_file;
    }
    if let Some(report_file) = args.report_file {
        config.report_file = report_file;
    }
    if args.results_json.is_some() {
        config.results_json = args.results_json;
    }

    let outputs = match ycsb_report::run_report(&config, &args.dir).await {
        Ok(outputs) => outputs,
        Err(err) => {
            error!("{err:#?}");
            return Err(err);
        }
    };

    for line in outputs.pipeline_lines() {
        println!("{line}");
    }
    Ok(())
}
