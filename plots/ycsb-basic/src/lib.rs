use std::{path::Path, sync::OnceLock};

use common::util::{ensure_parent_dir, remove_plot_data, write_plot_data};
use eyre::{Context, Result};
use itertools::{Itertools, MinMaxResult};
use plotters::{
    coord::Shift,
    prelude::*,
    style::{
        FontStyle, register_font,
        text_anchor::{HPos, Pos, VPos},
    },
};
use tracing::{debug, info, warn};
use ycsb::YcsbResults;

pub mod markdown;
pub mod stats;

pub use markdown::{render_markdown, write_markdown_report};
pub use stats::BoxStats;

pub const PLOT_SIZE: (u32, u32) = (1200, 800);
pub const PLOT_TITLE: &str = "YCSB Workload A - UPDATE Latency Comparison";
pub const NO_DATA_MESSAGE: &str = "No UPDATE latency data available for plotting.";

const PLACEHOLDER_SIZE: (u32, u32) = (640, 480);
const BOX_HALF_WIDTH: f64 = 0.25;

/// Family every plot label is drawn with, backed by the bundled DejaVu Sans
const FONT_FAMILY: &str = "sans-serif";
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Registers the bundled font with plotters so no system font lookup happens. Runs once
/// per process, later calls return the first result.
pub fn register_fonts() -> bool {
    *FONT_REGISTERED.get_or_init(|| {
        match register_font(FONT_FAMILY, FontStyle::Normal, BUNDLED_FONT) {
            Ok(()) => true,
            Err(_) => {
                warn!("Bundled font could not be loaded, plot text will be missing");
                false
            }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotOutcome {
    /// Number of boxes drawn
    Chart(usize),
    Placeholder,
}

/// Databases whose UPDATE section has a non-zero operation count and at least one
/// latency observation, paired with the expanded observations, in results order
pub fn select_update_latencies(results: &YcsbResults) -> Vec<(String, Vec<i64>)> {
    results
        .iter()
        .filter_map(|(name, metrics)| {
            let update = &metrics?.update;
            if !update.operation_count.is_some_and(|ops| ops != 0.0)
                || update.latency_distribution.is_empty()
            {
                return None;
            }
            let latencies = match update.latencies() {
                Ok(latencies) => latencies,
                Err(err) => {
                    warn!("Leaving {name} out of the latency plot: {err}");
                    return None;
                }
            };
            if latencies.is_empty() {
                debug!("{name} has an UPDATE histogram without observations");
                return None;
            }
            Some((name.to_owned(), latencies))
        })
        .collect()
}

/// Draws the UPDATE latency box plot to `filepath`, or a placeholder image when no
/// database has UPDATE latencies. An image is written in both cases.
pub fn render_latency_plot(results: &YcsbResults, filepath: &Path) -> Result<PlotOutcome> {
    ensure_parent_dir(filepath)?;
    register_fonts();
    let stats = select_update_latencies(results)
        .iter()
        .filter_map(|(label, latencies)| BoxStats::from_observations(label, latencies))
        .collect::<Vec<_>>();

    if stats.is_empty() {
        warn!("No UPDATE latency data available to generate plot.");
        return write_placeholder(filepath);
    }

    let data_file = write_plot_data(&stats, filepath)?;
    debug!("Plot data written to {}", data_file.display());
    if let Err(err) = draw_box_plot(&stats, filepath) {
        warn!("Could not draw latency box plot, writing placeholder: {err:#}");
        return write_placeholder(filepath);
    }
    info!("Plotted {} databases", stats.len());
    println!("Plot generated: {}", filepath.display());
    Ok(PlotOutcome::Chart(stats.len()))
}

fn draw_box_plot(stats: &[BoxStats], filepath: &Path) -> Result<()> {
    let (y_min, y_max) = match stats
        .iter()
        .flat_map(|s| [s.whisker_low, s.whisker_high])
        .minmax()
    {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    let pad = ((y_max - y_min) * 0.05).max(1.0);
    let labels = stats.iter().map(|s| s.label.as_str()).collect::<Vec<_>>();
    let label_at = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels
            .get(idx as usize)
            .map(|l| l.to_string())
            .unwrap_or_default()
    };

    let root = BitMapBackend::new(filepath, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(PLOT_TITLE, (FONT_FAMILY, 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(
            -0.5f64..(stats.len() as f64 - 0.5),
            (y_min - pad)..(y_max + pad),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(stats.len())
        .x_label_formatter(&label_at)
        .x_label_style((FONT_FAMILY, 16))
        .y_desc("Latency (us)")
        .draw()?;

    for (i, s) in stats.iter().enumerate() {
        let x = i as f64;
        let color = Palette99::pick(i);
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        let (cap_left, cap_right) = (x - BOX_HALF_WIDTH / 2.0, x + BOX_HALF_WIDTH / 2.0);
        chart.draw_series([
            Rectangle::new([(left, s.q1), (right, s.q3)], color.mix(0.3).filled()),
            Rectangle::new([(left, s.q1), (right, s.q3)], BLACK.stroke_width(2)),
        ])?;
        chart.draw_series([
            PathElement::new(vec![(x, s.q3), (x, s.whisker_high)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x, s.q1), (x, s.whisker_low)], BLACK.stroke_width(1)),
            PathElement::new(
                vec![(cap_left, s.whisker_high), (cap_right, s.whisker_high)],
                BLACK.stroke_width(1),
            ),
            PathElement::new(
                vec![(cap_left, s.whisker_low), (cap_right, s.whisker_low)],
                BLACK.stroke_width(1),
            ),
            PathElement::new(vec![(left, s.median), (right, s.median)], RED.stroke_width(2)),
        ])?;
    }

    root.present()?;
    Ok(())
}

/// Placeholder image in place of the chart. Plot data left by an earlier chart run is
/// removed so it cannot be mistaken for this run's.
fn write_placeholder(filepath: &Path) -> Result<PlotOutcome> {
    if remove_plot_data(filepath)? {
        debug!("Removed stale plot data for {}", filepath.display());
    }
    draw_placeholder(filepath, FONT_FAMILY)?;
    Ok(PlotOutcome::Placeholder)
}

/// Falls back to a blank image when the message cannot be drawn
fn draw_placeholder(filepath: &Path, family: &str) -> Result<()> {
    let root = BitMapBackend::new(filepath, PLACEHOLDER_SIZE).into_drawing_area();
    if let Err(err) = draw_message(&root, family, NO_DATA_MESSAGE) {
        warn!("Placeholder text not drawn, writing a blank image: {err:#}");
        root.fill(&WHITE)?;
    }
    root.present().context("Write placeholder plot")?;
    Ok(())
}

fn draw_message(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    family: &str,
    message: &str,
) -> Result<()> {
    root.fill(&WHITE)?;
    let (w, h) = root.dim_in_pixel();
    let style = (family, 20)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(message, (w as i32 / 2, h as i32 / 2), style))?;
    Ok(())
}
