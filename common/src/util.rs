use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, ContextCompat, Result};
use serde::Serialize;

/// Shortest round-trip form of a float. Whole numbers keep a trailing `.0`, and
/// magnitudes from `1e16` up or below `1e-4` switch to a signed two-digit exponent
/// (`1e+16`, `1.5e-05`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    let magnitude = value.abs();
    if value.is_infinite() || magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if value.fract() == 0.0 {
            format!("{value:.1}")
        } else {
            format!("{value}")
        };
    }
    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific,
    }
}

pub fn format_optional(value: Option<f64>) -> String {
    value
        .map(format_float)
        .unwrap_or_else(|| crate::NOT_AVAILABLE.to_owned())
}

pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// `<dir of filepath>/plot_data/<stem of filepath>.json`
pub fn plot_data_path(filepath: &Path) -> Result<PathBuf> {
    let stem = filepath
        .file_stem()
        .and_then(|s| s.to_str())
        .context(format!("Invalid plot filepath {filepath:?}"))?;
    let plot_data_dir = filepath
        .parent()
        .map(|p| p.join("plot_data"))
        .unwrap_or_else(|| PathBuf::from("plot_data"));
    Ok(plot_data_dir.join(format!("{stem}.json")))
}

pub fn write_plot_data<T: Serialize>(data: &T, filepath: &Path) -> Result<PathBuf> {
    let p = plot_data_path(filepath)?;
    if let Some(dir) = p.parent()
        && !dir.exists()
    {
        fs::create_dir_all(dir)?;
    }
    fs::write(&p, serde_json::to_string(data)?)?;
    Ok(p)
}

/// Deletes the plot data written for `filepath` by an earlier run, returns whether a
/// file was removed
pub fn remove_plot_data(filepath: &Path) -> Result<bool> {
    let p = plot_data_path(filepath)?;
    match fs::remove_file(&p) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).context(format!("Remove stale plot data {}", p.display())),
    }
}
