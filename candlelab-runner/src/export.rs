//! Artifact export: JSON report, trade log CSV and equity CSV.
//!
//! A run directory is named by the first 12 hex chars of the run
//! fingerprint, so re-running identical inputs overwrites the same
//! directory with byte-identical files.
//!
//! Persisted reports carry a `schema_version`. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use candlelab_core::domain::{ClosedTrade, EquityPoint};

use crate::runner::{RunReport, SCHEMA_VERSION};
use crate::sensitivity::SensitivityReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

/// Serialize a sensitivity report to pretty JSON.
pub fn export_sensitivity_json(report: &SensitivityReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SensitivityReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade log as CSV, one row per closed trade.
///
/// Columns: id, side, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, volume, stop_loss, take_profit, trailing_stop,
/// signal_strength, pnl, pnl_percent, close_reason, candles_held
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "side",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "volume",
        "stop_loss",
        "take_profit",
        "trailing_stop",
        "signal_strength",
        "pnl",
        "pnl_percent",
        "close_reason",
        "candles_held",
    ])?;

    for t in trades {
        let p = &t.position;
        let row: [String; 17] = [
            p.id.to_string(),
            format!("{:?}", p.side).to_uppercase(),
            p.entry_index.to_string(),
            p.opened_at.to_rfc3339(),
            format!("{:.6}", p.entry_price),
            t.exit_index.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            format!("{:.8}", p.volume),
            format!("{:.6}", p.stop_loss),
            format!("{:.6}", p.take_profit),
            p.trailing_stop.map(|v| format!("{v:.6}")).unwrap_or_default(),
            format!("{:.2}", p.signal_strength),
            format!("{:.6}", t.pnl),
            format!("{:.4}", t.pnl_percent),
            t.close_reason.as_str().to_string(),
            t.candles_held().to_string(),
        ];
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve as CSV with time and balance columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "balance"])?;
    for point in equity_curve {
        wtr.write_record([&point.time.to_rfc3339(), &format!("{:.6}", point.balance)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{short_fingerprint}/` under `output_dir` containing:
/// - `report.json`: the full `RunReport`
/// - `trades.csv`: closed trades
/// - `equity.csv`: per-tick equity
///
/// Returns the path to the run directory.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(report.short_id());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    write_file(&run_dir.join("report.json"), &json)?;

    let trades_csv = export_trades_csv(&report.trades)?;
    write_file(&run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&report.equity_curve)?;
    write_file(&run_dir.join("equity.csv"), &equity_csv)?;

    debug!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

/// Write `sensitivity.json` under `output_dir`.
pub fn save_sensitivity(report: &SensitivityReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = output_dir.join("sensitivity.json");
    write_file(&path, &export_sensitivity_json(report)?)?;
    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
