use std::fmt::Write as _;
use std::path::Path;

use zerotrash_impact::{ImpactSummary, Snapshot};

/// Load the snapshot at `path` and render its impact summary.
pub async fn report(path: &Path) -> exn::Result<String, zerotrash_impact::Error> {
    let snapshot = Snapshot::from_path(path)?;
    let summary = zerotrash_impact::fetch(&snapshot).await;
    Ok(format_summary(&summary))
}

#[must_use]
pub fn format_summary(summary: &ImpactSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Waste collected:   {} kg", summary.waste_collected);
    let _ = writeln!(out, "Reports submitted: {}", summary.reports_submitted);
    let _ = writeln!(out, "Tokens earned:     {}", summary.tokens_earned);
    let _ = writeln!(out, "CO2 offset:        {} kg", summary.co2_offset);
    out
}
