//! Console rendering.

use colored::Colorize;
use graphseed_gremlin::graphson::display_value;
use graphseed_gremlin::PropertyMap;
use graphseed_load::RunReport;

/// One row as a `key: value` listing, `id` and `label` first.
pub fn render_row(row: &PropertyMap) -> String {
    row.entries()
        .map(|(key, value)| format!("{}: {}", key.cyan(), display_value(value)))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_report(report: &RunReport) -> String {
    let mut lines = Vec::new();
    if report.indexes_enabled > 0 {
        lines.push(format!("{} {} index(es) enabled", "✓".green(), report.indexes_enabled));
    }
    if report.vertices.records > 0 {
        lines.push(format!(
            "{} {} vertex record(s) in {} batch(es)",
            "✓".green(),
            report.vertices.records,
            report.vertices.batches
        ));
    }
    if report.edges.records > 0 {
        lines.push(format!(
            "{} {} edge record(s) in {} batch(es)",
            "✓".green(),
            report.edges.records,
            report.edges.batches
        ));
    }
    lines.push(format!("{} row(s) read", report.rows_read));
    if report.dropped {
        lines.push(format!("{}", "graph contents dropped".yellow()));
    }
    lines.join("\n")
}
