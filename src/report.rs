//! Plain-text rendering of resolutions and ledger rows.

use crate::fields::{Classifier, Resolution};
use crate::ledger::JobRow;
use crate::record::ParsedRecord;

/// Width keys are padded to in a resolution report.
pub const KEY_WIDTH: usize = 20;

/// Widest a ledger table column may grow before values are cut.
pub const MAX_COLUMN_WIDTH: usize = 49;

const ELLIPSIS: &str = "...";

/// Renders one resolution as `key: value` lines, keys padded to
/// [`KEY_WIDTH`]. The `record` document is left out; unset values print empty.
/// When a record was resolved, its title and author follow the columns.
#[must_use]
pub fn format_resolution(resolution: &Resolution) -> String {
    let mut out = String::new();
    for (name, value) in resolution.columns() {
        if name == "record" {
            continue;
        }
        push_line(&mut out, &name, &value.unwrap_or_default());
    }
    if let Some(record) = resolved_record(resolution) {
        for (name, value) in [("title", record.title()), ("author", record.author())] {
            if let Some(value) = value {
                push_line(&mut out, name, &value);
            }
        }
    }
    push_line(&mut out, "status", resolution.status.as_str());
    out
}

fn push_line(out: &mut String, key: &str, value: &str) {
    let line = format!("{:<width$}{value}", format!("{key}:"), width = KEY_WIDTH);
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Re-reads the stored `record` with the schema of the catalog it came from.
fn resolved_record(resolution: &Resolution) -> Option<ParsedRecord> {
    let document = resolution.fields.get(Classifier::Record)?;
    let schema = resolution.supplementary.record_type?;
    ParsedRecord::parse(schema, document).ok()
}

/// Renders ledger rows as a right-aligned table with a header line.
///
/// Each column is as wide as its widest cell, capped at
/// [`MAX_COLUMN_WIDTH`]; longer cells end in `...`.
#[must_use]
pub fn format_table(rows: &[JobRow]) -> String {
    let header: Vec<String> = JobRow::COLUMNS.iter().map(|c| (*c).to_string()).collect();
    let body: Vec<Vec<String>> = rows.iter().map(JobRow::cells).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
        }
    }

    let mut out = String::new();
    for cells in std::iter::once(&header).chain(body.iter()) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                format!("{:>width$}", truncate(cell, *width), width = *width)
            })
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

fn truncate(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut cut: String = cell.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}
