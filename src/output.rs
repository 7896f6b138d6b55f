// Presentation glue: console previews and file exports.
//
// Everything here reads projected `DisplayRow`s, never raw records or the
// tree, so exported figures always match the on-screen ones.
use std::error::Error;

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::types::DisplayRow;
use crate::util::format_int;

/// Column names for the per-college cells of a pivot projection, in stable
/// order. These are data-dependent, so they are collected from the rows
/// rather than declared in the report shape.
pub fn composite_columns(rows: &[DisplayRow]) -> Vec<String> {
    let mut cols: Vec<String> = rows
        .iter()
        .flat_map(|r| r.counts.keys())
        .filter(|k| k.contains(':'))
        .cloned()
        .collect();
    cols.sort();
    cols.dedup();
    cols
}

fn cell(row: &DisplayRow, column: &str) -> String {
    if let Some(v) = row.counts.get(column) {
        format_int(*v)
    } else if let Some(v) = row.derived.get(column) {
        // Zero percentages render as a dash, same as the dashboard cells.
        if *v == 0.0 {
            "-".to_string()
        } else {
            format!("{:.1}", v)
        }
    } else {
        "0".to_string()
    }
}

fn name_cell(row: &DisplayRow) -> String {
    format!("{}{}", "  ".repeat(row.depth), row.key)
}

/// Print a markdown-style preview of the first `max_rows` projected rows.
pub fn preview_rows(rows: &[DisplayRow], columns: &[&str], max_rows: usize) {
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    let mut header = vec!["Row".to_string(), "Name".to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    builder.push_record(header);

    for row in rows.iter().take(max_rows) {
        let mut record = vec![row.kind.label().to_string(), name_cell(row)];
        record.extend(columns.iter().map(|c| cell(row, c)));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::markdown());
    println!("{}\n", table);
}

/// Export a full projection to CSV, one line per display row.
pub fn write_csv(path: &str, rows: &[DisplayRow], columns: &[&str]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["Row".to_string(), "Name".to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.kind.label().to_string(), row.key.clone()];
        for column in columns {
            let v = if let Some(v) = row.counts.get(*column) {
                v.to_string()
            } else if let Some(v) = row.derived.get(*column) {
                format!("{:.1}", v)
            } else {
                "0".to_string()
            };
            record.push(v);
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}
