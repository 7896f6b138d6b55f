// Entry point and high-level CLI flow.
//
// The binary mirrors the dashboard's reporting surface from the console:
// - Option [1] loads a saved backend payload (JSON), printing diagnostics.
// - Option [2] runs every report through the aggregation engine, printing
//   table previews and exporting CSV files plus a JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod derive;
mod normalize;
mod output;
mod project;
mod reports;
mod rollup;
mod sort;
mod types;
mod util;

use std::collections::HashMap;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use project::ExpandMap;
use types::{RawRecord, ReportSummary};

const PAYLOAD_PATH: &str = "crm_report_data.json";

// Simple in-memory app state so we only parse the payload once but can
// generate reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { payload: None }));

struct AppState {
    payload: Option<Payload>,
}

/// One saved backend response: a record feed per report slug. Feeds the
/// backend did not include are simply absent and report as empty.
#[derive(Clone)]
struct Payload {
    feeds: HashMap<String, Vec<RawRecord>>,
}

struct PayloadReport {
    feeds_present: usize,
    total_records: usize,
    skipped_rows: usize,
}

fn load_payload(path: &str) -> Result<(Payload, PayloadReport), Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let root: serde_json::Value = serde_json::from_str(&text)?;
    let Some(root) = root.as_object() else {
        return Err("payload root must be a JSON object".into());
    };

    let mut feeds = HashMap::new();
    let mut report = PayloadReport {
        feeds_present: 0,
        total_records: 0,
        skipped_rows: 0,
    };
    for shape in reports::ALL_REPORTS {
        let Some(rows) = root.get(shape.slug).and_then(|v| v.as_array()) else {
            continue;
        };
        report.feeds_present += 1;
        let mut records: Vec<RawRecord> = Vec::with_capacity(rows.len());
        for row in rows {
            match row.as_object() {
                Some(obj) => records.push(obj.clone()),
                None => report.skipped_rows += 1,
            }
        }
        report.total_records += records.len();
        feeds.insert(shape.slug.to_string(), records);
    }
    Ok((Payload { feeds }, report))
}

/// Read a single line of input after printing the common "Enter choice:"
/// prompt. Reused for the main menu.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports. Returns `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load the saved backend payload.
fn handle_load() {
    match load_payload(PAYLOAD_PATH) {
        Ok((payload, report)) => {
            println!(
                "Payload loaded... ({} records across {} report feeds)",
                util::format_int(report.total_records as u64),
                report.feeds_present
            );
            if report.skipped_rows > 0 {
                println!(
                    "Note: {} non-object rows skipped.",
                    util::format_int(report.skipped_rows as u64)
                );
            }
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.payload = Some(payload);
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", PAYLOAD_PATH, e);
        }
    }
}

/// Handle option [2]: run every report and export the results.
///
/// This function is intentionally side-effectful: it writes one CSV per
/// report, writes `summary.json`, and prints a preview of each report to
/// the console.
fn handle_generate_reports() {
    let payload = {
        let state = APP_STATE.lock().unwrap();
        state.payload.clone()
    };
    let Some(payload) = payload else {
        println!("Error: No data loaded. Please load the payload first (option 1).\n");
        return;
    };

    println!("Generating reports...\n");
    let mut summaries: Vec<ReportSummary> = Vec::new();
    static EMPTY: Vec<RawRecord> = Vec::new();

    for shape in reports::ALL_REPORTS {
        let records = payload.feeds.get(shape.slug).unwrap_or(&EMPTY);
        let config = reports::default_config(shape);
        let expand = ExpandMap::new();

        let (rows, diagnostics) = match reports::run_report(records, shape, &config, &expand) {
            Ok(out) => out,
            Err(e) => {
                eprintln!("Report `{}` failed: {}\n", shape.name, e);
                continue;
            }
        };

        println!("Report: {}", shape.name);
        println!("({})\n", reports::describe_diagnostics(&diagnostics));

        // Pivot projections grow data-dependent per-college columns.
        let extra = output::composite_columns(&rows);
        let mut columns: Vec<&str> = shape.columns.to_vec();
        columns.extend(extra.iter().map(String::as_str));

        output::preview_rows(&rows, &columns, 8);

        let file = format!("report_{}.csv", shape.slug);
        if let Err(e) = output::write_csv(&file, &rows, &columns) {
            eprintln!("Write error: {}", e);
        } else {
            println!("(Full table exported to {})\n", file);
        }

        summaries.push(reports::summarize(shape, &rows));
    }

    if let Err(e) = output::write_json("summary.json", &summaries) {
        eprintln!("Write error: {}", e);
    } else {
        println!("Summary stats written to summary.json\n");
    }
}

fn main() {
    loop {
        println!("Counseling CRM Reports");
        println!("[1] Load the payload file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
