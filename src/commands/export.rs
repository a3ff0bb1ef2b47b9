//! Output commands: report rendering and CSV export

use std::path::Path;

use super::CommandResult;
use crate::cli::ReportFormat;
use crate::detection::DetectionEngine;
use crate::export::{gather_rows, write_history_csv};
use crate::report::Report;

/// Handle `report <ID> --user <NAME> [--out FILE] [--format text|json]`
pub fn handle_report(
    engine: &DetectionEngine,
    id: i64,
    user: &str,
    out: Option<&Path>,
    format: ReportFormat,
) -> CommandResult {
    let db = engine.db();
    let user = db.require_user(user)?;

    let detection = match db.get_detection(id, user.id)? {
        Some(d) => d,
        None => return Err(format!("No screening #{} for {}", id, user.username).into()),
    };
    let suggestions = db.suggestions_for(detection.id)?;

    let report = Report::build(&user, &detection, &suggestions);
    let rendered = match format {
        ReportFormat::Text => report.to_text(),
        ReportFormat::Json => report.to_json()?,
    };

    match out {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// Handle `export [--user <NAME>] --out <FILE>`
pub fn handle_export(engine: &DetectionEngine, user: Option<&str>, out: &Path) -> CommandResult {
    let rows = gather_rows(engine.db(), user)?;
    write_history_csv(&rows, out)?;
    println!("Exported {} screenings to {}", rows.len(), out.display());
    Ok(())
}
