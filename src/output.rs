//! Output rendering for a fix run.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-file results, skipped files and a top-level summary.

use crate::fix::FixRun;
use crate::utils::display_path;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Print run results in the requested format. Paths are shown relative to `base`.
pub fn print_summary(run: &FixRun, output: &str, base: &Path) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_summary_json(run)) {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::error!("Unable to render JSON output: {}", e),
        },
        _ => {
            let color = use_colors(output);
            for f in &run.files {
                let file = display_path(&f.file_path, base);
                let saved = !run.skipped.iter().any(|s| s.path == f.file_path);
                let label = match (run.apply, saved) {
                    (true, true) => "✏️  modified:",
                    (true, false) => "not saved:",
                    (false, _) => "needs change:",
                };
                let count = format!("({} class(es))", f.file_changes.len());
                if color {
                    let label = match (run.apply, saved) {
                        (true, true) => label.green().bold().to_string(),
                        (true, false) => label.red().bold().to_string(),
                        (false, _) => label.yellow().bold().to_string(),
                    };
                    println!("{} {} {}", label, file.bold(), count.bright_black());
                } else {
                    println!("{} {} {}", label, file, count);
                }
                for c in &f.file_changes {
                    println!("    {}:{} {}", c.line_number, c.char_number, c.change_description);
                }
            }
            for s in &run.skipped {
                let file = display_path(&s.path, base);
                if color {
                    println!("{} {} — {}", "skipped:".red().bold(), file, s.reason);
                } else {
                    println!("skipped: {} — {}", file, s.reason);
                }
            }
            let failed = run.failed_writes() > 0;
            for line in summary_lines(run) {
                match (color, failed) {
                    (true, true) => println!("{}", line.red().bold()),
                    (true, false) => println!("{}", line.bold()),
                    _ => println!("{}", line),
                }
            }
        }
    }
}

/// Closing lines of the human output.
pub fn summary_lines(run: &FixRun) -> Vec<String> {
    if run.apply {
        let failed = run.failed_writes();
        let status = if failed == 0 {
            "Changes were applied successfully.".to_string()
        } else {
            format!(
                "Changes could not be saved to {} of {} source file(s).",
                failed,
                run.files.len()
            )
        };
        vec![
            status,
            format!("Total number of source files modified: {}", run.written),
        ]
    } else {
        vec![
            "No changes were applied. Use --apply-changes to apply changes.".to_string(),
            format!(
                "Total number of source files requiring modification: {}",
                run.files.len()
            ),
        ]
    }
}

pub fn compose_summary_json(run: &FixRun) -> JsonVal {
    let items: Vec<_> = run
        .files
        .iter()
        .map(|f| {
            json!({
                "file": f.file_path,
                "documentId": f.document_id,
                "project": f.project_file_path,
                "changes": f.file_changes,
                "wrote": run.apply && !run.skipped.iter().any(|s| s.path == f.file_path),
            })
        })
        .collect();
    let skipped: Vec<_> = run
        .skipped
        .iter()
        .map(|s| json!({"file": s.path, "reason": s.reason}))
        .collect();
    json!({"results": items, "skipped": skipped, "summary": run.summary()})
}
