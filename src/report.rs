//! Change report: a pretty-printed JSON array of [`SourceFileReport`]s.

use crate::error::{Error, Result};
use crate::models::SourceFileReport;
use crate::textio;
use chrono::{Local, NaiveDate};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default report file name for `date`, e.g. `basefix_20261018.json`.
pub fn default_report_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.json", prefix, date.format("%Y%m%d"))
}

/// Where the report goes for a `--report` value.
///
/// A value ending in `.json` is the file itself; `.` is the current
/// directory; anything else is a directory to put the default name in.
pub fn report_file_path(report: &str, prefix: &str, date: NaiveDate, cwd: &Path) -> PathBuf {
    let name = default_report_name(prefix, date);
    if report.ends_with(".json") {
        PathBuf::from(report)
    } else if report == "." {
        cwd.join(name)
    } else {
        PathBuf::from(report).join(name)
    }
}

/// Serialize `files` to the report location, creating parent directories.
/// Returns the path written.
pub fn write_report(report: &str, prefix: &str, files: &[SourceFileReport]) -> Result<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let path = report_file_path(report, prefix, Local::now().date_naive(), &cwd);
    write_report_to(&path, files)?;
    Ok(path)
}

pub fn write_report_to(path: &Path, files: &[SourceFileReport]) -> Result<()> {
    let report_err = |source: io::Error| Error::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(report_err)?;
    }
    tracing::info!("Writing change report to: '{}'", path.display());
    let body = serde_json::to_string_pretty(files)
        .map_err(|e| report_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    textio::write_atomic(path, body.as_bytes()).map_err(report_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeRecord, DocumentId};
    use serde_json::Value;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_report_file_path_variants() {
        let cwd = Path::new("/work");
        assert_eq!(
            report_file_path("out/run.json", "basefix", date(), cwd),
            PathBuf::from("out/run.json")
        );
        assert_eq!(
            report_file_path(".", "basefix", date(), cwd),
            PathBuf::from("/work/basefix_20260307.json")
        );
        assert_eq!(
            report_file_path("reports", "dacs", date(), cwd),
            PathBuf::from("reports/dacs_20260307.json")
        );
    }

    #[test]
    fn test_write_report_creates_directories_and_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/report.json");
        let files = vec![SourceFileReport::from_changes(
            DocumentId::new(Path::new("/p/App.csproj"), Path::new("/p/Orders.cs")),
            "Orders.cs",
            "/p/Orders.cs",
            "/p/App.csproj",
            vec![ChangeRecord::from_zero_based(0, 6, "Orders")],
        )
        .unwrap()];
        write_report_to(&path, &files).unwrap();

        let v: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v[0]["fileName"], "Orders.cs");
        assert_eq!(v[0]["projectFilePath"], "/p/App.csproj");
        assert_eq!(v[0]["fileChanges"][0]["lineNumber"], 1);
        assert_eq!(v[0]["fileChanges"][0]["charNumber"], 7);
        assert_eq!(v[0]["fileChanges"][0]["changeDescription"], "Orders");
        assert!(v[0]["documentId"].is_string());
    }

    #[test]
    fn test_empty_report_is_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.json");
        write_report_to(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
