//! Shared data models: change records, per-file reports and run summaries,
//! plus the solution filter schema used by workspace loading.

pub mod solution;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// One detected (or applied) non-conformance. Line and column are 1-based.
pub struct ChangeRecord {
    pub line_number: usize,
    pub char_number: usize,
    pub change_description: String,
}

impl ChangeRecord {
    /// Build from a 0-based position; the only place the +1 happens.
    pub fn from_zero_based(line: usize, column: usize, description: impl Into<String>) -> Self {
        ChangeRecord {
            line_number: line + 1,
            char_number: column + 1,
            change_description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
/// Stable document identity: a name-based UUID derived from the owning
/// project and the document path, so reruns produce the same id.
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new(project_path: &Path, document_path: &Path) -> Self {
        let project = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            project_path.to_string_lossy().as_bytes(),
        );
        DocumentId(Uuid::new_v5(
            &project,
            document_path.to_string_lossy().as_bytes(),
        ))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// Report entry for one source file that needs (or received) changes.
pub struct SourceFileReport {
    pub document_id: DocumentId,
    pub file_name: String,
    pub file_path: PathBuf,
    pub project_file_path: PathBuf,
    pub file_changes: Vec<ChangeRecord>,
}

impl SourceFileReport {
    /// `None` for an empty change list: files without changes are never reported.
    pub fn from_changes(
        document_id: DocumentId,
        file_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        project_file_path: impl Into<PathBuf>,
        file_changes: Vec<ChangeRecord>,
    ) -> Option<Self> {
        if file_changes.is_empty() {
            return None;
        }
        Some(SourceFileReport {
            document_id,
            file_name: file_name.into(),
            file_path: file_path.into(),
            project_file_path: project_file_path.into(),
            file_changes,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
/// A file left out of the run because of a recoverable error.
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Totals printed at the end of a run.
pub struct RunSummary {
    pub apply: bool,
    pub files_with_changes: usize,
    /// Files saved in apply mode.
    pub written: usize,
    pub total_changes: usize,
    pub skipped: usize,
    pub projects: usize,
    pub documents: usize,
}
