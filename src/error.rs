//! Error taxonomy for a basefix run.
//!
//! Fatal variants abort the run and map to a process exit code through
//! [`Error::exit_code`]. Per-file variants (`FileAccess`, `Parse`) are
//! recovered by the orchestrator: logged, recorded as skipped, never escalated.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The C# grammar could not be loaded into a parser.
    #[error("Unable to load the C# grammar: {0}")]
    ToolchainUnavailable(String),

    /// The solution or project could not be opened.
    #[error("Unable to load solution or project file '{}': {reason}", path.display())]
    WorkspaceLoad { path: PathBuf, reason: String },

    /// No explicit path was given and the search directory holds zero or
    /// several candidate solution/project files.
    #[error(
        "Found {found} solution/project files in '{}'. Specify which one to use.",
        dir.display()
    )]
    AmbiguousWorkspaceSelection { dir: PathBuf, found: usize },

    /// A project in a solution is not a C# project.
    #[error("Could not process '{}'. Only C# projects are supported.", path.display())]
    UnsupportedProjectKind { path: PathBuf },

    #[error("Unable to access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Parser-level failure with no file attached yet.
    #[error("{0}")]
    Syntax(String),

    #[error("Unable to write report '{}': {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn workspace_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::WorkspaceLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for a run aborted by this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ToolchainUnavailable(_) => 1,
            Error::WorkspaceLoad { .. }
            | Error::AmbiguousWorkspaceSelection { .. }
            | Error::UnsupportedProjectKind { .. } => 2,
            Error::Report { .. } => 3,
            // Per-file errors never reach the top level; treat as load failure if they do.
            Error::FileAccess { .. } | Error::Parse { .. } | Error::Syntax(_) => 2,
        }
    }

    /// Whether the orchestrator may skip the affected file and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileAccess { .. } | Error::Parse { .. } | Error::Syntax(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
