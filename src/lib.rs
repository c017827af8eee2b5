//! basefix core library.
//!
//! Finds C# classes that implement a capability interface (for example
//! `IBqlTable`) without deriving from the required base type (for example
//! `PX.Data.PXBqlTable`), reports them and optionally inserts the base type
//! while leaving every other byte of the file untouched.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `error`: Error taxonomy and exit codes.
//! - `fix`: Orchestrates a run over a workspace.
//! - `logging`: `tracing` subscriber setup.
//! - `models`: Change records, file reports, run summary, solution filter schema.
//! - `output`: Human/JSON printers for a run.
//! - `report`: JSON change report writer.
//! - `resolver`: File-scoped symbol resolution (base type, capabilities).
//! - `rewrite`: Detection and base-type insertion.
//! - `syntax`: C# parsing on tree-sitter, declarations, incremental edits.
//! - `textio`: Encoding-preserving reads and atomic writes.
//! - `utils`: Supporting helpers.
//! - `workspace`: Solution/project discovery and loading.
pub mod cli;
pub mod config;
pub mod error;
pub mod fix;
pub mod logging;
pub mod models;
pub mod output;
pub mod report;
pub mod resolver;
pub mod rewrite;
pub mod syntax;
pub mod textio;
pub mod utils;
pub mod workspace;

pub use error::{Error, Result};
