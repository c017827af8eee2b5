//! Solution filter (`.slnf`) schema.

use serde::Deserialize;

#[derive(Deserialize)]
/// Top-level `.slnf` document.
pub struct SolutionFilter {
    pub solution: SolutionFilterBody,
}

#[derive(Deserialize)]
/// The referenced solution and the subset of its projects to load.
pub struct SolutionFilterBody {
    /// Path to the `.sln`, relative to the filter file.
    pub path: String,
    /// Project paths, relative to the `.sln` directory.
    #[serde(default)]
    pub projects: Vec<String>,
}
