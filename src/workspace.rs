//! Workspace discovery and loading for C# solutions and projects.
//!
//! Supported inputs:
//! - `.sln` solutions (project lines parsed textually, solution folders skipped)
//! - `.slnf` solution filters (JSON)
//! - `.csproj` projects, SDK-style or classic
//!
//! Only what the fixer needs is loaded: per project its documents and the
//! names of the assemblies/packages/projects it references. Projects of other
//! languages are reported as unsupported and skipped when part of a solution.

use crate::error::{Error, Result};
use crate::models::solution::SolutionFilter;
use crate::models::DocumentId;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Solution folders in `.sln` files use this project type id.
const SOLUTION_FOLDER_TYPE: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Solution,
    SolutionFilter,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    pub path: PathBuf,
    pub kind: WorkspaceKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub documents: Vec<Document>,
    pub references: BTreeSet<String>,
}

#[derive(Debug)]
pub struct Workspace {
    pub file: WorkspaceFile,
    pub projects: Vec<Project>,
    /// Warnings collected while loading (skipped or unreadable projects).
    pub diagnostics: Vec<String>,
}

/// Classify a path by extension. `.xproj` (DNX) projects are not projects.
pub fn classify(path: &Path) -> Option<WorkspaceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "sln" => Some(WorkspaceKind::Solution),
        "slnf" => Some(WorkspaceKind::SolutionFilter),
        "xproj" => None,
        e if e.ends_with("proj") => Some(WorkspaceKind::Project),
        _ => None,
    }
}

/// Resolve the CLI workspace argument to a single solution or project file.
///
/// With no path (or a directory) the directory must hold exactly one
/// solution, solution filter or project file; anything else is ambiguous.
pub fn locate(path: Option<&Path>) -> Result<WorkspaceFile> {
    let target = path.unwrap_or_else(|| Path::new("."));
    if target.is_dir() {
        return search_dir(target);
    }
    let kind = classify(target).ok_or_else(|| {
        Error::workspace_load(
            target,
            "the file does not appear to be a valid project or solution file",
        )
    })?;
    if !target.is_file() {
        let what = match kind {
            WorkspaceKind::Project => "project",
            _ => "solution",
        };
        return Err(Error::workspace_load(
            target,
            format!("the {} file does not exist", what),
        ));
    }
    let path = fs::canonicalize(target).map_err(|e| Error::workspace_load(target, e.to_string()))?;
    Ok(WorkspaceFile { path, kind })
}

fn search_dir(dir: &Path) -> Result<WorkspaceFile> {
    let entries = fs::read_dir(dir).map_err(|e| Error::workspace_load(dir, e.to_string()))?;
    let candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && classify(path).is_some())
        .collect();
    if candidates.len() != 1 {
        return Err(Error::AmbiguousWorkspaceSelection {
            dir: dir.to_path_buf(),
            found: candidates.len(),
        });
    }
    locate(Some(&candidates[0]))
}

/// Load every project reachable from `file`.
pub fn load(file: &WorkspaceFile) -> Result<Workspace> {
    let mut diagnostics = Vec::new();
    let projects = match file.kind {
        WorkspaceKind::Project => match Project::load(&file.path) {
            Ok(p) => vec![p],
            Err(e @ Error::UnsupportedProjectKind { .. }) => {
                return Err(Error::workspace_load(&file.path, e.to_string()))
            }
            Err(e) => return Err(e),
        },
        WorkspaceKind::Solution => {
            let text = fs::read_to_string(&file.path)
                .map_err(|e| Error::workspace_load(&file.path, e.to_string()))?;
            let dir = parent_dir(&file.path);
            let members = solution_projects(&text)
                .into_iter()
                .map(|rel| dir.join(rel))
                .collect::<Vec<_>>();
            load_members(&members, &mut diagnostics)
        }
        WorkspaceKind::SolutionFilter => {
            let text = fs::read_to_string(&file.path)
                .map_err(|e| Error::workspace_load(&file.path, e.to_string()))?;
            let filter: SolutionFilter = serde_json::from_str(&text)
                .map_err(|e| Error::workspace_load(&file.path, e.to_string()))?;
            let sln = parent_dir(&file.path).join(normalize_separators(&filter.solution.path));
            if !sln.is_file() {
                return Err(Error::workspace_load(
                    &file.path,
                    format!("the solution file '{}' does not exist", sln.display()),
                ));
            }
            let sln_dir = parent_dir(&sln);
            let members = filter
                .solution
                .projects
                .iter()
                .map(|p| sln_dir.join(normalize_separators(p)))
                .collect::<Vec<_>>();
            load_members(&members, &mut diagnostics)
        }
    };
    for d in &diagnostics {
        tracing::warn!("{}", d);
    }
    Ok(Workspace {
        file: file.clone(),
        projects,
        diagnostics,
    })
}

fn load_members(paths: &[PathBuf], diagnostics: &mut Vec<String>) -> Vec<Project> {
    let mut projects = Vec::new();
    for path in paths {
        if !path.is_file() {
            diagnostics.push(format!("Project file '{}' does not exist.", path.display()));
            continue;
        }
        match Project::load(path) {
            Ok(p) => projects.push(p),
            Err(e) => diagnostics.push(e.to_string()),
        }
    }
    projects
}

/// Relative project paths listed in a `.sln`, solution folders excluded.
pub fn solution_projects(sln: &str) -> Vec<String> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let re = LINE.get_or_init(|| {
        Regex::new(
            r#"(?m)^\s*Project\("\{([0-9A-Fa-f-]+)\}"\)\s*=\s*"[^"]*"\s*,\s*"([^"]+)"\s*,\s*"\{[0-9A-Fa-f-]+\}""#,
        )
        .expect("solution project regex")
    });
    re.captures_iter(sln)
        .filter(|c| !c[1].eq_ignore_ascii_case(SOLUTION_FOLDER_TYPE))
        .map(|c| normalize_separators(&c[2]))
        .collect()
}

impl Project {
    pub fn load(path: &Path) -> Result<Project> {
        let is_csharp = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csproj"));
        if !is_csharp {
            return Err(Error::UnsupportedProjectKind {
                path: path.to_path_buf(),
            });
        }
        let text =
            fs::read_to_string(path).map_err(|e| Error::workspace_load(path, e.to_string()))?;
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let dir = parent_dir(&path);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let documents = project_documents(&text, &dir)
            .into_iter()
            .map(|doc| Document {
                id: DocumentId::new(&path, &doc),
                name: doc
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
                path: doc,
            })
            .collect::<Vec<_>>();
        tracing::debug!("Loaded project {} ({} documents)", name, documents.len());

        Ok(Project {
            name,
            references: project_references(&text),
            path,
            documents,
        })
    }

    /// Eligibility predicate: the project references `name` directly.
    pub fn references_platform(&self, name: &str) -> bool {
        self.references.contains(name)
    }
}

impl Workspace {
    /// Deduplicated references of `projects`.
    pub fn reference_set(projects: &[&Project]) -> BTreeSet<String> {
        projects
            .iter()
            .flat_map(|p| p.references.iter().cloned())
            .collect()
    }
}

struct ProjectPatterns {
    sdk: Regex,
    reference: Regex,
    package: Regex,
    project_ref: Regex,
    hint_path: Regex,
    compile_include: Regex,
    compile_remove: Regex,
}

fn patterns() -> &'static ProjectPatterns {
    static PATTERNS: OnceLock<ProjectPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |s: &str| Regex::new(s).expect("project regex");
        ProjectPatterns {
            sdk: re(r#"<Project\b[^>]*\bSdk\s*="#),
            reference: re(r#"<Reference\b[^>]*\bInclude\s*=\s*"([^"]+)""#),
            package: re(r#"<PackageReference\b[^>]*\bInclude\s*=\s*"([^"]+)""#),
            project_ref: re(r#"<ProjectReference\b[^>]*\bInclude\s*=\s*"([^"]+)""#),
            hint_path: re(r#"<HintPath>\s*([^<]+?)\s*</HintPath>"#),
            compile_include: re(r#"<Compile\b[^>]*\bInclude\s*=\s*"([^"]+)""#),
            compile_remove: re(r#"<Compile\b[^>]*\bRemove\s*=\s*"([^"]+)""#),
        }
    })
}

/// Assembly, package and project names referenced by a project file.
pub fn project_references(csproj: &str) -> BTreeSet<String> {
    let p = patterns();
    let mut refs = BTreeSet::new();
    for c in p.reference.captures_iter(csproj) {
        // `PX.Data, Version=1.0.0.0, Culture=neutral` → `PX.Data`
        if let Some(name) = c[1].split(',').next() {
            refs.insert(name.trim().to_string());
        }
    }
    for c in p.package.captures_iter(csproj) {
        refs.insert(c[1].trim().to_string());
    }
    for c in p.project_ref.captures_iter(csproj).chain(p.hint_path.captures_iter(csproj)) {
        let path = PathBuf::from(normalize_separators(&c[1]));
        if let Some(stem) = path.file_stem() {
            refs.insert(stem.to_string_lossy().to_string());
        }
    }
    refs.retain(|r| !r.is_empty());
    refs
}

fn split_items(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_separators)
}

fn project_documents(csproj: &str, dir: &Path) -> Vec<PathBuf> {
    let p = patterns();
    let removed: Vec<glob::Pattern> = p
        .compile_remove
        .captures_iter(csproj)
        .flat_map(|c| split_items(&c[1]).collect::<Vec<_>>())
        .filter_map(|pat| glob::Pattern::new(&pat).ok())
        .collect();

    let mut docs = BTreeSet::new();
    if p.sdk.is_match(csproj) {
        for path in glob_under(dir, "**/*.cs") {
            let excluded = path
                .strip_prefix(dir)
                .map(|rel| is_default_excluded(rel) || removed.iter().any(|r| r.matches_path(rel)))
                .unwrap_or(false);
            if !excluded {
                docs.insert(path);
            }
        }
    }
    for c in p.compile_include.captures_iter(csproj) {
        for item in split_items(&c[1]) {
            if item.contains(|c: char| matches!(c, '*' | '?' | '[')) {
                docs.extend(glob_under(dir, &item));
            } else {
                let path = dir.join(&item);
                docs.insert(fs::canonicalize(&path).unwrap_or(path));
            }
        }
    }
    docs.into_iter().collect()
}

fn glob_under(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    match glob::glob(&full) {
        Ok(paths) => paths
            .flatten()
            .filter(|p| p.is_file())
            .map(|p| fs::canonicalize(&p).unwrap_or(p))
            .collect(),
        Err(e) => {
            tracing::warn!("Ignoring invalid item pattern '{}': {}", pattern, e);
            Vec::new()
        }
    }
}

/// Default SDK item excludes: `bin/`, `obj/` and hidden folders.
fn is_default_excluded(rel: &Path) -> bool {
    let mut components = rel.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().to_string()),
        _ => None,
    });
    let first = components.next();
    if matches!(first.as_deref(), Some("bin") | Some("obj")) {
        return true;
    }
    let dirs: Vec<String> = first.into_iter().chain(components).collect();
    // The last component is the file itself.
    dirs.iter()
        .take(dirs.len().saturating_sub(1))
        .any(|d| d.starts_with('.'))
}

fn normalize_separators(s: &str) -> String {
    s.replace('\\', "/")
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SDK_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <Reference Include="PX.Data, Version=1.0.0.0, Culture=neutral">
      <HintPath>..\lib\PX.Common.dll</HintPath>
    </Reference>
    <PackageReference Version="13.0.1" Include="Newtonsoft.Json" />
    <ProjectReference Include="..\Shared\Shared.csproj" />
    <Compile Remove="Legacy\**" />
  </ItemGroup>
</Project>
"#;

    const SOLUTION: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App", "App\App.csproj", "{11111111-1111-1111-1111-111111111111}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Docs", "Docs", "{22222222-2222-2222-2222-222222222222}"
EndProject
Project("{F184B08F-C81C-45F6-A57F-5ABD9991F28F}") = "Vb", "Vb\Vb.vbproj", "{33333333-3333-3333-3333-333333333333}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Gone", "Gone\Gone.csproj", "{44444444-4444-4444-4444-444444444444}"
EndProject
"#;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_classify_extensions() {
        assert_eq!(classify(Path::new("a.sln")), Some(WorkspaceKind::Solution));
        assert_eq!(classify(Path::new("a.SLNF")), Some(WorkspaceKind::SolutionFilter));
        assert_eq!(classify(Path::new("a.csproj")), Some(WorkspaceKind::Project));
        assert_eq!(classify(Path::new("a.vbproj")), Some(WorkspaceKind::Project));
        assert_eq!(classify(Path::new("a.xproj")), None);
        assert_eq!(classify(Path::new("a.cs")), None);
    }

    #[test]
    fn test_project_references_collects_all_kinds() {
        let refs = project_references(SDK_PROJECT);
        let expected: BTreeSet<String> = ["PX.Data", "PX.Common", "Newtonsoft.Json", "Shared"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_solution_projects_skips_folders() {
        assert_eq!(
            solution_projects(SOLUTION),
            vec!["App/App.csproj", "Vb/Vb.vbproj", "Gone/Gone.csproj"]
        );
    }

    #[test]
    fn test_sdk_project_documents_honor_excludes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("App.csproj"), SDK_PROJECT);
        write(&root.join("Orders.cs"), "class Orders { }");
        write(&root.join("Dac/Items.cs"), "class Items { }");
        write(&root.join("obj/Debug/Gen.cs"), "class Gen { }");
        write(&root.join("bin/Out.cs"), "class Out { }");
        write(&root.join(".vs/Cache.cs"), "class Cache { }");
        write(&root.join("Legacy/Old.cs"), "class Old { }");

        let project = Project::load(&root.join("App.csproj")).unwrap();
        let names: Vec<&str> = project.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Items.cs", "Orders.cs"]);
        assert!(project.references_platform("PX.Data"));
        assert!(!project.references_platform("PX.Objects"));
    }

    #[test]
    fn test_classic_project_uses_compile_items() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("Old.csproj"),
            r#"<Project ToolsVersion="15.0">
  <ItemGroup>
    <Compile Include="Dac\Orders.cs" />
    <Compile Include="Missing.cs;Graph\*.cs" />
  </ItemGroup>
</Project>"#,
        );
        write(&root.join("Dac/Orders.cs"), "class Orders { }");
        write(&root.join("Graph/Maint.cs"), "class Maint { }");
        write(&root.join("Unlisted.cs"), "class Unlisted { }");

        let project = Project::load(&root.join("Old.csproj")).unwrap();
        let mut names: Vec<&str> = project.documents.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        // Missing files stay listed; reading them fails later and is reported per file.
        assert_eq!(names, vec!["Maint.cs", "Missing.cs", "Orders.cs"]);
    }

    #[test]
    fn test_load_solution_skips_unsupported_and_missing_projects() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("All.sln"), SOLUTION);
        write(&root.join("App/App.csproj"), SDK_PROJECT);
        write(&root.join("App/Orders.cs"), "class Orders { }");
        write(&root.join("Vb/Vb.vbproj"), "<Project Sdk=\"Microsoft.NET.Sdk\" />");

        let file = locate(Some(&root.join("All.sln"))).unwrap();
        assert_eq!(file.kind, WorkspaceKind::Solution);
        let ws = load(&file).unwrap();
        assert_eq!(ws.projects.len(), 1);
        assert_eq!(ws.projects[0].name, "App");
        assert_eq!(ws.diagnostics.len(), 2);
    }

    #[test]
    fn test_load_solution_filter() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("All.sln"), SOLUTION);
        write(&root.join("App/App.csproj"), SDK_PROJECT);
        write(
            &root.join("filters/App.slnf"),
            r#"{ "solution": { "path": "..\\All.sln", "projects": [ "App\\App.csproj" ] } }"#,
        );
        let file = locate(Some(&root.join("filters/App.slnf"))).unwrap();
        let ws = load(&file).unwrap();
        assert_eq!(ws.projects.len(), 1);
        assert!(ws.diagnostics.is_empty());
    }

    #[test]
    fn test_locate_directory_search() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        assert!(matches!(
            locate(Some(root)),
            Err(Error::AmbiguousWorkspaceSelection { found: 0, .. })
        ));

        write(&root.join("App.csproj"), SDK_PROJECT);
        let found = locate(Some(root)).unwrap();
        assert_eq!(found.kind, WorkspaceKind::Project);

        write(&root.join("Other.csproj"), SDK_PROJECT);
        assert!(matches!(
            locate(Some(root)),
            Err(Error::AmbiguousWorkspaceSelection { found: 2, .. })
        ));

        // Solutions and projects are candidates alike.
        fs::remove_file(root.join("Other.csproj")).unwrap();
        write(&root.join("All.sln"), SOLUTION);
        assert!(matches!(
            locate(Some(root)),
            Err(Error::AmbiguousWorkspaceSelection { found: 2, .. })
        ));
        fs::remove_file(root.join("App.csproj")).unwrap();
        assert_eq!(locate(Some(root)).unwrap().kind, WorkspaceKind::Solution);
    }

    #[test]
    fn test_locate_rejects_invalid_and_missing_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("notes.txt"), "");
        let invalid = locate(Some(&root.join("notes.txt"))).unwrap_err();
        assert_eq!(invalid.exit_code(), 2);
        let missing = locate(Some(&root.join("Nope.csproj"))).unwrap_err();
        assert!(missing.to_string().contains("does not exist"));
    }

    #[test]
    fn test_single_unsupported_project_fails_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Vb.vbproj");
        write(&path, "<Project />");
        let file = locate(Some(&path)).unwrap();
        assert!(matches!(load(&file), Err(Error::WorkspaceLoad { .. })));
    }

    #[test]
    fn test_reference_set_is_deduplicated() {
        let mk = |refs: &[&str]| Project {
            name: "p".into(),
            path: PathBuf::from("p.csproj"),
            documents: vec![],
            references: refs.iter().map(|s| s.to_string()).collect(),
        };
        let a = mk(&["PX.Data", "PX.Common"]);
        let b = mk(&["PX.Data", "PX.Objects"]);
        assert_eq!(Workspace::reference_set(&[&a, &b]).len(), 3);
    }
}
