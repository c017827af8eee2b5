//! Fix runner: walks eligible projects and their documents, runs the rewrite
//! engine per file and persists rewritten files in apply mode.
//!
//! Processing is strictly sequential (one project, one document, one write
//! at a time). Errors on a single file are logged, recorded as skipped and
//! never stop the run.

use crate::error::{Error, Result};
use crate::models::{RunSummary, SkippedFile, SourceFileReport};
use crate::resolver::{ResolverOptions, SyntacticResolver};
use crate::rewrite::{Mode, RewriteEngine, RewriteRule};
use crate::syntax::{CSharpParser, Toolchain};
use crate::textio;
use crate::workspace::{Document, Project, Workspace};
use std::io;
use std::path::Path;

/// Settings for one fix run.
#[derive(Debug, Clone)]
pub struct FixOptions {
    pub rule: RewriteRule,
    pub mode: Mode,
    /// Only projects referencing this assembly/package are processed.
    pub platform_reference: String,
    pub resolver: ResolverOptions,
}

impl FixOptions {
    /// Resolver hints plus the rule's own names, so the capability is always
    /// seen as an interface and the expected base as a class.
    fn resolver_options(&self) -> ResolverOptions {
        let mut opts = self.resolver.clone();
        opts.interfaces.insert(self.rule.capability().to_string());
        opts.classes
            .insert(self.rule.expected_base_name().to_string());
        opts
    }
}

#[derive(Debug, Default)]
/// Outcome of a fix run.
pub struct FixRun {
    pub apply: bool,
    pub files: Vec<SourceFileReport>,
    /// Files of `files` actually saved (apply mode only).
    pub written: usize,
    pub skipped: Vec<SkippedFile>,
    pub projects: usize,
    pub documents: usize,
}

impl FixRun {
    /// Files with changes that could not be saved.
    pub fn failed_writes(&self) -> usize {
        if self.apply {
            self.files.len() - self.written
        } else {
            0
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            apply: self.apply,
            files_with_changes: self.files.len(),
            written: self.written,
            total_changes: self.files.iter().map(|f| f.file_changes.len()).sum(),
            skipped: self.skipped.len(),
            projects: self.projects,
            documents: self.documents,
        }
    }
}

/// Run the fixer across all eligible projects of `workspace`.
pub fn run_fix(workspace: &Workspace, toolchain: &Toolchain, opts: &FixOptions) -> Result<FixRun> {
    run_fix_with(workspace, toolchain, opts, &mut textio::write_atomic)
}

/// [`run_fix`] with the function used to save rewritten files.
pub fn run_fix_with(
    workspace: &Workspace,
    toolchain: &Toolchain,
    opts: &FixOptions,
    save: &mut dyn FnMut(&Path, &[u8]) -> io::Result<()>,
) -> Result<FixRun> {
    let mut parser = toolchain.parser()?;
    let resolver_opts = opts.resolver_options();
    let mut run = FixRun {
        apply: opts.mode == Mode::Apply,
        ..Default::default()
    };

    let eligible: Vec<&Project> = workspace
        .projects
        .iter()
        .filter(|p| {
            let ok = p.references_platform(&opts.platform_reference);
            if !ok {
                tracing::debug!(
                    "Skipping project {}: no reference to {}",
                    p.name,
                    opts.platform_reference
                );
            }
            ok
        })
        .collect();

    for project in &eligible {
        let references = Workspace::reference_set(&eligible);
        tracing::debug!(
            "Analysing project {} ({} documents, {} references)",
            project.name,
            project.documents.len(),
            references.len()
        );
        run.projects += 1;
        for doc in &project.documents {
            run.documents += 1;
            match fix_document(project, doc, &mut parser, &resolver_opts, opts, save) {
                Ok(Some(outcome)) => {
                    match outcome.write_error {
                        Some(err) => run.skipped.push(SkippedFile {
                            path: doc.path.clone(),
                            reason: err.to_string(),
                        }),
                        None if run.apply => run.written += 1,
                        None => {}
                    }
                    run.files.push(outcome.report);
                }
                Ok(None) => {}
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    tracing::error!("{}", e);
                    run.skipped.push(SkippedFile {
                        path: doc.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
    Ok(run)
}

struct DocumentOutcome {
    report: SourceFileReport,
    /// Set when the rewrite was computed but could not be saved.
    write_error: Option<Error>,
}

fn fix_document(
    project: &Project,
    doc: &Document,
    parser: &mut CSharpParser,
    resolver_opts: &ResolverOptions,
    opts: &FixOptions,
    save: &mut dyn FnMut(&Path, &[u8]) -> io::Result<()>,
) -> Result<Option<DocumentOutcome>> {
    let source = textio::read_source(&doc.path).map_err(|e| Error::file_access(&doc.path, e))?;
    let parse_err = |e: Error| Error::Parse {
        path: doc.path.clone(),
        reason: e.to_string(),
    };
    let tree = parser.parse(source.text.as_str()).map_err(parse_err)?;
    if tree.has_errors() {
        tracing::debug!("{} contains syntax errors", doc.path.display());
    }
    let resolver = SyntacticResolver::new(&tree, resolver_opts.clone());
    let outcome = RewriteEngine::new(&opts.rule, &resolver)
        .run(&tree, opts.mode, parser)
        .map_err(parse_err)?;

    let Some(report) = SourceFileReport::from_changes(
        doc.id,
        doc.name.clone(),
        doc.path.clone(),
        project.path.clone(),
        outcome.changes,
    ) else {
        return Ok(None);
    };

    let mut write_error = None;
    if let Some(rewritten) = outcome.rewritten {
        tracing::info!("Saving file: {}", doc.path.display());
        let bytes = source.encode(rewritten.text());
        if let Err(e) = save(&doc.path, &bytes) {
            let err = Error::file_access(&doc.path, e);
            tracing::error!("{}", err);
            write_error = Some(err);
        }
    }
    Ok(Some(DocumentOutcome {
        report,
        write_error,
    }))
}
