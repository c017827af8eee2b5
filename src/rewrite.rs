//! Base type rewrite engine.
//!
//! A class is non-conformant when it directly implements the target
//! capability but its direct base type is missing or different from the
//! expected one. [`RewriteEngine::scan`] is the single detection pass; both
//! modes report exactly what it finds, and apply mode additionally turns the
//! findings' edits into a new tree:
//! - each class is judged only on its own [`SymbolInfo`], so nested and
//!   sibling declarations never influence each other;
//! - an edit only inserts the expected base type into the base list, all
//!   other bytes of the file are kept as they are;
//! - the input tree is never modified.

use crate::error::Result;
use crate::models::ChangeRecord;
use crate::resolver::{SymbolInfo, SymbolResolver};
use crate::syntax::{simple_type_name, CSharpParser, Declaration, SourceTree, TextEdit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report only.
    Detect,
    /// Report and produce a rewritten tree.
    Apply,
}

/// What to enforce: classes implementing `capability` must derive from `base_type`.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    capability: String,
    /// Spelling inserted into base lists, possibly namespace-qualified.
    base_type: String,
    /// Simple name compared against resolved base types.
    expected_base: String,
}

impl RewriteRule {
    pub fn new(capability: impl AsRef<str>, base_type: impl Into<String>) -> Self {
        let base_type = base_type.into();
        RewriteRule {
            capability: simple_type_name(capability.as_ref()),
            expected_base: simple_type_name(&base_type),
            base_type,
        }
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn base_type(&self) -> &str {
        &self.base_type
    }

    pub fn expected_base_name(&self) -> &str {
        &self.expected_base
    }

    pub fn is_nonconformant(&self, info: &SymbolInfo) -> bool {
        info.capabilities.contains(&self.capability)
            && info.base_type.as_deref() != Some(self.expected_base.as_str())
    }

    /// Insert the base type first in the base list, or add a base list when
    /// the declaration has none.
    fn edit_for(&self, decl: &Declaration) -> TextEdit {
        match decl.base_list.as_ref().and_then(|b| b.entries.first()) {
            Some(first) => TextEdit::insert_at(first.span.start, format!("{}, ", self.base_type)),
            None => TextEdit::insert_at(decl.header_end, format!(" : {}", self.base_type)),
        }
    }
}

/// A non-conformant declaration: the record to report and the edit fixing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub record: ChangeRecord,
    pub edit: TextEdit,
}

pub struct RewriteOutcome {
    pub changes: Vec<ChangeRecord>,
    /// The edited tree; present only in [`Mode::Apply`] when something changed.
    pub rewritten: Option<SourceTree>,
}

pub struct RewriteEngine<'a, R: SymbolResolver + ?Sized> {
    rule: &'a RewriteRule,
    resolver: &'a R,
}

impl<'a, R: SymbolResolver + ?Sized> RewriteEngine<'a, R> {
    pub fn new(rule: &'a RewriteRule, resolver: &'a R) -> Self {
        RewriteEngine { rule, resolver }
    }

    /// Non-conformant classes in document order (parents before children).
    pub fn scan(&self, tree: &SourceTree) -> Vec<Finding> {
        let mut findings = Vec::new();
        for decl in tree.declarations_preorder() {
            if !decl.kind.is_class_like() {
                continue;
            }
            let Some(info) = self.resolver.resolve(&decl) else {
                continue;
            };
            if !self.rule.is_nonconformant(&info) {
                continue;
            }
            tracing::trace!(
                "{} implements {} but derives from {}",
                info.name,
                self.rule.capability,
                info.base_type.as_deref().unwrap_or("nothing")
            );
            findings.push(Finding {
                record: ChangeRecord::from_zero_based(decl.start.line, decl.start.column, info.name),
                edit: self.rule.edit_for(&decl),
            });
        }
        findings
    }

    pub fn run(
        &self,
        tree: &SourceTree,
        mode: Mode,
        parser: &mut CSharpParser,
    ) -> Result<RewriteOutcome> {
        let findings = self.scan(tree);
        let rewritten = match mode {
            Mode::Detect => None,
            Mode::Apply if findings.is_empty() => None,
            Mode::Apply => {
                let edits: Vec<TextEdit> = findings.iter().map(|f| f.edit.clone()).collect();
                Some(parser.reparse(tree, &edits)?)
            }
        };
        Ok(RewriteOutcome {
            changes: findings.into_iter().map(|f| f.record).collect(),
            rewritten,
        })
    }
}
