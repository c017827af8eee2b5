//! C# syntax layer backed by tree-sitter.
//!
//! - [`Toolchain`] is the one-time grammar discovery; callers own it and no
//!   global state is kept.
//! - [`CSharpParser`] turns text into a [`SourceTree`] and re-parses edited
//!   trees incrementally, so subtrees outside an edit are shared with the
//!   previous tree instead of being rebuilt.
//! - [`Declaration`] is the view of a type declaration the rewrite engine
//!   and resolvers work with. Namespace blocks are transparent.

use crate::error::{Error, Result};
use std::ops::Range;
use tree_sitter::{InputEdit, Language, Node, Parser, Point, Tree};

/// Loaded C# grammar.
#[derive(Clone)]
pub struct Toolchain {
    language: Language,
}

impl Toolchain {
    /// Load the grammar and verify a parser accepts it.
    pub fn discover() -> Result<Self> {
        let language = tree_sitter_c_sharp::language();
        let mut probe = Parser::new();
        probe
            .set_language(&language)
            .map_err(|e| Error::ToolchainUnavailable(e.to_string()))?;
        tracing::debug!("Using C# grammar (ABI version {})", language.version());
        Ok(Toolchain { language })
    }

    pub fn parser(&self) -> Result<CSharpParser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Error::ToolchainUnavailable(e.to_string()))?;
        Ok(CSharpParser { parser })
    }
}

pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    pub fn parse(&mut self, text: impl Into<String>) -> Result<SourceTree> {
        let text = text.into();
        let tree = self
            .parser
            .parse(&text, None)
            .ok_or_else(|| Error::Syntax("parser produced no tree".into()))?;
        Ok(SourceTree { text, tree })
    }

    /// Apply `edits` to a copy of `old` and re-parse incrementally.
    ///
    /// Edits are expressed in `old`'s byte offsets and must not overlap.
    /// `old` is left untouched.
    pub fn reparse(&mut self, old: &SourceTree, edits: &[TextEdit]) -> Result<SourceTree> {
        let mut ordered: Vec<&TextEdit> = edits.iter().collect();
        // Back to front: earlier offsets stay valid while later text changes.
        ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));

        let mut text = old.text.clone();
        let mut tree = old.tree.clone();
        for edit in ordered {
            let start_position = point_at(&text, edit.range.start);
            let old_end_position = point_at(&text, edit.range.end);
            let new_end_byte = edit.range.start + edit.insert.len();
            text.replace_range(edit.range.clone(), &edit.insert);
            let new_end_position = point_at(&text, new_end_byte);
            tree.edit(&InputEdit {
                start_byte: edit.range.start,
                old_end_byte: edit.range.end,
                new_end_byte,
                start_position,
                old_end_position,
                new_end_position,
            });
        }
        let tree = self
            .parser
            .parse(&text, Some(&tree))
            .ok_or_else(|| Error::Syntax("parser produced no tree after edit".into()))?;
        Ok(SourceTree { text, tree })
    }
}

/// Replace `range` (byte offsets) with `insert`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub insert: String,
}

impl TextEdit {
    pub fn insert_at(offset: usize, insert: impl Into<String>) -> Self {
        TextEdit {
            range: offset..offset,
            insert: insert.into(),
        }
    }
}

/// Parsed source text. Cloning is cheap for the tree (reference counted).
#[derive(Clone)]
pub struct SourceTree {
    text: String,
    tree: Tree,
}

impl SourceTree {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// True when the parser had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Top-level type declarations in document order, nested ones attached
    /// as children.
    pub fn declarations(&self) -> Vec<Declaration> {
        let mut out = Vec::new();
        collect_declarations(self.tree.root_node(), &self.text, "", 0, &mut out);
        out
    }

    /// Every type declaration in pre-order (parents before their children).
    pub fn declarations_preorder(&self) -> Vec<Declaration> {
        fn flatten(decls: Vec<Declaration>, out: &mut Vec<Declaration>) {
            for mut d in decls {
                let children = std::mem::take(&mut d.children);
                out.push(d);
                flatten(children, out);
            }
        }
        let mut out = Vec::new();
        flatten(self.declarations(), &mut out);
        out
    }
}

/// 0-based line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

impl DeclarationKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(DeclarationKind::Class),
            "struct_declaration" | "record_struct_declaration" => Some(DeclarationKind::Struct),
            "interface_declaration" => Some(DeclarationKind::Interface),
            "record_declaration" => Some(DeclarationKind::Record),
            "enum_declaration" => Some(DeclarationKind::Enum),
            _ => None,
        }
    }

    /// Only classes take part in the base type check.
    pub fn is_class_like(self) -> bool {
        self == DeclarationKind::Class
    }
}

#[derive(Debug, Clone)]
pub struct BaseEntry {
    /// Source spelling, e.g. `PX.Data.IBqlTable`.
    pub text: String,
    /// Unqualified name without generic arguments, e.g. `IBqlTable`.
    pub simple_name: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct BaseList {
    pub entries: Vec<BaseEntry>,
}

/// A type declaration inside a [`SourceTree`].
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Enclosing namespaces and types plus the name, e.g. `Acme.Data.Outer.Inner`.
    pub qualified_name: String,
    /// Declared with the `partial` modifier.
    pub is_partial: bool,
    /// Number of enclosing type declarations.
    pub depth: usize,
    pub start: Position,
    pub base_list: Option<BaseList>,
    /// Byte offset right after the name, type parameters and primary
    /// constructor parameters; where a missing base list would begin.
    pub header_end: usize,
    pub children: Vec<Declaration>,
}

fn collect_declarations(
    node: Node<'_>,
    text: &str,
    scope: &str,
    depth: usize,
    out: &mut Vec<Declaration>,
) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    // A file-scoped namespace covers the declarations that follow it.
    let mut scope = scope.to_string();
    for child in children {
        match child.kind() {
            "file_scoped_namespace_declaration" => {
                scope = qualify(&scope, &field_text(child, "name", text));
                collect_declarations(child, text, &scope, depth, out);
            }
            "namespace_declaration" => {
                let inner = qualify(&scope, &field_text(child, "name", text));
                collect_declarations(child, text, &inner, depth, out);
            }
            other => match DeclarationKind::from_node_kind(other) {
                Some(kind) => {
                    let mut decl = build_declaration(child, kind, text, &scope, depth);
                    let inner = decl.qualified_name.clone();
                    collect_declarations(child, text, &inner, depth + 1, &mut decl.children);
                    out.push(decl);
                }
                None => collect_declarations(child, text, &scope, depth, out),
            },
        }
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn field_text(node: Node<'_>, field: &str, text: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, text).chars().filter(|c| !c.is_whitespace()).collect())
        .unwrap_or_default()
}

fn build_declaration(
    node: Node<'_>,
    kind: DeclarationKind,
    text: &str,
    scope: &str,
    depth: usize,
) -> Declaration {
    let name_node = node.child_by_field_name("name");
    let name = name_node
        .map(|n| node_text(n, text).to_string())
        .unwrap_or_default();
    let mut header_end = name_node.map(|n| n.end_byte()).unwrap_or(node.start_byte());
    let mut base_list = None;
    let mut is_partial = false;

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "modifier" if node_text(child, text) == "partial" => is_partial = true,
            "type_parameter_list" | "parameter_list" => {
                header_end = header_end.max(child.end_byte());
            }
            "base_list" => base_list = Some(build_base_list(child, text)),
            _ => {}
        }
    }

    Declaration {
        kind,
        qualified_name: qualify(scope, &name),
        name,
        is_partial,
        depth,
        start: to_position(node.start_position(), node.start_byte(), text),
        base_list,
        header_end,
        children: Vec::new(),
    }
}

fn build_base_list(node: Node<'_>, text: &str) -> BaseList {
    let mut entries = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let ty = match child.kind() {
            "comment" | "argument_list" => continue,
            // `Base(args)` in a primary constructor: the type is the first child.
            "primary_constructor_base_type" => child.named_child(0).unwrap_or(child),
            _ => child,
        };
        let spelled = node_text(ty, text);
        entries.push(BaseEntry {
            text: spelled.to_string(),
            simple_name: simple_type_name(spelled),
            span: child.start_byte()..child.end_byte(),
        });
    }
    BaseList { entries }
}

fn node_text<'a>(node: Node<'_>, text: &'a str) -> &'a str {
    &text[node.start_byte()..node.end_byte()]
}

fn to_position(point: Point, byte: usize, text: &str) -> Position {
    let line_start = byte - point.column;
    Position {
        line: point.row,
        column: text[line_start..byte].encode_utf16().count(),
    }
}

/// Tree-sitter point (row, byte column) for a byte offset.
fn point_at(text: &str, byte: usize) -> Point {
    let before = &text[..byte];
    let row = before.matches('\n').count();
    let column = before.rfind('\n').map(|i| byte - i - 1).unwrap_or(byte);
    Point::new(row, column)
}

/// Unqualified type name: `global::PX.Data.PXBqlTable` → `PXBqlTable`,
/// `TableBase<Orders>` → `TableBase`.
pub fn simple_type_name(spelled: &str) -> String {
    let without_args = spelled.split('<').next().unwrap_or(spelled);
    let last = without_args
        .rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(without_args);
    last.chars().filter(|c| !c.is_whitespace()).collect()
}
