//! Symbol resolution for type declarations.
//!
//! The rewrite engine only needs three facts per declaration: its name, its
//! direct base type and the capabilities (interfaces) it implements directly.
//! [`SymbolResolver`] is that narrow seam. [`SyntacticResolver`] answers it
//! from a single file: types declared in sibling files of the same project
//! are classified by configuration and naming convention only. Parts of a
//! `partial` class declared in the same file are resolved together.

use crate::syntax::{Declaration, DeclarationKind, SourceTree};
use std::collections::{BTreeSet, HashMap};

/// Resolved facts for one declaration. Names are simple (unqualified) names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolInfo {
    pub name: String,
    pub base_type: Option<String>,
    pub capabilities: BTreeSet<String>,
}

pub trait SymbolResolver {
    /// `None` when the declaration cannot be resolved; it is then never
    /// reported.
    fn resolve(&self, decl: &Declaration) -> Option<SymbolInfo>;
}

/// Hints for names the file itself does not declare.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Names always treated as interfaces.
    pub interfaces: BTreeSet<String>,
    /// Names always treated as classes.
    pub classes: BTreeSet<String>,
    /// Also report capabilities inherited through interfaces declared in the
    /// same file.
    pub transitive: bool,
}

/// File-scoped resolver built from one [`SourceTree`].
pub struct SyntacticResolver {
    options: ResolverOptions,
    /// Kinds of types declared in this file, by simple name.
    declared: HashMap<String, DeclarationKind>,
    /// Direct parents of interfaces declared in this file.
    interface_parents: HashMap<String, Vec<String>>,
    /// Merged facts of `partial` parts, by qualified name.
    partials: HashMap<String, TypeFacts>,
}

#[derive(Debug, Clone, Default)]
struct TypeFacts {
    base_type: Option<String>,
    capabilities: BTreeSet<String>,
}

impl SyntacticResolver {
    pub fn new(tree: &SourceTree, options: ResolverOptions) -> Self {
        let mut declared = HashMap::new();
        let mut interface_parents = HashMap::new();
        let decls = tree.declarations_preorder();
        for decl in &decls {
            if decl.kind == DeclarationKind::Interface {
                let parents = decl
                    .base_list
                    .as_ref()
                    .map(|b| b.entries.iter().map(|e| e.simple_name.clone()).collect())
                    .unwrap_or_default();
                interface_parents.insert(decl.name.clone(), parents);
            }
            declared.entry(decl.name.clone()).or_insert(decl.kind);
        }
        let mut resolver = SyntacticResolver {
            options,
            declared,
            interface_parents,
            partials: HashMap::new(),
        };

        let mut partials: HashMap<String, TypeFacts> = HashMap::new();
        for decl in decls.iter().filter(|d| d.is_partial) {
            let own = resolver.direct_facts(decl);
            let merged = partials.entry(decl.qualified_name.clone()).or_default();
            if merged.base_type.is_none() {
                merged.base_type = own.base_type;
            }
            merged.capabilities.extend(own.capabilities);
        }
        resolver.partials = partials;
        resolver
    }

    /// Base type and capabilities spelled in this declaration's own base list.
    fn direct_facts(&self, decl: &Declaration) -> TypeFacts {
        let entries = decl
            .base_list
            .as_ref()
            .map(|b| b.entries.as_slice())
            .unwrap_or_default();
        let mut facts = TypeFacts::default();
        for (i, entry) in entries.iter().enumerate() {
            // C# allows a base class only in the first position.
            let may_be_base = i == 0
                && matches!(decl.kind, DeclarationKind::Class | DeclarationKind::Record);
            if may_be_base && !self.is_interface(&entry.simple_name) {
                facts.base_type = Some(entry.simple_name.clone());
            } else {
                facts.capabilities.insert(entry.simple_name.clone());
            }
        }
        facts
    }

    fn is_interface(&self, name: &str) -> bool {
        match self.declared.get(name) {
            Some(DeclarationKind::Interface) => return true,
            Some(DeclarationKind::Class | DeclarationKind::Record) => return false,
            _ => {}
        }
        if self.options.interfaces.contains(name) {
            return true;
        }
        if self.options.classes.contains(name) {
            return false;
        }
        looks_like_interface(name)
    }

    fn expand(&self, capabilities: &mut BTreeSet<String>) {
        let mut pending: Vec<String> = capabilities.iter().cloned().collect();
        while let Some(name) = pending.pop() {
            if let Some(parents) = self.interface_parents.get(&name) {
                for parent in parents {
                    if capabilities.insert(parent.clone()) {
                        pending.push(parent.clone());
                    }
                }
            }
        }
    }
}

impl SymbolResolver for SyntacticResolver {
    fn resolve(&self, decl: &Declaration) -> Option<SymbolInfo> {
        if decl.name.is_empty() {
            return None;
        }
        let mut facts = match self.partials.get(&decl.qualified_name) {
            Some(merged) if decl.is_partial => merged.clone(),
            _ => self.direct_facts(decl),
        };
        if self.options.transitive {
            self.expand(&mut facts.capabilities);
        }

        Some(SymbolInfo {
            name: decl.name.clone(),
            base_type: facts.base_type,
            capabilities: facts.capabilities,
        })
    }
}

/// .NET naming convention: `I` followed by an uppercase letter.
fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tests::parse;

    fn resolve_all(code: &str, options: ResolverOptions) -> Vec<SymbolInfo> {
        let tree = parse(code);
        let resolver = SyntacticResolver::new(&tree, options);
        tree.declarations_preorder()
            .iter()
            .filter_map(|d| resolver.resolve(d))
            .collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_entry_is_base_unless_interface() {
        let infos = resolve_all(
            "class A : LegacyBase, ITable { }\nclass B : ITable, IOther { }\n",
            ResolverOptions::default(),
        );
        assert_eq!(infos[0].base_type.as_deref(), Some("LegacyBase"));
        assert_eq!(infos[0].capabilities, set(&["ITable"]));
        assert_eq!(infos[1].base_type, None);
        assert_eq!(infos[1].capabilities, set(&["IOther", "ITable"]));
    }

    #[test]
    fn test_file_declarations_override_naming_convention() {
        let code = "class IOHandler { }\ninterface Table { }\nclass A : IOHandler, Table { }\nclass B : Table { }\n";
        let infos = resolve_all(code, ResolverOptions::default());
        let a = infos.iter().find(|i| i.name == "A").unwrap();
        assert_eq!(a.base_type.as_deref(), Some("IOHandler"));
        let b = infos.iter().find(|i| i.name == "B").unwrap();
        assert_eq!(b.base_type, None);
        assert_eq!(b.capabilities, set(&["Table"]));
    }

    #[test]
    fn test_options_classify_foreign_names() {
        let options = ResolverOptions {
            interfaces: set(&["Tableish"]),
            classes: set(&["IOBase"]),
            transitive: false,
        };
        let infos = resolve_all("class A : Tableish { }\nclass B : IOBase, ITable { }\n", options);
        assert_eq!(infos[0].base_type, None);
        assert_eq!(infos[1].base_type.as_deref(), Some("IOBase"));
    }

    #[test]
    fn test_qualified_and_generic_names_are_simplified() {
        let infos = resolve_all(
            "class A : PX.Data.PXBqlTable, PX.Data.IBqlTable { }\nclass B : TableBase<B>, ITable { }\n",
            ResolverOptions::default(),
        );
        assert_eq!(infos[0].base_type.as_deref(), Some("PXBqlTable"));
        assert_eq!(infos[0].capabilities, set(&["IBqlTable"]));
        assert_eq!(infos[1].base_type.as_deref(), Some("TableBase"));
    }

    #[test]
    fn test_transitive_capabilities_only_when_enabled() {
        let code = "interface IAudited : ITable { }\nclass A : IAudited { }\n";
        let direct = resolve_all(code, ResolverOptions::default());
        let a = direct.iter().find(|i| i.name == "A").unwrap();
        assert_eq!(a.capabilities, set(&["IAudited"]));

        let options = ResolverOptions {
            transitive: true,
            ..Default::default()
        };
        let closed = resolve_all(code, options);
        let a = closed.iter().find(|i| i.name == "A").unwrap();
        assert_eq!(a.capabilities, set(&["IAudited", "ITable"]));
    }

    #[test]
    fn test_struct_entries_are_all_capabilities() {
        let infos = resolve_all("struct S : Comparable, ITable { }\n", ResolverOptions::default());
        assert_eq!(infos[0].base_type, None);
        assert_eq!(infos[0].capabilities, set(&["Comparable", "ITable"]));
    }

    #[test]
    fn test_partial_parts_share_base_and_capabilities() {
        let code = "partial class A : TableBase { }\npartial class A : ITable { }\nnamespace N { partial class A : IOther { } }\n";
        let infos = resolve_all(code, ResolverOptions::default());
        for part in &infos[..2] {
            assert_eq!(part.base_type.as_deref(), Some("TableBase"));
            assert_eq!(part.capabilities, set(&["ITable"]));
        }
        // Same simple name in another namespace is a different type.
        assert_eq!(infos[2].base_type, None);
        assert_eq!(infos[2].capabilities, set(&["IOther"]));
    }

    #[test]
    fn test_naming_convention() {
        assert!(looks_like_interface("ITable"));
        assert!(!looks_like_interface("Item"));
        assert!(!looks_like_interface("I"));
    }
}
