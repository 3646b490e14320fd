//! Lookup of `message`, `enum`, and `service` definitions over a
//! tree-sitter-proto syntax tree.
//!
//! Dotted names qualify by suffix against the file's `package` followed by the
//! enclosing messages, so `Entry.Kind` and `v1.Entry.Kind` reach the same
//! nested enum.

use std::fmt;
use std::ops::ControlFlow;

use tree_sitter::Node;

use crate::types::{self, QualifiedName};

/// Maximum nesting the walk descends before giving up on a subtree.
const MAX_DEPTH: u32 = 256;

/// Definition kinds a proto lookup can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoKind {
    /// `enum Name { ... }`
    Enum,
    /// `message Name { ... }`
    Message,
    /// `service Name { ... }`
    Service,
}

impl ProtoKind {
    /// Node kind of the definition's name child.
    fn name_kind(self) -> &'static str {
        return match self {
            ProtoKind::Enum => "enum_name",
            ProtoKind::Message => "message_name",
            ProtoKind::Service => "service_name",
        };
    }

    /// Kind of a definition node. The grammar's keyword tokens share these
    /// kind strings, so only named nodes count.
    fn of_node(node: Node<'_>) -> Option<Self> {
        if !node.is_named() {
            return None;
        }
        return match node.kind() {
            "enum" => Some(ProtoKind::Enum),
            "message" => Some(ProtoKind::Message),
            "service" => Some(ProtoKind::Service),
            _ => None,
        };
    }
}

impl fmt::Display for ProtoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            ProtoKind::Enum => f.write_str("enum"),
            ProtoKind::Message => f.write_str("message"),
            ProtoKind::Service => f.write_str("service"),
        };
    }
}

/// A definition reached by the walk.
struct Definition<'t> {
    /// Which keyword introduced it.
    kind: ProtoKind,
    /// Declared name.
    name: String,
    /// The whole definition, keyword to closing brace.
    node: Node<'t>,
    /// Enclosing path, outermost first.
    scope: Vec<String>,
}

/// Callback invoked for each definition; `Break` stops the walk.
type Visitor<'v, 't> = dyn FnMut(Definition<'t>) -> ControlFlow<()> + 'v;

/// First definition, depth first, of `kind` named `name`.
pub fn find<'t>(root: Node<'t>, source: &str, kind: ProtoKind, name: &QualifiedName) -> Option<Node<'t>> {
    let mut found = None;
    let scope = package(root, source);
    let _ = walk(root, &scope, 0, source, &mut |definition| {
        if definition.kind != kind
            || definition.name != name.leaf
            || !types::qualifiers_match(&definition.scope, &name.qualifiers)
        {
            return ControlFlow::Continue(());
        }
        found = Some(definition.node);
        return ControlFlow::Break(());
    });
    return found;
}

/// Dotted names, package left off, of every definition of `kind`.
pub fn names(root: Node<'_>, source: &str, kind: ProtoKind) -> Vec<String> {
    let mut names = Vec::new();
    let _ = walk(root, &[], 0, source, &mut |definition| {
        if definition.kind == kind {
            let mut path = definition.scope;
            path.push(definition.name);
            names.push(path.join("."));
        }
        return ControlFlow::Continue(());
    });
    return names;
}

/// Segments of the file's `package` declaration; empty when there is none.
fn package(root: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = root.walk();
    let Some(declaration) = root.named_children(&mut cursor).find(|n| return n.kind() == "package") else {
        return Vec::new();
    };
    let mut inner = declaration.walk();
    let ident = declaration.named_children(&mut inner).find(|n| return n.kind() == "full_ident");
    return ident
        .and_then(|n| return n.utf8_text(source.as_bytes()).ok())
        .map(|text| {
            return text
                .split('.')
                .map(str::trim)
                .filter(|s| return !s.is_empty())
                .map(String::from)
                .collect();
        })
        .unwrap_or_default();
}

/// Text of a definition's name child.
fn definition_name(node: Node<'_>, kind: ProtoKind, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let name = node.named_children(&mut cursor).find(|c| return c.kind() == kind.name_kind())?;
    return name.utf8_text(source.as_bytes()).ok().map(String::from);
}

/// Depth-first walk; a definition's body sees the scope extended by its name.
fn walk<'t>(
    node: Node<'t>,
    scope: &[String],
    depth: u32,
    source: &str,
    visit: &mut Visitor<'_, 't>,
) -> ControlFlow<()> {
    if depth > MAX_DEPTH {
        return ControlFlow::Continue(());
    }
    let depth = depth.saturating_add(1);

    let definition = ProtoKind::of_node(node).and_then(|kind| {
        return definition_name(node, kind, source).map(|name| return (kind, name));
    });
    let extended: Vec<String>;
    let child_scope = match definition {
        Some((kind, name)) => {
            extended = scope.iter().cloned().chain(std::iter::once(name.clone())).collect();
            visit(Definition {
                kind,
                name,
                node,
                scope: scope.to_vec(),
            })?;
            extended.as_slice()
        },
        None => scope,
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, child_scope, depth, source, visit)?;
    }
    return ControlFlow::Continue(());
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tree_sitter::Tree;

    use super::*;

    const LEDGER: &str = include_str!("../tests/fixtures/ledger.proto");

    fn tree(source: &str) -> Tree {
        return crate::syntax::parse_proto(Path::new("t.proto"), source).unwrap();
    }

    fn qn(raw: &str) -> QualifiedName {
        return QualifiedName::parse(raw).unwrap();
    }

    fn lines(node: Node<'_>) -> (u32, u32) {
        let span = types::node_lines(node);
        return (span.start, span.end);
    }

    #[test]
    fn message_spans_keyword_to_closing_brace() {
        let tree = tree(LEDGER);
        let entry = find(tree.root_node(), LEDGER, ProtoKind::Message, &qn("LedgerEntry")).unwrap();
        assert_eq!(lines(entry), (7, 22));
    }

    #[test]
    fn nested_definitions_are_found_by_dotted_name() {
        let tree = tree(LEDGER);
        let root = tree.root_node();
        let nested = find(root, LEDGER, ProtoKind::Enum, &qn("LedgerEntry.Kind")).unwrap();
        assert_eq!(lines(nested), (8, 11));
        let bare = find(root, LEDGER, ProtoKind::Enum, &qn("Kind")).unwrap();
        assert_eq!(bare.id(), nested.id());
        assert!(find(root, LEDGER, ProtoKind::Enum, &qn("Other.Kind")).is_none());
    }

    #[test]
    fn package_counts_as_a_qualifier() {
        let tree = tree(LEDGER);
        let root = tree.root_node();
        let service = find(root, LEDGER, ProtoKind::Service, &qn("ledger.v1.LedgerService")).unwrap();
        assert_eq!(lines(service), (29, 34));
        assert!(find(root, LEDGER, ProtoKind::Service, &qn("ledger.v2.LedgerService")).is_none());
    }

    #[test]
    fn kinds_do_not_cross() {
        let tree = tree(LEDGER);
        let root = tree.root_node();
        assert!(find(root, LEDGER, ProtoKind::Message, &qn("Status")).is_none());
        assert!(find(root, LEDGER, ProtoKind::Enum, &qn("Status")).is_some());
    }

    #[test]
    fn field_named_like_a_keyword_is_not_a_definition() {
        let tree = tree(LEDGER);
        let root = tree.root_node();
        assert!(find(root, LEDGER, ProtoKind::Message, &qn("message")).is_none());
        assert_eq!(names(root, LEDGER, ProtoKind::Message), vec!["LedgerEntry", "LedgerEntry.Attachment"]);
    }

    #[test]
    fn braces_in_strings_and_comments_are_ignored() {
        let source = "syntax = \"proto3\";\n// {\nmessage A {\n  string s = 1 [json_name = \"}\"];\n  /* } */\n}\n";
        let tree = tree(source);
        let a = find(tree.root_node(), source, ProtoKind::Message, &qn("A")).unwrap();
        assert_eq!(lines(a), (3, 6));
    }
}
