//! Qualified-name resolution over a tree-sitter-cpp syntax tree.
//!
//! The walk threads an immutable scope path down the tree: entering a namespace
//! or a type body builds a fresh path for that subtree only, so sibling
//! declarations never observe each other's scopes.

use std::ops::ControlFlow;

use tree_sitter::Node;

use crate::declarator;
use crate::types::{self, DeclarationKind, DeclarationMatch, LookupKind, QualifiedName};

/// Maximum tree depth the resolver descends before giving up on a subtree.
const MAX_DEPTH: u32 = 512;

/// The node shapes the resolver distinguishes, built once per visited node by
/// [`classify`]. Each variant carries only what matching needs.
enum Construct<'t> {
    /// Function with a body, possibly out-of-line (`void A::f() {}`).
    FunctionDefinition {
        /// Top of the declarator chain.
        declarator: Node<'t>,
    },
    /// Method declared without a body inside a class (`void f();`).
    MethodDeclaration {
        /// Top of the declarator chain.
        declarator: Node<'t>,
    },
    /// `namespace a::b { ... }`, including anonymous namespaces.
    Namespace {
        /// Body, absent only in malformed input.
        body: Option<Node<'t>>,
        /// Name split on `::`; empty for anonymous namespaces.
        segments: Vec<String>,
    },
    /// Anything else; children are visited with the current scope.
    Other,
    /// `template <...>` wrapper.
    Template {
        /// The wrapped declaration.
        inner: Node<'t>,
    },
    /// Named class, struct, union, or enum with a body.
    TypeDefinition {
        /// Member list or enumerator list.
        body: Node<'t>,
        /// Whether this is an `enum`.
        is_enum: bool,
        /// Name split on `::`, so `struct A::B {}` yields `["A", "B"]`.
        segments: Vec<String>,
    },
    /// Variable or constant declaration.
    Variable {
        /// Name as declared.
        name: declarator::DeclaredName,
        /// Type specifier, which may itself define a type.
        type_node: Option<Node<'t>>,
    },
}

/// Lookup family a candidate belongs to.
#[derive(Clone, Copy)]
enum Family {
    /// Functions and methods.
    Function,
    /// Types; `true` for enums.
    Type(bool),
    /// Variables.
    Variable,
}

impl Family {
    /// Whether a lookup of `kind` accepts this family.
    fn accepts(self, kind: LookupKind) -> bool {
        return match (self, kind) {
            (Family::Function, LookupKind::Function)
            | (Family::Type(_), LookupKind::Type)
            | (Family::Type(true), LookupKind::Enum)
            | (Family::Variable, LookupKind::Variable) => true,
            _ => false,
        };
    }
}

/// A named declaration reached by the walk.
struct Candidate<'t> {
    /// How the match is reported.
    kind: DeclarationKind,
    /// Lookup family.
    family: Family,
    /// Unqualified name.
    leaf: String,
    /// Node to report.
    node: Node<'t>,
    /// Scope path plus any explicit qualifiers, outermost first.
    qualifiers: Vec<String>,
    /// Scope path only.
    scope: Vec<String>,
}

/// Callback invoked for each candidate; `Break` stops the walk.
type Visitor<'v, 't> = dyn FnMut(Candidate<'t>) -> ControlFlow<()> + 'v;

/// Return the first declaration, depth first, that matches `name` and `kind`.
pub fn find<'t>(
    root: Node<'t>,
    source: &str,
    name: &QualifiedName,
    kind: LookupKind,
) -> Option<DeclarationMatch<'t>> {
    let mut found = None;
    let _ = walk(root, &[], 0, false, source, &mut |candidate| {
        if !matches(&candidate, name, kind) {
            return ControlFlow::Continue(());
        }
        found = Some(to_match(candidate, source));
        return ControlFlow::Break(());
    });
    return found;
}

/// Return every declaration matching `name` and `kind`, in document order.
/// Overloads share a name, so all of them are needed for disambiguation.
pub fn find_all<'t>(
    root: Node<'t>,
    source: &str,
    name: &QualifiedName,
    kind: LookupKind,
) -> Vec<DeclarationMatch<'t>> {
    let mut found = Vec::new();
    let _ = walk(root, &[], 0, false, source, &mut |candidate| {
        if matches(&candidate, name, kind) {
            found.push(to_match(candidate, source));
        }
        return ControlFlow::Continue(());
    });
    tracing::debug!(target_name = %name, count = found.len(), "collected candidates");
    return found;
}

/// Fully qualified names of every declaration of `kind`, for not-found diagnostics.
pub fn names(root: Node<'_>, source: &str, kind: LookupKind) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let _ = walk(root, &[], 0, false, source, &mut |candidate| {
        if candidate.family.accepts(kind) {
            let mut parts = candidate.qualifiers;
            parts.push(candidate.leaf);
            let joined = parts.join("::");
            if !names.contains(&joined) {
                names.push(joined);
            }
        }
        return ControlFlow::Continue(());
    });
    return names;
}

/// Leaf and qualifier test for one candidate.
fn matches(candidate: &Candidate<'_>, name: &QualifiedName, kind: LookupKind) -> bool {
    return candidate.family.accepts(kind)
        && types::leaf_matches(&candidate.leaf, &name.leaf)
        && types::qualifiers_match(&candidate.qualifiers, &name.qualifiers);
}

/// Materialize a candidate into the public match type.
fn to_match<'t>(candidate: Candidate<'t>, source: &str) -> DeclarationMatch<'t> {
    let span = types::node_lines(candidate.node);
    let text = candidate.node.utf8_text(source.as_bytes()).unwrap_or_default().to_string();
    tracing::debug!(
        leaf = %candidate.leaf,
        scope = %candidate.scope.join("::"),
        line = span.start,
        "matched declaration"
    );
    return DeclarationMatch {
        end_line: span.end,
        kind: candidate.kind,
        node: candidate.node,
        scope: candidate.scope,
        start_line: span.start,
        text,
    };
}

/// Copy `scope` and append `segments`.
fn extend(scope: &[String], segments: &[String]) -> Vec<String> {
    let mut inner = Vec::with_capacity(scope.len().saturating_add(segments.len()));
    inner.extend_from_slice(scope);
    inner.extend_from_slice(segments);
    return inner;
}

/// Split a name node on `::`, dropping empty segments from a leading `::`.
fn scoped_segments(node: Node<'_>, source: &str) -> Vec<String> {
    let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
    return types::split_scoped(&types::compact_whitespace(text), "::")
        .into_iter()
        .filter(|s| return !s.is_empty())
        .collect();
}

/// Map a node to the construct it represents.
fn classify<'t>(node: Node<'t>, source: &str, in_class: bool) -> Construct<'t> {
    match node.kind() {
        "namespace_definition" => {
            let segments = node
                .child_by_field_name("name")
                .map(|n| return scoped_segments(n, source))
                .unwrap_or_default();
            return Construct::Namespace {
                body: node.child_by_field_name("body"),
                segments,
            };
        },
        "class_specifier" | "enum_specifier" | "struct_specifier" | "union_specifier" => {
            let (Some(name), Some(body)) = (node.child_by_field_name("name"), node.child_by_field_name("body")) else {
                return Construct::Other;
            };
            return Construct::TypeDefinition {
                body,
                is_enum: node.kind() == "enum_specifier",
                segments: scoped_segments(name, source),
            };
        },
        "function_definition" => {
            return node
                .child_by_field_name("declarator")
                .map_or(Construct::Other, |declarator| return Construct::FunctionDefinition { declarator });
        },
        "template_declaration" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).find(|c| return c.kind() != "template_parameter_list");
            return inner.map_or(Construct::Other, |inner| return Construct::Template { inner });
        },
        "declaration" | "field_declaration" => return classify_declaration(node, source, in_class),
        _ => return Construct::Other,
    }
}

/// A declaration is a method when it declares a function inside a class body,
/// and a variable when its declarator chain ends in a plain name. Field
/// declarations that are not methods stay `Other` so nested types are visited.
fn classify_declaration<'t>(node: Node<'t>, source: &str, in_class: bool) -> Construct<'t> {
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return Construct::Other;
    };
    if declarator::function_declarator(declarator).is_some() {
        if in_class {
            return Construct::MethodDeclaration { declarator };
        }
        return Construct::Other;
    }
    if node.kind() == "field_declaration" {
        return Construct::Other;
    }
    return declarator::variable_name(declarator, source).map_or(Construct::Other, |name| {
        return Construct::Variable {
            name,
            type_node: node.child_by_field_name("type"),
        };
    });
}

/// Depth-first walk. `scope` is never mutated: scopes for a subtree are built
/// as new vectors and dropped when that subtree is done.
fn walk<'t>(
    node: Node<'t>,
    scope: &[String],
    depth: u32,
    in_class: bool,
    source: &str,
    visit: &mut Visitor<'_, 't>,
) -> ControlFlow<()> {
    if depth > MAX_DEPTH {
        tracing::debug!(line = node.start_position().row, "resolver depth limit reached");
        return ControlFlow::Continue(());
    }
    let next = depth.saturating_add(1);

    match classify(node, source, in_class) {
        Construct::Namespace { body, segments } => {
            let inner = extend(scope, &segments);
            return body.map_or(ControlFlow::Continue(()), |body| {
                return walk_children(body, &inner, next, false, source, visit);
            });
        },
        Construct::TypeDefinition { body, is_enum, segments } => {
            let (leaf_segments, leaf) = match segments.split_last() {
                Some((leaf, rest)) => (rest, leaf.clone()),
                None => return ControlFlow::Continue(()),
            };
            visit(Candidate {
                kind: DeclarationKind::StructLike,
                family: Family::Type(is_enum),
                leaf,
                node,
                qualifiers: extend(scope, leaf_segments),
                scope: scope.to_vec(),
            })?;
            let inner = extend(scope, &segments);
            return walk_children(body, &inner, next, true, source, visit);
        },
        Construct::FunctionDefinition { declarator } | Construct::MethodDeclaration { declarator } => {
            let Some(name) = declarator::function_name(declarator, source) else {
                return ControlFlow::Continue(());
            };
            return visit(Candidate {
                kind: DeclarationKind::Function,
                family: Family::Function,
                leaf: name.leaf,
                node,
                qualifiers: extend(scope, &name.qualifiers),
                scope: scope.to_vec(),
            });
        },
        Construct::Template { inner } => {
            // A match on the wrapped declaration reports the whole wrapper so the
            // template parameter list stays in the output.
            let inner_id = inner.id();
            return walk(inner, scope, next, in_class, source, &mut |mut candidate: Candidate<'t>| {
                if candidate.node.id() == inner_id {
                    candidate.node = node;
                    candidate.kind = DeclarationKind::TemplateWrapper;
                }
                return visit(candidate);
            });
        },
        Construct::Variable { name, type_node } => {
            visit(Candidate {
                kind: DeclarationKind::Variable,
                family: Family::Variable,
                leaf: name.leaf,
                node,
                qualifiers: extend(scope, &name.qualifiers),
                scope: scope.to_vec(),
            })?;
            return type_node.map_or(ControlFlow::Continue(()), |type_node| {
                return walk(type_node, scope, next, in_class, source, visit);
            });
        },
        Construct::Other => {
            let member_list = in_class || node.kind() == "field_declaration_list";
            return walk_children(node, scope, next, member_list, source, visit);
        },
    }
}

/// Visit every child of `node` with the same scope.
fn walk_children<'t>(
    node: Node<'t>,
    scope: &[String],
    depth: u32,
    in_class: bool,
    source: &str,
    visit: &mut Visitor<'_, 't>,
) -> ControlFlow<()> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, scope, depth, in_class, source, visit)?;
    }
    return ControlFlow::Continue(());
}
