//! Declarator-chain helpers for tree-sitter-cpp nodes.
//!
//! C++ hides a declaration's name under layers of pointer, reference, array,
//! attribute, and parenthesis declarators. These helpers walk that chain node by
//! node instead of searching the declaration text.

use tree_sitter::Node;

use crate::types;

/// Upper bound on declarator nesting, far beyond anything a compiler accepts.
const MAX_DECLARATOR_DEPTH: u32 = 64;

/// Name of a function as written at its declarator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredName {
    /// Unqualified name, e.g. `cleanup`, `operator+=`, `~Widget`, `max<int>`.
    pub leaf: String,
    /// Qualifiers written explicitly in an out-of-line definition, e.g. `Helper` in
    /// `Helper::cleanup`. Empty for names declared in place.
    pub qualifiers: Vec<String>,
}

impl DeclaredName {
    /// Split a name node's text into qualifiers and leaf. A leading `::` is dropped.
    fn from_name_node(node: Node<'_>, source: &str) -> Option<Self> {
        let text = node.utf8_text(source.as_bytes()).ok()?;
        let mut segments: Vec<String> = types::split_scoped(&types::compact_whitespace(text), "::")
            .into_iter()
            .filter(|s| return !s.is_empty())
            .collect();
        let leaf = segments.pop()?;
        return Some(Self {
            leaf,
            qualifiers: segments,
        });
    }
}

/// Step one level down a declarator chain.
fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    // reference, parenthesized, and attributed declarators carry no field name.
    let mut cursor = node.walk();
    return node
        .named_children(&mut cursor)
        .find(|c| return c.kind().ends_with("declarator") || is_name_kind(c.kind()));
}

/// Kinds that terminate a declarator chain.
fn is_name_kind(kind: &str) -> bool {
    return matches!(
        kind,
        "destructor_name"
            | "field_identifier"
            | "identifier"
            | "operator_cast"
            | "operator_name"
            | "qualified_identifier"
            | "template_function"
    );
}

/// Follow `pointer_declarator → reference_declarator → ... → function_declarator`.
/// Returns `None` when the chain ends without a function declarator, which means
/// the declaration is a variable.
pub fn function_declarator(declarator: Node<'_>) -> Option<Node<'_>> {
    let mut current = declarator;
    for _ in 0..MAX_DECLARATOR_DEPTH {
        match current.kind() {
            "function_declarator" => return Some(current),
            "array_declarator" | "attributed_declarator" | "parenthesized_declarator"
            | "pointer_declarator" | "reference_declarator" => {
                current = inner_declarator(current)?;
            },
            _ => return None,
        }
    }
    return None;
}

/// Name of the function introduced by a declarator chain.
pub fn function_name(declarator: Node<'_>, source: &str) -> Option<DeclaredName> {
    let function = function_declarator(declarator)?;
    let name = function.child_by_field_name("declarator")?;
    return DeclaredName::from_name_node(name, source);
}

/// Name of the variable introduced by a declarator chain, unwrapping an
/// `init_declarator` and any pointer/reference/array layers.
pub fn variable_name(declarator: Node<'_>, source: &str) -> Option<DeclaredName> {
    let mut current = declarator;
    for _ in 0..MAX_DECLARATOR_DEPTH {
        match current.kind() {
            "identifier" | "qualified_identifier" | "field_identifier" => {
                return DeclaredName::from_name_node(current, source);
            },
            "array_declarator" | "attributed_declarator" | "init_declarator"
            | "parenthesized_declarator" | "pointer_declarator" | "reference_declarator" => {
                current = inner_declarator(current)?;
            },
            _ => return None,
        }
    }
    return None;
}

/// The declaration a template wrapper holds, if it is a function-like one.
fn template_inner(template: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = template.walk();
    return template.named_children(&mut cursor).find(|c| {
        return matches!(
            c.kind(),
            "declaration" | "field_declaration" | "function_definition" | "template_declaration"
        );
    });
}

/// Parameter list node of a function definition, method declaration, or a
/// template wrapping either.
pub fn parameter_list(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    for _ in 0..MAX_DECLARATOR_DEPTH {
        if current.kind() != "template_declaration" {
            break;
        }
        current = template_inner(current)?;
    }
    let declarator = current.child_by_field_name("declarator")?;
    return function_declarator(declarator)?.child_by_field_name("parameters");
}
