//! Macro-style code generation: `NAME(args...)` calls and `NAME(args...) { ... }`
//! definitions, located by macro name and filtered by positional argument.

use tree_sitter::Node;

use crate::declarator;
use crate::error::Error;
use crate::markers::{self, END_DIRECTIVE, START_DIRECTIVE};
use crate::syntax::SourceDocument;
use crate::types::{self, Extraction, LineSpan, Selection};

/// Which syntactic shape an invocation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroShape {
    /// `NAME(a, b);` as a call expression.
    Call,
    /// `NAME(a, b) { ... }`, which the grammar reads as a function definition.
    FunctionDefinition,
}

/// A located macro invocation.
#[derive(Debug, Clone)]
pub struct MacroInvocation<'tree> {
    /// Argument texts in order, trimmed.
    ///
    /// For [`MacroShape::Call`] these are the comma-separated argument
    /// expressions. For [`MacroShape::FunctionDefinition`] each entry is the
    /// last whitespace-separated token of the parameter, so `const Args& args`
    /// yields `args`. That second rule follows the convention of macros whose
    /// "parameters" are bare tags; it is not general C++ parameter parsing.
    pub arguments: Vec<String>,
    /// Macro name as written.
    pub name: String,
    /// The call expression or function definition node.
    pub node: Node<'tree>,
    /// Shape the invocation was found in.
    pub shape: MacroShape,
}

impl MacroInvocation<'_> {
    /// Lines of the whole invocation.
    pub fn span(&self) -> LineSpan {
        return types::node_lines(self.node);
    }
}

/// One `argN=value` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentFilter {
    /// Zero-based argument position.
    pub position: usize,
    /// Expected argument text.
    pub value: String,
}

impl ArgumentFilter {
    /// Build a filter from a key such as `arg0` and its value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` if the key is not `arg` followed by digits.
    pub fn from_key(key: &str, value: &str) -> Result<Self, Error> {
        let position = key
            .strip_prefix("arg")
            .filter(|digits| return !digits.is_empty())
            .and_then(|digits| return digits.parse::<usize>().ok())
            .ok_or_else(|| {
                return Error::InvalidSelector {
                    reason: format!("macro argument filter `{key}` must look like arg0, arg1, ..."),
                };
            })?;
        return Ok(Self {
            position,
            value: value.to_string(),
        });
    }

    /// Parse `argN=value`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` if there is no `=` or the key is malformed.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(Error::InvalidSelector {
                reason: format!("macro argument filter `{raw}` must be argN=value"),
            });
        };
        return Self::from_key(key.trim(), value.trim());
    }

    /// Whether `invocation` satisfies this filter. The argument's source text,
    /// trimmed, must equal the value exactly, so a string literal argument is
    /// matched by writing its quotes too.
    fn accepts(&self, invocation: &MacroInvocation<'_>) -> bool {
        return invocation
            .arguments
            .get(self.position)
            .is_some_and(|arg| return arg.trim() == self.value.trim());
    }
}

/// Every invocation of `name`, in document order.
pub fn find_by_name<'t>(root: Node<'t>, source: &str, name: &str) -> Vec<MacroInvocation<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(invocation) = as_invocation(node, source, name) {
            found.push(invocation);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    tracing::debug!(macro_name = name, count = found.len(), "collected macro invocations");
    return found;
}

/// Invocations of `name` whose argument at `position` equals `value`.
pub fn find_by_argument<'t>(
    root: Node<'t>,
    source: &str,
    name: &str,
    position: usize,
    value: &str,
) -> Vec<MacroInvocation<'t>> {
    let filter = ArgumentFilter {
        position,
        value: value.to_string(),
    };
    return find_by_name(root, source, name)
        .into_iter()
        .filter(|inv| return filter.accepts(inv))
        .collect();
}

/// Apply every filter; exactly one survivor is required.
pub fn select_unique<'t>(invocations: Vec<MacroInvocation<'t>>, filters: &[ArgumentFilter]) -> Selection<MacroInvocation<'t>> {
    let mut survivors: Vec<MacroInvocation<'t>> = invocations
        .into_iter()
        .filter(|inv| return filters.iter().all(|f| return f.accepts(inv)))
        .collect();
    return match survivors.len() {
        0 => Selection::Missing,
        1 => survivors.pop().map_or(Selection::Missing, Selection::Unique),
        _ => Selection::Ambiguous(survivors),
    };
}

/// Recognize `node` as an invocation of `name` in either shape.
fn as_invocation<'t>(node: Node<'t>, source: &str, name: &str) -> Option<MacroInvocation<'t>> {
    match node.kind() {
        "call_expression" => {
            let callee = node.child_by_field_name("function")?;
            if callee.kind() != "identifier" || callee.utf8_text(source.as_bytes()).ok()? != name {
                return None;
            }
            let args = node.child_by_field_name("arguments")?;
            let mut cursor = args.walk();
            let arguments = args
                .named_children(&mut cursor)
                .filter(|a| return a.kind() != "comment")
                .filter_map(|a| return a.utf8_text(source.as_bytes()).ok())
                .map(|a| return a.trim().to_string())
                .collect();
            return Some(MacroInvocation {
                arguments,
                name: name.to_string(),
                node,
                shape: MacroShape::Call,
            });
        },
        "function_definition" => {
            let declarator_node = node.child_by_field_name("declarator")?;
            let declared = declarator::function_name(declarator_node, source)?;
            if !declared.qualifiers.is_empty() || declared.leaf != name {
                return None;
            }
            let params = declarator::parameter_list(node)?;
            let mut cursor = params.walk();
            let arguments = params
                .named_children(&mut cursor)
                .filter(|p| return p.kind() != "comment")
                .filter_map(|p| return p.utf8_text(source.as_bytes()).ok())
                .map(|p| return last_token(p).to_string())
                .collect();
            return Some(MacroInvocation {
                arguments,
                name: name.to_string(),
                node,
                shape: MacroShape::FunctionDefinition,
            });
        },
        _ => return None,
    }
}

/// Last whitespace-separated token of a parameter declaration.
fn last_token(parameter: &str) -> &str {
    return parameter.split_whitespace().last().unwrap_or_default();
}

/// Describe candidates for an ambiguity report: `line N: first line of text`.
fn describe(doc: &SourceDocument, invocations: &[MacroInvocation<'_>]) -> Vec<String> {
    return invocations
        .iter()
        .map(|inv| {
            let first = doc.node_text(inv.node).lines().next().unwrap_or_default().trim();
            return format!("line {}: {first}", inv.span().start);
        })
        .collect();
}

/// Resolve `name` plus `filters` to exactly one invocation and return its text,
/// or the text of `marker` within it.
///
/// # Errors
///
/// Returns `Error::NotFound` when nothing matches (or the marker is absent),
/// `Error::AmbiguousMatch` when several invocations survive the filters, and
/// `Error::InvalidSelector` for non-C++ documents.
pub fn extract_section(
    doc: &SourceDocument,
    name: &str,
    filters: &[ArgumentFilter],
    marker: Option<&str>,
) -> Result<Extraction, Error> {
    let Some(tree) = doc.cpp_tree() else {
        return Err(Error::InvalidSelector {
            reason: "macro invocations exist only in C/C++ sources".to_string(),
        });
    };
    let target = describe_target(name, filters);
    let root = tree.root_node();
    let candidates = match filters.split_first() {
        Some((first, _)) => find_by_argument(root, &doc.source, name, first.position, &first.value),
        None => find_by_name(root, &doc.source, name),
    };
    let invocation = match select_unique(candidates, filters) {
        Selection::Unique(inv) => inv,
        Selection::Missing => {
            return Err(Error::NotFound {
                available: Vec::new(),
                file: doc.path.clone(),
                target,
            });
        },
        Selection::Ambiguous(all) => {
            return Err(Error::AmbiguousMatch {
                candidates: describe(doc, &all),
                file: doc.path.clone(),
                target,
            });
        },
    };

    let span = match marker {
        None => invocation.span(),
        Some(marker) => {
            let scan = markers::scan_node(invocation.node, &doc.source);
            let Some(span) = scan.table.get(marker).copied() else {
                return Err(Error::NotFound {
                    available: scan.table.keys().cloned().collect(),
                    file: doc.path.clone(),
                    target: format!("marker `{marker}` in {target}"),
                });
            };
            span
        },
    };
    return Ok(trim_directives(doc.lines(span)));
}

/// Human description of the lookup, e.g. ``macro `DEFINE(arg0=accept)` ``.
fn describe_target(name: &str, filters: &[ArgumentFilter]) -> String {
    if filters.is_empty() {
        return format!("macro `{name}`");
    }
    let args: Vec<String> = filters.iter().map(|f| return format!("arg{}={}", f.position, f.value)).collect();
    return format!("macro `{name}({})`", args.join(", "));
}

/// Drop a directive line from either end of an extraction, shifting its bounds.
fn trim_directives(extraction: Extraction) -> Extraction {
    let mut lines: Vec<&str> = extraction.text.lines().collect();
    let mut start_line = extraction.start_line;
    let mut end_line = extraction.end_line;
    if lines.len() > 1 && lines.first().is_some_and(|l| return l.contains(START_DIRECTIVE)) {
        lines.remove(0);
        start_line = start_line.saturating_add(1);
    }
    if lines.len() > 1 && lines.last().is_some_and(|l| return l.contains(END_DIRECTIVE)) {
        lines.pop();
        end_line = end_line.saturating_sub(1);
    }
    return Extraction {
        text: lines.join("\n"),
        start_line,
        end_line,
    };
}

/// Locate `#define name` in either object-like or function-like form.
pub fn find_definition<'t>(root: Node<'t>, source: &str, name: &str) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "preproc_def" | "preproc_function_def")
            && node
                .child_by_field_name("name")
                .and_then(|n| return n.utf8_text(source.as_bytes()).ok())
                == Some(name)
        {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    return None;
}

/// Names of every `#define` in the tree, for not-found diagnostics.
pub fn definition_names(root: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "preproc_def" | "preproc_function_def") {
            let name = node.child_by_field_name("name").and_then(|n| return n.utf8_text(source.as_bytes()).ok());
            names.extend(name.map(String::from));
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    return names;
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::grammar::SourceLanguage;

    const MACROS: &str = include_str!("../tests/fixtures/macros.cpp");

    fn doc() -> SourceDocument {
        return SourceDocument::parse(Path::new("macros.cpp"), SourceLanguage::Cpp, MACROS.to_string()).unwrap();
    }

    fn filter(raw: &str) -> ArgumentFilter {
        return ArgumentFilter::parse(raw).unwrap();
    }

    #[test]
    fn function_shaped_invocations_expose_parameter_tags() {
        let doc = doc();
        let tree = doc.cpp_tree().unwrap();
        let found = find_by_name(tree.root_node(), &doc.source, "DEFINE_JS_FUNCTION");
        assert_eq!(found.len(), 2);
        let first = found.first().unwrap();
        assert_eq!(first.shape, MacroShape::FunctionDefinition);
        assert_eq!(first.arguments, vec!["accept", "ctx", "data"]);
        assert_eq!(first.span(), LineSpan::new(10, 16));
    }

    #[test]
    fn call_invocations_expose_argument_expressions() {
        let doc = doc();
        let tree = doc.cpp_tree().unwrap();
        let found = find_by_argument(tree.root_node(), &doc.source, "REGISTER_HANDLER", 1, "\"reject\"");
        assert_eq!(found.len(), 1);
        let call = found.first().unwrap();
        assert_eq!(call.shape, MacroShape::Call);
        assert_eq!(call.arguments, vec!["registry", "\"reject\"", "onReject"]);
        assert_eq!(call.span(), LineSpan::new(26, 26));
    }

    #[test]
    fn argument_text_is_compared_verbatim() {
        let doc = doc();
        let root = doc.cpp_tree().unwrap().root_node();
        assert!(find_by_argument(root, &doc.source, "REGISTER_HANDLER", 1, "reject").is_empty());
        assert_eq!(find_by_argument(root, &doc.source, "REGISTER_HANDLER", 1, "\"accept\"").len(), 1);
        assert!(find_by_argument(root, &doc.source, "DEFINE_JS_FUNCTION", 0, "\"accept\"").is_empty());
        let quoted = extract_section(&doc, "REGISTER_HANDLER", &[filter("arg1=\"accept\"")], None).unwrap();
        assert_eq!((quoted.start_line, quoted.end_line), (25, 25));
    }

    #[test]
    fn unique_filter_extracts_the_block() {
        let extraction = extract_section(&doc(), "DEFINE_JS_FUNCTION", &[filter("arg0=accept")], None).unwrap();
        assert_eq!((extraction.start_line, extraction.end_line), (10, 16));
        assert!(extraction.text.starts_with("DEFINE_JS_FUNCTION(accept, ctx, data)"));
    }

    #[test]
    fn missing_filter_is_ambiguous_and_names_both_lines() {
        let err = extract_section(&doc(), "DEFINE_JS_FUNCTION", &[], None).unwrap_err();
        let Error::AmbiguousMatch { candidates, .. } = err else {
            panic!("expected ambiguity, got {err}");
        };
        assert_eq!(candidates.len(), 2);
        assert!(candidates.first().unwrap().starts_with("line 10:"));
        assert!(candidates.get(1).unwrap().starts_with("line 18:"));
    }

    #[test]
    fn filter_matching_nothing_is_not_found() {
        let err = extract_section(&doc(), "DEFINE_JS_FUNCTION", &[filter("arg0=retry")], None).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn marker_inside_invocation() {
        let extraction =
            extract_section(&doc(), "DEFINE_JS_FUNCTION", &[filter("arg0=accept")], Some("accept-body")).unwrap();
        assert_eq!((extraction.start_line, extraction.end_line), (13, 13));
        assert_eq!(extraction.text.trim(), "ctx.session().accept(data);");

        let err = extract_section(&doc(), "DEFINE_JS_FUNCTION", &[filter("arg0=reject")], Some("accept-body"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn directive_lines_at_the_edges_are_trimmed() {
        let extraction = Extraction {
            text: "//@@start a\nbody();\n//@@end a".to_string(),
            start_line: 4,
            end_line: 6,
        };
        let trimmed = trim_directives(extraction);
        assert_eq!(trimmed.text, "body();");
        assert_eq!((trimmed.start_line, trimmed.end_line), (5, 5));
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(ArgumentFilter::parse("accept").is_err());
        assert!(ArgumentFilter::parse("argx=accept").is_err());
        assert!(ArgumentFilter::parse("arg=accept").is_err());
        assert_eq!(filter("arg2 = data").position, 2);
    }

    #[test]
    fn macro_definitions_by_name() {
        let doc = doc();
        let root = doc.cpp_tree().unwrap().root_node();
        let object_like = find_definition(root, &doc.source, "MAX_SIZE").unwrap();
        assert_eq!(types::node_lines(object_like), LineSpan::new(3, 3));
        let multi_line = find_definition(root, &doc.source, "COMPLEX_MACRO").unwrap();
        assert_eq!(types::node_lines(multi_line), LineSpan::new(5, 8));
        assert!(find_definition(root, &doc.source, "MISSING").is_none());
        assert_eq!(definition_names(root, &doc.source), vec!["MAX_SIZE", "MIN", "COMPLEX_MACRO"]);
    }
}
