//! Picks one overload from a list of same-named candidates by a parameter
//! signature fragment.

use tree_sitter::Node;

use crate::declarator;
use crate::types::{self, Selection};

/// Text of the parameter list, parentheses included, for a function
/// definition, method declaration, or template wrapping either.
pub fn parameter_text(node: Node<'_>, source: &str) -> Option<String> {
    let params = declarator::parameter_list(node)?;
    return params.utf8_text(source.as_bytes()).ok().map(String::from);
}

/// Candidates whose parameter text contains `signature`, with insignificant
/// whitespace collapsed on both sides. An absent or blank signature keeps all.
pub fn matching<T>(candidates: Vec<(T, Option<String>)>, signature: Option<&str>) -> Vec<T> {
    let wanted = signature.map(types::compact_whitespace).filter(|s| return !s.is_empty());
    return candidates
        .into_iter()
        .filter(|(_, params)| {
            return wanted.as_deref().is_none_or(|wanted| {
                return params
                    .as_deref()
                    .is_some_and(|p| return types::compact_whitespace(p).contains(wanted));
            });
        })
        .map(|(candidate, _)| return candidate)
        .collect();
}

/// Narrow `candidates` (paired with their parameter text) to one.
///
/// Without a signature, or with an empty one, the first candidate wins. With a
/// signature, every candidate whose parameter text contains it survives (see
/// [`matching`]); more than one survivor is reported as ambiguous.
pub fn pick_overload<T>(candidates: Vec<(T, Option<String>)>, signature: Option<&str>) -> Selection<T> {
    let has_signature = signature.is_some_and(|s| return !s.trim().is_empty());
    let mut survivors = matching(candidates, signature);
    if !has_signature {
        survivors.truncate(1);
    }

    tracing::debug!(signature = signature.unwrap_or_default(), survivors = survivors.len(), "filtered overloads");
    return match survivors.len() {
        0 => Selection::Missing,
        1 => survivors.pop().map_or(Selection::Missing, Selection::Unique),
        _ => Selection::Ambiguous(survivors),
    };
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::resolver;
    use crate::syntax;
    use crate::types::{LookupKind, QualifiedName};

    const OVERLOADS: &str = include_str!("../tests/fixtures/overloads.cpp");

    /// Start lines of every surviving candidate for `name` under `signature`.
    fn pick(name: &str, signature: Option<&str>) -> Selection<u32> {
        let tree = syntax::parse_cpp(Path::new("overloads.cpp"), OVERLOADS).unwrap();
        let target = QualifiedName::parse(name).unwrap();
        let found = resolver::find_all(tree.root_node(), OVERLOADS, &target, LookupKind::Function);
        let candidates = found
            .iter()
            .map(|m| return (m.start_line, parameter_text(m.node, OVERLOADS)))
            .collect();
        return pick_overload(candidates, signature);
    }

    #[test]
    fn parameter_text_includes_parentheses() {
        let tree = syntax::parse_cpp(Path::new("overloads.cpp"), OVERLOADS).unwrap();
        let target = QualifiedName::parse("process").unwrap();
        let found = resolver::find_all(tree.root_node(), OVERLOADS, &target, LookupKind::Function);
        let params: Vec<String> = found.iter().filter_map(|m| return parameter_text(m.node, OVERLOADS)).collect();
        assert_eq!(params, vec!["(int value)", "(double value)", "(const char* name, int value)"]);
    }

    #[test]
    fn no_signature_takes_the_first() {
        assert_eq!(pick("PeerImp::onMessage", None), Selection::Unique(12));
        assert_eq!(pick("PeerImp::onMessage", Some("  ")), Selection::Unique(12));
    }

    #[test]
    fn signature_fragment_selects_declaration_and_definition() {
        assert_eq!(pick("PeerImp::onMessage", Some("TMTransaction")), Selection::Ambiguous(vec![13, 24]));
        assert_eq!(pick("process", Some("double")), Selection::Unique(45));
    }

    #[test]
    fn whitespace_in_signature_is_insignificant() {
        assert_eq!(pick("process", Some("const char *  name")), Selection::Unique(46));
    }

    #[test]
    fn shared_fragment_is_ambiguous() {
        assert_eq!(pick("process", Some("int value")), Selection::Ambiguous(vec![44, 46]));
    }

    #[test]
    fn unmatched_signature_is_missing() {
        assert_eq!(pick("process", Some("float")), Selection::Missing);
    }
}
