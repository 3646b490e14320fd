//! `//@@start <name>` / `//@@end <name>` directive scanning.
//!
//! A marker covers the lines strictly between its two directives. Malformed
//! markers never fail a scan: they become [`MarkerDiagnostic`]s, are logged as
//! warnings, and are left out of the table.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use crate::syntax::SourceDocument;
use crate::types::{self, LineSpan, MarkerTable};

/// Directive text that opens a marker.
pub const START_DIRECTIVE: &str = "//@@start";

/// Directive text that closes a marker.
pub const END_DIRECTIVE: &str = "//@@end";

/// `//@@start name` or `//@@end name`; names are word characters and hyphens.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"//@@(start|end)\s+([\w-]+)").expect("valid directive regex"));

/// A non-fatal problem found while pairing directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerDiagnostic {
    /// Start immediately followed by end: the marker covers no lines.
    Empty {
        /// Marker name.
        name: String,
        /// Line of the end directive.
        line: u32,
    },
    /// End directive with no open marker of that name.
    EndWithoutStart {
        /// Marker name.
        name: String,
        /// Line of the end directive.
        line: u32,
    },
    /// A second start while the first was still open; the later one wins.
    Reopened {
        /// Line of the start directive that was discarded.
        first_line: u32,
        /// Marker name.
        name: String,
        /// Line of the start directive that replaced it.
        line: u32,
    },
    /// Start directive never closed.
    Unterminated {
        /// Marker name.
        name: String,
        /// Line of the start directive.
        line: u32,
    },
}

impl fmt::Display for MarkerDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            MarkerDiagnostic::Empty { name, line } => {
                write!(f, "marker `{name}` closed at line {line} covers no lines")
            },
            MarkerDiagnostic::EndWithoutStart { name, line } => {
                write!(f, "end of marker `{name}` at line {line} has no matching start")
            },
            MarkerDiagnostic::Reopened { first_line, name, line } => {
                write!(f, "marker `{name}` opened at line {first_line} was reopened at line {line}")
            },
            MarkerDiagnostic::Unterminated { name, line } => {
                write!(f, "marker `{name}` opened at line {line} is never closed")
            },
        };
    }
}

/// Result of one scan: the well-formed markers plus everything that was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerScan {
    /// Problems found, in source order.
    pub diagnostics: Vec<MarkerDiagnostic>,
    /// Well-formed markers.
    pub table: MarkerTable,
}

/// Pair directives found in `comments`, given as `(first line, text)` in source order.
/// Each comment contributes at most its first directive.
pub fn scan_comments<'c>(comments: impl IntoIterator<Item = (u32, &'c str)>) -> MarkerScan {
    let mut scan = MarkerScan::default();
    // Marker name to the directive line that opened it.
    let mut open: BTreeMap<String, u32> = BTreeMap::new();

    for (line, text) in comments {
        let Some(caps) = DIRECTIVE.captures(text) else {
            continue;
        };
        let (Some(action), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = name.as_str().to_string();

        if action.as_str() == "start" {
            if let Some(first_line) = open.insert(name.clone(), line) {
                scan.diagnostics.push(MarkerDiagnostic::Reopened { first_line, name, line });
            }
            continue;
        }

        let Some(start_line) = open.remove(&name) else {
            scan.diagnostics.push(MarkerDiagnostic::EndWithoutStart { name, line });
            continue;
        };
        let first = start_line.saturating_add(1);
        let last = line.saturating_sub(1);
        if first > last {
            scan.diagnostics.push(MarkerDiagnostic::Empty { name, line });
            continue;
        }
        scan.table.insert(name, LineSpan::new(first, last));
    }

    for (name, line) in open {
        scan.diagnostics.push(MarkerDiagnostic::Unterminated { name, line });
    }
    scan.diagnostics.sort_by_key(diagnostic_line);

    for diagnostic in &scan.diagnostics {
        tracing::warn!("{diagnostic}");
    }
    return scan;
}

/// Line a diagnostic points at, for ordering.
fn diagnostic_line(diagnostic: &MarkerDiagnostic) -> u32 {
    return match diagnostic {
        MarkerDiagnostic::Empty { line, .. }
        | MarkerDiagnostic::EndWithoutStart { line, .. }
        | MarkerDiagnostic::Reopened { line, .. }
        | MarkerDiagnostic::Unterminated { line, .. } => *line,
    };
}

/// Scan every comment node under `node`, line and block comments alike.
pub fn scan_node(node: Node<'_>, source: &str) -> MarkerScan {
    let mut comments: Vec<(u32, &str)> = Vec::new();
    let mut cursor = node.walk();
    // Pre-order traversal with an explicit cursor; no recursion on deep trees.
    'walk: loop {
        let current = cursor.node();
        if current.kind() == "comment" {
            let text = current.utf8_text(source.as_bytes()).unwrap_or_default();
            comments.push((types::row_to_line(current.start_position().row), text));
        } else if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node().id() == node.id() {
                break 'walk;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    return scan_comments(comments);
}

/// Scan a whole document.
pub fn scan_document(doc: &SourceDocument) -> MarkerScan {
    return scan_node(doc.tree().root_node(), &doc.source);
}

/// Whether a source line holds nothing but a directive, as produced by
/// instrumenting a file for documentation.
pub fn is_directive_line(line: &str) -> bool {
    let trimmed = line.trim();
    return DIRECTIVE.find(trimmed).is_some_and(|m| return m.start() == 0 && m.end() == trimmed.len());
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::grammar::SourceLanguage;

    fn scan_cpp(source: &str) -> MarkerScan {
        let doc = SourceDocument::parse(Path::new("m.cpp"), SourceLanguage::Cpp, source.to_string()).unwrap();
        return scan_document(&doc);
    }

    #[test]
    fn region_excludes_directive_lines() {
        let source = "int a;\nint b;\nint c;\n//@@start x\nint d;\nint e;\nint f;\n//@@end x\n";
        let scan = scan_cpp(source);
        assert_eq!(scan.table.get("x"), Some(&LineSpan::new(5, 7)));
        assert!(scan.diagnostics.is_empty());
    }

    #[test]
    fn block_comments_and_hyphenated_names() {
        let source = "/* //@@start two-words */\nint a;\n/* //@@end two-words */\n";
        let scan = scan_cpp(source);
        assert_eq!(scan.table.get("two-words"), Some(&LineSpan::new(2, 2)));
    }

    #[test]
    fn unterminated_and_orphan_end_are_dropped() {
        let source = "//@@start open\nint a;\n//@@end stray\nint b;\n";
        let scan = scan_cpp(source);
        assert!(scan.table.is_empty());
        assert_eq!(
            scan.diagnostics,
            vec![
                MarkerDiagnostic::Unterminated { name: "open".into(), line: 1 },
                MarkerDiagnostic::EndWithoutStart { name: "stray".into(), line: 3 },
            ]
        );
    }

    #[test]
    fn reopened_marker_keeps_the_later_start() {
        let source = "//@@start x\nint a;\n//@@start x\nint b;\n//@@end x\n";
        let scan = scan_cpp(source);
        assert_eq!(scan.table.get("x"), Some(&LineSpan::new(4, 4)));
        assert_eq!(
            scan.diagnostics,
            vec![MarkerDiagnostic::Reopened { first_line: 1, name: "x".into(), line: 3 }]
        );
    }

    #[test]
    fn adjacent_directives_produce_no_entry() {
        let scan = scan_comments([(3, "//@@start e"), (4, "//@@end e")]);
        assert!(scan.table.is_empty());
        assert_eq!(scan.diagnostics, vec![MarkerDiagnostic::Empty { name: "e".into(), line: 4 }]);
    }

    #[test]
    fn fixture_markers_are_all_found() {
        let source = include_str!("../tests/fixtures/shapes.cpp");
        let scan = scan_cpp(source);
        let names: Vec<&String> = scan.table.keys().collect();
        assert_eq!(names, vec!["describe-body", "tail"]);
        assert_eq!(scan.table.get("describe-body"), Some(&LineSpan::new(32, 34)));
        assert_eq!(scan.table.get("tail"), Some(&LineSpan::new(95, 95)));
    }

    #[test]
    fn proto_comments_scan_the_same_way() {
        let source = include_str!("../tests/fixtures/ledger.proto");
        let doc = SourceDocument::parse(Path::new("l.proto"), SourceLanguage::Proto, source.to_string()).unwrap();
        let scan = scan_document(&doc);
        assert_eq!(scan.table.get("entry-fields"), Some(&LineSpan::new(14, 15)));

        let root = doc.tree().root_node();
        let mut cursor = root.walk();
        let service = root.named_children(&mut cursor).find(|n| return n.kind() == "service").unwrap();
        assert!(scan_node(service, &doc.source).table.is_empty());
    }

    #[test]
    fn directive_lines_are_recognised_alone() {
        assert!(is_directive_line("    //@@start body  "));
        assert!(is_directive_line("//@@end body"));
        assert!(!is_directive_line("call(); //@@end body"));
        assert!(!is_directive_line("// plain comment"));
    }
}
