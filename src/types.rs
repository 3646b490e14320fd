/// Core domain types shared by the resolver, the scanners, and the coverage tracker.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tree_sitter::Node;

/// Keyword that starts an operator function name such as `operator+`.
const OPERATOR_KEYWORD: &str = "operator";

/// A lookup target split into enclosing qualifiers and a leaf name.
/// Built only through [`QualifiedName::parse`], which guarantees a non-empty leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// Final segment, e.g. `method` in `Outer::Inner::method`.
    pub leaf: String,
    /// Enclosing scopes, outermost first. Empty means "match in any scope".
    pub qualifiers: Vec<String>,
}

impl QualifiedName {
    /// Split a `::`-separated name (or a `.`-separated one when no `::` is present).
    /// Separators nested inside `<...>` or `(...)` do not split, and everything after
    /// an `operator` keyword is kept as one leaf so `operator<<` survives intact.
    /// Returns `None` when the leaf would be empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact = compact_whitespace(raw);
        let separator = if compact.contains("::") { "::" } else { "." };
        let mut segments = split_scoped(&compact, separator);
        let leaf = segments.pop()?;
        if leaf.is_empty() || segments.iter().any(String::is_empty) {
            return None;
        }
        return Some(Self {
            leaf,
            qualifiers: segments,
        });
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for qualifier in &self.qualifiers {
            write!(f, "{qualifier}::")?;
        }
        return write!(f, "{}", self.leaf);
    }
}

/// Remove whitespace that carries no meaning in a C++ name, keeping single
/// spaces only between two identifier characters (`operator new`, `unsigned int`).
pub fn compact_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        let joins_words = out.chars().last().is_some_and(is_identifier_char) && is_identifier_char(ch);
        if pending_space && joins_words {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    return out;
}

/// Whether `ch` can appear inside a C/C++ identifier.
fn is_identifier_char(ch: char) -> bool {
    return ch.is_alphanumeric() || ch == '_';
}

/// Split on `separator` at bracket depth zero. Once a segment starts with the
/// `operator` keyword the remainder of the input becomes that segment.
pub fn split_scoped(raw: &str, separator: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0_u32;
    let mut rest = raw;

    while let Some(ch) = rest.chars().next() {
        if depth == 0 && current.is_empty() && starts_operator(rest) {
            current.push_str(rest);
            break;
        }
        if depth == 0 && rest.starts_with(separator) {
            segments.push(std::mem::take(&mut current));
            rest = rest.get(separator.len()..).unwrap_or_default();
            continue;
        }
        match ch {
            '<' | '(' => depth = depth.saturating_add(1),
            '>' | ')' => depth = depth.saturating_sub(1),
            _ => {},
        }
        current.push(ch);
        rest = rest.get(ch.len_utf8()..).unwrap_or_default();
    }

    segments.push(current);
    return segments;
}

/// Whether `text` begins with the `operator` keyword followed by a non-identifier.
fn starts_operator(text: &str) -> bool {
    let Some(after) = text.strip_prefix(OPERATOR_KEYWORD) else {
        return false;
    };
    return after.chars().next().is_none_or(|c| return !is_identifier_char(c));
}

/// Drop a trailing template argument list: `Container<int>` becomes `Container`.
/// Operator names are returned untouched because `<` is part of their spelling.
pub fn template_base(segment: &str) -> &str {
    if starts_operator(segment) {
        return segment;
    }
    return segment.split('<').next().unwrap_or(segment).trim_end();
}

/// Segment equality that ignores template arguments on either side.
pub fn segments_match(found: &str, target: &str) -> bool {
    return found == target || template_base(found) == template_base(target);
}

/// Whether `found` equals `target`, or ends with it as a suffix, segment by segment.
/// An empty `target` matches anything.
pub fn qualifiers_match(found: &[String], target: &[String]) -> bool {
    let Some(offset) = found.len().checked_sub(target.len()) else {
        return false;
    };
    return found
        .iter()
        .skip(offset)
        .zip(target)
        .all(|(f, t)| return segments_match(f, t));
}

/// Leaf equality: exact, or exact after stripping the candidate's template arguments.
pub fn leaf_matches(found: &str, target: &str) -> bool {
    return found == target || template_base(found) == target;
}

/// Syntactic family of a located declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// Function definition or in-class method declaration.
    Function,
    /// Class, struct, union, or enum definition with a body.
    StructLike,
    /// A `template <...>` wrapper around a function definition.
    TemplateWrapper,
    /// Single variable or constant declaration.
    Variable,
}

/// Which families a lookup accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Enum definitions only.
    Enum,
    /// Functions, methods, and templated functions.
    Function,
    /// Classes, structs, unions, and enums.
    Type,
    /// Variables and constants.
    Variable,
}

/// A declaration located during one resolution walk. Borrows the tree it came from.
#[derive(Debug, Clone)]
pub struct DeclarationMatch<'tree> {
    /// Last line of the node, 1-based.
    pub end_line: u32,
    /// Family of the matched declaration.
    pub kind: DeclarationKind,
    /// The node whose text is returned to callers.
    pub node: Node<'tree>,
    /// Enclosing scope path at the point of the match, outermost first.
    pub scope: Vec<String>,
    /// First line of the node, 1-based.
    pub start_line: u32,
    /// Verbatim node text.
    pub text: String,
}

/// Inclusive 1-based line interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineSpan {
    /// Last line, inclusive.
    pub end: u32,
    /// First line, inclusive.
    pub start: u32,
}

impl LineSpan {
    /// Build a span, swapping the bounds if they arrive reversed.
    pub fn new(start: u32, end: u32) -> Self {
        return Self {
            start: start.min(end),
            end: start.max(end),
        };
    }

    /// Number of lines covered.
    pub fn line_count(self) -> u32 {
        return self.end.saturating_sub(self.start).saturating_add(1);
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}-{}", self.start, self.end);
    }
}

/// Text of an extracted region plus its 1-based inclusive line bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Last line of the region.
    pub end_line: u32,
    /// First line of the region.
    pub start_line: u32,
    /// Region text without a trailing newline.
    pub text: String,
}

/// Marker name to the lines strictly between its start and end directives.
pub type MarkerTable = BTreeMap<String, LineSpan>;

/// A changed range that no extraction has claimed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRegion {
    /// File the range belongs to.
    pub file: PathBuf,
    /// Uncovered lines.
    pub span: LineSpan,
}

/// Outcome of narrowing a candidate list down to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    /// Several candidates survived; callers report them all.
    Ambiguous(Vec<T>),
    /// Nothing survived.
    Missing,
    /// Exactly one candidate.
    Unique(T),
}

/// Convert a zero-based tree-sitter row into a 1-based line number.
pub fn row_to_line(row: usize) -> u32 {
    return u32::try_from(row).unwrap_or(u32::MAX).saturating_add(1);
}

/// 1-based inclusive lines of a node. Nodes that swallow their trailing newline
/// (preprocessor definitions) end at column zero of the next row; that row is
/// not counted.
pub fn node_lines(node: Node<'_>) -> LineSpan {
    let start = node.start_position();
    let end = node.end_position();
    let end_row = if end.column == 0 && end.row > start.row {
        end.row.saturating_sub(1)
    } else {
        end.row
    };
    return LineSpan::new(row_to_line(start.row), row_to_line(end_row));
}
