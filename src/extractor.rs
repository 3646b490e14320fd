//! The extraction boundary: one request in, one region of text out.
//!
//! Everything below this layer reports absence as `None` or an empty list.
//! This is where absence becomes [`Error::NotFound`] and where selectors are
//! checked against what each language supports.

use std::fmt;
use std::path::PathBuf;

use tree_sitter::Node;

use crate::error::Error;
use crate::grammar::SourceLanguage;
use crate::macros::{self, ArgumentFilter};
use crate::markers;
use crate::overload;
use crate::proto_resolver::{self, ProtoKind};
use crate::resolver;
use crate::syntax::{SourceDocument, Syntax};
use crate::types::{self, DeclarationMatch, Extraction, LineSpan, LookupKind, QualifiedName, Selection};

/// What to extract from a file. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// C/C++ enum definition, or proto `enum`.
    Enum {
        /// Possibly qualified name.
        name: String,
    },
    /// Function, method, or function template.
    Function {
        /// Possibly qualified name.
        name: String,
        /// Fragment of the parameter list that picks one overload.
        signature: Option<String>,
    },
    /// Code wrapped by a macro invocation.
    FunctionMacro {
        /// Macro name.
        name: String,
        /// Positional argument constraints.
        filters: Vec<ArgumentFilter>,
    },
    /// Explicit inclusive line range.
    Lines {
        /// Last line.
        end: u32,
        /// First line.
        start: u32,
    },
    /// `#define` by name.
    MacroDefinition {
        /// Macro name.
        name: String,
    },
    /// Region between `//@@start` and `//@@end` directives.
    Marker {
        /// Marker name.
        name: String,
    },
    /// Proto `message`.
    Message {
        /// Possibly dotted name.
        name: String,
    },
    /// Proto `service`.
    Service {
        /// Possibly dotted name.
        name: String,
    },
    /// Class, struct, union, or enum.
    Type {
        /// Possibly qualified name.
        name: String,
    },
    /// Variable or constant.
    Variable {
        /// Possibly qualified name.
        name: String,
    },
}

impl Selector {
    /// Keyword the selector is written with in templates and on the command line.
    pub fn keyword(&self) -> &'static str {
        return match self {
            Selector::Enum { .. } => "enum",
            Selector::Function { .. } => "function",
            Selector::FunctionMacro { .. } => "function_macro",
            Selector::Lines { .. } => "lines",
            Selector::MacroDefinition { .. } => "macro_definition",
            Selector::Marker { .. } => "marker",
            Selector::Message { .. } => "message",
            Selector::Service { .. } => "service",
            Selector::Type { .. } => "struct",
            Selector::Variable { .. } => "var",
        };
    }

    /// Whether files of `language` can answer this selector.
    fn supported_by(&self, language: SourceLanguage) -> bool {
        return match (language, self) {
            (_, Selector::Enum { .. } | Selector::Lines { .. } | Selector::Marker { .. })
            | (
                SourceLanguage::Cpp,
                Selector::Function { .. }
                | Selector::FunctionMacro { .. }
                | Selector::MacroDefinition { .. }
                | Selector::Type { .. }
                | Selector::Variable { .. },
            )
            | (SourceLanguage::Proto, Selector::Message { .. } | Selector::Service { .. }) => true,
            _ => false,
        };
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Selector::Function { name, signature: Some(sig) } => write!(f, "function `{name}` with signature `{sig}`"),
            Selector::FunctionMacro { name, filters } if !filters.is_empty() => {
                let args: Vec<String> = filters.iter().map(|a| return format!("arg{}={}", a.position, a.value)).collect();
                write!(f, "function_macro `{name}({})`", args.join(", "))
            },
            Selector::Lines { start, end } => write!(f, "lines {start}-{end}"),
            Selector::Enum { name }
            | Selector::Function { name, .. }
            | Selector::FunctionMacro { name, .. }
            | Selector::MacroDefinition { name }
            | Selector::Marker { name }
            | Selector::Message { name }
            | Selector::Service { name }
            | Selector::Type { name }
            | Selector::Variable { name } => write!(f, "{} `{name}`", self.keyword()),
        };
    }
}

/// A file plus one selector, optionally narrowed to a marker inside the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Marker to extract from within the selected construct.
    pub marker: Option<String>,
    /// Source file.
    pub path: PathBuf,
    /// The construct to select.
    pub selector: Selector,
}

/// Reduce a list of selectors to the single one a request needs.
///
/// # Errors
///
/// Returns `Error::InvalidSelector` when the list is empty or has more than one entry.
pub fn single_selector(mut selectors: Vec<Selector>) -> Result<Selector, Error> {
    if selectors.len() > 1 {
        let keywords: Vec<&str> = selectors.iter().map(Selector::keyword).collect();
        return Err(Error::InvalidSelector {
            reason: format!("exactly one selector is allowed, got {}", keywords.join(", ")),
        });
    }
    return selectors.pop().ok_or_else(|| {
        return Error::InvalidSelector {
            reason: "no selector given (function, struct, var, function_macro, macro_definition, lines, marker, \
                     message, enum, service)"
                .to_string(),
        };
    });
}

/// Load the request's file and extract from it.
///
/// # Errors
///
/// Returns any error from loading the file or from [`extract_from`].
pub fn extract(request: &ExtractRequest) -> Result<Extraction, Error> {
    validate(request)?;
    let doc = SourceDocument::load(&request.path)?;
    return extract_from(&doc, request);
}

/// Extract from an already-parsed document.
///
/// # Errors
///
/// Returns `Error::InvalidSelector` for malformed requests,
/// `Error::UnsupportedConstruct` when the language cannot answer the selector,
/// `Error::NotFound` when nothing matches, and `Error::AmbiguousMatch` when a
/// signature or macro filter matches more than one candidate.
pub fn extract_from(doc: &SourceDocument, request: &ExtractRequest) -> Result<Extraction, Error> {
    validate(request)?;
    if !request.selector.supported_by(doc.language) {
        return Err(Error::UnsupportedConstruct {
            file: doc.path.clone(),
            language: doc.language.to_string(),
            selector: request.selector.keyword().to_string(),
        });
    }

    let marker = request.marker.as_deref();
    let extraction = match (&doc.syntax, &request.selector) {
        (_, Selector::Lines { start, end }) => extract_lines(doc, *start, *end)?,
        (_, Selector::Marker { name }) => {
            let scan = markers::scan_document(doc);
            let span = scan.table.get(name).copied().ok_or_else(|| {
                return Error::NotFound {
                    available: scan.table.keys().cloned().collect(),
                    file: doc.path.clone(),
                    target: format!("marker `{name}`"),
                };
            })?;
            doc.lines(span)
        },
        (Syntax::Cpp(tree), Selector::Function { name, signature }) => {
            extract_function(doc, tree.root_node(), name, signature.as_deref(), marker)?
        },
        (Syntax::Cpp(tree), Selector::Type { name }) => {
            extract_declaration(doc, tree.root_node(), name, LookupKind::Type, marker)?
        },
        (Syntax::Cpp(tree), Selector::Enum { name }) => {
            extract_declaration(doc, tree.root_node(), name, LookupKind::Enum, marker)?
        },
        (Syntax::Cpp(tree), Selector::Variable { name }) => {
            extract_declaration(doc, tree.root_node(), name, LookupKind::Variable, marker)?
        },
        (Syntax::Cpp(_), Selector::FunctionMacro { name, filters }) => {
            macros::extract_section(doc, name, filters, marker)?
        },
        (Syntax::Cpp(tree), Selector::MacroDefinition { name }) => {
            let root = tree.root_node();
            let node = macros::find_definition(root, &doc.source, name).ok_or_else(|| {
                return Error::NotFound {
                    available: macros::definition_names(root, &doc.source),
                    file: doc.path.clone(),
                    target: format!("macro definition `{name}`"),
                };
            })?;
            within_node(doc, node, marker, &request.selector)?
        },
        (Syntax::Proto(tree), Selector::Enum { name }) => {
            extract_proto(doc, tree.root_node(), ProtoKind::Enum, name, marker)?
        },
        (Syntax::Proto(tree), Selector::Message { name }) => {
            extract_proto(doc, tree.root_node(), ProtoKind::Message, name, marker)?
        },
        (Syntax::Proto(tree), Selector::Service { name }) => {
            extract_proto(doc, tree.root_node(), ProtoKind::Service, name, marker)?
        },
        (_, selector) => {
            return Err(Error::UnsupportedConstruct {
                file: doc.path.clone(),
                language: doc.language.to_string(),
                selector: selector.keyword().to_string(),
            });
        },
    };

    tracing::info!(
        file = %doc.path.display(),
        selector = %request.selector,
        start = extraction.start_line,
        end = extraction.end_line,
        "extracted"
    );
    return Ok(extraction);
}

/// Reject request shapes that can never succeed.
fn validate(request: &ExtractRequest) -> Result<(), Error> {
    match (&request.selector, &request.marker) {
        (Selector::Lines { .. } | Selector::Marker { .. }, Some(marker)) => {
            return Err(Error::InvalidSelector {
                reason: format!("marker `{marker}` cannot narrow a {} selector", request.selector.keyword()),
            });
        },
        (Selector::Lines { start, end }, None) if *start == 0 || start > end => {
            return Err(Error::InvalidSelector {
                reason: format!("line range {start}:{end} must be 1-based with start <= end"),
            });
        },
        _ => return Ok(()),
    }
}

/// Parse a target name, rejecting empty ones.
fn qualified(name: &str) -> Result<QualifiedName, Error> {
    return QualifiedName::parse(name).ok_or_else(|| {
        return Error::InvalidSelector {
            reason: format!("`{name}` is not a valid name"),
        };
    });
}

/// Explicit range, with the end clamped to the file.
fn extract_lines(doc: &SourceDocument, start: u32, end: u32) -> Result<Extraction, Error> {
    let total = doc.line_count();
    if start > total {
        return Err(Error::InvalidSelector {
            reason: format!("line {start} is past the end of {} ({total} lines)", doc.path.display()),
        });
    }
    return Ok(doc.lines(LineSpan::new(start, end.min(total))));
}

/// Whole lines of `node`, or of `marker` inside it.
fn within_node(
    doc: &SourceDocument,
    node: Node<'_>,
    marker: Option<&str>,
    selector: &Selector,
) -> Result<Extraction, Error> {
    let Some(marker) = marker else {
        return Ok(doc.lines(types::node_lines(node)));
    };
    let scan = markers::scan_node(node, &doc.source);
    let span = scan.table.get(marker).copied().ok_or_else(|| {
        return Error::NotFound {
            available: scan.table.keys().cloned().collect(),
            file: doc.path.clone(),
            target: format!("marker `{marker}` in {selector}"),
        };
    })?;
    return Ok(doc.lines(span));
}

/// Type, enum, or variable lookup.
fn extract_declaration(
    doc: &SourceDocument,
    root: Node<'_>,
    name: &str,
    kind: LookupKind,
    marker: Option<&str>,
) -> Result<Extraction, Error> {
    let target = qualified(name)?;
    let selector = match kind {
        LookupKind::Enum => Selector::Enum { name: name.to_string() },
        LookupKind::Variable => Selector::Variable { name: name.to_string() },
        LookupKind::Function | LookupKind::Type => Selector::Type { name: name.to_string() },
    };
    let Some(found) = resolver::find(root, &doc.source, &target, kind) else {
        return Err(Error::NotFound {
            available: resolver::names(root, &doc.source, kind),
            file: doc.path.clone(),
            target: selector.to_string(),
        });
    };
    return within_node(doc, found.node, marker, &selector);
}

/// Whether a function candidate carries a body.
fn is_definition(candidate: &DeclarationMatch<'_>) -> bool {
    let mut node = candidate.node;
    while node.kind() == "template_declaration" {
        let mut cursor = node.walk();
        let Some(inner) = node.named_children(&mut cursor).last() else {
            return false;
        };
        node = inner;
    }
    return node.kind() == "function_definition";
}

/// Break a tie between signature survivors by keeping the definitions, so a
/// method matched both by its in-class declaration and by its out-of-line body
/// resolves to the body.
fn prefer_definitions(survivors: Vec<DeclarationMatch<'_>>) -> Selection<DeclarationMatch<'_>> {
    let mut kept: Vec<_> = if survivors.iter().any(is_definition) {
        survivors.into_iter().filter(is_definition).collect()
    } else {
        survivors
    };
    return match kept.len() {
        0 => Selection::Missing,
        1 => kept.pop().map_or(Selection::Missing, Selection::Unique),
        _ => Selection::Ambiguous(kept),
    };
}

/// `line N: first line of text` for each candidate.
fn describe_candidates(candidates: &[DeclarationMatch<'_>]) -> Vec<String> {
    return candidates
        .iter()
        .map(|c| return format!("line {}: {}", c.start_line, c.text.lines().next().unwrap_or_default().trim()))
        .collect();
}

/// Function lookup with overload selection and optional nested marker.
fn extract_function(
    doc: &SourceDocument,
    root: Node<'_>,
    name: &str,
    signature: Option<&str>,
    marker: Option<&str>,
) -> Result<Extraction, Error> {
    let target = qualified(name)?;
    let selector = Selector::Function {
        name: name.to_string(),
        signature: signature.map(String::from),
    };
    let all = resolver::find_all(root, &doc.source, &target, LookupKind::Function);
    if all.is_empty() {
        return Err(Error::NotFound {
            available: resolver::names(root, &doc.source, LookupKind::Function),
            file: doc.path.clone(),
            target: selector.to_string(),
        });
    }
    let candidates: Vec<_> = all
        .into_iter()
        .map(|c| {
            let params = overload::parameter_text(c.node, &doc.source);
            return (c, params);
        })
        .collect();

    if let Some(marker) = marker {
        let survivors = overload::matching(candidates, signature);
        let mut seen: Vec<String> = Vec::new();
        for candidate in &survivors {
            let scan = markers::scan_node(candidate.node, &doc.source);
            if let Some(span) = scan.table.get(marker) {
                return Ok(doc.lines(*span));
            }
            for key in scan.table.into_keys() {
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        return Err(Error::NotFound {
            available: seen,
            file: doc.path.clone(),
            target: format!("marker `{marker}` in {selector}"),
        });
    }

    let picked = match overload::pick_overload(candidates, signature) {
        Selection::Ambiguous(survivors) => prefer_definitions(survivors),
        other => other,
    };
    return match picked {
        Selection::Unique(found) => Ok(doc.lines(LineSpan::new(found.start_line, found.end_line))),
        Selection::Missing => Err(Error::NotFound {
            available: Vec::new(),
            file: doc.path.clone(),
            target: selector.to_string(),
        }),
        Selection::Ambiguous(all) => Err(Error::AmbiguousMatch {
            candidates: describe_candidates(&all),
            file: doc.path.clone(),
            target: selector.to_string(),
        }),
    };
}

/// Proto definition lookup with optional nested marker.
fn extract_proto(
    doc: &SourceDocument,
    root: Node<'_>,
    kind: ProtoKind,
    name: &str,
    marker: Option<&str>,
) -> Result<Extraction, Error> {
    let target = qualified(name)?;
    let selector = match kind {
        ProtoKind::Enum => Selector::Enum { name: name.to_string() },
        ProtoKind::Message => Selector::Message { name: name.to_string() },
        ProtoKind::Service => Selector::Service { name: name.to_string() },
    };
    let Some(node) = proto_resolver::find(root, &doc.source, kind, &target) else {
        return Err(Error::NotFound {
            available: proto_resolver::names(root, &doc.source, kind),
            file: doc.path.clone(),
            target: selector.to_string(),
        });
    };
    return within_node(doc, node, marker, &selector);
}
