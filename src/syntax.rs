use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::Error;
use crate::grammar::{self, SourceLanguage};
use crate::types::{Extraction, LineSpan};

/// Maximum source file size (16 MiB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Parsed form of a document, one variant per language.
pub enum Syntax {
    /// Concrete syntax tree from tree-sitter-cpp.
    Cpp(Tree),
    /// Concrete syntax tree from tree-sitter-proto.
    Proto(Tree),
}

/// An immutable source buffer plus its parse. Lives for one extraction call.
pub struct SourceDocument {
    /// Language chosen from the file extension.
    pub language: SourceLanguage,
    /// Path the document was loaded from, as given by the caller.
    pub path: PathBuf,
    /// Full UTF-8 source text.
    pub source: String,
    /// Language-specific parse of `source`.
    pub syntax: Syntax,
}

impl SourceDocument {
    /// Read and parse a file from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::UnsupportedLanguage`
    /// for unknown extensions, `Error::FileTooLarge` above the size limit,
    /// or `Error::ParseFailed` if the parser cannot run.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let language = grammar::language_for_path(path)?;
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(path, language, source);
    }

    /// Parse an in-memory buffer as if it had been read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileTooLarge` or `Error::ParseFailed` on invalid input.
    pub fn parse(path: &Path, language: SourceLanguage, source: String) -> Result<Self, Error> {
        let source_len: u64 = source.len().try_into().unwrap_or(u64::MAX);
        if source_len > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                file: path.to_path_buf(),
                size_bytes: source_len,
                max_bytes: MAX_FILE_SIZE,
            });
        }

        let syntax = match language {
            SourceLanguage::Cpp => Syntax::Cpp(parse_cpp(path, &source)?),
            SourceLanguage::Proto => Syntax::Proto(parse_proto(path, &source)?),
        };

        return Ok(Self {
            language,
            path: path.to_path_buf(),
            source,
            syntax,
        });
    }

    /// The tree-sitter tree, for C/C++ documents.
    pub fn cpp_tree(&self) -> Option<&Tree> {
        return match &self.syntax {
            Syntax::Cpp(tree) => Some(tree),
            Syntax::Proto(_) => None,
        };
    }

    /// The tree-sitter tree, whichever grammar produced it.
    pub fn tree(&self) -> &Tree {
        return match &self.syntax {
            Syntax::Cpp(tree) | Syntax::Proto(tree) => tree,
        };
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> u32 {
        return u32::try_from(self.source.lines().count()).unwrap_or(u32::MAX);
    }

    /// Inclusive 1-based line range. The text is clamped to the document while
    /// the reported bounds stay as requested.
    pub fn lines(&self, span: LineSpan) -> Extraction {
        let skip = usize::try_from(span.start.saturating_sub(1)).unwrap_or(usize::MAX);
        let take = usize::try_from(span.line_count()).unwrap_or(usize::MAX);
        let text = self.source.lines().skip(skip).take(take).collect::<Vec<_>>().join("\n");
        return Extraction {
            text,
            start_line: span.start,
            end_line: span.end,
        };
    }

    /// Source text of a tree node, or an empty string if the range is not UTF-8.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        return node.utf8_text(self.source.as_bytes()).unwrap_or_default();
    }
}

/// Parse C/C++ source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_cpp(file_path: &Path, source: &str) -> Result<Tree, Error> {
    return parse_with(tree_sitter_cpp::LANGUAGE.into(), file_path, source);
}

/// Parse `.proto` source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_proto(file_path: &Path, source: &str) -> Result<Tree, Error> {
    return parse_with(tree_sitter_proto::LANGUAGE.into(), file_path, source);
}

/// Run a fresh parser for `language` over `source`.
fn parse_with(language: tree_sitter::Language, file_path: &Path, source: &str) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}
