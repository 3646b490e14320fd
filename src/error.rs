/// Crate-level error types for snipref diagnostics.
use std::path::PathBuf;

/// All errors in snipref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, target, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// More than one candidate matched where exactly one was required.
    #[error(
        "ambiguous `{target}` in {}: {} matches ({}), be more specific",
        file.display(),
        candidates.len(),
        candidates.join("; ")
    )]
    AmbiguousMatch {
        /// One description per conflicting candidate, led by its line number.
        candidates: Vec<String>,
        /// File that was searched.
        file: PathBuf,
        /// Target as the caller wrote it.
        target: String,
    },

    /// Running `git` or reading its diff failed.
    #[error("git diff failed: {reason}")]
    DiffFailed {
        /// Captured stderr or the spawn error.
        reason: String,
    },

    /// A referenced source file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Source file exceeds the size limit.
    #[error("file too large ({size_bytes} bytes, max {max_bytes}): {}", file.display())]
    FileTooLarge {
        /// File that exceeded the size limit.
        file: PathBuf,
        /// Maximum allowed file size in bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        size_bytes: u64,
    },

    /// The extraction request itself is malformed.
    #[error("invalid selector: {reason}")]
    InvalidSelector {
        /// What is wrong with the request.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of the fixture manifest failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A named construct does not exist under the given qualifiers.
    #[error("{target} not found in {}{}", file.display(), available_suffix(available))]
    NotFound {
        /// Names that do exist, when the lookup has a natural catalogue.
        available: Vec<String>,
        /// File that was searched.
        file: PathBuf,
        /// Human description of what was looked for, e.g. "function `foo`".
        target: String,
    },

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A template contains a call expression that cannot be parsed.
    #[error("template syntax: {}:{line}: {reason}", file.display())]
    TemplateSyntax {
        /// Template file, or `-` for stdin.
        file: PathBuf,
        /// 1-based line of the offending expression.
        line: u32,
        /// What could not be parsed.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The selector is not available for the file's language.
    #[error("{selector} extraction is not supported for {language} files ({})", file.display())]
    UnsupportedConstruct {
        /// File the request targeted.
        file: PathBuf,
        /// Language detected for the file.
        language: String,
        /// Selector the caller asked for.
        selector: String,
    },

    /// No grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}

/// Render the ". Available: a, b" tail of a not-found message.
fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        return String::new();
    }
    return format!(". Available: {}", available.join(", "));
}
