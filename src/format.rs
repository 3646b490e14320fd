//! Markdown rendering of extracted regions.

use std::path::Path;

use crate::error::Error;
use crate::types::Extraction;

/// Code-fence language tag for a source path.
pub fn fence_language(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| return e.to_str()).map(str::to_ascii_lowercase);
    return match ext.as_deref() {
        Some("c") => "c",
        Some("c++" | "cc" | "cpp" | "cxx" | "h" | "h++" | "hpp" | "hxx" | "ipp") => "cpp",
        Some("proto") => "protobuf",
        _ => "text",
    };
}

/// Prefix each line with its number, right-aligned to width 4.
pub fn number_lines(text: &str, start: u32) -> String {
    let mut out = String::with_capacity(text.len());
    let mut number = start;
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{number:4} {line}"));
        number = number.saturating_add(1);
    }
    return out;
}

/// `` 📍 `path:start-end` ``, or `` `path:line` `` for a single line.
pub fn header(display_path: &str, extraction: &Extraction) -> String {
    if extraction.start_line == extraction.end_line {
        return format!("📍 `{display_path}:{}`", extraction.start_line);
    }
    return format!("📍 `{display_path}:{}-{}`", extraction.start_line, extraction.end_line);
}

/// Options for one rendered block.
#[derive(Debug, Clone, Copy)]
pub struct BlockStyle<'a> {
    /// Fence tag override; `None` picks one from the path.
    pub language: Option<&'a str>,
    /// Whether to number lines.
    pub line_numbers: bool,
}

/// Header, blank line, then the fenced code.
pub fn render_block(display_path: &str, extraction: &Extraction, style: BlockStyle<'_>) -> String {
    let language = style.language.unwrap_or_else(|| return fence_language(Path::new(display_path)));
    let body = if style.line_numbers {
        number_lines(&extraction.text, extraction.start_line)
    } else {
        extraction.text.clone()
    };
    return format!("{}\n\n```{language}\n{body}\n```", header(display_path, extraction));
}

/// Inline failure marker that replaces a call that could not be resolved.
pub fn render_failure(error: &Error) -> String {
    return format!("❌ **ERROR**: {error}");
}
