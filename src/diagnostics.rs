use std::fmt::Write as _;
use std::path::Path;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::NotFound { available, file, target } => render_not_found(file, target, available),
        Error::AmbiguousMatch { candidates, file, target } => render_ambiguous(file, target, candidates),
        Error::UnsupportedConstruct { file, language, selector } => {
            render_unsupported_construct(file, language, selector)
        },
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        Error::DiffFailed { reason } => render_diff_failed(reason),
        Error::FileTooLarge { file, size_bytes, max_bytes } => render_file_too_large(file, *size_bytes, *max_bytes),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::InvalidSelector { reason } => format!("\
# Error: Invalid Selector

{reason}

## Fix

Pass exactly one of `--function`, `--struct`, `--var`, `--function-macro`,
`--macro-definition`, `--lines`, `--marker`, `--message`, `--enum`, `--service`.
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::TemplateSyntax { file, line, reason } => format!("\
# Error: Template Syntax

`{}:{line}`: {reason}

## Fix

Calls look like `{{{{ code('path/to/file.cpp', function='name') }}}}`.
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.snipref.toml` at the repository root.
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_not_found(file: &Path, target: &str, available: &[String]) -> String {
    let mut out = format!("\
# Error: Not Found

{target} does not exist in `{}`.
", file.display());

    if !available.is_empty() {
        out.push_str("\n## Available\n\n");
        for name in available {
            let _ = writeln!(out, "- `{name}`");
        }
    }
    out
}

fn render_ambiguous(file: &Path, target: &str, candidates: &[String]) -> String {
    let mut out = format!("\
# Error: Ambiguous Match

{target} matches {} candidates in `{}`.

## Candidates

", candidates.len(), file.display());
    for c in candidates {
        let _ = writeln!(out, "- {c}");
    }

    out.push_str("\
\n## Fix

Narrow the query: add `--signature` with a fragment of the parameter list,
or `--arg argN=value` for macro invocations.
");
    out
}

fn render_unsupported_construct(file: &Path, language: &str, selector: &str) -> String {
    format!(
        "\
# Error: Unsupported Construct

`{selector}` cannot be extracted from {language} files such as `{}`.

## Supported selectors

- C/C++: `function`, `struct`, `var`, `enum`, `function_macro`, `macro_definition`, `lines`, `marker`
- proto: `message`, `enum`, `service`, `lines`, `marker`
",
        file.display()
    )
}

fn render_unsupported_language(ext: &str) -> String {
    format!(
        "\
# Error: Unsupported Language

No extractor for `.{ext}` files.

## Supported extensions

- `.c`, `.cc`, `.cpp`, `.cxx`, `.c++`, `.h`, `.hpp`, `.hxx`, `.h++`, `.ipp`: C/C++
- `.proto`: Protocol Buffers
"
    )
}

fn render_diff_failed(reason: &str) -> String {
    format!(
        "\
# Error: Diff Failed

{reason}

## Fix

Run inside a git repository (or pass `-r <repo>`) and use a base that exists,
for example `auto`, `main`, or `HEAD~3`.
"
    )
}

fn render_file_too_large(file: &Path, size_bytes: u64, max_bytes: u64) -> String {
    format!("\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).
", file.display())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn not_found_lists_available_names() {
        let err = Error::NotFound {
            available: vec!["alpha".to_string(), "beta".to_string()],
            file: PathBuf::from("src/a.cpp"),
            target: "marker `gamma`".to_string(),
        };
        let md = render_error(&err);
        assert!(md.starts_with("# Error: Not Found"));
        assert!(md.contains("marker `gamma` does not exist in `src/a.cpp`"));
        assert!(md.contains("## Available\n\n- `alpha`\n- `beta`"));
    }

    #[test]
    fn ambiguity_lists_candidates_and_a_fix() {
        let err = Error::AmbiguousMatch {
            candidates: vec!["line 10: A(x)".to_string(), "line 18: A(y)".to_string()],
            file: PathBuf::from("m.cpp"),
            target: "macro `A`".to_string(),
        };
        let md = render_error(&err);
        assert!(md.contains("matches 2 candidates"));
        assert!(md.contains("- line 10: A(x)\n- line 18: A(y)"));
        assert!(md.contains("## Fix"));
    }

    #[test]
    fn template_syntax_shows_a_literal_call() {
        let err = Error::TemplateSyntax {
            file: PathBuf::from("docs/a.md.j2"),
            line: 4,
            reason: "unterminated string".to_string(),
        };
        let md = render_error(&err);
        assert!(md.contains("`docs/a.md.j2:4`: unterminated string"));
        assert!(md.contains("{{ code('path/to/file.cpp', function='name') }}"));
    }
}
