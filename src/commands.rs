//! Command bodies for snipref: extract, render, markers, find-markers, changes.

use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::changes::{self, ChangesSet};
use crate::config::Config;
use crate::error::Error;
use crate::extractor::{self, ExtractRequest, Selector};
use crate::fixtures::{self, FixtureCollector};
use crate::format::{self, BlockStyle};
use crate::git;
use crate::grammar;
use crate::macros::ArgumentFilter;
use crate::markers;
use crate::render::{self, Renderer};
use crate::syntax::SourceDocument;

/// Inputs of `snipref extract`, one field per flag.
pub struct ExtractArgs {
    /// `--arg argN=value` filters.
    pub args: Vec<String>,
    /// `--enum`.
    pub enum_name: Option<String>,
    /// Source file.
    pub file: PathBuf,
    /// `--function`.
    pub function: Option<String>,
    /// `--function-macro`.
    pub function_macro: Option<String>,
    /// `--lines A:B`.
    pub lines: Option<String>,
    /// Negation of `--no-line-numbers`.
    pub line_numbers: bool,
    /// `--macro-definition`.
    pub macro_definition: Option<String>,
    /// `--marker`.
    pub marker: Option<String>,
    /// `--message`.
    pub message: Option<String>,
    /// `--raw`.
    pub raw: bool,
    /// `--service`.
    pub service: Option<String>,
    /// `--signature`.
    pub signature: Option<String>,
    /// `--struct`.
    pub struct_name: Option<String>,
    /// `--var`.
    pub var: Option<String>,
}

/// Inputs of `snipref render`.
pub struct RenderArgs {
    /// Copy failing sources into the fixture directory.
    pub collect_error_fixtures: bool,
    /// Template file, directory, or `-`.
    pub input: String,
    /// Output file or `-`.
    pub output: Option<String>,
    /// Repository root.
    pub repo: PathBuf,
    /// Fail on any failure or uncovered change.
    pub strict: bool,
    /// Base to verify changes against.
    pub verify_changes: Option<String>,
}

/// Parse `A:B` (or `A-B`) into an inclusive line range.
///
/// # Errors
///
/// Returns `Error::InvalidSelector` if either bound is not a number.
fn parse_line_range(raw: &str) -> Result<Selector, Error> {
    let invalid = || {
        return Error::InvalidSelector {
            reason: format!("`--lines` expects START:END, got `{raw}`"),
        };
    };
    let (start, end) = raw.split_once(':').or_else(|| return raw.split_once('-')).ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| return invalid())?;
    let end = end.trim().parse().map_err(|_| return invalid())?;
    return Ok(Selector::Lines { end, start });
}

/// Build the request described by the extract flags.
///
/// # Errors
///
/// Returns `Error::InvalidSelector` for zero or several selectors, or a malformed flag value.
fn extract_request(args: &ExtractArgs) -> Result<ExtractRequest, Error> {
    let mut selectors = Vec::new();
    if let Some(name) = &args.function {
        selectors.push(Selector::Function {
            name: name.clone(),
            signature: args.signature.clone(),
        });
    }
    if let Some(name) = &args.struct_name {
        selectors.push(Selector::Type { name: name.clone() });
    }
    if let Some(name) = &args.var {
        selectors.push(Selector::Variable { name: name.clone() });
    }
    if let Some(name) = &args.function_macro {
        let filters = args.args.iter().map(|raw| return ArgumentFilter::parse(raw)).collect::<Result<Vec<_>, _>>()?;
        selectors.push(Selector::FunctionMacro {
            filters,
            name: name.clone(),
        });
    }
    if let Some(name) = &args.macro_definition {
        selectors.push(Selector::MacroDefinition { name: name.clone() });
    }
    if let Some(raw) = &args.lines {
        selectors.push(parse_line_range(raw)?);
    }
    if let Some(name) = &args.message {
        selectors.push(Selector::Message { name: name.clone() });
    }
    if let Some(name) = &args.enum_name {
        selectors.push(Selector::Enum { name: name.clone() });
    }
    if let Some(name) = &args.service {
        selectors.push(Selector::Service { name: name.clone() });
    }

    // A lone marker is the selector; next to another selector it narrows it.
    let (selector, marker) = match (selectors.is_empty(), &args.marker) {
        (true, Some(name)) => (Selector::Marker { name: name.clone() }, None),
        (_, marker) => (extractor::single_selector(selectors)?, marker.clone()),
    };
    return Ok(ExtractRequest {
        marker,
        path: args.file.clone(),
        selector,
    });
}

/// Extract one construct and print it.
///
/// # Errors
///
/// Returns the extraction error; `main` renders it as a diagnostic.
pub fn extract(args: &ExtractArgs) -> Result<ExitCode, Error> {
    let request = extract_request(args)?;
    let extraction = extractor::extract(&request)?;
    tracing::info!(file = %args.file.display(), selector = %request.selector, "extracted {}-{}", extraction.start_line, extraction.end_line);

    if args.raw {
        println!("{}", extraction.text);
    } else {
        let style = BlockStyle {
            language: None,
            line_numbers: args.line_numbers,
        };
        println!("{}", format::render_block(&args.file.display().to_string(), &extraction, style));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Render one template, a directory of templates, or stdin.
///
/// # Errors
///
/// Returns config, git, template syntax, or I/O errors. Failed extractions are
/// not errors: they are rendered inline and only affect the exit code under `--strict`.
pub fn render(args: &RenderArgs) -> Result<ExitCode, Error> {
    let config = Config::load(&args.repo)?;
    let mut changes = match &args.verify_changes {
        Some(base) => Some(ChangesSet::from_diff(base, &args.repo, &config)?),
        None => None,
    };
    let mut collector = args
        .collect_error_fixtures
        .then(|| return FixtureCollector::new(args.repo.join(fixtures::DEFAULT_DIR)));

    let failures = {
        let mut renderer = Renderer::new(&args.repo, &config);
        if let Some(set) = changes.as_mut() {
            renderer = renderer.with_changes(set);
        }
        if let Some(c) = collector.as_mut() {
            renderer = renderer.with_collector(c);
        }
        render_input(&mut renderer, args, &config)?;
        renderer.failures()
    };

    let manifest = match &collector {
        Some(c) => c.write_manifest()?,
        None => None,
    };
    if let Some(path) = manifest {
        let count = collector.as_ref().map_or(0, FixtureCollector::len);
        eprintln!("Collected {count} failing extraction(s); manifest at {}", path.display());
    }

    let mut clean = failures == 0;
    if failures > 0 {
        eprintln!("{failures} extraction(s) failed");
    }
    if let Some(set) = &changes {
        print_uncovered(set, &args.repo);
        clean = clean && set.is_complete();
    }

    if args.strict && !clean {
        return Ok(ExitCode::FAILURE);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Dispatch on the kind of render input.
///
/// # Errors
///
/// Returns I/O and template syntax errors.
fn render_input(renderer: &mut Renderer<'_>, args: &RenderArgs, config: &Config) -> Result<(), Error> {
    if args.input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        let rendered = renderer.render_str(&text, Path::new("<stdin>"))?;
        return write_rendered(&rendered, args.output.as_deref().map(Path::new));
    }

    let input = PathBuf::from(&args.input);
    if input.is_dir() {
        if args.output.is_some() {
            tracing::warn!("output path is ignored when rendering a directory");
        }
        let templates = render::find_templates(&input, config);
        for template in &templates {
            renderer.render_file(template, &render::output_path(template))?;
        }
        eprintln!("Rendered {} template(s)", templates.len());
        return Ok(());
    }

    if !input.is_file() {
        return Err(Error::FileNotFound { path: input });
    }
    match args.output.as_deref() {
        Some("-") => {
            let text = std::fs::read_to_string(&input)?;
            let rendered = renderer.render_str(&text, &input)?;
            return write_rendered(&rendered, None);
        },
        Some(output) => return renderer.render_file(&input, Path::new(output)),
        None => return renderer.render_file(&input, &render::output_path(&input)),
    }
}

/// Write to `output`, or stdout for `None` and `-`.
///
/// # Errors
///
/// Returns `Error::Io` if writing fails.
fn write_rendered(rendered: &str, output: Option<&Path>) -> Result<(), Error> {
    match output.filter(|p| return p.as_os_str() != "-") {
        Some(path) => std::fs::write(path, rendered)?,
        None => std::io::stdout().write_all(rendered.as_bytes())?,
    }
    return Ok(());
}

/// `path` relative to `repo` when it lives inside it.
fn display_relative(path: &Path, repo: &Path) -> String {
    return path.strip_prefix(repo).unwrap_or(path).display().to_string();
}

/// Print uncovered regions grouped by file, each followed by its current lines.
fn print_uncovered(set: &ChangesSet, repo: &Path) {
    if set.is_complete() {
        println!("All changes are covered by documentation.");
        return;
    }

    println!("Uncovered changes ({} region(s)):", set.len());
    for file in set.files() {
        println!();
        println!("{}", display_relative(file, repo));
        let source = std::fs::read_to_string(file).unwrap_or_default();
        let lines: Vec<&str> = source.lines().collect();
        for span in set.ranges(file) {
            println!("  {span}");
            let first = usize::try_from(span.start.saturating_sub(1)).unwrap_or(usize::MAX);
            let count = usize::try_from(span.line_count()).unwrap_or(usize::MAX);
            for (line, text) in (span.start..).zip(lines.iter().skip(first).take(count)) {
                println!("    {line:4} {text}");
            }
        }
    }
}

/// Print the marker table of a file. Malformed markers are logged as warnings.
///
/// # Errors
///
/// Returns loading or parsing errors.
pub fn markers(file: &Path) -> Result<ExitCode, Error> {
    let doc = SourceDocument::load(file)?;
    let scan = markers::scan_document(&doc);
    if scan.table.is_empty() {
        eprintln!("No markers in {}", file.display());
    }
    for (name, span) in &scan.table {
        println!("{name} {span}");
    }
    return Ok(ExitCode::SUCCESS);
}

/// List (and optionally delete) standalone directive lines in C/C++ files changed since `since`.
///
/// # Errors
///
/// Returns `Error::DiffFailed` if git fails, or `Error::Io` if a rewrite fails.
pub fn find_markers(repo: &Path, since: &str, remove: bool) -> Result<ExitCode, Error> {
    let config = Config::load(repo)?;
    let range = git::diff_range(&git::resolve_base(repo, &config, since));
    let mut found = 0_usize;

    for relative in git::changed_files(repo, &range)? {
        if !grammar::is_cpp_path(Path::new(&relative)) {
            continue;
        }
        let path = changes::resolve_in_repo(repo, Path::new(&relative));
        let Ok(content) = std::fs::read_to_string(&path) else {
            tracing::debug!(path = %path.display(), "changed file no longer exists");
            continue;
        };

        let mut kept = Vec::new();
        for (line, text) in (1_u32..).zip(content.lines()) {
            if markers::is_directive_line(text) {
                println!("{relative}:{line}: {}", text.trim());
                found = found.saturating_add(1);
            } else {
                kept.push(text);
            }
        }

        let removed = kept.len() != content.lines().count();
        if remove && removed {
            let mut output = kept.join("\n");
            if content.ends_with('\n') {
                output.push('\n');
            }
            std::fs::write(&path, output)?;
            tracing::info!(path = %path.display(), "removed marker directives");
        }
    }

    if found == 0 {
        eprintln!("No marker directives in files changed since {since}");
    } else if remove {
        eprintln!("Removed {found} marker directive line(s)");
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print the change regions since `base`, grouped by file.
///
/// # Errors
///
/// Returns config or git errors.
pub fn changes(repo: &Path, base: &str) -> Result<ExitCode, Error> {
    let config = Config::load(repo)?;
    let set = ChangesSet::from_diff(base, repo, &config)?;
    if set.is_empty() {
        eprintln!("No changes");
    }
    let mut current: Option<PathBuf> = None;
    for region in set.uncovered() {
        if current.as_ref() != Some(&region.file) {
            println!("{}", display_relative(&region.file, repo));
            current = Some(region.file.clone());
        }
        println!("  {}", region.span);
    }
    return Ok(ExitCode::SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: &str) -> ExtractArgs {
        return ExtractArgs {
            args: Vec::new(),
            enum_name: None,
            file: PathBuf::from(file),
            function: None,
            function_macro: None,
            lines: None,
            line_numbers: true,
            macro_definition: None,
            marker: None,
            message: None,
            raw: false,
            service: None,
            signature: None,
            struct_name: None,
            var: None,
        };
    }

    #[test]
    fn line_ranges_accept_colon_or_dash() {
        assert_eq!(parse_line_range("3:9").unwrap(), Selector::Lines { end: 9, start: 3 });
        assert_eq!(parse_line_range("3-9").unwrap(), Selector::Lines { end: 9, start: 3 });
        assert!(parse_line_range("3").is_err());
        assert!(parse_line_range("a:b").is_err());
    }

    #[test]
    fn lone_marker_becomes_the_selector() {
        let mut a = args("x.cpp");
        a.marker = Some("m".to_string());
        let request = extract_request(&a).unwrap();
        assert_eq!(request.selector, Selector::Marker { name: "m".to_string() });
        assert!(request.marker.is_none());
    }

    #[test]
    fn marker_next_to_a_selector_narrows_it() {
        let mut a = args("x.cpp");
        a.function = Some("f".to_string());
        a.marker = Some("m".to_string());
        let request = extract_request(&a).unwrap();
        assert_eq!(request.marker.as_deref(), Some("m"));
        assert!(matches!(request.selector, Selector::Function { .. }));
    }

    #[test]
    fn two_selectors_are_rejected() {
        let mut a = args("x.cpp");
        a.function = Some("f".to_string());
        a.var = Some("v".to_string());
        assert!(matches!(extract_request(&a), Err(Error::InvalidSelector { .. })));
    }

    #[test]
    fn macro_filters_are_parsed() {
        let mut a = args("x.cpp");
        a.function_macro = Some("REGISTER_HANDLER".to_string());
        a.args = vec!["arg1=accept".to_string()];
        let request = extract_request(&a).unwrap();
        let Selector::FunctionMacro { filters, .. } = request.selector else {
            panic!("expected a macro selector");
        };
        assert_eq!(filters.len(), 1);

        a.args = vec!["first=accept".to_string()];
        assert!(extract_request(&a).is_err());
    }
}
