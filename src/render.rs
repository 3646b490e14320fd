//! Template rendering: `{{ code(...) }}` calls become fenced code blocks.
//!
//! Only `code`, its alias `ghc`, and `ignore_changes` are interpreted. Any other
//! `{{ ... }}` expression, and all text outside expressions, passes through
//! untouched so templates can hold other placeholders.

use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::changes::ChangesSet;
use crate::config::Config;
use crate::error::Error;
use crate::extractor::{self, ExtractRequest, Selector};
use crate::fixtures::FixtureCollector;
use crate::format::{self, BlockStyle};
use crate::macros::ArgumentFilter;

/// Template file extension.
pub const TEMPLATE_EXTENSION: &str = "j2";

/// `{{ expression }}`, non-greedy so adjacent expressions stay separate.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}").expect("valid expression regex"));

// ── Call expressions ───────────────────────────────────────────────────

/// Literal argument values a call may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    /// `True` / `False`.
    Bool(bool),
    /// `{'key': value, ...}`.
    Dict(Vec<(String, Value)>),
    /// Integer literal.
    Int(i64),
    /// `None`.
    Null,
    /// Quoted string.
    Str(String),
    /// `(a, b)` or `[a, b]`.
    Tuple(Vec<Value>),
}

impl Value {
    /// Short type name for error messages.
    fn kind(&self) -> &'static str {
        return match self {
            Value::Bool(_) => "bool",
            Value::Dict(_) => "dict",
            Value::Int(_) => "int",
            Value::Null => "None",
            Value::Str(_) => "string",
            Value::Tuple(_) => "tuple",
        };
    }
}

/// The functions this renderer interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    /// `code(...)` or `ghc(...)`: render a block.
    Code,
    /// `ignore_changes(...)`: mark a region as documented without rendering it.
    IgnoreChanges,
}

/// A parsed call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    /// Which function was called.
    function: Function,
    /// `name=value` arguments in order.
    keywords: Vec<(String, Value)>,
    /// Positional arguments in order.
    positional: Vec<Value>,
}

/// Character-level parser for one call expression.
struct CallParser<'a> {
    /// Remaining input.
    chars: Peekable<Chars<'a>>,
}

impl<'a> CallParser<'a> {
    /// Parser over `expression`.
    fn new(expression: &'a str) -> Self {
        return Self {
            chars: expression.chars().peekable(),
        };
    }

    /// Skip whitespace.
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| return c.is_whitespace()).is_some() {}
    }

    /// Consume `expected` after whitespace, or fail.
    fn require(&mut self, expected: char) -> Result<(), String> {
        self.skip_ws();
        match self.chars.next() {
            Some(c) if c == expected => return Ok(()),
            Some(c) => return Err(format!("expected `{expected}`, found `{c}`")),
            None => return Err(format!("expected `{expected}`, found end of expression")),
        }
    }

    /// Consume `c` after whitespace if it is next.
    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        return self.chars.next_if_eq(&c).is_some();
    }

    /// Identifier made of word characters.
    fn identifier(&mut self) -> String {
        self.skip_ws();
        let mut ident = String::new();
        while let Some(c) = self.chars.next_if(|c| return c.is_alphanumeric() || *c == '_') {
            ident.push(c);
        }
        return ident;
    }

    /// Parse `function(args)` when `function` is one this renderer handles.
    /// `Ok(None)` means the expression belongs to someone else.
    fn call(mut self) -> Result<Option<Call>, String> {
        let function = match self.identifier().as_str() {
            "code" | "ghc" => Function::Code,
            "ignore_changes" => Function::IgnoreChanges,
            _ => return Ok(None),
        };
        self.skip_ws();
        if self.chars.peek() != Some(&'(') {
            return Ok(None);
        }
        self.require('(')?;

        let mut call = Call {
            function,
            keywords: Vec::new(),
            positional: Vec::new(),
        };
        while !self.eat(')') {
            self.argument(&mut call)?;
            if !self.eat(',') {
                self.require(')')?;
                break;
            }
        }
        self.skip_ws();
        if let Some(extra) = self.chars.next() {
            return Err(format!("unexpected `{extra}` after call"));
        }
        return Ok(Some(call));
    }

    /// One positional or keyword argument.
    fn argument(&mut self, call: &mut Call) -> Result<(), String> {
        self.skip_ws();
        let starts_word = self.chars.peek().is_some_and(|c| return c.is_alphabetic() || *c == '_');
        if !starts_word {
            call.positional.push(self.value()?);
            return Ok(());
        }
        let word = self.identifier();
        if self.eat('=') {
            let value = self.value()?;
            call.keywords.push((word, value));
            return Ok(());
        }
        call.positional.push(keyword_literal(&word)?);
        return Ok(());
    }

    /// A literal value.
    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                return self.string(quote).map(Value::Str);
            },
            Some('(') => {
                self.chars.next();
                return self.sequence(')').map(Value::Tuple);
            },
            Some('[') => {
                self.chars.next();
                return self.sequence(']').map(Value::Tuple);
            },
            Some('{') => {
                self.chars.next();
                return self.dict().map(Value::Dict);
            },
            Some(c) if c.is_ascii_digit() || c == '-' => return self.integer(),
            Some(c) if c.is_alphabetic() => {
                let word = self.identifier();
                return keyword_literal(&word);
            },
            Some(c) => return Err(format!("unexpected `{c}`")),
            None => return Err("unexpected end of expression".to_string()),
        }
    }

    /// Body of a quoted string; the opening quote is already consumed.
    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        return Err("unterminated string".to_string());
    }

    /// Signed integer literal.
    fn integer(&mut self) -> Result<Value, String> {
        let mut digits = String::new();
        if let Some(sign) = self.chars.next_if_eq(&'-') {
            digits.push(sign);
        }
        while let Some(d) = self.chars.next_if(char::is_ascii_digit) {
            digits.push(d);
        }
        return digits
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| return format!("invalid integer `{digits}`"));
    }

    /// Comma-separated values up to `close`; the opener is already consumed.
    fn sequence(&mut self, close: char) -> Result<Vec<Value>, String> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.value()?);
            if !self.eat(',') {
                self.require(close)?;
                break;
            }
        }
        return Ok(items);
    }

    /// `'key': value` pairs up to `}`; the `{` is already consumed.
    fn dict(&mut self) -> Result<Vec<(String, Value)>, String> {
        let mut entries = Vec::new();
        while !self.eat('}') {
            let key = match self.value()? {
                Value::Str(key) => key,
                other => return Err(format!("dict keys must be strings, found {}", other.kind())),
            };
            self.require(':')?;
            entries.push((key, self.value()?));
            if !self.eat(',') {
                self.require('}')?;
                break;
            }
        }
        return Ok(entries);
    }
}

/// `True`, `False`, `None`, in either case convention.
fn keyword_literal(word: &str) -> Result<Value, String> {
    return match word {
        "True" | "true" => Ok(Value::Bool(true)),
        "False" | "false" => Ok(Value::Bool(false)),
        "None" | "none" => Ok(Value::Null),
        _ => Err(format!("bare name `{word}` is not a value")),
    };
}

// ── Call to request ────────────────────────────────────────────────────

/// Everything needed to run and format one call.
struct Prepared {
    /// Path as written in the template, used in headers.
    display_path: String,
    /// Fence tag override.
    language: Option<String>,
    /// Line-number override.
    line_numbers: Option<bool>,
    /// The extraction, or `None` for a bare `ignore_changes(path)`.
    request: Option<ExtractRequest>,
    /// Resolved source path.
    source: PathBuf,
}

/// Shorthand for selector-shape errors.
fn invalid(reason: String) -> Error {
    return Error::InvalidSelector { reason };
}

/// Require a string value for `key`.
fn expect_str(key: &str, value: Value) -> Result<String, Error> {
    return match value {
        Value::Str(s) => Ok(s),
        other => Err(invalid(format!("`{key}` must be a string, found {}", other.kind()))),
    };
}

/// Require a positive line number.
fn expect_line(key: &str, value: &Value) -> Result<u32, Error> {
    return match value {
        Value::Int(n) => u32::try_from(*n).map_err(|_| return invalid(format!("`{key}` line {n} is out of range"))),
        other => Err(invalid(format!("`{key}` bounds must be integers, found {}", other.kind()))),
    };
}

/// `function_macro='NAME'` or `function_macro={'name': 'NAME', 'arg0': 'x'}`.
fn macro_selector(value: Value) -> Result<Selector, Error> {
    return match value {
        Value::Str(name) => Ok(Selector::FunctionMacro {
            name,
            filters: Vec::new(),
        }),
        Value::Dict(entries) => {
            let mut name = None;
            let mut filters = Vec::new();
            for (key, value) in entries {
                if key == "name" {
                    name = Some(expect_str("function_macro.name", value)?);
                    continue;
                }
                let text = match value {
                    Value::Str(s) => s,
                    Value::Int(n) => n.to_string(),
                    other => return Err(invalid(format!("`{key}` must be a string, found {}", other.kind()))),
                };
                filters.push(ArgumentFilter::from_key(&key, &text)?);
            }
            let name = name.ok_or_else(|| return invalid("function_macro dict needs a 'name' entry".to_string()))?;
            Ok(Selector::FunctionMacro { name, filters })
        },
        other => Err(invalid(format!("`function_macro` must be a string or dict, found {}", other.kind()))),
    };
}

/// Turn call arguments into a request.
fn prepare(call: Call, repo: &Path) -> Result<Prepared, Error> {
    let mut positional = call.positional.into_iter();
    let display_path = match positional.next() {
        Some(Value::Str(path)) => path,
        Some(other) => return Err(invalid(format!("the first argument must be a file path, found {}", other.kind()))),
        None => return Err(invalid("the first argument must be a file path".to_string())),
    };
    if positional.next().is_some() {
        return Err(invalid("only the file path may be passed positionally".to_string()));
    }

    let mut selectors = Vec::new();
    let mut signature = None;
    let mut marker = None;
    let mut language = None;
    let mut line_numbers = None;

    for (key, value) in call.keywords {
        match key.as_str() {
            "function" => selectors.push(Selector::Function {
                name: expect_str(&key, value)?,
                signature: None,
            }),
            "signature" => signature = Some(expect_str(&key, value)?),
            "struct" | "class" => selectors.push(Selector::Type {
                name: expect_str(&key, value)?,
            }),
            "var" => selectors.push(Selector::Variable {
                name: expect_str(&key, value)?,
            }),
            "function_macro" => selectors.push(macro_selector(value)?),
            "macro_definition" => selectors.push(Selector::MacroDefinition {
                name: expect_str(&key, value)?,
            }),
            "lines" => {
                let Value::Tuple(bounds) = value else {
                    return Err(invalid(format!("`lines` must be a (start, end) pair, found {}", value.kind())));
                };
                let [start, end] = bounds.as_slice() else {
                    return Err(invalid("`lines` must be a (start, end) pair".to_string()));
                };
                selectors.push(Selector::Lines {
                    start: expect_line(&key, start)?,
                    end: expect_line(&key, end)?,
                });
            },
            "marker" => marker = Some(expect_str(&key, value)?),
            "message" => selectors.push(Selector::Message {
                name: expect_str(&key, value)?,
            }),
            "enum" => selectors.push(Selector::Enum {
                name: expect_str(&key, value)?,
            }),
            "service" => selectors.push(Selector::Service {
                name: expect_str(&key, value)?,
            }),
            "line_numbers" => match value {
                Value::Bool(b) => line_numbers = Some(b),
                other => return Err(invalid(format!("`line_numbers` must be a bool, found {}", other.kind()))),
            },
            "language" => language = Some(expect_str(&key, value)?),
            "github" | "blame" => {},
            _ => return Err(invalid(format!("unknown keyword `{key}`"))),
        }
    }

    if let Some(sig) = signature {
        let Some(Selector::Function { signature, .. }) =
            selectors.iter_mut().find(|s| return matches!(s, Selector::Function { .. }))
        else {
            return Err(invalid("`signature` needs `function`".to_string()));
        };
        *signature = Some(sig);
    }

    let source = crate::changes::resolve_in_repo(repo, Path::new(&display_path));
    let request = match (selectors.is_empty(), marker) {
        (true, None) => None,
        (true, Some(name)) => Some(ExtractRequest {
            marker: None,
            path: source.clone(),
            selector: Selector::Marker { name },
        }),
        (false, marker) => Some(ExtractRequest {
            marker,
            path: source.clone(),
            selector: extractor::single_selector(selectors)?,
        }),
    };

    return Ok(Prepared {
        display_path,
        language,
        line_numbers,
        request,
        source,
    });
}

// ── Renderer ───────────────────────────────────────────────────────────

/// Renders templates against one repository, optionally consuming a
/// [`ChangesSet`] and feeding a [`FixtureCollector`].
pub struct Renderer<'a> {
    /// Change regions to subtract from.
    changes: Option<&'a mut ChangesSet>,
    /// Where failing sources are copied.
    collector: Option<&'a mut FixtureCollector>,
    /// Formatting defaults.
    config: &'a Config,
    /// Failed calls so far.
    failures: usize,
    /// Root that call paths are relative to.
    repo: &'a Path,
}

impl<'a> Renderer<'a> {
    /// Renderer with no change tracking and no fixture collection.
    pub fn new(repo: &'a Path, config: &'a Config) -> Self {
        return Self {
            changes: None,
            collector: None,
            config,
            failures: 0,
            repo,
        };
    }

    /// Subtract every successful extraction from `changes`.
    pub fn with_changes(mut self, changes: &'a mut ChangesSet) -> Self {
        self.changes = Some(changes);
        return self;
    }

    /// Hand every failing source to `collector`.
    pub fn with_collector(mut self, collector: &'a mut FixtureCollector) -> Self {
        self.collector = Some(collector);
        return self;
    }

    /// Number of calls that rendered as failures.
    pub fn failures(&self) -> usize {
        return self.failures;
    }

    /// Render template text. `template` names the template in errors and manifests.
    ///
    /// # Errors
    ///
    /// Returns `Error::TemplateSyntax` for a malformed call, or `Error::Io` if a
    /// failing source cannot be collected. Extraction failures do not abort:
    /// they render inline and are counted.
    pub fn render_str(&mut self, text: &str, template: &Path) -> Result<String, Error> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in EXPRESSION.captures_iter(text) {
            let (Some(whole), Some(expression)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(text.get(last..whole.start()).unwrap_or_default());
            last = whole.end();

            let call = CallParser::new(expression.as_str()).call().map_err(|reason| {
                return Error::TemplateSyntax {
                    file: template.to_path_buf(),
                    line: line_of(text, whole.start()),
                    reason,
                };
            })?;
            match call {
                Some(call) => out.push_str(&self.render_call(call, template)?),
                None => out.push_str(whole.as_str()),
            }
        }

        out.push_str(text.get(last..).unwrap_or_default());
        return Ok(out);
    }

    /// Render `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if either file cannot be accessed, or any error from
    /// [`Renderer::render_str`].
    pub fn render_file(&mut self, input: &Path, output: &Path) -> Result<(), Error> {
        let text = std::fs::read_to_string(input)?;
        let rendered = self.render_str(&text, input)?;
        if let Some(parent) = output.parent().filter(|p| return !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, rendered)?;
        tracing::info!(input = %input.display(), output = %output.display(), "rendered template");
        return Ok(());
    }

    /// One interpreted call to its replacement text.
    fn render_call(&mut self, call: Call, template: &Path) -> Result<String, Error> {
        let function = call.function;
        let prepared = match prepare(call, self.repo) {
            Ok(p) => p,
            Err(e) if function == Function::IgnoreChanges => {
                tracing::warn!(template = %template.display(), error = %e, "ignore_changes call ignored");
                return Ok(String::new());
            },
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                tracing::warn!(template = %template.display(), error = %e, "extraction failed");
                return Ok(format::render_failure(&e));
            },
        };

        let Some(request) = prepared.request.as_ref() else {
            if function == Function::IgnoreChanges {
                self.consume(&prepared.source, 1, u32::MAX);
                return Ok(String::new());
            }
            let err = invalid(format!("no selector given for `{}`", prepared.display_path));
            self.failures = self.failures.saturating_add(1);
            return Ok(format::render_failure(&err));
        };

        match extractor::extract(request) {
            Ok(extraction) => {
                self.consume(&prepared.source, extraction.start_line, extraction.end_line);
                if function == Function::IgnoreChanges {
                    return Ok(String::new());
                }
                let style = BlockStyle {
                    language: prepared.language.as_deref(),
                    line_numbers: prepared.line_numbers.unwrap_or(self.config.line_numbers),
                };
                return Ok(format::render_block(&prepared.display_path, &extraction, style));
            },
            Err(e) if function == Function::IgnoreChanges => {
                tracing::warn!(template = %template.display(), error = %e, "ignore_changes target not resolved");
                return Ok(String::new());
            },
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                tracing::warn!(template = %template.display(), error = %e, "extraction failed");
                if let Some(collector) = self.collector.as_deref_mut() {
                    collector.collect(&prepared.source, &e, template)?;
                }
                return Ok(format::render_failure(&e));
            },
        }
    }

    /// Mark lines of `file` as documented.
    fn consume(&mut self, file: &Path, start: u32, end: u32) {
        if let Some(changes) = self.changes.as_deref_mut() {
            changes.subtract(file, start, end);
        }
    }
}

/// 1-based line of byte offset `at`.
fn line_of(text: &str, at: usize) -> u32 {
    let before = text.get(..at).unwrap_or_default();
    let newlines = before.bytes().filter(|b| return *b == b'\n').count();
    return u32::try_from(newlines).unwrap_or(u32::MAX).saturating_add(1);
}

/// Output path for a template: the `.j2` extension stripped.
pub fn output_path(template: &Path) -> PathBuf {
    if template.extension().is_some_and(|e| return e == TEMPLATE_EXTENSION) {
        return template.with_extension("");
    }
    return template.to_path_buf();
}

/// Every `*.j2` file under `root`, sorted, filtered by the config's
/// include/exclude prefixes (matched against the path relative to `root`).
pub fn find_templates(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return !e.file_type().is_dir())
        .filter(|e| return e.path().extension().is_some_and(|ext| return ext == TEMPLATE_EXTENSION))
    {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.should_render(&relative.to_string_lossy()) {
            found.push(path.to_path_buf());
        }
    }
    return found;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(expression: &str) -> Result<Option<Call>, String> {
        return CallParser::new(expression).call();
    }

    fn fixtures_root() -> PathBuf {
        return Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    }

    #[test]
    fn parses_positional_and_keyword_arguments() {
        let call = parse("code('src/a.cpp', function=\"f\", lines=(1, 3), line_numbers=False,)").unwrap().unwrap();
        assert_eq!(call.function, Function::Code);
        assert_eq!(call.positional, vec![Value::Str("src/a.cpp".into())]);
        assert_eq!(
            call.keywords,
            vec![
                ("function".into(), Value::Str("f".into())),
                ("lines".into(), Value::Tuple(vec![Value::Int(1), Value::Int(3)])),
                ("line_numbers".into(), Value::Bool(false)),
            ]
        );
    }

    #[test]
    fn parses_dicts_and_escapes() {
        let call = parse("ghc('a.cpp', function_macro={'name': 'M', 'arg0': 'it\\'s'})").unwrap().unwrap();
        let (_, value) = call.keywords.first().unwrap();
        assert_eq!(
            value,
            &Value::Dict(vec![("name".into(), Value::Str("M".into())), ("arg0".into(), Value::Str("it's".into()))])
        );
    }

    #[test]
    fn foreign_expressions_are_not_calls() {
        assert_eq!(parse("title"), Ok(None));
        assert_eq!(parse("other('x')"), Ok(None));
        assert_eq!(parse("code"), Ok(None));
    }

    #[test]
    fn malformed_calls_are_errors() {
        assert!(parse("code('a.cpp'").is_err());
        assert!(parse("code('a.cpp) ").is_err());
        assert!(parse("code('a.cpp', x=)").is_err());
        assert!(parse("code('a.cpp') trailing").is_err());
    }

    #[test]
    fn renders_blocks_and_passes_other_text_through() {
        let config = Config::default();
        let root = fixtures_root();
        let mut renderer = Renderer::new(&root, &config);
        let template = "# Shapes\n\n{{ code('shapes.cpp', struct='SimpleStruct', line_numbers=False) }}\n\n{{ title }}\n";
        let out = renderer.render_str(template, Path::new("doc.md.j2")).unwrap();
        assert_eq!(
            out,
            "# Shapes\n\n📍 `shapes.cpp:5-8`\n\n```cpp\nstruct SimpleStruct {\n    int x;\n    int y;\n};\n```\n\n{{ title }}\n"
        );
        assert_eq!(renderer.failures(), 0);
    }

    #[test]
    fn failures_render_inline_and_are_counted() {
        let config = Config::default();
        let root = fixtures_root();
        let mut renderer = Renderer::new(&root, &config);
        let template = "{{ code('shapes.cpp', function='nope') }}\n{{ code('shapes.cpp', bogus='x') }}\n";
        let out = renderer.render_str(template, Path::new("doc.md.j2")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.first().unwrap().starts_with("❌ **ERROR**: function `nope` not found in"));
        assert!(lines.get(1).unwrap().contains("unknown keyword `bogus`"));
        assert_eq!(renderer.failures(), 2);
    }

    #[test]
    fn syntax_errors_name_the_template_line() {
        let config = Config::default();
        let root = fixtures_root();
        let mut renderer = Renderer::new(&root, &config);
        let err = renderer.render_str("intro\n\n{{ code('shapes.cpp' }}\n", Path::new("doc.md.j2")).unwrap_err();
        let Error::TemplateSyntax { line, .. } = err else {
            panic!("expected a syntax error, got {err}");
        };
        assert_eq!(line, 3);
    }

    #[test]
    fn successful_calls_consume_change_regions() {
        let config = Config::default();
        let root = fixtures_root();
        let shapes = root.join("shapes.cpp");
        let methods = root.join("methods.h");
        let mut changes = ChangesSet::new();
        changes.add(&shapes, 1, 10);
        changes.add(&methods, 2, 4);
        {
            let mut renderer = Renderer::new(&root, &config).with_changes(&mut changes);
            let template = "{{ code('shapes.cpp', struct='SimpleStruct') }}{{ ignore_changes('methods.h') }}";
            renderer.render_str(template, Path::new("t.md.j2")).unwrap();
        }
        assert_eq!(changes.ranges(&shapes), &[crate::types::LineSpan::new(1, 4), crate::types::LineSpan::new(9, 10)]);
        assert!(changes.ranges(&methods).is_empty());
    }

    #[test]
    fn ignore_changes_with_selector_renders_nothing() {
        let config = Config::default();
        let root = fixtures_root();
        let shapes = root.join("shapes.cpp");
        let mut changes = ChangesSet::new();
        changes.add(&shapes, 70, 71);
        let out = {
            let mut renderer = Renderer::new(&root, &config).with_changes(&mut changes);
            renderer
                .render_str("a{{ ignore_changes('shapes.cpp', var='kMaxRetries') }}b", Path::new("t.md.j2"))
                .unwrap()
        };
        assert_eq!(out, "ab");
        assert_eq!(changes.ranges(&shapes), &[crate::types::LineSpan::new(71, 71)]);
    }

    #[test]
    fn template_discovery_honours_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/drafts")).unwrap();
        std::fs::write(dir.path().join("docs/b.md.j2"), "").unwrap();
        std::fs::write(dir.path().join("docs/a.md.j2"), "").unwrap();
        std::fs::write(dir.path().join("docs/drafts/c.md.j2"), "").unwrap();
        std::fs::write(dir.path().join("docs/notes.md"), "").unwrap();
        std::fs::write(dir.path().join(".snipref.toml"), "exclude = [\"docs/drafts\"]\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        let found: Vec<PathBuf> = find_templates(dir.path(), &config)
            .into_iter()
            .map(|p| return p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(found, vec![PathBuf::from("docs/a.md.j2"), PathBuf::from("docs/b.md.j2")]);
        assert_eq!(output_path(Path::new("docs/a.md.j2")), PathBuf::from("docs/a.md"));
    }
}
