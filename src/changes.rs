//! Per-file interval sets of changed lines, consumed as extractions document them.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::error::Error;
use crate::git;
use crate::types::{ChangeRegion, LineSpan};

/// Changed line ranges keyed by file.
///
/// Invariant: each file's list is sorted, and consecutive spans `a`, `b`
/// satisfy `b.start > a.end + 1`. Files with no spans are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangesSet {
    /// Spans per file.
    files: BTreeMap<PathBuf, Vec<LineSpan>>,
}

impl ChangesSet {
    /// An empty set.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Add `start..=end` to `file`, merging with overlapping or adjacent spans.
    pub fn add(&mut self, file: &Path, start: u32, end: u32) {
        let incoming = LineSpan::new(start, end);
        let spans = self.files.entry(file.to_path_buf()).or_default();

        let mut merged = incoming;
        let mut kept = Vec::with_capacity(spans.len().saturating_add(1));
        for span in spans.drain(..) {
            if touches(span, merged) {
                merged = LineSpan::new(span.start.min(merged.start), span.end.max(merged.end));
            } else {
                kept.push(span);
            }
        }
        let at = kept.partition_point(|s| return s.start < merged.start);
        kept.insert(at, merged);
        *spans = kept;
    }

    /// Remove `start..=end` from `file`, splitting spans that straddle it.
    /// A file left with no spans is dropped.
    pub fn subtract(&mut self, file: &Path, start: u32, end: u32) {
        let cut = LineSpan::new(start, end);
        let Some(spans) = self.files.get_mut(file) else {
            return;
        };

        let mut remaining = Vec::with_capacity(spans.len().saturating_add(1));
        for span in spans.drain(..) {
            if span.end < cut.start || span.start > cut.end {
                remaining.push(span);
                continue;
            }
            if span.start < cut.start {
                remaining.push(LineSpan::new(span.start, cut.start.saturating_sub(1)));
            }
            if span.end > cut.end {
                remaining.push(LineSpan::new(cut.end.saturating_add(1), span.end));
            }
        }

        if remaining.is_empty() {
            self.files.remove(file);
        } else {
            *spans = remaining;
        }
    }

    /// Every remaining span, files in sorted order.
    pub fn uncovered(&self) -> Vec<ChangeRegion> {
        return self
            .files
            .iter()
            .flat_map(|(file, spans)| {
                return spans.iter().map(|span| {
                    return ChangeRegion {
                        file: file.clone(),
                        span: *span,
                    };
                });
            })
            .collect();
    }

    /// Whether every change has been documented.
    pub fn is_complete(&self) -> bool {
        return self.files.is_empty();
    }

    /// Files that still hold changes.
    pub fn files(&self) -> Vec<&Path> {
        return self.files.keys().map(PathBuf::as_path).collect();
    }

    /// Spans remaining for one file.
    pub fn ranges(&self, file: &Path) -> &[LineSpan] {
        return self.files.get(file).map(Vec::as_slice).unwrap_or_default();
    }

    /// Number of stored spans across all files.
    pub fn len(&self) -> usize {
        return self.files.values().map(Vec::len).sum();
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        return self.files.is_empty();
    }

    /// Parse unified diff text. Added lines and context lines are recorded in
    /// new-file coordinates; deleted lines have no position there and are skipped.
    /// File keys are `+++ b/<path>` resolved against `root`.
    pub fn from_unified_diff(diff: &str, root: &Path) -> Self {
        let mut set = Self::new();
        let mut file: Option<PathBuf> = None;
        // Next new-file line, and how many new-file lines the hunk still owes.
        let mut cursor = 0_u32;
        let mut remaining = 0_u32;

        for line in diff.lines() {
            if remaining > 0 {
                match (line.chars().next(), file.as_deref()) {
                    (Some('+' | ' ') | None, Some(path)) => {
                        set.add(path, cursor, cursor);
                        cursor = cursor.saturating_add(1);
                        remaining = remaining.saturating_sub(1);
                    },
                    (Some('-' | '\\'), _) => {},
                    _ => remaining = 0,
                }
                continue;
            }
            if let Some(header) = line.strip_prefix("+++ ") {
                file = new_file_path(header).map(|p| return resolve_in_repo(root, Path::new(&p)));
                continue;
            }
            if let Some((start, count)) = line.strip_prefix("@@ ").and_then(parse_hunk_header) {
                cursor = start;
                remaining = count;
            }
        }
        return set;
    }

    /// Changes between `base` and `HEAD` in `repo`. `auto` detects the base from
    /// the configured default branches.
    ///
    /// # Errors
    ///
    /// Returns `Error::DiffFailed` if git fails.
    pub fn from_diff(base: &str, repo: &Path, config: &Config) -> Result<Self, Error> {
        let base = git::resolve_base(repo, config, base);
        let range = git::diff_range(&base);
        let diff = git::unified_diff(repo, &range)?;
        let set = Self::from_unified_diff(&diff, repo);
        tracing::info!(%range, files = set.files.len(), spans = set.len(), "computed change regions");
        return Ok(set);
    }
}

/// Whether two spans overlap or sit next to each other.
fn touches(a: LineSpan, b: LineSpan) -> bool {
    return a.start <= b.end.saturating_add(1) && b.start <= a.end.saturating_add(1);
}

/// Path from a `+++` header, or `None` for `/dev/null`. Git wraps names with
/// unusual bytes in double quotes and escapes them C-style; those are decoded.
fn new_file_path(header: &str) -> Option<String> {
    let path = match header.strip_prefix('"') {
        Some(quoted) => unquote_c_style(quoted)?,
        None => header.split('\t').next().unwrap_or(header).trim().to_string(),
    };
    if path == "/dev/null" {
        return None;
    }
    if let Some(rest) = path.strip_prefix("b/") {
        return Some(rest.to_string());
    }
    return Some(path);
}

/// Decode a C-quoted path whose opening quote is already stripped. Octal
/// escapes are raw bytes, so multi-byte UTF-8 names come back whole.
fn unquote_c_style(body: &str) -> Option<String> {
    let mut decoded: Vec<u8> = Vec::new();
    let mut bytes = body.bytes();
    while let Some(byte) = bytes.next() {
        match byte {
            b'"' => return Some(String::from_utf8_lossy(&decoded).into_owned()),
            b'\\' => {
                let escaped = bytes.next()?;
                decoded.push(match escaped {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'v' => 0x0b,
                    b'0'..=b'7' => {
                        let digits = [escaped, bytes.next()?, bytes.next()?];
                        u8::from_str_radix(std::str::from_utf8(&digits).ok()?, 8).ok()?
                    },
                    other => other,
                });
            },
            other => decoded.push(other),
        }
    }
    return None;
}

/// `-a,b +c,d @@ ...` to `(c, d)`; a missing count means one line.
fn parse_hunk_header(hunk: &str) -> Option<(u32, u32)> {
    let new_range = hunk.split_whitespace().find_map(|part| return part.strip_prefix('+'))?;
    let (start, count) = match new_range.split_once(',') {
        Some((start, count)) => (start.parse().ok()?, count.parse().ok()?),
        None => (new_range.parse().ok()?, 1),
    };
    return Some((start, count));
}

/// `path` joined onto `repo` unless absolute, with `.` and `..` collapsed
/// without touching the filesystem.
pub fn resolve_in_repo(repo: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() { path.to_path_buf() } else { repo.join(path) };
    return normalize_path(&joined);
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(components.last(), Some(c) if !matches!(c, Component::ParentDir | Component::RootDir));
            if can_pop {
                components.pop();
            } else {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}
