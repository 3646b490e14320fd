//! Thin wrappers over the `git` CLI used for change tracking.

use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::error::Error;

/// Run `git <args>` in `repo` and return stdout.
///
/// # Errors
///
/// Returns `Error::DiffFailed` if git cannot be spawned or exits non-zero.
fn run_git(repo: &Path, args: &[&str]) -> Result<String, Error> {
    tracing::debug!(repo = %repo.display(), ?args, "running git");
    let output = Command::new("git").arg("-C").arg(repo).args(args).output().map_err(|e| {
        return Error::DiffFailed {
            reason: format!("could not run git: {e}"),
        };
    })?;

    if !output.status.success() {
        return Err(Error::DiffFailed {
            reason: format!("git {} failed: {}", args.join(" "), String::from_utf8_lossy(&output.stderr).trim()),
        });
    }
    return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
}

/// Merge base of `HEAD` with the first configured default branch that has one,
/// or the configured fallback base.
pub fn detect_base(repo: &Path, config: &Config) -> String {
    for branch in &config.default_branches {
        match run_git(repo, &["merge-base", "HEAD", branch]) {
            Ok(out) if !out.trim().is_empty() => {
                let base = out.trim().to_string();
                tracing::info!(%branch, %base, "detected change base");
                return base;
            },
            Ok(_) => {},
            Err(e) => tracing::debug!(%branch, error = %e, "no merge base"),
        }
    }
    tracing::info!(base = %config.fallback_base, "no default branch found, using fallback base");
    return config.fallback_base.clone();
}

/// `base` as a revision range: explicit ranges pass through, anything else
/// becomes `base..HEAD`.
pub fn diff_range(base: &str) -> String {
    if base.contains("..") {
        return base.to_string();
    }
    return format!("{base}..HEAD");
}

/// Resolve the `auto` keyword to a detected base; pass anything else through.
pub fn resolve_base(repo: &Path, config: &Config, base: &str) -> String {
    if base == "auto" {
        return detect_base(repo, config);
    }
    return base.to_string();
}

/// Unified diff of `range` with three lines of context.
///
/// # Errors
///
/// Returns `Error::DiffFailed` on a bad ref or a non-repository.
pub fn unified_diff(repo: &Path, range: &str) -> Result<String, Error> {
    return run_git(repo, &["diff", range, "--unified=3"]);
}

/// Repository-relative paths of files changed in `range`.
///
/// # Errors
///
/// Returns `Error::DiffFailed` on a bad ref or a non-repository.
pub fn changed_files(repo: &Path, range: &str) -> Result<Vec<String>, Error> {
    let out = run_git(repo, &["diff", range, "--name-only"])?;
    return Ok(out.lines().filter(|l| return !l.trim().is_empty()).map(String::from).collect());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ranges_pass_through() {
        assert_eq!(diff_range("main..feature"), "main..feature");
        assert_eq!(diff_range("v1...v2"), "v1...v2");
        assert_eq!(diff_range("abc123"), "abc123..HEAD");
    }

    #[test]
    fn non_repository_is_a_diff_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = unified_diff(dir.path(), "HEAD~1..HEAD").unwrap_err();
        assert!(matches!(err, Error::DiffFailed { .. }));
    }

    #[test]
    fn detection_falls_back_outside_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        assert_eq!(detect_base(dir.path(), &config), "HEAD~1");
        assert_eq!(resolve_base(dir.path(), &config, "v2.0"), "v2.0");
    }
}
