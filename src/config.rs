use std::path::Path;

use crate::error::Error;

/// File name looked up at the repository root.
pub const CONFIG_FILE: &str = ".snipref.toml";

/// Project configuration loaded from `.snipref.toml`.
/// Include/exclude patterns are path prefixes applied to template files.
#[derive(Debug, Clone)]
pub struct Config {
    /// Branches tried in order when detecting the base for change tracking.
    pub default_branches: Vec<String>,
    /// Path prefixes never rendered.
    exclude: Vec<String>,
    /// Base used when no default branch has a merge base with `HEAD`.
    pub fallback_base: String,
    /// Path prefixes rendered; empty means everything.
    include: Vec<String>,
    /// Whether rendered blocks carry line numbers unless a call says otherwise.
    pub line_numbers: bool,
}

/// Raw TOML structure for `.snipref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SniprefTomlConfig {
    /// Overrides the `main`, `master` search order.
    #[serde(default)]
    default_branches: Option<Vec<String>>,
    /// Excluded path prefixes.
    #[serde(default)]
    exclude: Vec<String>,
    /// Overrides `HEAD~1`.
    #[serde(default)]
    fallback_base: Option<String>,
    /// Included path prefixes.
    #[serde(default)]
    include: Vec<String>,
    /// Overrides numbered output.
    #[serde(default)]
    line_numbers: Option<bool>,
}

impl Default for Config {
    /// Render everything, number lines, and track changes against `main`/`master`.
    fn default() -> Self {
        return Self {
            default_branches: vec!["main".to_string(), "master".to_string()],
            exclude: Vec::new(),
            fallback_base: "HEAD~1".to_string(),
            include: Vec::new(),
            line_numbers: true,
        };
    }
}

impl Config {
    /// Load config from `.snipref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// A file that exists but is malformed is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: SniprefTomlConfig = toml::from_str(&content)?;
        let defaults = Self::default();
        tracing::debug!(path = %path.display(), "loaded config");
        return Ok(Self {
            default_branches: raw.default_branches.unwrap_or(defaults.default_branches),
            exclude: raw.exclude,
            fallback_base: raw.fallback_base.unwrap_or(defaults.fallback_base),
            include: raw.include,
            line_numbers: raw.line_numbers.unwrap_or(defaults.line_numbers),
        });
    }

    /// Check whether a template path should be rendered.
    ///
    /// A path is included if no include patterns are set (render everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_render(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));
        if !included {
            return false;
        }
        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
