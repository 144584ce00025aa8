//! Aligning profile paths with diff paths.
//!
//! Profiles name files by import path (`github.com/acme/app/internal/x.go`)
//! while diffs use repository-relative paths (`internal/x.go`).

use std::path::Path;

use covgate_core::Result;

/// Strips a qualifying module prefix from profile paths.
///
/// The normalized path is the text after the last occurrence of
/// `<prefix>/`; paths that do not contain it are returned unchanged.
///
/// # Examples
///
/// ```
/// use covgate_profile::PathNormalizer;
///
/// let norm = PathNormalizer::new(Some("github.com/acme/app"));
/// assert_eq!(norm.normalize("github.com/acme/app/internal/x.go"), "internal/x.go");
/// assert_eq!(norm.normalize("internal/x.go"), "internal/x.go");
///
/// let identity = PathNormalizer::default();
/// assert_eq!(identity.normalize("github.com/acme/app/x.go"), "github.com/acme/app/x.go");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathNormalizer {
    needle: Option<String>,
}

impl PathNormalizer {
    pub fn new(prefix: Option<&str>) -> Self {
        let needle = prefix
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}/"));
        Self { needle }
    }

    /// Use `configured` if set, otherwise the module path from
    /// `<root>/go.mod`, otherwise no stripping.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Io`](covgate_core::CovgateError::Io) if `go.mod` exists but cannot be read.
    pub fn resolve(configured: Option<&str>, root: &Path) -> Result<Self> {
        if let Some(prefix) = configured {
            return Ok(Self::new(Some(prefix)));
        }

        let go_mod = root.join("go.mod");
        if !go_mod.exists() {
            tracing::debug!("no go.mod at {}; profile paths used as-is", root.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&go_mod)?;
        let module = module_path(&content);
        match &module {
            Some(m) => tracing::debug!(module = %m, "read module prefix from go.mod"),
            None => tracing::warn!("go.mod has no module directive; profile paths used as-is"),
        }
        Ok(Self::new(module.as_deref()))
    }

    /// The prefix being stripped, without its trailing slash.
    pub fn prefix(&self) -> Option<&str> {
        self.needle.as_deref().map(|n| n.trim_end_matches('/'))
    }

    pub fn normalize<'a>(&self, path: &'a str) -> &'a str {
        match &self.needle {
            Some(needle) => path
                .rsplit_once(needle.as_str())
                .map_or(path, |(_, rest)| rest),
            None => path,
        }
    }
}

/// Read the `module` directive from go.mod content.
///
/// # Examples
///
/// ```
/// use covgate_profile::paths::module_path;
///
/// let go_mod = "module github.com/acme/app\n\ngo 1.22\n";
/// assert_eq!(module_path(go_mod).as_deref(), Some("github.com/acme/app"));
/// ```
pub fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}
