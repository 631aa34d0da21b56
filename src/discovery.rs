//! Route file enumeration.
//!
//! # Responsibilities
//! - Build the file pattern from the configured extensions
//! - List candidate files under the route directory as relative,
//!   `/`-separated paths in a deterministic order
//!
//! Classification happens later; a lister only filters by pattern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::DiscoveryError;

/// Glob patterns a route file must match (any of them).
#[derive(Debug, Clone)]
pub struct FilePattern {
    patterns: Vec<glob::Pattern>,
}

impl FilePattern {
    /// `**/*.<ext>` for every extension.
    pub fn for_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self, DiscoveryError> {
        let patterns = extensions
            .iter()
            .map(|ext| {
                let pattern = format!("**/*.{}", ext.as_ref());
                glob::Pattern::new(&pattern).map_err(|source| DiscoveryError::Pattern { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether a relative, `/`-separated path matches.
    pub fn matches(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(relative_path))
    }

    pub fn as_strs(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.as_str()).collect()
    }
}

/// Enumerates candidate route files.
#[async_trait]
pub trait RouteLister: Send + Sync {
    /// Relative paths of every file under `base_dir` matching `pattern`,
    /// sorted.
    async fn list(&self, pattern: &FilePattern, base_dir: &Path) -> Result<Vec<String>, DiscoveryError>;
}

/// Lists files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirLister;

impl WalkDirLister {
    pub fn new() -> Self {
        Self
    }

    fn walk(pattern: &FilePattern, base_dir: &Path) -> Result<Vec<String>, DiscoveryError> {
        if !base_dir.is_dir() {
            return Err(DiscoveryError::MissingDirectory(base_dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(base_dir).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(base_dir) else {
                continue;
            };
            let relative = to_slash_path(relative);
            if pattern.matches(&relative) {
                paths.push(relative);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl RouteLister for WalkDirLister {
    async fn list(&self, pattern: &FilePattern, base_dir: &Path) -> Result<Vec<String>, DiscoveryError> {
        let pattern = pattern.clone();
        let base_dir = base_dir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::walk(&pattern, &base_dir))
            .await
            .map_err(|e| DiscoveryError::Task(e.to_string()))?
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns a fixed set of paths, filtered by the pattern.
#[derive(Debug, Clone, Default)]
pub struct StaticLister {
    paths: Vec<String>,
}

impl StaticLister {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RouteLister for StaticLister {
    async fn list(&self, pattern: &FilePattern, _base_dir: &Path) -> Result<Vec<String>, DiscoveryError> {
        let mut paths: Vec<String> = self.paths.iter().filter(|p| pattern.matches(p)).cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

/// Resolve `dir` against `cwd` unless it is already absolute.
pub fn absolutize(dir: &Path, cwd: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    }
}
