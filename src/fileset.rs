//! Include/exclude file sets.
//!
//! Plugins describe which files leave a part directory as a list of glob
//! patterns. A pattern prefixed with `-` excludes matching paths; an excluded
//! directory excludes everything below it. Patterns are matched against paths
//! relative to the directory being resolved, using `/` as separator.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A compiled set of include and exclude patterns.
#[derive(Debug, Clone)]
pub struct FileSet {
    patterns: Vec<String>,
    includes: GlobSet,
    excludes: GlobSet,
}

impl FileSet {
    /// Compile a pattern list. An empty list includes nothing.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut includes = GlobSetBuilder::new();
        let mut excludes = GlobSetBuilder::new();

        for pattern in &patterns {
            let (builder, raw) = match pattern.strip_prefix('-') {
                Some(rest) => (&mut excludes, rest),
                None => (&mut includes, pattern.as_str()),
            };
            let raw = raw.trim_start_matches("./").trim_end_matches('/');
            let glob = Glob::new(raw).map_err(|e| Error::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }

        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|e| Error::InvalidPattern {
                pattern: patterns.join(" "),
                message: e.to_string(),
            })
        };

        Ok(Self {
            includes: build(includes)?,
            excludes: build(excludes)?,
            patterns,
        })
    }

    /// The patterns this set was compiled from, in declaration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a relative path belongs to the set.
    pub fn matches(&self, relative: &Path) -> bool {
        if !self.includes.is_match(relative) {
            return false;
        }
        !relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.excludes.is_match(p))
    }

    /// Walk `root` and return the relative paths of all matching files, sorted.
    ///
    /// A missing root resolves to an empty set.
    pub fn resolve(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.map_err(|e| Error::Other {
                message: format!("Failed to walk '{}'", root.display()),
                source: Some(Box::new(e)),
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| Error::Other {
                    message: format!("'{}' escaped '{}'", entry.path().display(), root.display()),
                    source: Some(Box::new(e)),
                })?
                .to_path_buf();
            if self.matches(&relative) {
                files.push(relative);
            }
        }
        files.sort();
        Ok(files)
    }
}
