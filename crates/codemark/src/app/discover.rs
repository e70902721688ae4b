//! Locating files that match the accepted extension set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::warn;

use crate::domain::model::{FileRecord, IgnoreSet};
use crate::infra::config::Config;

/// Walks root paths and collects files matching the accepted extensions.
///
/// The walk is serial and sorted by file name so that discovery order, and
/// therefore the output document, is reproducible across runs.
#[derive(Debug)]
pub struct Discovery {
    ignore: IgnoreSet,
    excludes: Option<GlobSet>,
    extensions: Vec<String>,
}

impl Discovery {
    /// Build a discovery pass from layered configuration and the resolved
    /// extension set.
    pub fn new(config: &Config, extensions: Vec<String>) -> Result<Self> {
        Ok(Self {
            ignore: IgnoreSet::new(&config.ignore.dirs),
            excludes: build_exclude_matcher(&config.ignore.globs)?,
            extensions,
        })
    }

    /// The directory-name ignore set shared with the tree renderer.
    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    /// Collect matching files beneath every root, in root order.
    ///
    /// Roots must already be known to exist. A root that is neither a
    /// directory nor a matching file is reported and skipped; a directory
    /// yielding no matches is reported. Neither condition is fatal.
    pub fn collect(&self, roots: &[PathBuf]) -> Vec<FileRecord> {
        let mut records = Vec::new();
        for root in roots {
            if root.is_dir() {
                let found = self.walk_directory(root);
                if found.is_empty() {
                    warn!(
                        root = %root.display(),
                        extensions = ?self.extensions,
                        "no files with accepted extensions found"
                    );
                }
                records.extend(found);
            } else if root.is_file() && self.matches_extension(root) {
                records.push(FileRecord::new(root.clone()));
            } else {
                warn!(
                    path = %root.display(),
                    "neither a directory nor a supported file, skipping"
                );
            }
        }
        records
    }

    fn walk_directory(&self, root: &Path) -> Vec<FileRecord> {
        let ignore = self.ignore.clone();
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && ignore.matches(&entry.file_name().to_string_lossy()))
        });

        let mut records = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if !self.matches_extension(path) {
                continue;
            }
            if let Some(excludes) = &self.excludes {
                let rel = path.strip_prefix(root).unwrap_or(path);
                if excludes.is_match(rel) {
                    continue;
                }
            }
            records.push(FileRecord::new(path.to_path_buf()));
        }
        records
    }

    /// Suffix match against the accepted extensions: case-sensitive, leading
    /// dot included.
    fn matches_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|name| name.to_string_lossy()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }
}

fn build_exclude_matcher(globs: &[String]) -> Result<Option<GlobSet>> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let glob = Glob::new(pattern).context("invalid ignore glob")?;
        builder.add(glob);
    }
    let set = builder.build().context("failed to build ignore globs")?;
    Ok(Some(set))
}
