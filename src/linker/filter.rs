// src/linker/filter.rs

//! Decides which filesystem changes wake a trigger-gated process.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{ConductorError, Result};
use crate::fs::FileSystem;
use crate::process::FsTrigger;

/// Compiled filesystem filter for one process.
///
/// A changed path is included according to the first rule that applies:
///
/// 1. it is exactly one of the watched paths: include
/// 2. it is exactly one of the ignored paths: exclude
/// 3. its base name matches an ignore glob: exclude
/// 4. its base name matches a contain filter: include
/// 5. otherwise: exclude
///
/// Globs are case-sensitive and only understand `*`.
#[derive(Clone)]
pub struct WatchFilter {
    watch: BTreeSet<PathBuf>,
    ignore_paths: BTreeSet<PathBuf>,
    ignore_globs: GlobSet,
    contain: GlobSet,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("watch", &self.watch)
            .field("ignore_paths", &self.ignore_paths)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    /// Compile the filter for `process`, resolving paths through `fs`.
    pub fn compile(process: &str, trigger: &FsTrigger, fs: &dyn FileSystem) -> Result<Self> {
        let watch = trigger
            .watch
            .iter()
            .map(|p| fs.canonicalize(p).unwrap_or_else(|_| p.clone()))
            .collect();

        let ignore_paths = trigger
            .ignore
            .iter()
            .map(|p| fs.canonicalize(p).unwrap_or_else(|_| p.clone()))
            .collect();

        let mut ignore_globs = GlobSetBuilder::new();
        for path in trigger.ignore.iter() {
            // Only the last component can be a base-name pattern.
            if let Some(base) = path.file_name() {
                let pattern = base.to_string_lossy();
                ignore_globs.add(base_name_glob(process, &pattern)?);
            }
        }

        let mut contain = GlobSetBuilder::new();
        for pattern in trigger.contain_filters.iter() {
            if pattern.contains('/') || pattern.contains(std::path::MAIN_SEPARATOR) {
                return Err(ConductorError::InvalidFilterPattern {
                    process: process.to_string(),
                    pattern: pattern.clone(),
                    reason: "filters match base names and cannot contain a path separator"
                        .to_string(),
                });
            }
            contain.add(base_name_glob(process, pattern)?);
        }

        Ok(Self {
            watch,
            ignore_paths,
            ignore_globs: build_set(process, ignore_globs)?,
            contain: build_set(process, contain)?,
        })
    }

    /// The resolved paths to install OS watches on.
    pub fn watch_paths(&self) -> impl Iterator<Item = &Path> {
        self.watch.iter().map(PathBuf::as_path)
    }

    pub fn includes(&self, path: &Path) -> bool {
        if self.watch.contains(path) {
            return true;
        }
        if self.ignore_paths.contains(path) {
            return false;
        }
        let Some(base) = path.file_name() else {
            return false;
        };
        let base = Path::new(base);
        if self.ignore_globs.is_match(base) {
            return false;
        }
        self.contain.is_match(base)
    }
}

/// Build a glob where `*` is the only special character.
fn base_name_glob(process: &str, pattern: &str) -> Result<Glob> {
    let invalid = |reason: String| ConductorError::InvalidFilterPattern {
        process: process.to_string(),
        pattern: pattern.to_string(),
        reason,
    };

    if pattern.is_empty() {
        return Err(invalid("empty pattern".to_string()));
    }

    let escaped: Vec<String> = pattern.split('*').map(globset::escape).collect();
    Glob::new(&escaped.join("*")).map_err(|e| invalid(e.to_string()))
}

fn build_set(process: &str, builder: GlobSetBuilder) -> Result<GlobSet> {
    builder
        .build()
        .map_err(|e| ConductorError::InvalidFilterPattern {
            process: process.to_string(),
            pattern: String::new(),
            reason: e.to_string(),
        })
}
