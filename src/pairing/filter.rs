//! Paths the engine must never pair.
//!
//! Collaborators that write back into the filesystem (backups, a local
//! destination store) would otherwise feed their own output into the
//! detector and pair it again.

use std::path::{Path, PathBuf};

use crate::utils::resolve_path;

/// One excluded region of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Everything beneath this directory.
    Under(PathBuf),
    /// Everything inside any directory with this name below the root.
    DirNamed(String),
}

/// Exclusions resolved against a watch root.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    root: PathBuf,
    prefixes: Vec<PathBuf>,
    dir_names: Vec<String>,
}

impl PathFilter {
    pub fn new(root: &Path) -> Self {
        Self {
            root: resolve_path(root),
            prefixes: Vec::new(),
            dir_names: Vec::new(),
        }
    }

    pub fn with(mut self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        for exclusion in exclusions {
            self.add(exclusion);
        }
        self
    }

    pub fn add(&mut self, exclusion: Exclusion) {
        match exclusion {
            Exclusion::Under(path) => {
                let resolved = resolve_path(&path);
                if !self.prefixes.contains(&resolved) {
                    self.prefixes.push(resolved);
                }
            }
            Exclusion::DirNamed(name) => {
                if !name.is_empty() && !self.dir_names.contains(&name) {
                    self.dir_names.push(name);
                }
            }
        }
    }

    /// Whether a file at `path` must be ignored.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            return true;
        }
        if self.dir_names.is_empty() {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .any(|component| {
                let name = component.as_os_str().to_string_lossy();
                self.dir_names.iter().any(|excluded| *excluded == name)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.dir_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_excludes_prefix_even_before_it_exists() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let filter = PathFilter::new(&root).with([Exclusion::Under(dir.path().join("store"))]);

        assert!(filter.is_excluded(&root.join("store/Acme/PDF/job17.pdf")));
        assert!(!filter.is_excluded(&root.join("storefront/job17.pdf")));
        assert!(!filter.is_excluded(&root.join("job17.pdf")));
    }

    #[test]
    fn test_dir_name_only_matches_below_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap().join("backups");
        let filter = PathFilter::new(&root).with([Exclusion::DirNamed("backups".to_string())]);

        assert!(!filter.is_excluded(&root.join("job17.dwg")));
        assert!(filter.is_excluded(&root.join("a/backups/job17_20240101_120000.dwg")));
        assert!(!filter.is_excluded(&root.join("a/backups.dwg")));
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filter = PathFilter::new(Path::new("/w"));
        assert!(filter.is_empty());
        assert!(!filter.is_excluded(Path::new("/w/backups/a.pdf")));
    }
}
