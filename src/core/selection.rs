//! The selection state: which absolute paths the user has chosen.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Whether a change adds paths to, or removes them from, the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionAction {
    Select,
    Deselect,
}

/// A computed set of paths and what to do with them.
///
/// Workers produce these; only the owner of the [`SelectionSet`] applies them.
/// `files` marks the members of `paths` that were regular files when the
/// change was computed, so the owner never has to stat them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub action: SelectionAction,
    pub paths: HashSet<PathBuf>,
    pub files: HashSet<PathBuf>,
}

impl SelectionChange {
    /// Selects `paths`, checking each one for being a regular file.
    pub fn select(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let paths: HashSet<PathBuf> = paths.into_iter().collect();
        let files = paths.iter().filter(|p| p.is_file()).cloned().collect();
        Self {
            action: SelectionAction::Select,
            paths,
            files,
        }
    }

    pub fn deselect(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            action: SelectionAction::Deselect,
            paths: paths.into_iter().collect(),
            files: HashSet::new(),
        }
    }

    /// A change whose file kinds are already known, e.g. from a directory walk.
    pub fn classified(action: SelectionAction, paths: HashSet<PathBuf>, files: HashSet<PathBuf>) -> Self {
        Self {
            action,
            paths,
            files,
        }
    }
}

/// The set of selected absolute paths.
///
/// Membership does not depend on which part of the tree is currently listed:
/// a file may be selected while its parent directory was never displayed.
/// Enumeration is always in a deterministic order (see [`SelectionSet::snapshot`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: HashSet<PathBuf>,
    /// Selected paths that were regular files when they were selected.
    files: HashSet<PathBuf>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Applies a change and returns how many paths actually changed membership.
    ///
    /// Selecting present paths or deselecting absent ones is a no-op.
    pub fn apply(&mut self, change: &SelectionChange) -> usize {
        match change.action {
            SelectionAction::Select => {
                let added = change
                    .paths
                    .iter()
                    .filter(|path| self.paths.insert((*path).clone()))
                    .count();
                self.files.extend(
                    change
                        .files
                        .iter()
                        .filter(|path| change.paths.contains(*path))
                        .cloned(),
                );
                added
            }
            SelectionAction::Deselect => change
                .paths
                .iter()
                .filter(|path| {
                    self.files.remove(path.as_path());
                    self.paths.remove(path.as_path())
                })
                .count(),
        }
    }

    /// Empties the selection and returns the change that describes it.
    pub fn clear(&mut self) -> SelectionChange {
        self.files.clear();
        SelectionChange::deselect(self.paths.drain())
    }

    /// All selected paths, ordered case-insensitively by full path.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.paths.iter().cloned().collect();
        sort_paths(&mut paths);
        paths
    }

    /// The selected paths that were regular files when selected, in snapshot order.
    ///
    /// Directories are part of the selection (a recursive toggle adds them) but
    /// carry no content of their own. A file deleted since is still listed;
    /// the aggregator drops what it cannot read.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.files.iter().cloned().collect();
        sort_paths(&mut files);
        files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Sorts paths by lowercased full path, ties broken by the exact path.
pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| (p.to_string_lossy().to_lowercase(), p.clone()));
}
