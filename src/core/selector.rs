//! Recursive selection: computes every path affected by toggling a directory.

use super::IgnoreRuleSet;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The outcome of one walk: every affected path, and which of them are files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    pub paths: HashSet<PathBuf>,
    pub files: HashSet<PathBuf>,
}

/// Collects `root` and every descendant that survives the ignore rules.
///
/// Children are tested by basename. A matching directory is pruned together
/// with its contents; a matching file is skipped. `root` itself is never
/// tested and is always part of the result. Entries that cannot be read are
/// skipped and the walk carries on with their siblings.
pub fn collect_subtree(root: &Path, rules: &IgnoreRuleSet) -> HashSet<PathBuf> {
    scan_subtree(root, rules).paths
}

/// Same walk as [`collect_subtree`], also recording which paths are regular files.
///
/// Symlinks are not followed during the walk, but a link that points at a file
/// counts as a file, as it does when the file is selected on its own.
pub fn scan_subtree(root: &Path, rules: &IgnoreRuleSet) -> Subtree {
    let mut subtree = Subtree::default();
    subtree.paths.insert(root.to_path_buf());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !rules.matches(&entry.file_name().to_string_lossy())
        });

    let mut skipped = 0usize;
    for entry in walker {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                let is_file = file_type.is_file()
                    || (file_type.is_symlink() && entry.path().is_file());
                let path = entry.into_path();
                if is_file {
                    subtree.files.insert(path.clone());
                }
                subtree.paths.insert(path);
            }
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping unreadable entry under {}: {}", root.display(), e);
            }
        }
    }

    tracing::debug!(
        "Collected {} paths ({} files) under {} ({} unreadable entries skipped)",
        subtree.paths.len(),
        subtree.files.len(),
        root.display(),
        skipped
    );
    subtree
}
