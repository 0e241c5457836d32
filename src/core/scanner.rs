//! Single-level directory listing.

use super::{DirEntry, EntryKind};
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;

/// Lists the direct children of one directory.
///
/// This struct is stateless; the listing is recomputed on every call.
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Lists the direct children of `directory`, directories first, then by
    /// case-insensitive name.
    ///
    /// Hidden entries (leading `.`) are always left out; ignore rules do not
    /// apply here. If the directory cannot be opened the listing is empty.
    /// Metadata that cannot be read is reported as `None` on the entry.
    pub fn list(directory: &Path) -> Vec<DirEntry> {
        let read_dir = match fs::read_dir(directory) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", directory.display(), e);
                return Vec::new();
            }
        };

        let mut entries: Vec<DirEntry> = read_dir
            .filter_map(|entry| match entry {
                Ok(entry) => Self::to_dir_entry(&entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry in {}: {}", directory.display(), e);
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    fn to_dir_entry(entry: &fs::DirEntry) -> Option<DirEntry> {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            return None;
        }

        let path = entry.path();
        // Follows symlinks, so a link to a directory lists as a directory.
        let metadata = fs::metadata(&path).ok();
        let is_dir = match &metadata {
            Some(md) => md.is_dir(),
            None => entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
        };

        let kind = if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let size = match kind {
            EntryKind::File => metadata.as_ref().map(|md| md.len()),
            EntryKind::Directory => None,
        };
        let modified = metadata
            .as_ref()
            .and_then(|md| md.modified().ok())
            .map(DateTime::<Local>::from);

        Some(DirEntry {
            name,
            path,
            kind,
            size,
            modified,
        })
    }
}
