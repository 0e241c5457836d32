pub mod aggregator;
pub mod dispatcher;
pub mod display_path;
pub mod error;
pub mod ignore;
pub mod output_format;
pub mod scanner;
pub mod selection;
pub mod selector;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// The kind of a listed filesystem entry. Directories order before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Size in bytes; `None` for directories or when metadata is unavailable.
    pub size: Option<u64>,
    /// `None` when the modification time is unavailable.
    pub modified: Option<DateTime<Local>>,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

pub use aggregator::{AggregationConfig, Aggregator, FileRecord};
pub use dispatcher::{Dispatcher, TaskError};
pub use error::CoreError;
pub use ignore::IgnoreRuleSet;
pub use output_format::OutputFormat;
pub use scanner::DirectoryScanner;
pub use selection::{SelectionAction, SelectionChange, SelectionSet};
pub use selector::{collect_subtree, scan_subtree, Subtree};
