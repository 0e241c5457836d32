pub mod settings;

use crate::core::aggregator::{MAX_READ_THREADS, READ_THREADS_PER_CORE};
use crate::core::dispatcher::DEFAULT_THREADS_PER_CORE;
use crate::core::display_path::DEFAULT_MAX_PARENT_HOPS;
use crate::core::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ignore rules a fresh installation starts with.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "*.pyc",
    "*.png",
    "*.jpg",
    "*.exe",
    ".vscode",
];

/// Persistent settings. The selection itself is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ignore_patterns: Vec<String>,
    pub last_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub output_filename: String,
    pub output_format: OutputFormat,
    pub use_relative_paths: bool,
    pub compress_blank_lines: bool,
    /// How many `..` segments a relative display path may have before it is
    /// rebased on the common ancestor of the selected files.
    pub max_parent_hops: usize,
    pub dispatcher_threads_per_core: usize,
    pub read_threads_per_core: usize,
    pub max_read_threads: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    /// The ignore rules as `;`-separated text, the form the rule editor shows.
    pub fn ignore_text(&self) -> String {
        self.ignore_patterns.join(";")
    }

    /// Where generated documents go when the request names no directory.
    pub fn resolved_output_directory(&self) -> PathBuf {
        self.output_directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| Path::new(".").to_path_buf())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            last_directory: None,
            output_directory: dirs::document_dir(),
            output_filename: "prompt_context.md".to_string(),
            output_format: OutputFormat::Markdown,
            use_relative_paths: true,
            compress_blank_lines: false,
            max_parent_hops: DEFAULT_MAX_PARENT_HOPS,
            dispatcher_threads_per_core: DEFAULT_THREADS_PER_CORE,
            read_threads_per_core: READ_THREADS_PER_CORE,
            max_read_threads: MAX_READ_THREADS,
        }
    }
}
