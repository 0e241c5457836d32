//! The read → normalize → order → serialize pipeline behind "generate".

use super::display_path::{DisplayPathResolver, DEFAULT_MAX_PARENT_HOPS};
use super::{CoreError, IgnoreRuleSet, OutputFormat};
use crate::utils::file_detection::language_tag;
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Upper bound for the per-run read pool.
pub const MAX_READ_THREADS: usize = 64;
/// Read pool size multiplier over the available hardware threads.
pub const READ_THREADS_PER_CORE: usize = 8;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern is valid"));

/// Everything one aggregation run needs. Built once per "generate" and never changed.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub ignore: IgnoreRuleSet,
    pub sources: Vec<PathBuf>,
    pub root: PathBuf,
    pub relative: bool,
    pub compress: bool,
    pub max_parent_hops: usize,
    pub read_workers: usize,
}

impl AggregationConfig {
    /// A config with relative paths on, compression off and default pool sizing.
    pub fn new(output: impl Into<PathBuf>, sources: Vec<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            format: OutputFormat::Markdown,
            ignore: IgnoreRuleSet::default(),
            sources,
            root: root.into(),
            relative: true,
            compress: false,
            max_parent_hops: DEFAULT_MAX_PARENT_HOPS,
            read_workers: default_read_workers(READ_THREADS_PER_CORE, MAX_READ_THREADS),
        }
    }
}

/// `min(max, per_core × hardware threads)`, at least 1.
pub fn default_read_workers(per_core: usize, max: usize) -> usize {
    (per_core * super::dispatcher::available_cores()).min(max).max(1)
}

/// One readable, non-ignored file of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub display_path: String,
    pub content: String,
    pub language: String,
}

/// Runs aggregations. Stateless.
pub struct Aggregator;

impl Aggregator {
    /// Reads every source, renders the document and writes it to `config.output`.
    ///
    /// Ignored and unreadable sources are left out. Only a failure to write the
    /// output ends the run with an error. The output directory must exist.
    pub fn run(config: &AggregationConfig) -> Result<PathBuf, CoreError> {
        Self::reject_self_reference(config)?;

        let records = Self::collect_records(config)?;
        let document = config.format.render(&records);

        fs::write(&config.output, document.as_bytes())
            .map_err(|e| CoreError::Io(e, config.output.clone()))?;

        tracing::info!(
            "Wrote {} files ({} bytes) to {}",
            records.len(),
            document.len(),
            config.output.display()
        );
        Ok(config.output.clone())
    }

    /// Reads, filters and orders the records of a run without writing anything.
    pub fn collect_records(config: &AggregationConfig) -> Result<Vec<FileRecord>, CoreError> {
        let sources: Vec<PathBuf> = config
            .sources
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let resolver =
            DisplayPathResolver::new(&config.root, config.relative, config.max_parent_hops, &sources);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.read_workers.max(1))
            .thread_name(|i| format!("read-worker-{i}"))
            .build()?;

        let mut keyed: Vec<(PathBuf, FileRecord)> = pool.install(|| {
            sources
                .par_iter()
                .filter_map(|path| {
                    Self::read_record(path, config, &resolver).map(|record| (path.clone(), record))
                })
                .collect()
        });

        keyed.sort_by_cached_key(|(path, record)| {
            (
                record.display_path.to_lowercase(),
                record.display_path.clone(),
                path.clone(),
            )
        });

        tracing::debug!(
            "Collected {} of {} sources",
            keyed.len(),
            config.sources.len()
        );
        Ok(keyed.into_iter().map(|(_, record)| record).collect())
    }

    fn read_record(
        path: &Path,
        config: &AggregationConfig,
        resolver: &DisplayPathResolver,
    ) -> Option<FileRecord> {
        let name = path.file_name()?.to_string_lossy();
        if config.ignore.matches(&name) {
            return None;
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Skipping unreadable file {}: {}", path.display(), e);
                return None;
            }
        };

        let mut content = String::from_utf8_lossy(&bytes).into_owned();
        if config.compress {
            content = compress_blank_lines(&content);
        }

        Some(FileRecord {
            display_path: resolver.resolve(path),
            content,
            language: language_tag(path),
        })
    }

    fn reject_self_reference(config: &AggregationConfig) -> Result<(), CoreError> {
        let output_canonical = fs::canonicalize(&config.output).ok();
        let clashes = config.sources.iter().any(|source| {
            source == &config.output
                || output_canonical
                    .as_ref()
                    .is_some_and(|out| fs::canonicalize(source).ok().as_ref() == Some(out))
        });

        if clashes {
            tracing::error!(
                "Refusing to write {}: it is one of the selected sources",
                config.output.display()
            );
            return Err(CoreError::OutputIsSource(config.output.clone()));
        }
        Ok(())
    }
}

/// Collapses every run of blank or whitespace-only lines into one line break.
pub fn compress_blank_lines(content: &str) -> String {
    BLANK_LINES.replace_all(content, "\n").into_owned()
}
