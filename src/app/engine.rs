//! The engine: owns the selection and wires the core components to one display.
//!
//! Every public method runs on the consumption point and never blocks on the
//! filesystem beyond a cheap check of the path it was given and, when
//! persistence is enabled, the settings write. Listings, recursive walks
//! and aggregation runs go to the dispatcher, and their results are applied
//! when the owner calls [`Engine::pump`] or awaits [`Engine::wait_idle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::events::EngineEvent;
use super::navigation::{Navigator, RequestId};
use super::proxy::EventProxy;
use super::view_model::{selection_view, SelectionUpdate, SelectionView};
use crate::config::{settings, AppConfig};
use crate::core::aggregator::default_read_workers;
use crate::core::display_path::common_ancestor;
use crate::core::{
    scan_subtree, AggregationConfig, Aggregator, CoreError, DirEntry, DirectoryScanner,
    Dispatcher, IgnoreRuleSet, OutputFormat, SelectionAction, SelectionChange, SelectionSet,
    TaskError,
};

/// Parameters of one "generate" action.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub output_dir: PathBuf,
    pub output_name: String,
    pub format: OutputFormat,
    pub relative: bool,
    pub compress: bool,
}

impl GenerateRequest {
    /// A request built from the persisted output settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.resolved_output_directory(),
            output_name: config.output_filename.clone(),
            format: config.output_format,
            relative: config.use_relative_paths,
            compress: config.compress_blank_lines,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

pub struct Engine<P: EventProxy> {
    config: AppConfig,
    proxy: P,
    ignore: Arc<IgnoreRuleSet>,
    selection: SelectionSet,
    navigator: Navigator,
    listing: Vec<DirEntry>,
    /// Where settings changes are saved; `None` keeps them in memory only.
    settings_dir: Option<PathBuf>,
    dispatcher: Dispatcher<Engine<P>>,
}

impl<P: EventProxy> Engine<P> {
    pub fn new(config: AppConfig, proxy: P) -> Result<Self, CoreError> {
        let dispatcher = Dispatcher::new(config.dispatcher_threads_per_core)?;
        let ignore = Arc::new(IgnoreRuleSet::new(&config.ignore_patterns));

        Ok(Self {
            config,
            proxy,
            ignore,
            selection: SelectionSet::new(),
            navigator: Navigator::new(),
            listing: Vec::new(),
            settings_dir: None,
            dispatcher,
        })
    }

    /// Saves every later settings change (rules, format, last directory) to `dir`.
    pub fn with_settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Writes the current settings if persistence is enabled. Failures are logged.
    pub fn save_config(&self) -> bool {
        let Some(dir) = self.settings_dir.as_deref() else {
            return false;
        };
        match settings::save_config(&self.config, Some(dir)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save settings: {:#}", e);
                false
            }
        }
    }

    // --- Ignore rules -------------------------------------------------------

    /// Replaces the ignore rules. Work already submitted keeps its snapshot.
    pub fn set_ignore_text(&mut self, text: &str) {
        let rules = IgnoreRuleSet::parse(text);
        self.config.ignore_patterns = rules.patterns().to_vec();
        tracing::info!("Ignore rules set to {:?}", rules.patterns());
        self.ignore = Arc::new(rules);
        self.save_config();
    }

    pub fn ignore_rules(&self) -> Arc<IgnoreRuleSet> {
        Arc::clone(&self.ignore)
    }

    /// Switches the output format, swapping the configured filename's extension.
    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.config.output_format = format;
        self.config.output_filename = format.with_extension(&self.config.output_filename);
        self.save_config();
    }

    // --- Navigation ---------------------------------------------------------

    /// Lists `path`. The previous directory goes onto the back-history.
    pub fn navigate(&mut self, path: impl Into<PathBuf>) -> Result<(), CoreError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(CoreError::NotADirectory(path));
        }
        let id = self.navigator.visit(path.clone());
        self.remember_directory(&path);
        self.request_listing(path, id);
        Ok(())
    }

    pub fn go_back(&mut self) -> bool {
        let id = self.navigator.back();
        self.list_current(id)
    }

    pub fn go_up(&mut self) -> bool {
        let id = self.navigator.up();
        self.list_current(id)
    }

    pub fn refresh(&mut self) -> bool {
        let id = self.navigator.reload();
        self.list_current(id)
    }

    pub fn current_directory(&self) -> Option<&Path> {
        self.navigator.current()
    }

    /// The most recently delivered listing.
    pub fn listing(&self) -> &[DirEntry] {
        &self.listing
    }

    fn list_current(&mut self, id: Option<RequestId>) -> bool {
        let (Some(id), Some(path)) = (id, self.navigator.current().map(Path::to_path_buf)) else {
            return false;
        };
        self.remember_directory(&path);
        self.request_listing(path, id);
        true
    }

    fn remember_directory(&mut self, path: &Path) {
        if self.config.last_directory.as_deref() != Some(path) {
            self.config.last_directory = Some(path.to_path_buf());
            self.save_config();
        }
    }

    fn request_listing(&mut self, path: PathBuf, id: RequestId) {
        let target = path.clone();
        self.dispatcher.submit(
            "directory listing",
            move || Ok(DirectoryScanner::list(&target)),
            move |engine: &mut Self, result| match result {
                Ok(entries) if engine.navigator.is_latest(id) => {
                    engine.listing = entries.clone();
                    engine
                        .proxy
                        .send_event(EngineEvent::DirectoryListed { path, entries });
                }
                Ok(_) => {
                    tracing::debug!("Discarding stale listing of {}", path.display());
                }
                Err(e) => engine.report_failure(e),
            },
        );
    }

    // --- Selection ----------------------------------------------------------

    /// Selects `path` if absent, deselects it if present.
    ///
    /// With `recursive` set, a directory's whole subtree under the current
    /// ignore rules is computed on the pool and applied on completion.
    pub fn toggle(&mut self, path: &Path, recursive: bool) {
        let action = if self.selection.contains(path) {
            SelectionAction::Deselect
        } else {
            SelectionAction::Select
        };
        self.change(path, action, recursive);
    }

    /// Deselects `path`, recursing for directories.
    pub fn remove(&mut self, path: &Path) {
        self.change(path, SelectionAction::Deselect, true);
    }

    pub fn clear_all(&mut self) {
        let change = self.selection.clear();
        tracing::info!("Cleared selection of {} paths", change.paths.len());
        self.proxy
            .send_event(EngineEvent::SelectionChanged(SelectionUpdate {
                action: SelectionAction::Deselect,
                affected: change.paths.len(),
                selected_files: 0,
            }));
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.selection.contains(path)
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selection.snapshot()
    }

    pub fn selected_file_count(&self) -> usize {
        self.selection.file_count()
    }

    pub fn selection_view(&self) -> SelectionView {
        selection_view(&self.selection)
    }

    fn change(&mut self, path: &Path, action: SelectionAction, recursive: bool) {
        if !(recursive && path.is_dir()) {
            let change = match action {
                SelectionAction::Select => SelectionChange::select([path.to_path_buf()]),
                SelectionAction::Deselect => SelectionChange::deselect([path.to_path_buf()]),
            };
            self.apply_change(change);
            return;
        }

        let rules = Arc::clone(&self.ignore);
        let root = path.to_path_buf();
        self.dispatcher.submit(
            "recursive selection",
            move || Ok(scan_subtree(&root, &rules)),
            move |engine: &mut Self, result| match result {
                Ok(subtree) => engine.apply_change(SelectionChange::classified(
                    action,
                    subtree.paths,
                    subtree.files,
                )),
                Err(e) => engine.report_failure(e),
            },
        );
    }

    fn apply_change(&mut self, change: SelectionChange) {
        let affected = self.selection.apply(&change);
        tracing::debug!("{:?} changed {} paths", change.action, affected);
        self.proxy
            .send_event(EngineEvent::SelectionChanged(SelectionUpdate {
                action: change.action,
                affected,
                selected_files: self.selection.file_count(),
            }));
    }

    // --- Generation ---------------------------------------------------------

    /// Starts an aggregation run over the currently selected files.
    ///
    /// Returns the path that will be written, or `None` if nothing is selected.
    /// The outcome arrives as [`EngineEvent::GenerationFinished`].
    pub fn generate(&mut self, request: GenerateRequest) -> Option<PathBuf> {
        let sources = self.selection.files();
        if sources.is_empty() {
            self.proxy
                .send_event(EngineEvent::Notice("No files selected.".to_string()));
            return None;
        }

        let output = request.output_path();
        let root = self
            .navigator
            .current()
            .map(Path::to_path_buf)
            .or_else(|| common_ancestor(&sources))
            .unwrap_or_default();

        let run = AggregationConfig {
            output: output.clone(),
            format: request.format,
            ignore: (*self.ignore).clone(),
            sources,
            root,
            relative: request.relative,
            compress: request.compress,
            max_parent_hops: self.config.max_parent_hops,
            read_workers: default_read_workers(
                self.config.read_threads_per_core,
                self.config.max_read_threads,
            ),
        };
        tracing::info!(
            "Generating {} from {} files",
            output.display(),
            run.sources.len()
        );

        self.dispatcher.submit(
            "generation",
            move || Ok(Aggregator::run(&run)?),
            |engine: &mut Self, result| {
                let outcome = result.map_err(|e| {
                    tracing::error!("{}", e);
                    e.to_string()
                });
                engine
                    .proxy
                    .send_event(EngineEvent::GenerationFinished(outcome));
            },
        );
        Some(output)
    }

    // --- Consumption point --------------------------------------------------

    /// Applies every finished result without waiting. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(done) = self.dispatcher.try_take() {
            done.deliver(self);
            delivered += 1;
        }
        delivered
    }

    /// Applies results until no submitted work is left.
    pub async fn wait_idle(&mut self) {
        while let Some(done) = self.dispatcher.next().await {
            done.deliver(self);
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.dispatcher.pending()
    }

    fn report_failure(&mut self, error: TaskError) {
        self.proxy
            .send_event(EngineEvent::TaskFailed(error.to_string()));
    }
}
