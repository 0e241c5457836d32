//! Defines the events the engine sends to its display collaborator.

use std::path::PathBuf;

use super::view_model::SelectionUpdate;
use crate::core::DirEntry;

/// Events sent from the engine to the display.
#[derive(Debug)]
pub enum EngineEvent {
    /// A listing that answers the most recent navigation request.
    DirectoryListed { path: PathBuf, entries: Vec<DirEntry> },
    /// A toggle, removal or clear was applied to the selection.
    SelectionChanged(SelectionUpdate),
    /// An aggregation run ended, with the written path or a message.
    GenerationFinished(Result<PathBuf, String>),
    /// Dispatched work failed; nothing was applied.
    TaskFailed(String),
    /// An informational message, e.g. a refused request.
    Notice(String),
}
