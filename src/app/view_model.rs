//! Read-only projections of the selection prepared for the display.

use serde::Serialize;
use std::path::PathBuf;

use crate::core::{SelectionAction, SelectionSet};

/// Above this many selected files the view carries only the count.
pub const DETAIL_LIMIT: usize = 100;

/// The selected files panel.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SelectionView {
    /// Selected files in deterministic order; empty when `truncated`.
    pub paths: Vec<PathBuf>,
    pub file_count: usize,
    pub truncated: bool,
}

/// Payload of a selection change event.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SelectionUpdate {
    pub action: SelectionAction,
    /// Paths whose membership actually changed.
    pub affected: usize,
    pub selected_files: usize,
}

/// Builds the selected files panel from the current selection.
pub fn selection_view(selection: &SelectionSet) -> SelectionView {
    let files = selection.files();
    let file_count = files.len();
    if file_count > DETAIL_LIMIT {
        return SelectionView {
            paths: Vec::new(),
            file_count,
            truncated: true,
        };
    }
    SelectionView {
        paths: files,
        file_count,
        truncated: false,
    }
}
