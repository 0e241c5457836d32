//! Tracks the browsed directory, its back-history and the latest listing request.

use std::path::{Path, PathBuf};

/// Identifies one listing request. Larger ids are newer.
pub type RequestId = u64;

#[derive(Debug, Default)]
pub struct Navigator {
    current: Option<PathBuf>,
    history: Vec<PathBuf>,
    latest: RequestId,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Moves to `path`, remembering the previous directory if it differs.
    pub fn visit(&mut self, path: PathBuf) -> RequestId {
        if let Some(previous) = self.current.take() {
            if previous != path {
                self.history.push(previous);
            }
        }
        self.current = Some(path);
        self.next_request()
    }

    /// Returns to the most recently left directory.
    pub fn back(&mut self) -> Option<RequestId> {
        let previous = self.history.pop()?;
        self.current = Some(previous);
        Some(self.next_request())
    }

    /// Moves to the parent of the current directory.
    pub fn up(&mut self) -> Option<RequestId> {
        let parent = self.current.as_deref()?.parent()?.to_path_buf();
        Some(self.visit(parent))
    }

    /// Re-lists the current directory without touching the history.
    pub fn reload(&mut self) -> Option<RequestId> {
        self.current.as_ref()?;
        Some(self.next_request())
    }

    /// Whether a listing for `id` is still wanted.
    pub fn is_latest(&self, id: RequestId) -> bool {
        id == self.latest
    }

    fn next_request(&mut self) -> RequestId {
        self.latest += 1;
        self.latest
    }
}
