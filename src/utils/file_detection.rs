use std::path::Path;

/// Fallback tag for files without an extension.
const DEFAULT_LANGUAGE: &str = "txt";

/// The language tag used for a file's fenced code block: its extension, or `txt`.
///
/// Dotfiles such as `.bashrc` have no extension and get the fallback tag.
pub fn language_tag(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
