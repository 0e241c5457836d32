//! Computes the path string written into the output document for each file.

use std::path::{Component, Path, PathBuf};

/// Default for how many `..` segments a relative display path may contain
/// before the common-ancestor fallback kicks in.
pub const DEFAULT_MAX_PARENT_HOPS: usize = 2;

/// Resolves display paths for one aggregation run.
#[derive(Debug, Clone)]
pub struct DisplayPathResolver {
    root: PathBuf,
    relative: bool,
    max_parent_hops: usize,
    common_ancestor: Option<PathBuf>,
}

impl DisplayPathResolver {
    /// `sources` are all files of the run; their deepest common ancestor is the
    /// fallback base when a path relative to `root` climbs too far.
    pub fn new(root: &Path, relative: bool, max_parent_hops: usize, sources: &[PathBuf]) -> Self {
        Self {
            root: root.to_path_buf(),
            relative,
            max_parent_hops,
            common_ancestor: common_ancestor(sources),
        }
    }

    pub fn resolve(&self, path: &Path) -> String {
        if !self.relative {
            return base_name(path);
        }

        let Some(relative) = pathdiff::diff_paths(path, &self.root) else {
            return base_name(path);
        };

        if parent_hops(&relative) > self.max_parent_hops {
            if let Some(rebased) = self
                .common_ancestor
                .as_deref()
                .and_then(|ancestor| pathdiff::diff_paths(path, ancestor))
            {
                return join_slash(&rebased).unwrap_or_else(|| base_name(path));
            }
            return base_name(path);
        }

        join_slash(&relative).unwrap_or_else(|| base_name(path))
    }
}

/// The final path segment, or the whole path if it has none.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// The deepest directory containing the parent of every path.
pub fn common_ancestor(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut iter = paths.iter();
    let mut ancestor = iter.next()?.parent()?.to_path_buf();

    for path in iter {
        while !path.starts_with(&ancestor) {
            ancestor = ancestor.parent()?.to_path_buf();
        }
    }
    Some(ancestor)
}

fn parent_hops(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::ParentDir))
        .count()
}

/// Joins the components with `/`; `None` for an empty path.
fn join_slash(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::ParentDir => "..".to_string(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(root: &str, relative: bool, sources: &[&str]) -> DisplayPathResolver {
        let sources: Vec<PathBuf> = sources.iter().map(PathBuf::from).collect();
        DisplayPathResolver::new(Path::new(root), relative, DEFAULT_MAX_PARENT_HOPS, &sources)
    }

    #[test]
    fn test_relative_paths_use_forward_slashes() {
        let r = resolver("/ws", true, &["/ws/a.txt", "/ws/sub/b.txt"]);
        assert_eq!(r.resolve(Path::new("/ws/a.txt")), "a.txt");
        assert_eq!(r.resolve(Path::new("/ws/sub/b.txt")), "sub/b.txt");
    }

    #[test]
    fn test_base_name_when_not_relative() {
        let r = resolver("/ws", false, &["/ws/sub/b.txt"]);
        assert_eq!(r.resolve(Path::new("/ws/sub/b.txt")), "b.txt");
    }

    #[test]
    fn test_few_parent_hops_are_kept() {
        let r = resolver("/ws/app/src", true, &["/ws/lib/x.rs"]);
        assert_eq!(r.resolve(Path::new("/ws/lib/x.rs")), "../../lib/x.rs");
    }

    #[test]
    fn test_too_many_parent_hops_fall_back_to_common_ancestor() {
        let r = resolver(
            "/home/user/deep/nested/root",
            true,
            &["/opt/proj/a/x.rs", "/opt/proj/b/y.rs"],
        );
        assert_eq!(r.resolve(Path::new("/opt/proj/a/x.rs")), "a/x.rs");
        assert_eq!(r.resolve(Path::new("/opt/proj/b/y.rs")), "b/y.rs");
    }

    #[test]
    fn test_threshold_is_configurable() {
        let sources = vec![PathBuf::from("/ws/lib/x.rs")];
        let strict = DisplayPathResolver::new(Path::new("/ws/app"), true, 0, &sources);
        assert_eq!(strict.resolve(Path::new("/ws/lib/x.rs")), "x.rs");
    }

    #[test]
    fn test_path_equal_to_root_uses_base_name() {
        let r = resolver("/ws/file.txt", true, &["/ws/file.txt"]);
        assert_eq!(r.resolve(Path::new("/ws/file.txt")), "file.txt");
    }

    #[test]
    fn test_common_ancestor() {
        let paths = vec![
            PathBuf::from("/a/b/c/1.txt"),
            PathBuf::from("/a/b/d/2.txt"),
            PathBuf::from("/a/b/3.txt"),
        ];
        assert_eq!(common_ancestor(&paths), Some(PathBuf::from("/a/b")));
        assert_eq!(common_ancestor(&[]), None);
        assert_eq!(
            common_ancestor(&[PathBuf::from("/a/one.txt")]),
            Some(PathBuf::from("/a"))
        );
    }
}
