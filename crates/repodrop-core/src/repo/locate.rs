//! Finding the repository root inside an extracted tree.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Name of the directory that marks a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// Deepest directory (relative to the extraction root) considered as a root.
pub const MAX_SEARCH_DEPTH: usize = 2;

/// The directory judged to be the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocation {
    /// Absolute path of the repository directory.
    pub path: PathBuf,
    /// Path relative to the extraction root; empty when the root itself matched.
    pub relative: PathBuf,
    /// Separator count of `relative` (0 for the root).
    pub depth: usize,
}

impl RepositoryLocation {
    /// The `.git` directory of the repository.
    pub fn git_dir(&self) -> PathBuf {
        self.path.join(REPOSITORY_MARKER)
    }

    pub fn config_path(&self) -> PathBuf {
        self.git_dir().join("config")
    }
}

fn has_marker(dir: &Path) -> bool {
    fs::symlink_metadata(dir.join(REPOSITORY_MARKER))
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Locate the shallowest directory containing a `.git` directory.
///
/// The root is checked first, then every directory at depth 1, then depth 2,
/// each level in file-name order. Links are never followed and nothing under
/// a `.git` directory is visited.
pub fn locate_repository(root: &Path) -> Option<RepositoryLocation> {
    if has_marker(root) {
        return Some(RepositoryLocation {
            path: root.to_path_buf(),
            relative: PathBuf::new(),
            depth: 0,
        });
    }

    for depth in 1..=MAX_SEARCH_DEPTH {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != REPOSITORY_MARKER)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir());

        for entry in walker {
            if has_marker(entry.path()) {
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                return Some(RepositoryLocation {
                    path: entry.into_path(),
                    relative,
                    depth,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_marker_wins() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::create_dir_all(tmp.path().join("nested/.git")).unwrap();

        let found = locate_repository(tmp.path()).unwrap();
        assert_eq!(found.depth, 0);
        assert_eq!(found.path, tmp.path());
    }

    #[test]
    fn test_finds_repo_one_level_down() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("project/.git")).unwrap();

        let found = locate_repository(tmp.path()).unwrap();
        assert_eq!(found.relative, PathBuf::from("project"));
        assert_eq!(found.depth, 1);
        assert_eq!(found.config_path(), tmp.path().join("project/.git/config"));
    }

    #[test]
    fn test_shallowest_match_wins_over_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/deep/.git")).unwrap();
        fs::create_dir_all(tmp.path().join("z/.git")).unwrap();

        let found = locate_repository(tmp.path()).unwrap();
        assert_eq!(found.relative, PathBuf::from("z"));
    }

    #[test]
    fn test_depth_two_is_searched() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/.git")).unwrap();

        let found = locate_repository(tmp.path()).unwrap();
        assert_eq!(found.depth, 2);
    }

    #[test]
    fn test_never_descends_past_depth_two() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/c/.git")).unwrap();

        assert!(locate_repository(tmp.path()).is_none());
    }

    #[test]
    fn test_marker_file_is_not_a_repository() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a/.git"), "gitdir: /elsewhere").unwrap();

        assert!(locate_repository(tmp.path()).is_none());
    }
}
