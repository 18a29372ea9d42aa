//! core/library.rs
//!
//! File discovery under one root.
//! - A root that is a file is taken as-is if its extension matches
//! - A directory is walked recursively
//! - Unreadable entries are reported and skipped, never fatal

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::error::DiscoveryError;

/// Which files count as audio files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    pub follow_symlinks: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".to_string()],
            follow_symlinks: false,
        }
    }
}

impl Filter {
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Every matching file under `root`, in walk order.
pub fn scan_root(
    root: &Path,
    filter: &Filter,
    errors: &mut Vec<DiscoveryError>,
) -> Vec<PathBuf> {
    let mut out = Vec::new();

    for entry in WalkDir::new(root).follow_links(filter.follow_symlinks) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                errors.push(DiscoveryError::Walk { path, source: e });
                continue;
            }
        };

        if entry.file_type().is_file() && filter.matches(entry.path()) {
            out.push(entry.into_path());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_is_case_insensitive() {
        let filter = Filter::default();
        assert!(filter.matches(Path::new("/a/b.mp3")));
        assert!(filter.matches(Path::new("/a/B.MP3")));
        assert!(!filter.matches(Path::new("/a/b.flac")));
        assert!(!filter.matches(Path::new("/a/mp3")));
    }

    #[test]
    fn walks_directories_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("Bach").join("Cantatas");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("top.mp3"), b"x").expect("write");
        std::fs::write(nested.join("bwv147.MP3"), b"x").expect("write");
        std::fs::write(nested.join("cover.jpg"), b"x").expect("write");

        let mut errors = Vec::new();
        let mut found = scan_root(dir.path(), &Filter::default(), &mut errors);
        found.sort();
        assert!(errors.is_empty());
        assert_eq!(
            found,
            vec![nested.join("bwv147.MP3"), dir.path().join("top.mp3")]
        );
    }

    #[test]
    fn missing_root_is_reported_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut errors = Vec::new();
        let found = scan_root(&dir.path().join("gone"), &Filter::default(), &mut errors);
        assert!(found.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
