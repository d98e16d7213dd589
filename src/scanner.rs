use crate::config::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Recursively enumerates candidate source files under a root.
///
/// The selection rules are fixed for a whole run: a file is included iff
/// its extension is in the allow-list and its full path contains none of
/// the excluded substrings. Directories below the root whose relative
/// path contains the reserved output directory name are pruned so prior
/// artifacts are never re-scanned; the root itself is always entered,
/// whatever it happens to be called.
pub(crate) struct Scanner {
    allowed_extensions: Vec<String>,
    excluded_substrings: Vec<String>,
    reserved_dir_name: String,
}

impl Scanner {
    /// Creates a new scanner from the run settings.
    #[must_use]
    pub(crate) fn new(settings: &Settings) -> Self {
        Self {
            allowed_extensions: settings.allowed_extensions.clone(),
            excluded_substrings: settings.excluded_substrings.clone(),
            reserved_dir_name: settings.output_dir_name.clone(),
        }
    }

    /// Scans the root directory and returns all matching file paths.
    ///
    /// The scan is read-only. Filesystem errors on a subtree are logged
    /// and that subtree is skipped; the scan as a whole never fails.
    /// Results are sorted by path for reproducible runs.
    pub(crate) fn scan(&self, root: &Path) -> Vec<PathBuf> {
        debug!("Scanning {}", root.display());

        let mut files = Vec::new();
        let mut errors = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                // Prune generated output trees; case-sensitive substring
                // match on the path below the root, so a root that itself
                // contains the reserved name is still scanned.
                entry.depth() == 0
                    || !(entry.file_type().is_dir()
                        && self.contains_reserved_dir(entry.path(), root))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable subtree: {e}");
                    errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.matches(path) {
                trace!("Selected {}", path.display());
                files.push(path.to_path_buf());
            }
        }

        if errors > 0 {
            warn!("Encountered {errors} errors during scanning (non-fatal)");
        }

        files.sort();

        debug!("Scan complete: {} files selected", files.len());
        files
    }

    /// Returns true if the file passes both selection rules.
    fn matches(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        let dotted = format!(".{extension}");
        if !self.allowed_extensions.iter().any(|e| e == &dotted) {
            return false;
        }

        let path_str = path.to_string_lossy();
        !self
            .excluded_substrings
            .iter()
            .any(|needle| path_str.contains(needle.as_str()))
    }

    fn contains_reserved_dir(&self, path: &Path, root: &Path) -> bool {
        let below_root = path.strip_prefix(root).unwrap_or(path);
        below_root
            .to_string_lossy()
            .contains(&self.reserved_dir_name)
    }
}
