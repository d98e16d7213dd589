use std::path::{Path, PathBuf};

/// Unit of work for one matched source file.
///
/// Created per file during a run and consumed once; never persisted.
/// The output directory is always a subdirectory of the source file's own
/// directory, named by configuration.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Path to the source file
    pub source_path: PathBuf,

    /// File extension with leading dot (e.g. ".py")
    pub extension: String,

    /// Directory receiving generated artifacts for this file
    pub output_dir: PathBuf,

    /// Source file name without its extension
    pub stem: String,
}

impl FileTask {
    /// Builds a task for a source file.
    ///
    /// Returns `None` when the path has no parent directory, no file stem,
    /// or no extension; such paths never come out of the scanner, but a
    /// malformed one must not abort a run.
    #[must_use]
    pub fn for_path(path: &Path, output_dir_name: &str) -> Option<Self> {
        let parent = path.parent()?;
        let stem = path.file_stem()?.to_str()?.to_string();
        let extension = path.extension()?.to_str()?;

        Some(Self {
            source_path: path.to_path_buf(),
            extension: format!(".{extension}"),
            output_dir: parent.join(output_dir_name),
            stem,
        })
    }

    /// Resolves the full output path for one artifact file name.
    ///
    /// The configured file name is appended directly to the source stem,
    /// so `main` + `_analysis.md` lands at `<output_dir>/main_analysis.md`.
    #[must_use]
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.stem, file_name))
    }

    /// Returns the source file name for progress reporting.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map_or_else(|| self.source_path.display().to_string(), |n| {
                n.to_string_lossy().to_string()
            })
    }
}
