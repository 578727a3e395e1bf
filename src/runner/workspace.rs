use crate::error::Result;
use crate::runner::naming::extraction_dir_name;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The directory binwalk may create inside a working directory.
///
/// The directory is created by an external process, if at all; this guard
/// only owns its removal. [`ExtractionDir::release`] removes it and reports
/// failures; if the guard is dropped without being released (early return,
/// panic), removal is attempted on drop and failures are logged.
#[derive(Debug)]
pub struct ExtractionDir {
    path: PathBuf,
    released: bool,
}

/// File count and total size of an extraction, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub bytes: u64,
}

impl ExtractionDir {
    pub fn new(working_dir: &Path, artifact_name: &OsStr) -> Self {
        Self {
            path: working_dir.join(extraction_dir_name(artifact_name)),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether extraction happened, judged by the directory alone.
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    pub fn summarize(&self) -> ExtractionSummary {
        WalkDir::new(&self.path)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .fold(ExtractionSummary::default(), |mut summary, entry| {
                summary.files += 1;
                summary.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                summary
            })
    }

    /// Removes the directory and everything under it, if present.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_if_present(&self.path)?;
        Ok(())
    }
}

impl Drop for ExtractionDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = remove_if_present(&self.path) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove extraction directory"
            );
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        return Ok(());
    }

    debug!(path = %path.display(), "removing extraction directory");
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &ExtractionDir) {
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("0.zip"), b"PK\x03\x04").unwrap();
        fs::write(dir.path().join("nested").join("flag.txt"), b"flag{x}").unwrap();
    }

    #[test]
    fn test_path_follows_naming_convention() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
        assert_eq!(dir.path(), temp_dir.path().join("_cat.png.extracted"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_release_removes_tree() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
        populate(&dir);
        let path = dir.path().to_path_buf();

        assert!(dir.exists());
        dir.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_without_directory_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
        assert!(dir.release().is_ok());
    }

    #[test]
    fn test_drop_removes_tree() {
        let temp_dir = TempDir::new().unwrap();
        let path = {
            let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
            populate(&dir);
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_during_panic_removes_tree() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("_cat.png.extracted");
        let working_dir = temp_dir.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let dir = ExtractionDir::new(&working_dir, OsStr::new("cat.png"));
            populate(&dir);
            panic!("tool handling blew up");
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_summarize_counts_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
        populate(&dir);

        let summary = dir.summarize();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.bytes, 11);
    }

    #[test]
    fn test_other_files_in_working_dir_survive() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("binwalk.7z"), b"7z").unwrap();

        let dir = ExtractionDir::new(temp_dir.path(), OsStr::new("cat.png"));
        populate(&dir);
        dir.release().unwrap();

        assert!(temp_dir.path().join("binwalk.7z").exists());
    }
}
