//! File and argument conventions shared with binwalk, 7z and the download endpoint.

use crate::error::{AnalyzerError, Result};
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Archive written into the working directory when extraction succeeds.
pub const ARCHIVE_FILE_NAME: &str = "binwalk.7z";

/// Directory binwalk creates next to its cwd when it carves something out.
///
/// Artifact names are kept as raw OS strings: a non-UTF-8 name must reach
/// binwalk and this directory name byte for byte.
pub fn extraction_dir_name(artifact_name: &OsStr) -> OsString {
    let mut name = OsString::from("_");
    name.push(artifact_name);
    name.push(".extracted");
    name
}

/// `binwalk -e ../<artifact> --run-as=root`, run from the working directory.
pub fn extractor_args(artifact_name: &OsStr) -> Vec<OsString> {
    let mut target = OsString::from("../");
    target.push(artifact_name);
    vec![OsString::from("-e"), target, OsString::from("--run-as=root")]
}

/// `7z a ../binwalk.7z *`, run from inside the extraction directory.
pub fn archiver_args() -> Vec<OsString> {
    vec![
        OsString::from("a"),
        OsString::from(format!("../{}", ARCHIVE_FILE_NAME)),
        OsString::from("*"),
    ]
}

pub fn artifact_file_name(artifact: &Path) -> Result<OsString> {
    artifact
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| AnalyzerError::InvalidArtifact {
            path: artifact.display().to_string(),
        })
}

/// Identifier the download endpoint uses for a job: its directory name.
pub fn working_dir_id(working_dir: &Path) -> String {
    working_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
