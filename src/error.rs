use crate::ui::progress::format_duration;
use std::time::Duration;
use thiserror::Error;

/// Source tag prefixed to the extraction tool's standard error.
pub const EXTRACTOR_TAG: &str = "Binwalk";

/// Source tag prefixed to the archiving tool's standard error.
pub const ARCHIVER_TAG: &str = "7z compression";

/// Reported when archiving exits non-zero without writing to standard error.
pub const ARCHIVER_SILENT_FAILURE: &str = "7z compression failed with no error output";

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The extractor complained and left no extraction directory behind.
    #[error("{}: {}", EXTRACTOR_TAG, .stderr)]
    ExtractionTool { stderr: String },

    /// Extraction happened but the archiver exited non-zero.
    #[error("{}", archiving_message(.stderr))]
    ArchivingTool { stderr: Option<String> },

    #[error("Command '{}' timed out after {} seconds", .program, .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact path has no file name: {path}")]
    InvalidArtifact { path: String },

    #[error("Invalid job layout: {message}")]
    InvalidJob { message: String },

    #[error("Result store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Analyzer task failed: {message}")]
    TaskFailed { message: String },
}

fn archiving_message(stderr: &Option<String>) -> String {
    match stderr {
        Some(text) => format!("{}: {}", ARCHIVER_TAG, text),
        None => ARCHIVER_SILENT_FAILURE.to_string(),
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for AnalyzerError {
    fn user_message(&self) -> String {
        match self {
            AnalyzerError::Launch { program, source } => {
                format!("Could not start '{}': {}", program, source)
            }
            AnalyzerError::Timeout { program, timeout } => {
                format!(
                    "'{}' did not finish within {}",
                    program,
                    format_duration(*timeout)
                )
            }
            AnalyzerError::InvalidArtifact { path } => {
                format!("Invalid artifact path: {}", path)
            }
            AnalyzerError::InvalidJob { message } => {
                format!("Invalid job layout: {}", message)
            }
            AnalyzerError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            AnalyzerError::Launch { .. } => Some(
                "Make sure binwalk and 7z are installed and on PATH, or point --extractor/--archiver at them.".to_string()
            ),
            AnalyzerError::Timeout { .. } => Some(
                "Large artifacts can take a while to carve. Raise the limit with --timeout or max_pending_time.".to_string()
            ),
            AnalyzerError::InvalidArtifact { .. } | AnalyzerError::InvalidJob { .. } => Some(
                "Pass the path of the submitted file, which must sit one level above the working directory.".to_string()
            ),
            AnalyzerError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            AnalyzerError::Store { .. } => Some(
                "Ensure the working directory is writable and results.json is valid JSON.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for AnalyzerError {
    fn from(error: toml::de::Error) -> Self {
        AnalyzerError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(error: serde_json::Error) -> Self {
        AnalyzerError::Store {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_tool_message_is_tagged() {
        let error = AnalyzerError::ExtractionTool {
            stderr: "cannot open file".to_string(),
        };
        assert_eq!(error.to_string(), "Binwalk: cannot open file");
    }

    #[test]
    fn test_archiving_tool_messages() {
        let with_stderr = AnalyzerError::ArchivingTool {
            stderr: Some("disk full".to_string()),
        };
        assert_eq!(with_stderr.to_string(), "7z compression: disk full");

        let silent = AnalyzerError::ArchivingTool { stderr: None };
        assert_eq!(silent.to_string(), ARCHIVER_SILENT_FAILURE);
    }

    #[test]
    fn test_timeout_message() {
        let error = AnalyzerError::Timeout {
            program: "binwalk".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(
            error.to_string(),
            "Command 'binwalk' timed out after 300 seconds"
        );
        assert!(error.user_message().contains("5m 0s"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_user_friendly_messages() {
        let error = AnalyzerError::InvalidArtifact {
            path: "/".to_string(),
        };
        assert!(error.user_message().contains("Invalid artifact path"));
        assert!(error.suggestion().is_some());
    }
}
