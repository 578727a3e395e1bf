use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which this analyzer's result lands in the shared job record.
pub const ANALYZER_NAME: &str = "binwalk";

/// Status payload for one analyzer.
///
/// Serialises to the shape the result store and UI expect:
/// `{"status": "ok", "output": [...], "download": "..."}` or
/// `{"status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalyzerResult {
    Ok {
        output: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download: Option<String>,
    },
    Error {
        error: String,
    },
}

impl AnalyzerResult {
    pub fn success(output: Vec<String>, download: Option<String>) -> Self {
        AnalyzerResult::Ok { output, download }
    }

    pub fn failure(error: &AnalyzerError) -> Self {
        AnalyzerResult::Error {
            error: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AnalyzerResult::Ok { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            AnalyzerResult::Ok { .. } => "ok",
            AnalyzerResult::Error { .. } => "error",
        }
    }

    pub fn download(&self) -> Option<&str> {
        match self {
            AnalyzerResult::Ok { download, .. } => download.as_deref(),
            AnalyzerResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AnalyzerResult::Ok { .. } => None,
            AnalyzerResult::Error { error } => Some(error),
        }
    }
}

/// One analyzer's entry in a job's shared result document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub analyzer: String,
    pub result: AnalyzerResult,
}

impl ResultRecord {
    pub fn new<S: Into<String>>(analyzer: S, result: AnalyzerResult) -> Self {
        Self {
            analyzer: analyzer.into(),
            result,
        }
    }

    /// `{analyzer: result}`, the mapping handed to the store.
    pub fn to_json(&self) -> serde_json::Result<Map<String, Value>> {
        let mut map = Map::new();
        map.insert(self.analyzer.clone(), serde_json::to_value(&self.result)?);
        Ok(map)
    }
}

/// Path the download endpoint resolves to the archive produced for a job.
pub fn download_reference(working_dir_id: &str, analyzer: &str) -> String {
    format!("/download/{}/{}", working_dir_id, analyzer)
}

/// Splits tool output on `\n` into the line list stored in the record.
///
/// The split is exact: a trailing newline leaves an empty last line and
/// empty output is a single empty line, which is what the UI renders.
pub fn output_lines(stdout: &str) -> Vec<String> {
    stdout.split('\n').map(str::to_string).collect()
}
