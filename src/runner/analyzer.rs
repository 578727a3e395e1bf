use crate::config::ToolsConfig;
use crate::error::{AnalyzerError, Result};
use crate::report::record::{download_reference, output_lines, AnalyzerResult, ResultRecord, ANALYZER_NAME};
use crate::report::ResultStore;
use crate::runner::naming::{archiver_args, artifact_file_name, extractor_args, working_dir_id};
use crate::runner::process::{run_tool, ToolOutput};
use crate::runner::workspace::ExtractionDir;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// What the two tool invocations produced.
///
/// `archive` is present exactly when the extraction directory existed after
/// binwalk returned.
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub extraction: ToolOutput,
    pub archive: Option<ToolOutput>,
}

/// Maps a finished run to the result reported for it.
///
/// Success is returned as `Ok`; the two tool-reported failure modes come back
/// as [`AnalyzerError::ExtractionTool`] and [`AnalyzerError::ArchivingTool`].
pub fn classify(run: &ToolRun, working_dir_id: &str) -> Result<AnalyzerResult> {
    let extraction = &run.extraction;

    match &run.archive {
        None if !extraction.stderr.is_empty() => Err(AnalyzerError::ExtractionTool {
            stderr: extraction.stderr.clone(),
        }),
        None => Ok(AnalyzerResult::success(
            output_lines(&extraction.stdout),
            None,
        )),
        Some(archive) if !archive.success() => Err(AnalyzerError::ArchivingTool {
            stderr: Some(archive.stderr.clone()).filter(|s| !s.is_empty()),
        }),
        Some(_) => Ok(AnalyzerResult::success(
            output_lines(&extraction.stdout),
            Some(download_reference(working_dir_id, ANALYZER_NAME)),
        )),
    }
}

/// Runs binwalk over a submitted artifact and archives whatever it carves out.
///
/// Every call writes exactly one record under [`ANALYZER_NAME`] to the
/// result store and never returns an error or panics to the caller.
pub struct BinwalkAnalyzer {
    tools: ToolsConfig,
    store: Arc<dyn ResultStore>,
}

impl BinwalkAnalyzer {
    pub fn new(tools: ToolsConfig, store: Arc<dyn ResultStore>) -> Self {
        Self { tools, store }
    }

    /// Analyzes `artifact`, which must live in the parent of `working_dir`.
    ///
    /// `max_pending_time` bounds each of the two child processes separately.
    pub async fn run(&self, artifact: &Path, working_dir: &Path, max_pending_time: Duration) {
        let start_time = Instant::now();
        let tools = self.tools.clone();
        let task_artifact = artifact.to_path_buf();
        let task_working_dir = working_dir.to_path_buf();

        // A separate task turns a panic anywhere below into a JoinError.
        let handle = tokio::spawn(async move {
            analyze(&tools, &task_artifact, &task_working_dir, max_pending_time).await
        });

        let result = match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => AnalyzerResult::failure(&e),
            Err(e) => AnalyzerResult::failure(&task_failure(e)),
        };

        info!(
            artifact = %artifact.display(),
            status = result.status(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "binwalk analysis finished"
        );

        self.write(working_dir, result);
    }

    /// Blocking form of [`BinwalkAnalyzer::run`] for thread-per-job hosts.
    ///
    /// Called from inside a tokio runtime it cannot block, so it records an
    /// error result instead of running the tools.
    pub fn run_blocking(&self, artifact: &Path, working_dir: &Path, max_pending_time: Duration) {
        if tokio::runtime::Handle::try_current().is_ok() {
            warn!(
                artifact = %artifact.display(),
                "run_blocking called on a runtime thread"
            );
            let error = AnalyzerError::TaskFailed {
                message: "blocking run requested from inside an async runtime; use run instead"
                    .to_string(),
            };
            self.write(working_dir, AnalyzerResult::failure(&error));
            return;
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run(artifact, working_dir, max_pending_time)),
            Err(e) => self.write(working_dir, AnalyzerResult::failure(&AnalyzerError::Io(e))),
        }
    }

    fn write(&self, working_dir: &Path, result: AnalyzerResult) {
        let record = ResultRecord::new(ANALYZER_NAME, result);
        if let Err(e) = self.store.update_data(working_dir, &record) {
            error!(
                working_dir = %working_dir.display(),
                error = %e,
                "failed to store binwalk result"
            );
        }
    }
}

async fn analyze(
    tools: &ToolsConfig,
    artifact: &Path,
    working_dir: &Path,
    timeout: Duration,
) -> Result<AnalyzerResult> {
    let working_dir: PathBuf = working_dir.canonicalize()?;
    let artifact_name = artifact_file_name(artifact)?;
    let extraction_dir = ExtractionDir::new(&working_dir, &artifact_name);

    let run = extract_and_archive(tools, &artifact_name, &working_dir, &extraction_dir, timeout).await;
    let cleanup = extraction_dir.release();

    let run = match (run, cleanup) {
        (Ok(run), Ok(())) => run,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), cleanup) => {
            if let Err(cleanup_error) = cleanup {
                warn!(error = %cleanup_error, "cleanup failed after analysis error");
            }
            return Err(e);
        }
    };

    classify(&run, &working_dir_id(&working_dir))
}

async fn extract_and_archive(
    tools: &ToolsConfig,
    artifact_name: &OsStr,
    working_dir: &Path,
    extraction_dir: &ExtractionDir,
    timeout: Duration,
) -> Result<ToolRun> {
    let extraction = run_tool(
        &tools.extractor,
        &extractor_args(artifact_name),
        working_dir,
        timeout,
    )
    .await?;

    if !extraction_dir.exists() {
        debug!(artifact = ?artifact_name, "binwalk extracted nothing");
        return Ok(ToolRun {
            extraction,
            archive: None,
        });
    }

    let summary = extraction_dir.summarize();
    debug!(
        artifact = ?artifact_name,
        files = summary.files,
        bytes = summary.bytes,
        "archiving extracted files"
    );

    let archive = run_tool(
        &tools.archiver,
        &archiver_args(),
        extraction_dir.path(),
        timeout,
    )
    .await?;

    Ok(ToolRun {
        extraction,
        archive: Some(archive),
    })
}

fn task_failure(error: JoinError) -> AnalyzerError {
    let message = if error.is_panic() {
        let payload = error.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "analyzer panicked".to_string())
    } else {
        error.to_string()
    };

    AnalyzerError::TaskFailed { message }
}
