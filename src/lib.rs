pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, LimitsConfig, OutputConfig, ToolCommand, ToolsConfig};
pub use error::{AnalyzerError, Result, UserFriendlyError};

// Core functionality re-exports
pub use report::{AnalyzerResult, JsonFileStore, MemoryStore, ResultRecord, ResultStore, ANALYZER_NAME};
pub use runner::{BinwalkAnalyzer, ExtractionDir, ToolOutput};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use runner::naming::{archiver_args, artifact_file_name, extraction_dir_name, extractor_args};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Binary-facing wrapper: configuration, terminal output and the JSON store.
pub struct AnalyzerApp {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    store: Arc<JsonFileStore>,
}

impl AnalyzerApp {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let show_progress = !quiet && output_mode == OutputMode::Human;
        let progress_manager = ProgressManager::new(show_progress);
        let store = Arc::new(JsonFileStore::new(config.output.results_file.clone()));

        Self {
            config,
            output_formatter,
            progress_manager,
            store,
        }
    }

    /// Create AnalyzerApp instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(
            config,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        ))
    }

    /// Runs the analyzer and reads back what it stored.
    pub async fn analyze(&self, artifact: &Path, working_dir: &Path) -> Result<AnalyzerResult> {
        let start_time = Instant::now();
        self.output_formatter
            .start_operation(&format!("Analyzing {} with binwalk", artifact.display()));

        let spinner = self.progress_manager.create_spinner("Running binwalk");
        let analyzer = BinwalkAnalyzer::new(self.config.tools.clone(), self.store.clone());
        analyzer
            .run(artifact, working_dir, self.config.max_pending_duration())
            .await;
        ui::progress::finish_progress_with_summary(&spinner, "binwalk finished", start_time.elapsed());

        let result = self
            .store
            .get(working_dir, ANALYZER_NAME)?
            .ok_or_else(|| AnalyzerError::Store {
                message: format!(
                    "no {} entry in {}",
                    ANALYZER_NAME,
                    self.store.results_path(working_dir).display()
                ),
            })?;

        self.output_formatter.print_result(
            &ResultRecord::new(ANALYZER_NAME, result.clone()),
            start_time.elapsed(),
        );

        Ok(result)
    }

    /// Prints the commands a real run would execute.
    pub fn print_dry_run(&self, artifact: &Path, working_dir: &Path) -> Result<()> {
        let name = artifact_file_name(artifact)?;
        let extraction_dir = working_dir.join(extraction_dir_name(&name));
        let tools = &self.config.tools;

        let steps = [
            (tools.extractor.display_with(&extractor_args(&name)), working_dir),
            (
                format!("{} (only if extraction happens)", tools.archiver.display_with(&archiver_args())),
                extraction_dir.as_path(),
            ),
        ];

        self.output_formatter.print_header("Dry run");
        self.output_formatter.print_plan(&steps);
        self.output_formatter.info(&format!(
            "Each step is limited to {} seconds; results go to {}",
            self.config.limits.max_pending_time,
            self.store.results_path(working_dir).display()
        ));

        Ok(())
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &AnalyzerError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Runs the binwalk analyzer for one job with a [`JsonFileStore`] built from
/// `config`.
pub async fn analyze_binwalk(input_img: &Path, output_dir: &Path, config: &Config) {
    let store = Arc::new(JsonFileStore::new(config.output.results_file.clone()));
    BinwalkAnalyzer::new(config.tools.clone(), store)
        .run(input_img, output_dir, config.max_pending_duration())
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_creation() {
        let app = AnalyzerApp::new(Config::default(), OutputMode::Json, 1, false);
        assert_eq!(app.config().limits.max_pending_time, 300);
        assert_eq!(app.output_formatter().mode(), OutputMode::Json);
        assert!(!app.progress_manager.is_enabled());
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        AnalyzerApp::generate_sample_config(&config_path).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.tools.extractor.program, "binwalk");
    }

    #[test]
    fn test_dry_run_needs_artifact_name() {
        let app = AnalyzerApp::new(Config::default(), OutputMode::Plain, 0, true);
        let temp_dir = TempDir::new().unwrap();
        assert!(app.print_dry_run(Path::new("/"), temp_dir.path()).is_err());
        assert!(app
            .print_dry_run(Path::new("/jobs/cat.png"), temp_dir.path())
            .is_ok());
    }

    #[tokio::test]
    async fn test_analyze_binwalk_writes_results_file() {
        let root = TempDir::new().unwrap();
        let working_dir = root.path().join("job");
        std::fs::create_dir(&working_dir).unwrap();
        let artifact = root.path().join("cat.png");
        std::fs::write(&artifact, b"png").unwrap();

        let mut config = Config::default();
        config.tools.extractor = ToolCommand::new("no-such-binwalk-binary");

        analyze_binwalk(&artifact, &working_dir, &config).await;

        let result = JsonFileStore::default()
            .get(&working_dir, ANALYZER_NAME)
            .unwrap()
            .unwrap();
        assert!(!result.is_ok());
    }
}
