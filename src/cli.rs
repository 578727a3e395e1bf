use crate::config::{CliOverrides, Config};
use crate::error::{AnalyzerError, Result};
use crate::runner::naming::artifact_file_name;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "binwalk-analyzer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Carve embedded files out of a submitted artifact with binwalk")]
#[command(
    long_about = "Runs binwalk against a submitted artifact from inside its job working \
                  directory, archives anything it extracts into binwalk.7z and records \
                  the outcome in the job's results.json."
)]
#[command(after_help = "EXAMPLES:\n  \
    binwalk-analyzer /jobs/cat.png /jobs/3f2a\n  \
    binwalk-analyzer /jobs/cat.png /jobs/3f2a --timeout 60 --output-format json\n  \
    binwalk-analyzer /jobs/cat.png /jobs/3f2a --dry-run\n  \
    binwalk-analyzer --generate-config --config binwalk-analyzer.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Submitted artifact; must sit in the parent of WORKING_DIR
    #[arg(required_unless_present = "generate_config")]
    pub artifact: Option<PathBuf>,

    /// Job working directory that receives the archive and results
    #[arg(required_unless_present = "generate_config")]
    pub working_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Per-tool time limit in seconds
    #[arg(
        short,
        long,
        env = "BINWALK_ANALYZER_TIMEOUT",
        help = "Maximum pending time for each tool (seconds)"
    )]
    pub timeout: Option<u64>,

    /// Extraction tool to run instead of binwalk
    #[arg(long, env = "BINWALK_ANALYZER_EXTRACTOR")]
    pub extractor: Option<String>,

    /// Archiving tool to run instead of 7z
    #[arg(long, env = "BINWALK_ANALYZER_ARCHIVER")]
    pub archiver: Option<String>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show the commands without executing them)
    #[arg(long, help = "Show the commands that would run without running them")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_timeout(self.timeout)
            .with_extractor(self.extractor.clone())
            .with_archiver(self.archiver.clone())
    }

    /// Artifact and working directory, checked against the job layout.
    pub fn job_paths(&self) -> Result<(&Path, &Path)> {
        let (artifact, working_dir) = match (&self.artifact, &self.working_dir) {
            (Some(artifact), Some(working_dir)) => (artifact.as_path(), working_dir.as_path()),
            _ => {
                return Err(AnalyzerError::InvalidJob {
                    message: "both ARTIFACT and WORKING_DIR are required".to_string(),
                })
            }
        };

        validate_job_layout(artifact, working_dir)?;
        Ok((artifact, working_dir))
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// The extractor is handed `../<artifact name>` from inside the working
/// directory, so the artifact must be a file in the working directory's parent.
pub fn validate_job_layout(artifact: &Path, working_dir: &Path) -> Result<()> {
    let name = artifact_file_name(artifact)?;

    if !working_dir.is_dir() {
        return Err(AnalyzerError::InvalidJob {
            message: format!("working directory does not exist: {}", working_dir.display()),
        });
    }

    let expected = working_dir.join("..").join(&name);
    if !expected.is_file() {
        return Err(AnalyzerError::InvalidJob {
            message: format!(
                "{} is not in the parent of {}",
                artifact.display(),
                working_dir.display()
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cli_for(artifact: Option<PathBuf>, working_dir: Option<PathBuf>) -> Cli {
        Cli {
            artifact,
            working_dir,
            config: None,
            timeout: None,
            extractor: None,
            archiver: None,
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
            dry_run: false,
            generate_config: false,
        }
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "binwalk-analyzer",
            "/jobs/cat.png",
            "/jobs/3f2a",
            "--timeout",
            "60",
            "--output-format",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.artifact, Some(PathBuf::from("/jobs/cat.png")));
        assert_eq!(cli.working_dir, Some(PathBuf::from("/jobs/3f2a")));
        assert_eq!(cli.timeout, Some(60));
        assert!(matches!(cli.output_format, OutputFormat::Json));
        assert_eq!(cli.verbosity_level(), 2);
    }

    #[test]
    fn test_generate_config_needs_no_paths() {
        let cli = Cli::try_parse_from(["binwalk-analyzer", "--generate-config"]).unwrap();
        assert!(cli.generate_config);
        assert!(cli.artifact.is_none());
    }

    #[test]
    fn test_paths_required_otherwise() {
        assert!(Cli::try_parse_from(["binwalk-analyzer", "/jobs/cat.png"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["binwalk-analyzer", "a", "b", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_overrides_applied_to_config() {
        let mut cli = cli_for(None, None);
        cli.timeout = Some(12);
        cli.extractor = Some("/opt/binwalk/bin/binwalk".to_string());

        let config = cli.load_config().unwrap();
        assert_eq!(config.limits.max_pending_time, 12);
        assert_eq!(config.tools.extractor.program, "/opt/binwalk/bin/binwalk");
        assert_eq!(config.tools.archiver.program, "7z");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut cli = cli_for(None, None);
        cli.timeout = Some(0);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_job_layout_validation() {
        let root = TempDir::new().unwrap();
        let working_dir = root.path().join("job");
        fs::create_dir(&working_dir).unwrap();
        let artifact = root.path().join("cat.png");
        fs::write(&artifact, b"png").unwrap();

        let cli = cli_for(Some(artifact.clone()), Some(working_dir.clone()));
        assert!(cli.job_paths().is_ok());

        let stray = working_dir.join("inside.png");
        fs::write(&stray, b"png").unwrap();
        assert!(validate_job_layout(&stray, &working_dir).is_err());

        assert!(validate_job_layout(&artifact, &root.path().join("missing")).is_err());
        assert!(cli_for(Some(artifact), None).job_paths().is_err());
    }
}
