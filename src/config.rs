use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub limits: LimitsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    pub extractor: ToolCommand,
    pub archiver: ToolCommand,
}

/// An external program plus arguments placed before the analyzer's own.
///
/// `prefix_args` lets a deployment wrap the tool, e.g. `program = "nice"`
/// with `prefix_args = ["-n", "10", "binwalk"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub prefix_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Wall-clock bound for each child process, in seconds.
    pub max_pending_time: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub results_file: String,
}

impl ToolCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Human-readable command line for logs and dry runs.
    pub fn display_with(&self, args: &[OsString]) -> String {
        std::iter::once(self.program.clone())
            .chain(self.prefix_args.iter().cloned())
            .chain(args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            extractor: ToolCommand::new("binwalk"),
            archiver: ToolCommand::new("7z"),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pending_time: 300, // 5 minutes
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_file: "results.json".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AnalyzerError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| AnalyzerError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| AnalyzerError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["binwalk-analyzer.toml", ".binwalk-analyzer.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(timeout) = cli_args.timeout {
            self.limits.max_pending_time = timeout;
        }

        if let Some(ref extractor) = cli_args.extractor {
            self.tools.extractor.program = extractor.clone();
        }

        if let Some(ref archiver) = cli_args.archiver {
            self.tools.archiver.program = archiver.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_pending_time == 0 {
            return Err(AnalyzerError::Config {
                message: "max_pending_time must be greater than 0".to_string(),
            });
        }

        for (name, tool) in [
            ("extractor", &self.tools.extractor),
            ("archiver", &self.tools.archiver),
        ] {
            if tool.program.trim().is_empty() {
                return Err(AnalyzerError::Config {
                    message: format!("The {} program must not be empty", name),
                });
            }
        }

        let results_file = Path::new(&self.output.results_file);
        if self.output.results_file.is_empty() || results_file.components().count() != 1 {
            return Err(AnalyzerError::Config {
                message: format!(
                    "results_file must be a plain file name, got '{}'",
                    self.output.results_file
                ),
            });
        }

        Ok(())
    }

    pub fn max_pending_duration(&self) -> Duration {
        Duration::from_secs(self.limits.max_pending_time)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub timeout: Option<u64>,
    pub extractor: Option<String>,
    pub archiver: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extractor(mut self, extractor: Option<String>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_archiver(mut self, archiver: Option<String>) -> Self {
        self.archiver = archiver;
        self
    }
}
