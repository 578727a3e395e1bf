use crate::error::{AnalyzerError, UserFriendlyError};
use crate::report::{AnalyzerResult, ResultRecord};
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static MAGNIFIER: Emoji = Emoji("🔎 ", "> ");
static PACKAGE: Emoji = Emoji("📦 ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", MAGNIFIER, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &AnalyzerError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    println!();
                    if self.use_colors {
                        println!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        println!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    println!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Prints the stored result for one analyzer. JSON mode always prints,
    /// even when quiet, since scripts consume it.
    pub fn print_result(&self, record: &ResultRecord, elapsed: Duration) {
        match self.mode {
            OutputMode::Human => {
                if !self.quiet {
                    self.print_human_result(record, elapsed)
                }
            }
            OutputMode::Json => match record.to_json() {
                Ok(map) => println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                ),
                Err(e) => self.error(&format!("Failed to serialize result: {}", e)),
            },
            OutputMode::Plain => self.print_plain_result(record, elapsed),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", PACKAGE, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (&CHECKMARK, style(message).green().bold()),
                MessageType::Error => (&CROSS, style(message).red().bold()),
                MessageType::Info => (&INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_result(&self, record: &ResultRecord, elapsed: Duration) {
        self.print_header(&format!("{} result", record.analyzer));

        match &record.result {
            AnalyzerResult::Ok { output, download } => {
                self.success(&format!(
                    "Analysis completed in {}",
                    format_duration(elapsed)
                ));
                match download {
                    Some(link) => println!("  Download: {}", link),
                    None => println!("  Nothing was extracted"),
                }
                if !output.is_empty() {
                    println!();
                    for line in output {
                        println!("  {}", line);
                    }
                }
            }
            AnalyzerResult::Error { error } => {
                self.error(&format!(
                    "Analysis failed after {}",
                    format_duration(elapsed)
                ));
                for line in error.lines() {
                    eprintln!("  {}", line);
                }
            }
        }

        self.print_separator();
    }

    fn print_plain_result(&self, record: &ResultRecord, elapsed: Duration) {
        println!("ANALYZER: {}", record.analyzer);
        println!("STATUS: {}", record.result.status());
        println!("Duration: {:?}", elapsed);

        match &record.result {
            AnalyzerResult::Ok { output, download } => {
                if let Some(link) = download {
                    println!("DOWNLOAD: {}", link);
                }
                for line in output {
                    println!("OUTPUT: {}", line);
                }
            }
            AnalyzerResult::Error { error } => {
                println!("ERROR: {}", error);
            }
        }
    }

    /// Dry-run plan: the two commands and where they would run.
    pub fn print_plan(&self, steps: &[(String, &Path)]) {
        match self.mode {
            OutputMode::Json => {
                let plan: Vec<_> = steps
                    .iter()
                    .map(|(command, cwd)| {
                        serde_json::json!({ "command": command, "cwd": cwd.display().to_string() })
                    })
                    .collect();
                self.print_json_object(&serde_json::json!({ "type": "plan", "steps": plan }));
            }
            _ => {
                for (index, (command, cwd)) in steps.iter().enumerate() {
                    println!("  {}. {}", index + 1, command);
                    println!("     in {}", cwd.display());
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Info,
}
