use binwalk_analyzer::{
    logging, AnalyzerApp, AnalyzerError, Cli, OutputFormatter, OutputMode, UserFriendlyError,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    logging::init(cli.verbosity_level(), cli.quiet);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let app = match AnalyzerApp::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let (artifact, working_dir) = match cli.job_paths() {
        Ok(paths) => paths,
        Err(e) => {
            app.handle_error(&e);
            return 2;
        }
    };

    if cli.dry_run {
        return match app.print_dry_run(artifact, working_dir) {
            Ok(()) => 0,
            Err(e) => {
                app.handle_error(&e);
                2
            }
        };
    }

    match app.analyze(artifact, working_dir).await {
        Ok(result) if result.is_ok() => 0,
        Ok(_) => 1,
        Err(e) => {
            app.handle_error(&e);
            1
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "binwalk-analyzer.toml".to_string());

    match AnalyzerApp::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!(
                "  binwalk-analyzer <artifact> <working-dir> --config {}",
                config_path
            );
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &AnalyzerError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
