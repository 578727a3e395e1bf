use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset, by `-v` count.
pub fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "binwalk_analyzer=error";
    }

    match verbose {
        0 => "binwalk_analyzer=warn",
        1 => "binwalk_analyzer=info",
        _ => "binwalk_analyzer=debug",
    }
}

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(0, false), "binwalk_analyzer=warn");
        assert_eq!(default_filter(1, false), "binwalk_analyzer=info");
        assert_eq!(default_filter(3, false), "binwalk_analyzer=debug");
        assert_eq!(default_filter(3, true), "binwalk_analyzer=error");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(0, true);
        init(2, false);
    }
}
