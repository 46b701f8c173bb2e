use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(author, version, about, long_about = None, long_version = LONG_VERSION)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overrides the configured level)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_observe_with_globals() {
        let args = CliArgs::try_parse_from([
            "bic",
            "observe",
            "--url",
            "https://example.com",
            "--max",
            "10",
            "--debug",
        ])
        .unwrap();
        assert!(args.debug);
        match args.command {
            Commands::Observe(observe) => {
                assert_eq!(observe.url, "https://example.com");
                assert_eq!(observe.max, Some(10));
            }
            _ => panic!("expected observe"),
        }
    }
}
