//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.

use clap::Parser;

/// Command-line arguments for the feed generator.
///
/// # Examples
///
/// ```sh
/// # Write feeds for every rostered program into the current directory
/// fbi_radio_feeds
///
/// # Only one program, feeds into ./feeds, slower site tolerance
/// fbi_radio_feeds -o ./feeds -p loose-joints --timeout-secs 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the generated feed files
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,

    /// Restrict the run to these program slugs (repeatable); all rostered
    /// programs when omitted
    #[arg(short, long = "program")]
    pub programs: Vec<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "FBI_FEEDS_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fbi_radio_feeds"]);
        assert_eq!(cli.output_dir, ".");
        assert!(cli.programs.is_empty());
        assert_eq!(cli.timeout_secs, 10);
    }

    #[test]
    fn test_cli_program_filter_repeatable() {
        let cli = Cli::parse_from([
            "fbi_radio_feeds",
            "-p",
            "loose-joints",
            "-p",
            "utility-fog",
            "-o",
            "./feeds",
        ]);
        assert_eq!(cli.programs, vec!["loose-joints", "utility-fog"]);
        assert_eq!(cli.output_dir, "./feeds");
    }
}
