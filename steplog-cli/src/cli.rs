//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// steplog -- step log ingestion tooling.
///
/// Use `steplog <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "steplog", version, about, long_about = None)]
pub struct Cli {
    /// Path to a steplog.toml configuration file.
    ///
    /// Without it, configuration comes from defaults and environment variables.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration.
    Config(ConfigArgs),

    /// Run the pipeline against a captured queue event.
    Replay(ReplayArgs),

    /// Decode and enrich a local gzip log without writing anything.
    Preview(PreviewArgs),
}

// ---- config ----

/// Manage steplog configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, ingest).
        #[arg(long)]
        section: Option<String>,
    },
}

// ---- replay ----

/// Replay a captured queue event through the pipeline.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Queue event JSON file (`{"Records": [...]}`).
    #[arg(long)]
    pub event: PathBuf,

    /// Read from object storage but record index writes instead of sending them.
    #[arg(long)]
    pub dry_run: bool,
}

// ---- preview ----

/// Preview the records a local log file would produce.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Local gzip-compressed log file.
    #[arg(long)]
    pub file: PathBuf,

    /// Bucket name used to build `log_file`.
    #[arg(long)]
    pub bucket: String,

    /// Object key used to build `log_file` and derive cluster/step ids.
    #[arg(long)]
    pub key: String,

    /// Region stamped on the records.
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Maximum number of records to print.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["steplog", "config", "show", "--section", "ingest"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("ingest")),
            _ => panic!("expected Config Show command"),
        }
        assert!(cli.config.is_none(), "config path should default to None");
    }

    #[test]
    fn test_cli_parse_replay_dry_run() {
        let cli = Cli::try_parse_from([
            "steplog",
            "--config",
            "/etc/steplog.toml",
            "replay",
            "--event",
            "event.json",
            "--dry-run",
        ])
        .expect("should parse replay");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/steplog.toml")));
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.event, PathBuf::from("event.json"));
                assert!(args.dry_run);
            }
            _ => panic!("expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parse_preview_defaults() {
        let cli = Cli::try_parse_from([
            "steplog",
            "preview",
            "--file",
            "stdout.gz",
            "--bucket",
            "emr-logs",
            "--key",
            "emr/j-1/steps/s-1/stdout.gz",
        ])
        .expect("should parse preview");
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.limit, 20);
                assert_eq!(args.region, "us-east-1");
                assert_eq!(args.bucket, "emr-logs");
            }
            _ => panic!("expected Preview command"),
        }
    }

    #[test]
    fn test_cli_preview_requires_key() {
        let result = Cli::try_parse_from([
            "steplog",
            "preview",
            "--file",
            "stdout.gz",
            "--bucket",
            "emr-logs",
        ]);
        assert!(result.is_err(), "missing --key should be rejected");
    }

    #[test]
    fn test_cli_output_json_is_global() {
        let cli = Cli::try_parse_from(["steplog", "config", "validate", "--output", "json"])
            .expect("should parse global output flag");
        assert!(matches!(cli.output, OutputFormat::Json));
    }
}
