//! CLI argument definitions for `omop-link`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "omop-link",
    version,
    about = "Link provisional OMOP subtables into one consistent key space",
    long_about = "Resolve participants to person ids, deduplicate (participant, date)\n\
                  encounters into visit occurrences, rewrite every foreign key and\n\
                  validate concept ids against a reference vocabulary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Link a directory of `{instrument}--{table}.csv` subtables.
    Link(LinkArgs),

    /// Run the built-in instrument mappers over registry exports.
    Map(MapArgs),

    /// List table types with their key and date columns.
    Tables,
}

#[derive(Parser)]
pub struct LinkArgs {
    /// Directory of provisional subtables.
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Output directory for final tables (default: <INPUT_DIR>/final_omop).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Reference vocabulary with `concept_id` and `concept_name` columns.
    #[arg(long = "vocabulary", value_name = "FILE")]
    pub vocabulary: Option<PathBuf>,

    /// Index date that relative day offsets count from.
    #[arg(long = "index-date", value_name = "YYYY-MM-DD")]
    pub index_date: Option<NaiveDate>,

    /// Also write the combined tables before linking.
    #[arg(long = "write-checkpoints")]
    pub write_checkpoints: bool,

    /// TOML configuration file; explicit flags take precedence.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct MapArgs {
    /// Directory holding `<instrument>.csv` exports.
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Output directory for subtables (default: <SOURCE_DIR>/processed_source).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Index date that relative day offsets count from.
    #[arg(long = "index-date", value_name = "YYYY-MM-DD")]
    pub index_date: Option<NaiveDate>,

    /// TOML configuration file; only `index_date` is read.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
