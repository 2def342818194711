//! CLI argument definitions for the disclosure-control job compiler.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use sdc_hierarchy::{DEFAULT_INDENT, DEFAULT_TOTAL_CODE};
use sdc_result::DEFAULT_MARKER;

#[derive(Parser)]
#[command(
    name = "sdc",
    version,
    about = "Compile disclosure-control jobs into TauArgus batch files",
    long_about = "Compile disclosure-control jobs into TauArgus batch files.\n\n\
                  Writes data, metadata, hierarchy and recode files next to a batch\n\
                  script, and decodes the protected tables the engine produces."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
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
    /// Write all job files and the batch script.
    Compile(JobArgs),

    /// Report consistency problems without writing anything.
    Check(JobArgs),

    /// Decode the status column of a protected table.
    Decode(DecodeArgs),

    /// Print a hierarchy file as a tree.
    Hierarchy(HierarchyArgs),
}

#[derive(Parser)]
pub struct JobArgs {
    /// TOML job description.
    #[arg(value_name = "JOB_FILE")]
    pub job: PathBuf,

    /// Print the batch script after the summary.
    #[arg(long = "print-batch")]
    pub print_batch: bool,

    /// Print the result as JSON instead of tables.
    #[arg(long = "json", conflicts_with = "print_batch")]
    pub json: bool,
}

#[derive(Parser)]
pub struct DecodeArgs {
    /// CSV table written by the engine.
    #[arg(value_name = "CSV")]
    pub path: PathBuf,

    /// Explanatory columns, in table order.
    #[arg(long = "index", value_name = "COLUMN", num_args = 1.., required = true)]
    pub index: Vec<String>,

    /// Response column (`Freq` for frequency tables).
    #[arg(long = "response", value_name = "COLUMN")]
    pub response: String,

    /// Replacement for suppressed values.
    #[arg(long = "marker", default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Only print status counts.
    #[arg(long = "counts-only")]
    pub counts_only: bool,
}

#[derive(Parser)]
pub struct HierarchyArgs {
    /// `.hrc` file.
    #[arg(value_name = "HRC_FILE")]
    pub path: PathBuf,

    /// Depth marker used in the file.
    #[arg(long = "indent", default_value = DEFAULT_INDENT)]
    pub indent: String,

    /// Code of the root.
    #[arg(long = "total", default_value = DEFAULT_TOTAL_CODE)]
    pub total: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
