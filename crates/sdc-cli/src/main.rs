//! `sdc`: compile disclosure-control jobs and inspect their results.

use clap::{ColorChoice, Parser};
use sdc_cli::logging::{LogConfig, LogFormat, init_logging};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_check, run_compile, run_decode, run_hierarchy};
use crate::summary::{
    print_compile_json, print_compile_summary, print_hierarchy, print_problems,
    print_problems_json, print_table_result,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match cli.command {
        Command::Compile(args) => {
            let printed = run_compile(&args).and_then(|result| {
                if args.json {
                    print_compile_json(&result)
                } else {
                    print_compile_summary(&result, args.print_batch);
                    Ok(())
                }
            });
            match printed {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {error:#}");
                    1
                }
            }
        }
        Command::Check(args) => match run_check(&args) {
            Ok((job, problems)) => {
                let printed = if args.json {
                    print_problems_json(job.name(), &problems)
                } else {
                    print_problems(job.name(), &problems);
                    Ok(())
                };
                match printed {
                    Ok(()) => i32::from(!problems.is_empty()),
                    Err(error) => {
                        eprintln!("error: {error:#}");
                        1
                    }
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Decode(args) => {
            match run_decode(&args)
                .and_then(|result| print_table_result(&result, &args.marker, args.counts_only))
            {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {error:#}");
                    1
                }
            }
        }
        Command::Hierarchy(args) => match run_hierarchy(&args) {
            Ok(hierarchy) => {
                print_hierarchy(&args.path, &hierarchy);
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags. `--log-level` wins over
/// `-v`/`-q`; with neither, `RUST_LOG` applies.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    let with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    let config = LogConfig::default()
        .with_format(format)
        .with_ansi(with_ansi)
        .with_log_file(cli.log_file.clone());
    let explicit = cli.log_level.map(|level| match level {
        LogLevelArg::Error => LevelFilter::ERROR,
        LogLevelArg::Warn => LevelFilter::WARN,
        LogLevelArg::Info => LevelFilter::INFO,
        LogLevelArg::Debug => LevelFilter::DEBUG,
        LogLevelArg::Trace => LevelFilter::TRACE,
    });
    match explicit {
        Some(level) => config.with_level(level),
        None if cli.verbosity.is_present() => config.with_level(cli.verbosity.tracing_level_filter()),
        None => LogConfig {
            level_filter: cli.verbosity.tracing_level_filter(),
            ..config
        },
    }
}
