//! Batch commands and their one-line rendering.
//!
//! Every command renders as `<KEYWORD>` or `<KEYWORD>\targument`. Arguments
//! are positional: an absent optional value still leaves its separator
//! behind.

use std::fmt;
use std::path::PathBuf;

use sdc_model::{Cost, Response, Suppression, format_number};

/// Second argument of `WRITETABLE`: comma separated file.
pub const CSV_TABLE_KIND: u8 = 2;

/// Target of a `RECODE` command.
#[derive(Debug, Clone, PartialEq)]
pub enum RecodeTarget {
    File(PathBuf),
    Level(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    Logbook(PathBuf),
    VersionInfo(PathBuf),
    OpenMicrodata(PathBuf),
    OpenTableData(PathBuf),
    OpenMetadata(PathBuf),
    SpecifyTable {
        explanatory: Vec<String>,
        response: Response,
        shadow: Option<String>,
        cost: Option<Cost>,
        lambda: Option<f64>,
    },
    SafetyRule(Vec<String>),
    ReadMicrodata,
    ReadTable {
        compute_totals: Option<bool>,
    },
    Apriori {
        path: PathBuf,
        table: usize,
        separator: String,
        ignore_error: bool,
        expand_trivial: bool,
    },
    Recode {
        table: usize,
        variable: String,
        target: RecodeTarget,
    },
    Suppress {
        table: usize,
        suppression: Suppression,
    },
    WriteTable {
        table: usize,
        kind: u8,
        options: Vec<(String, bool)>,
        path: PathBuf,
    },
    GoInteractive,
    Clear,
}

impl BatchCommand {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Logbook(_) => "LOGBOOK",
            Self::VersionInfo(_) => "VERSIONINFO",
            Self::OpenMicrodata(_) => "OPENMICRODATA",
            Self::OpenTableData(_) => "OPENTABLEDATA",
            Self::OpenMetadata(_) => "OPENMETADATA",
            Self::SpecifyTable { .. } => "SPECIFYTABLE",
            Self::SafetyRule(_) => "SAFETYRULE",
            Self::ReadMicrodata => "READMICRODATA",
            Self::ReadTable { .. } => "READTABLE",
            Self::Apriori { .. } => "APRIORI",
            Self::Recode { .. } => "RECODE",
            Self::Suppress { .. } => "SUPPRESS",
            Self::WriteTable { .. } => "WRITETABLE",
            Self::GoInteractive => "GOINTERACTIVE",
            Self::Clear => "CLEAR",
        }
    }

    /// The text after the tab, if the command takes one.
    pub fn argument(&self) -> Option<String> {
        match self {
            Self::Logbook(path)
            | Self::VersionInfo(path)
            | Self::OpenMicrodata(path)
            | Self::OpenTableData(path)
            | Self::OpenMetadata(path) => Some(quote_path(path)),
            Self::SpecifyTable {
                explanatory,
                response,
                shadow,
                cost,
                lambda,
            } => {
                let explanatory: String = explanatory.iter().map(|name| quote(name)).collect();
                let response = match response {
                    Response::Frequency => quote(sdc_model::FREQUENCY_RESPONSE),
                    Response::Variable(name) => quote(name),
                };
                let shadow = shadow.as_deref().map(quote).unwrap_or_default();
                let cost = match cost {
                    None => String::new(),
                    Some(Cost::Variable(name)) => quote(name),
                    Some(pseudo) => pseudo
                        .code()
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                };
                let mut argument = format!("{explanatory}|{response}|{shadow}|{cost}");
                if let Some(lambda) = lambda {
                    argument.push('|');
                    argument.push_str(&format_number(*lambda));
                }
                Some(argument)
            }
            Self::SafetyRule(rules) => Some(rules.join("|")),
            Self::ReadMicrodata | Self::GoInteractive | Self::Clear => None,
            Self::ReadTable { compute_totals } => {
                compute_totals.map(|totals| u8::from(totals).to_string())
            }
            Self::Apriori {
                path,
                table,
                separator,
                ignore_error,
                expand_trivial,
            } => Some(format!(
                "{}, {table}, {}, {}, {}",
                quote_path(path),
                quote(separator),
                u8::from(*ignore_error),
                u8::from(*expand_trivial)
            )),
            Self::Recode {
                table,
                variable,
                target,
            } => {
                let target = match target {
                    RecodeTarget::File(path) => quote_path(path),
                    RecodeTarget::Level(level) => level.to_string(),
                };
                Some(format!("{table}, {}, {target}", quote(variable)))
            }
            Self::Suppress { table, suppression } => Some(suppression.render(*table)),
            Self::WriteTable {
                table,
                kind,
                options,
                path,
            } => {
                let options: String = options
                    .iter()
                    .map(|(key, enabled)| format!("{key}{}", if *enabled { '+' } else { '-' }))
                    .collect();
                Some(format!("({table}, {kind}, {options}, {})", quote_path(path)))
            }
        }
    }
}

impl fmt::Display for BatchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(argument) => write!(f, "<{}>\t{argument}", self.keyword()),
            None => write!(f, "<{}>", self.keyword()),
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{text}\"")
}

fn quote_path(path: &std::path::Path) -> String {
    quote(&path.display().to_string())
}
