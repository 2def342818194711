use std::fmt;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use sdc_hierarchy::HierarchyError;

use crate::rules::RuleKind;

/// Level a safety rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLevel {
    Individual,
    Holding,
}

impl fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual => f.write_str("individual"),
            Self::Holding => f.write_str("holding"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("invalid {kind} rule: {constraint}")]
    InvalidParameter { kind: RuleKind, constraint: String },

    #[error("{kind} rule ({code}) may appear at most {maximum} times at {level} level")]
    TooManyOccurrences {
        kind: RuleKind,
        code: &'static str,
        level: RuleLevel,
        maximum: usize,
    },
}

impl RuleError {
    pub(crate) fn invalid(kind: RuleKind, constraint: impl Into<String>) -> Self {
        Self::InvalidParameter {
            kind,
            constraint: constraint.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("column '{column}' not found in input data")]
    UnknownColumn { column: String },

    #[error("{role} role is not available for {kind} input")]
    RoleNotSupported {
        role: &'static str,
        kind: &'static str,
    },

    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("column '{column}' has a tree hierarchy without a file; write the hierarchy first")]
    HierarchyWithoutFile { column: String },

    #[error("column '{column}' has a codelist without a file; write the codelist first")]
    CodelistWithoutFile { column: String },

    #[error("line {line}: invalid override '{text}': {message}")]
    InvalidOverride {
        line: usize,
        text: String,
        message: String,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Frame {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("data frame error: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
