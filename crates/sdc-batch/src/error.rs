use std::path::PathBuf;

use sdc_hierarchy::HierarchyError;
use sdc_model::{ModelError, RuleError};

use crate::runner::RunReport;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Every reference problem found in the job, not only the first.
    #[error("{}", problem_list(.problems))]
    Consistency { problems: Vec<String> },

    #[error("job has no tables; add a table or use table data input")]
    NoTables,

    #[error("table '{name}' is defined twice")]
    DuplicateTable { name: String },

    #[error("table '{table}' refers to {artifact} without a file; run setup first")]
    Unresolved { table: String, artifact: &'static str },

    #[error("{artifact} has no file; run setup first")]
    MissingArtifact { artifact: &'static str },

    #[error("invalid safety rule for table '{table}': {source}")]
    Rule {
        table: String,
        #[source]
        source: RuleError,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    EngineFailed(Box<RunReport>),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl JobError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Problems collected by the consistency check, if that is what failed.
    pub fn problems(&self) -> &[String] {
        match self {
            Self::Consistency { problems } => problems,
            _ => &[],
        }
    }
}

fn problem_list(problems: &[String]) -> String {
    let mut text = String::from("Problems found in setup:");
    for problem in problems {
        text.push_str("\n- ");
        text.push_str(problem);
    }
    text
}

pub type Result<T> = std::result::Result<T, JobError>;
