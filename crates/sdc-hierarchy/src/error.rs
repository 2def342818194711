use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("code '{code}' is the total code and cannot start a path")]
    RootCodeInPath { code: String },

    #[error("'{parent}' already has a child with code '{code}'")]
    DuplicateChild { parent: String, code: String },

    #[error("the root node cannot be detached")]
    DetachRoot,

    #[error("indent string must not be empty")]
    EmptyIndent,

    #[error("line {line}: indentation jumps to depth {depth}, deepest open level is {max}")]
    IndentJump {
        line: usize,
        depth: usize,
        max: usize,
    },

    #[error("invalid level widths {widths:?}: {message}")]
    InvalidLevels { widths: Vec<u32>, message: String },

    #[error("line {line}: invalid recode entry '{text}': {message}")]
    InvalidRecode {
        line: usize,
        text: String,
        message: String,
    },

    #[error("recoding by level or leaves needs a code tree")]
    RecodeNeedsTree,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write CSV: {0}")]
    CsvWrite(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl HierarchyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HierarchyError>;
