//! Contract with whatever actually starts the engine.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{JobError, Result};

/// Line between runs appended to the same logbook.
pub const SECTION_MARKER: &str = "--------------------";
/// Last line the engine logs for a run.
pub const END_MARKER: &str = "End of TauArgus run";

/// Runs a batch file with the external engine.
///
/// Implementations decide how the engine is started; a job only hands over
/// the batch file, the logbook location and a scratch directory.
pub trait Runner {
    fn run(&self, batch: &Path, logbook: Option<&Path>, workdir: Option<&Path>)
    -> Result<RunReport>;
}

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    exit_code: Option<i32>,
    logbook_path: Option<PathBuf>,
    logbook: Option<Vec<String>>,
}

impl RunReport {
    pub fn new(exit_code: Option<i32>, logbook_path: Option<PathBuf>) -> Self {
        Self {
            exit_code,
            logbook_path,
            logbook: None,
        }
    }

    /// Builds a report and reads the last run from the logbook. A logbook
    /// that does not exist is not an error.
    pub fn collect(exit_code: Option<i32>, logbook_path: Option<PathBuf>) -> Result<Self> {
        let mut report = Self::new(exit_code, logbook_path);
        if let Some(path) = &report.logbook_path {
            match fs::read_to_string(path) {
                Ok(text) => report.logbook = Some(last_run(&text)),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(JobError::io(path, err)),
            }
        }
        Ok(report)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn logbook_path(&self) -> Option<&Path> {
        self.logbook_path.as_deref()
    }

    /// Logbook lines of the last run, when the logbook could be read.
    pub fn logbook(&self) -> Option<&[String]> {
        self.logbook.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() { "success" } else { "failed" }
    }

    /// Turns a failed run into [`JobError::EngineFailed`].
    pub fn check(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(JobError::EngineFailed(Box::new(self)))
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "status: {} <{code}>", self.status())?,
            None => write!(f, "status: {} <none>", self.status())?,
        }
        if let Some(path) = &self.logbook_path {
            write!(f, "\nlogbook_file: {}", path.display())?;
        }
        if let Some(lines) = &self.logbook {
            f.write_str("\nlogbook:")?;
            for line in lines {
                write!(f, "\n\t{line}")?;
            }
        }
        Ok(())
    }
}

/// Lines after the last section marker, up to and including the end marker.
pub fn last_run(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut ended = false;
    for line in text.lines() {
        if line.contains(SECTION_MARKER) {
            lines.clear();
            ended = false;
            continue;
        }
        if ended {
            continue;
        }
        lines.push(line.to_string());
        if line.contains(END_MARKER) {
            ended = true;
        }
    }
    lines
}
