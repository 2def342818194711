//! Compiles disclosure-control jobs into TauArgus batch files.
//!
//! A [`Job`] ties input data to one or more tables. [`Job::setup`] writes
//! every file the engine reads (data, metadata, hierarchies, code lists,
//! a priori files, recode files) next to a batch file whose commands are
//! emitted in the order the engine expects:
//!
//! 1. open data and metadata
//! 2. specify each table with its safety rules
//! 3. read the data
//! 4. per table: a priori changes, recodes, suppression
//! 5. linked suppression over all tables
//! 6. write each table
//!
//! Running the engine itself is left to a [`Runner`].

pub mod command;
pub mod error;
pub mod job;
pub mod paths;
pub mod runner;
pub mod writer;

pub use command::{BatchCommand, CSV_TABLE_KIND, RecodeTarget};
pub use error::{JobError, Result};
pub use job::{DEFAULT_JOB_NAME, INPUT_TABLE_NAME, Job, Logbook};
pub use paths::{JobPaths, slugify};
pub use runner::{END_MARKER, RunReport, Runner, SECTION_MARKER, last_run};
pub use writer::{BatchWriter, render_batch};
