//! Library surface of the `sdc` command: job files and logging setup.

pub mod config;
pub mod logging;

pub use config::{JobConfig, load_job};
