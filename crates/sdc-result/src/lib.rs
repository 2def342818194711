//! Decoding of protected tables written by TauArgus.
//!
//! The engine writes each table with its explanatory columns, the response
//! and a numeric `Status` column. [`TableResult`] decodes the status codes
//! and masks suppressed values.

pub mod error;
pub mod status;
pub mod table;

pub use error::{Result, ResultError};
pub use status::{CellStatus, decode_status};
pub use table::{DEFAULT_MARKER, STATUS_COLUMN, TableResult};
