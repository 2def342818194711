//! Input data and table specifications for statistical disclosure control.
//!
//! - [`InputData`]: a polars frame with per-column metadata ([`InputColumn`])
//!   and role columns, either microdata or already aggregated table data
//! - [`Table`]: explanatory variables, response, costs, safety rules and
//!   suppression settings of one output table
//! - [`rules`]: validated safety rules and their composition
//! - [`CellOverrides`]: manual per-cell changes (a priori files)

pub mod column;
pub mod error;
pub mod input;
mod metadata;
pub mod overrides;
pub mod rules;
pub mod table;

pub use column::{DEFAULT_CODE_LENGTH, DEFAULT_DECIMALS, InputColumn, ValueKind};
pub use error::{ModelError, Result, RuleError, RuleLevel};
pub use input::{
    DEFAULT_REQUEST_VALUES, InputData, InputKind, MicrodataRoles, TabularRoles,
    default_status_markers,
};
pub use overrides::{CellChange, CellOverride, CellOverrides, OverrideStatus};
pub use rules::{
    RuleKind, SafetyRule, SafetyRuleSpec, compose, dominance_rule, format_number,
    frequency_rule, manual_rule, missing_rule, p_rule, request_rule, weight_rule, zero_rule,
};
pub use table::{
    Cost, FREQUENCY_COLUMN, FREQUENCY_RESPONSE, MethodArg, Recode, Response, SuppressMethod,
    Suppression, Table, UnknownMethod,
};
