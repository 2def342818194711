//! Table specifications: what to tabulate and how to protect it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use sdc_hierarchy::TreeRecode;

use crate::overrides::CellOverrides;
use crate::rules::{SafetyRuleSpec, format_number};

/// Pseudo-variable counting contributors instead of summing a column.
pub const FREQUENCY_RESPONSE: &str = "<freq>";
/// Name of the response column in output written for frequency tables.
pub const FREQUENCY_COLUMN: &str = "Freq";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Frequency,
    Variable(String),
}

impl Response {
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Frequency => None,
            Self::Variable(name) => Some(name),
        }
    }

    /// Column holding the response in the engine's output file.
    pub fn result_column(&self) -> &str {
        match self {
            Self::Frequency => FREQUENCY_COLUMN,
            Self::Variable(name) => name,
        }
    }
}

impl From<&str> for Response {
    fn from(name: &str) -> Self {
        if name == FREQUENCY_RESPONSE {
            Self::Frequency
        } else {
            Self::Variable(name.to_string())
        }
    }
}

impl From<String> for Response {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

/// Cost of suppressing a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cost {
    Variable(String),
    Frequency,
    Unity,
    Distance,
}

impl Cost {
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Engine code of a pseudo-cost.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Variable(_) => None,
            Self::Frequency => Some(-1),
            Self::Unity => Some(-2),
            Self::Distance => Some(-3),
        }
    }
}

/// Secondary suppression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressMethod {
    Hypercube,
    Modular,
    Optimal,
    Network,
    Rounding,
    TabularAdjustment,
}

impl SuppressMethod {
    pub fn code(self) -> &'static str {
        match self {
            Self::Hypercube => "GH",
            Self::Modular => "MOD",
            Self::Optimal => "OPT",
            Self::Network => "NET",
            Self::Rounding => "RND",
            Self::TabularAdjustment => "CTA",
        }
    }

    /// Arguments used when a method is configured without any.
    pub fn default_args(self) -> Vec<MethodArg> {
        let ints: &[i64] = match self {
            Self::Hypercube => &[0, 1],
            Self::Modular => &[5, 1, 1, 1],
            Self::Optimal => &[5],
            Self::Rounding => &[0, 10, 0, 3],
            Self::Network | Self::TabularAdjustment => &[],
        };
        ints.iter().copied().map(MethodArg::Int).collect()
    }
}

impl fmt::Display for SuppressMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown suppression method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for SuppressMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GH" | "GHMITER" | "HYPERCUBE" => Ok(Self::Hypercube),
            "MOD" | "MODULAR" => Ok(Self::Modular),
            "OPT" | "OPTIMAL" => Ok(Self::Optimal),
            "NET" | "NETWORK" => Ok(Self::Network),
            "RND" | "ROUNDING" => Ok(Self::Rounding),
            "CTA" | "TABULAR_ADJUSTMENT" => Ok(Self::TabularAdjustment),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Positional argument of a suppression method.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodArg {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for MethodArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_number(*value)),
            Self::Bool(value) => write!(f, "{}", u8::from(*value)),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for MethodArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MethodArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MethodArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for MethodArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Suppression method plus its positional arguments; `None` leaves a slot
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Suppression {
    pub method: SuppressMethod,
    pub args: Vec<Option<MethodArg>>,
}

impl Suppression {
    pub fn new(method: SuppressMethod) -> Self {
        Self {
            method,
            args: Vec::new(),
        }
    }

    /// The method with its usual arguments, e.g. `GH(t,0,1)`.
    pub fn with_default_args(method: SuppressMethod) -> Self {
        Self {
            method,
            args: method.default_args().into_iter().map(Some).collect(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<MethodArg>) -> Self {
        self.args.push(Some(arg.into()));
        self
    }

    #[must_use]
    pub fn with_empty_arg(mut self) -> Self {
        self.args.push(None);
        self
    }

    /// `METHOD(t,arg1,,arg3)` for the table at `table_index`.
    pub fn render(&self, table_index: usize) -> String {
        let mut parts = vec![table_index.to_string()];
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.as_ref().map(ToString::to_string).unwrap_or_default()),
        );
        format!("{}({})", self.method, parts.join(","))
    }
}

/// How the engine should recode a variable of one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Recode {
    /// An existing `.grc` file.
    File(PathBuf),
    /// Collapse a hierarchy to this many levels.
    Level(u32),
    /// Codes to keep, written to a `.grc` file during setup.
    Tree(TreeRecode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub explanatory: Vec<String>,
    pub response: Response,
    pub shadow: Option<String>,
    pub cost: Option<Cost>,
    pub lambda: Option<f64>,
    pub safety_rule: SafetyRuleSpec,
    pub overrides: Option<CellOverrides>,
    pub recodes: Vec<(String, Recode)>,
    pub suppression: Option<Suppression>,
    pub write_options: Vec<(String, bool)>,
    pub output_path: Option<PathBuf>,
}

impl Table {
    pub fn new<I, S>(explanatory: I, response: impl Into<Response>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            explanatory: explanatory.into_iter().map(Into::into).collect(),
            response: response.into(),
            shadow: None,
            cost: None,
            lambda: None,
            safety_rule: SafetyRuleSpec::default(),
            overrides: None,
            recodes: Vec::new(),
            suppression: None,
            write_options: vec![("AS".to_string(), true)],
            output_path: None,
        }
    }

    /// A table counting contributors per cell.
    pub fn frequency<I, S>(explanatory: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(explanatory, Response::Frequency)
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: impl Into<String>) -> Self {
        self.shadow = Some(shadow.into());
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Cost) -> Self {
        self.cost = Some(cost);
        self
    }

    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    #[must_use]
    pub fn with_safety_rule(mut self, rules: SafetyRuleSpec) -> Self {
        self.safety_rule = rules;
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: CellOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    #[must_use]
    pub fn with_recode(mut self, variable: impl Into<String>, recode: Recode) -> Self {
        self.recodes.push((variable.into(), recode));
        self
    }

    #[must_use]
    pub fn with_suppression(mut self, suppression: Suppression) -> Self {
        self.suppression = Some(suppression);
        self
    }

    /// Sets a `WRITETABLE` option such as `AS` or `SE`.
    #[must_use]
    pub fn with_write_option(mut self, key: impl Into<String>, enabled: bool) -> Self {
        let key = key.into();
        match self.write_options.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, value)) => *value = enabled,
            None => self.write_options.push((key, enabled)),
        }
        self
    }

    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Explanatory variables followed by recode targets.
    pub fn categorical_variables(&self) -> Vec<&str> {
        self.explanatory
            .iter()
            .map(String::as_str)
            .chain(self.recodes.iter().map(|(variable, _)| variable.as_str()))
            .collect()
    }

    /// Response, shadow and cost variables that refer to real columns.
    pub fn numeric_variables(&self) -> Vec<&str> {
        self.response
            .variable()
            .into_iter()
            .chain(self.shadow.as_deref())
            .chain(self.cost.as_ref().and_then(Cost::variable))
            .collect()
    }

    pub fn find_variables(&self) -> Vec<&str> {
        let mut variables = self.categorical_variables();
        variables.extend(self.numeric_variables());
        variables
    }

    /// Response column name in the engine's output.
    pub fn result_column(&self) -> &str {
        self.response.result_column()
    }
}
