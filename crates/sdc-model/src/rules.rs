//! Safety rules deciding which cells are sensitive.
//!
//! Rules are validated when constructed and render as `CODE(params…)`.
//! A table carries rules on individual level and on holding level; the
//! engine tells them apart by position, so [`compose`] pads the individual
//! part with dummy rules before appending the holding part.

use std::fmt;

use crate::error::{RuleError, RuleLevel};

pub const DEFAULT_MANUAL_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Dominance,
    Percent,
    Frequency,
    Request,
    Zero,
    Missing,
    Weight,
    Manual,
}

impl RuleKind {
    /// All kinds in composition order.
    pub const ALL: [RuleKind; 8] = [
        Self::Dominance,
        Self::Percent,
        Self::Frequency,
        Self::Request,
        Self::Zero,
        Self::Missing,
        Self::Weight,
        Self::Manual,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Dominance => "NK",
            Self::Percent => "P",
            Self::Frequency => "FREQ",
            Self::Request => "REQ",
            Self::Zero => "ZERO",
            Self::Missing => "MIS",
            Self::Weight => "WGT",
            Self::Manual => "MAN",
        }
    }

    /// How often the kind may appear per level, if limited.
    pub fn maximum(self) -> Option<usize> {
        match self {
            Self::Dominance | Self::Percent => Some(2),
            Self::Request | Self::Zero => Some(1),
            Self::Frequency | Self::Missing | Self::Weight | Self::Manual => None,
        }
    }

    /// Placeholder used to fill unused individual-level slots.
    pub fn dummy(self) -> Option<&'static str> {
        match self {
            Self::Dominance => Some("NK(0, 0)"),
            Self::Percent => Some("P(0, 0)"),
            Self::Request => Some("REQ(0, 0, 0)"),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }

    /// Kind of a rendered rule, read from the code before `(`.
    pub fn classify(rule: &str) -> Option<Self> {
        let code = rule.split('(').next().unwrap_or_default().trim();
        Self::from_code(code)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dominance => "dominance",
            Self::Percent => "p%",
            Self::Frequency => "frequency",
            Self::Request => "request",
            Self::Zero => "zero",
            Self::Missing => "missing",
            Self::Weight => "weight",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// A validated rule, e.g. `NK(3, 75)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyRule {
    kind: RuleKind,
    params: Vec<f64>,
}

impl SafetyRule {
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }
}

impl fmt::Display for SafetyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| format_number(*p)).collect();
        write!(f, "{}({})", self.kind.code(), params.join(", "))
    }
}

impl From<SafetyRule> for String {
    fn from(rule: SafetyRule) -> Self {
        rule.to_string()
    }
}

/// Renders a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn percentage(kind: RuleKind, name: &str, value: f64) -> Result<f64, RuleError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(RuleError::invalid(
            kind,
            format!("{name} should be a percentage, got {}", format_number(value)),
        ))
    }
}

fn positive(kind: RuleKind, name: &str, value: i64) -> Result<f64, RuleError> {
    if value >= 1 {
        Ok(value as f64)
    } else {
        Err(RuleError::invalid(
            kind,
            format!("{name} should be positive, got {value}"),
        ))
    }
}

/// (n, k)-dominance: unsafe when the `n` largest contributors make up more
/// than `k`% of the cell.
pub fn dominance_rule(n: i64, k: f64) -> Result<SafetyRule, RuleError> {
    let kind = RuleKind::Dominance;
    let n = positive(kind, "n", n)?;
    let k = percentage(kind, "k", k)?;
    Ok(SafetyRule {
        kind,
        params: vec![n, k],
    })
}

/// p%-rule with `n` intruders.
pub fn p_rule(p: f64, n: i64) -> Result<SafetyRule, RuleError> {
    let kind = RuleKind::Percent;
    let n = positive(kind, "n", n)?;
    let p = percentage(kind, "p", p)?;
    Ok(SafetyRule {
        kind,
        params: vec![p, n],
    })
}

pub fn frequency_rule(n: i64, safety_range: f64) -> Result<SafetyRule, RuleError> {
    let kind = RuleKind::Frequency;
    let n = positive(kind, "n", n)?;
    let safety_range = percentage(kind, "safety_range", safety_range)?;
    Ok(SafetyRule {
        kind,
        params: vec![n, safety_range],
    })
}

pub fn request_rule(
    percent1: f64,
    percent2: f64,
    safety_margin: f64,
) -> Result<SafetyRule, RuleError> {
    let kind = RuleKind::Request;
    let percent1 = percentage(kind, "percent1", percent1)?;
    let percent2 = percentage(kind, "percent2", percent2)?;
    Ok(SafetyRule {
        kind,
        params: vec![percent1, percent2, safety_margin],
    })
}

/// Zero rule. The safety range is passed through unchecked.
pub fn zero_rule(safety_range: f64) -> SafetyRule {
    SafetyRule {
        kind: RuleKind::Zero,
        params: vec![safety_range],
    }
}

pub fn missing_rule(is_safe: bool) -> SafetyRule {
    SafetyRule {
        kind: RuleKind::Missing,
        params: vec![f64::from(u8::from(is_safe))],
    }
}

pub fn weight_rule(apply_weights: bool) -> SafetyRule {
    SafetyRule {
        kind: RuleKind::Weight,
        params: vec![f64::from(u8::from(apply_weights))],
    }
}

pub fn manual_rule(margin: f64) -> Result<SafetyRule, RuleError> {
    let kind = RuleKind::Manual;
    let margin = percentage(kind, "margin", margin)?;
    Ok(SafetyRule {
        kind,
        params: vec![margin],
    })
}

/// Joins individual and holding rules into the order the engine expects.
///
/// For every limited kind that occurs at holding level, the individual part
/// is padded with dummies up to the maximum so holding rules land in their
/// own slots. Rules with an unknown code pass through unpadded.
pub fn compose<I, H>(individual: &[I], holding: &[H]) -> Result<Vec<String>, RuleError>
where
    I: AsRef<str>,
    H: AsRef<str>,
{
    let mut padding = Vec::new();
    for kind in RuleKind::ALL {
        let Some(maximum) = kind.maximum() else {
            continue;
        };
        let in_individual = count_kind(individual, kind);
        let in_holding = count_kind(holding, kind);
        for (count, level) in [
            (in_individual, RuleLevel::Individual),
            (in_holding, RuleLevel::Holding),
        ] {
            if count > maximum {
                return Err(RuleError::TooManyOccurrences {
                    kind,
                    code: kind.code(),
                    level,
                    maximum,
                });
            }
        }
        if in_holding > 0
            && let Some(dummy) = kind.dummy()
        {
            padding.extend(std::iter::repeat_n(dummy, maximum - in_individual));
        }
    }

    Ok(individual
        .iter()
        .map(|rule| rule.as_ref().to_string())
        .chain(padding.into_iter().map(str::to_string))
        .chain(holding.iter().map(|rule| rule.as_ref().to_string()))
        .collect())
}

fn count_kind<S: AsRef<str>>(rules: &[S], kind: RuleKind) -> usize {
    rules
        .iter()
        .filter(|rule| RuleKind::classify(rule.as_ref()) == Some(kind))
        .count()
}

/// Safety rules of one table, split by level. Raw strings are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyRuleSpec {
    pub individual: Vec<String>,
    pub holding: Vec<String>,
}

impl SafetyRuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a `|`-separated rule string into individual-level rules.
    pub fn parse(text: &str) -> Self {
        Self {
            individual: split_rules(text),
            holding: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_individual(mut self, rule: impl Into<String>) -> Self {
        self.individual.push(rule.into());
        self
    }

    #[must_use]
    pub fn with_holding(mut self, rule: impl Into<String>) -> Self {
        self.holding.push(rule.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.holding.is_empty()
    }

    pub fn compose(&self) -> Result<Vec<String>, RuleError> {
        compose(&self.individual, &self.holding)
    }

    /// The composed rules joined with `|`.
    pub fn render(&self) -> Result<String, RuleError> {
        Ok(self.compose()?.join("|"))
    }
}

pub fn split_rules(text: &str) -> Vec<String> {
    text.split('|')
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .map(str::to_string)
        .collect()
}
