//! Numeric and category filters.
//!
//! Grid columns holding numbers (age, overall rating, wins...) can be narrowed
//! with a short typed expression such as `>80`, `<=-5` or just `50`. This module
//! converts between that text, the structured [`NumericFilterValue`] stored in
//! preferences, and a predicate over a sample value.
//!
//! ## Grammar
//!
//! ```text
//! expr     := ws* [operator ws*] [sign] digits ['.' digits] ws*
//! operator := "<>" | ">=" | "<=" | ">" | "<" | "="
//! sign     := "+" | "-"
//! ```
//!
//! Operators are matched longest first, so `<>` and `>=` win over `<` and `>`.
//! A missing operator means `=`. Anything else (empty input, stray characters,
//! doubled operators like `>>50`) does not parse.
//!
//! Parse failures are values, not errors: [`parse`] returns `None` and callers
//! treat that as "leave the stored filter alone".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Comparison applied by a numeric filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
}

impl FilterOperator {
    /// Operators in the order the parser must try them.
    const LONGEST_FIRST: [FilterOperator; 6] = [
        FilterOperator::Ne,
        FilterOperator::Gte,
        FilterOperator::Lte,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Eq,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Gte => ">=",
            FilterOperator::Lte => "<=",
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "<>",
        }
    }

    /// Applies the comparison as `sample <op> target`.
    pub fn compare(self, sample: f64, target: f64) -> bool {
        match self {
            FilterOperator::Gt => sample > target,
            FilterOperator::Lt => sample < target,
            FilterOperator::Gte => sample >= target,
            FilterOperator::Lte => sample <= target,
            FilterOperator::Eq => sample == target,
            FilterOperator::Ne => sample != target,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed numeric filter: `{operator, value}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericFilterValue {
    pub operator: FilterOperator,
    pub value: f64,
}

impl NumericFilterValue {
    pub fn new(operator: FilterOperator, value: f64) -> Self {
        Self { operator, value }
    }

    /// Whether `sample` satisfies this filter. Missing samples never match.
    pub fn matches(&self, sample: Option<f64>) -> bool {
        match sample {
            Some(sample) => self.operator.compare(sample, self.value),
            None => false,
        }
    }
}

/// Renders the filter back into editable text; `=` is written as a bare number.
impl fmt::Display for NumericFilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FilterOperator::Eq => write!(f, "{}", self.value),
            op => write!(f, "{}{}", op, self.value),
        }
    }
}

impl FromStr for NumericFilterValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).ok_or_else(|| format!("Invalid filter expression: {}", s))
    }
}

/// Parses a filter expression. Returns `None` for anything outside the grammar.
pub fn parse(expression: &str) -> Option<NumericFilterValue> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (operator, rest) = FilterOperator::LONGEST_FIRST
        .iter()
        .find_map(|op| trimmed.strip_prefix(op.symbol()).map(|rest| (*op, rest)))
        .unwrap_or((FilterOperator::Eq, trimmed));

    let number = rest.trim_start();
    if !is_decimal_literal(number) {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(NumericFilterValue { operator, value })
}

/// Inverse of [`parse`] for populating a text field. `None` renders as `""`.
pub fn format(filter: Option<&NumericFilterValue>) -> String {
    filter.map(ToString::to_string).unwrap_or_default()
}

/// Tests a sample against an optional filter. No filter always passes.
pub fn evaluate(sample: Option<f64>, filter: Option<&NumericFilterValue>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter.matches(sample),
    }
}

/// Tests a category code against a set of allowed codes. An empty set means
/// "all"; a missing code never satisfies a non-empty set.
pub fn category_matches(code: Option<&str>, allowed: &BTreeSet<String>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    code.is_some_and(|code| allowed.contains(code))
}

// [sign] digits ['.' digits]
fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s
        .strip_prefix('-')
        .or_else(|| s.strip_prefix('+'))
        .unwrap_or(s);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nf(operator: FilterOperator, value: f64) -> NumericFilterValue {
        NumericFilterValue::new(operator, value)
    }

    #[test]
    fn parse_operators() {
        assert_eq!(parse(">80"), Some(nf(FilterOperator::Gt, 80.0)));
        assert_eq!(parse("<=-5"), Some(nf(FilterOperator::Lte, -5.0)));
        assert_eq!(parse(">=10"), Some(nf(FilterOperator::Gte, 10.0)));
        assert_eq!(parse("<3"), Some(nf(FilterOperator::Lt, 3.0)));
        assert_eq!(parse("<>7"), Some(nf(FilterOperator::Ne, 7.0)));
        assert_eq!(parse("=4"), Some(nf(FilterOperator::Eq, 4.0)));
    }

    #[test]
    fn parse_bare_number_defaults_to_eq() {
        assert_eq!(parse("50"), Some(nf(FilterOperator::Eq, 50.0)));
        assert_eq!(parse("+2.5"), Some(nf(FilterOperator::Eq, 2.5)));
    }

    #[test]
    fn parse_ignores_surrounding_whitespace() {
        assert_eq!(parse("  >=  12.75  "), Some(nf(FilterOperator::Gte, 12.75)));
        assert_eq!(parse("\t< -1"), Some(nf(FilterOperator::Lt, -1.0)));
    }

    #[test]
    fn parse_rejects_invalid_input() {
        for input in ["", "   ", "abc", ">>50", "!50", "50abc", "5.", ".5", "1.2.3", "- 5", ">"] {
            assert_eq!(parse(input), None, "expected {:?} to be rejected", input);
        }
        let overflow = format!(">1{}", "0".repeat(400));
        assert_eq!(parse(&overflow), None);
        assert_eq!(parse(&"9".repeat(400)), None);
    }

    #[test]
    fn format_omits_eq_prefix() {
        assert_eq!(format(Some(&nf(FilterOperator::Eq, 50.0))), "50");
        assert_eq!(format(Some(&nf(FilterOperator::Gt, 80.0))), ">80");
        assert_eq!(format(Some(&nf(FilterOperator::Lte, -5.0))), "<=-5");
        assert_eq!(format(Some(&nf(FilterOperator::Ne, 0.5))), "<>0.5");
        assert_eq!(format(None), "");
    }

    #[test]
    fn format_then_parse_is_stable() {
        for input in [">80", "<=-5", "50", "<>0.25", ">= 3", "=9"] {
            let parsed = parse(input).unwrap();
            assert_eq!(parse(&format(Some(&parsed))), Some(parsed));
        }
    }

    #[test]
    fn evaluate_comparisons() {
        let gt80 = nf(FilterOperator::Gt, 80.0);
        assert!(evaluate(Some(85.0), Some(&gt80)));
        assert!(!evaluate(Some(80.0), Some(&gt80)));
        assert!(evaluate(Some(80.0), Some(&nf(FilterOperator::Gte, 80.0))));
        assert!(evaluate(Some(3.0), Some(&nf(FilterOperator::Ne, 4.0))));
        assert!(!evaluate(Some(4.0), Some(&nf(FilterOperator::Ne, 4.0))));
        assert!(evaluate(Some(0.5), Some(&nf(FilterOperator::Eq, 0.5))));
    }

    #[test]
    fn evaluate_missing_sample_fails() {
        assert!(!evaluate(None, Some(&nf(FilterOperator::Gt, 0.0))));
        assert!(!evaluate(None, Some(&nf(FilterOperator::Ne, 0.0))));
    }

    #[test]
    fn evaluate_without_filter_passes() {
        assert!(evaluate(None, None));
        assert!(evaluate(Some(-1e9), None));
    }

    #[test]
    fn category_filter_empty_means_all() {
        let empty = BTreeSet::new();
        assert!(category_matches(Some("QB"), &empty));
        assert!(category_matches(None, &empty));

        let allowed: BTreeSet<String> = ["QB".to_string(), "RB".to_string()].into();
        assert!(category_matches(Some("RB"), &allowed));
        assert!(!category_matches(Some("WR"), &allowed));
        assert!(!category_matches(None, &allowed));
    }

    #[test]
    fn serializes_operator_as_symbol() {
        let json = serde_json::to_string(&nf(FilterOperator::Gte, 3.0)).unwrap();
        assert_eq!(json, r#"{"operator":">=","value":3.0}"#);
    }
}
