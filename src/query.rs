/// Predicate expressions over records.
///
/// This module provides the predicate engine used by in-memory record
/// sources. It supports:
///
/// - **Comparisons**: `=`, `!=` (or `<>`), `>`, `>=`, `<`, `<=`
/// - **Presence**: `IS NULL`, `IS NOT NULL`
/// - **Patterns**: `LIKE` with `%` and `_` wildcards
/// - **Logic**: `AND` binds tighter than `OR`
///
/// # Example
///
/// ```ignore
/// use chart_prep::query::Filter;
///
/// let filter = Filter::parse("status = 'paid' AND amount >= 10")?;
/// assert!(filter.matches_record(&json!({"status": "paid", "amount": 12})));
/// ```
use crate::error::{ChartError, ChartResult};
use crate::record::{FieldValue, Record};
use std::cmp::Ordering;

/// Comparison operator of a [`Filter::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Operator for a token; `<>` is an alias of `!=`.
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            _ => return None,
        })
    }

    /// Whether an ordering satisfies the operator. `None` (incomparable
    /// values) only satisfies `!=`.
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Self::Ne, ordering) => ordering != Some(Ordering::Equal),
            (_, None) => false,
            (Self::Eq, Some(o)) => o == Ordering::Equal,
            (Self::Gt, Some(o)) => o == Ordering::Greater,
            (Self::Gte, Some(o)) => o != Ordering::Less,
            (Self::Lt, Some(o)) => o == Ordering::Less,
            (Self::Lte, Some(o)) => o != Ordering::Greater,
        }
    }
}

/// A parsed predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field op value`. A missing field only satisfies `!=`.
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// Field is present and not null.
    Exists { field: String },
    /// Text field matches an anchored regex (from `LIKE`).
    Matches { field: String, pattern: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Build a comparison.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate this filter against a record.
    pub fn matches_record(&self, record: &dyn Record) -> bool {
        match self {
            Filter::Compare { field, op, value } => {
                op.holds(record.field(field).and_then(|v| v.partial_compare(value)))
            }
            Filter::Exists { field } => record.field(field).is_some_and(|v| v != FieldValue::Null),
            Filter::Matches { field, pattern } => match record.field(field) {
                Some(FieldValue::Text(s)) => {
                    regex::Regex::new(pattern).is_ok_and(|re| re.is_match(&s))
                }
                _ => false,
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches_record(record)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches_record(record)),
            Filter::Not(filter) => !filter.matches_record(record),
        }
    }

    /// Parse a raw predicate expression.
    ///
    /// Supports: `field = value`, `field > value`, `field <= value`, ...,
    /// `field IS [NOT] NULL`, `field LIKE 'pat%'`, joined with `AND` / `OR`.
    pub fn parse(expr: &str) -> ChartResult<Filter> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(invalid_expression(expr));
        }

        let alternatives = split_keyword(expr, "OR");
        if alternatives.len() > 1 {
            return alternatives
                .into_iter()
                .map(Filter::parse)
                .collect::<ChartResult<Vec<_>>>()
                .map(Filter::Or);
        }

        let conjuncts = split_keyword(expr, "AND");
        if conjuncts.len() > 1 {
            return conjuncts
                .into_iter()
                .map(Filter::parse)
                .collect::<ChartResult<Vec<_>>>()
                .map(Filter::And);
        }

        parse_comparison(expr)
    }
}

fn invalid_expression(expr: &str) -> ChartError {
    ChartError::config(format!(
        "Invalid predicate expression: '{expr}'. \
         Supported formats: field = value, field > value, field IS NULL, field LIKE 'x%', \
         joined with AND/OR"
    ))
}

/// Parse a single comparison: `field op value`.
fn parse_comparison(expr: &str) -> ChartResult<Filter> {
    let upper = expr.to_ascii_uppercase();
    if let Some(field) = upper.strip_suffix(" IS NOT NULL") {
        return Ok(Filter::Exists {
            field: expr[..field.len()].trim().to_string(),
        });
    }
    if let Some(field) = upper.strip_suffix(" IS NULL") {
        return Ok(Filter::Not(Box::new(Filter::Exists {
            field: expr[..field.len()].trim().to_string(),
        })));
    }

    let like = split_keyword(expr, "LIKE");
    if let [field, pattern] = like.as_slice() {
        let pattern = match parse_value(pattern.trim()) {
            FieldValue::Text(p) => p,
            other => other.to_key_string(),
        };
        return Ok(Filter::Matches {
            field: field.trim().to_string(),
            pattern: like_to_regex(&pattern),
        });
    }

    let (idx, op) = find_operator(expr).ok_or_else(|| invalid_expression(expr))?;
    let field = expr[..idx].trim();
    let value_str = expr[idx + op.len()..].trim();
    if field.is_empty() || value_str.is_empty() {
        return Err(invalid_expression(expr));
    }
    let op = CompareOp::from_token(op).ok_or_else(|| invalid_expression(expr))?;

    Ok(Filter::compare(field, op, parse_value(value_str)))
}

/// Parse a literal: quoted string, boolean, null, number, or bare word.
fn parse_value(value_str: &str) -> FieldValue {
    let quoted = value_str.len() >= 2
        && ((value_str.starts_with('"') && value_str.ends_with('"'))
            || (value_str.starts_with('\'') && value_str.ends_with('\'')));
    if quoted {
        return FieldValue::Text(value_str[1..value_str.len() - 1].to_string());
    }
    match value_str.to_ascii_lowercase().as_str() {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        "null" => return FieldValue::Null,
        _ => {}
    }
    if let Ok(num) = value_str.parse::<f64>() {
        return FieldValue::Number(num);
    }
    FieldValue::Text(value_str.to_string())
}

/// Find the first comparison operator outside quotes.
fn find_operator(expr: &str) -> Option<(usize, &'static str)> {
    const OPERATORS: [&str; 7] = ["<>", ">=", "<=", "!=", "=", ">", "<"];

    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    for i in 0..bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {
                if let Some(op) = OPERATORS
                    .iter()
                    .find(|op| bytes[i..].starts_with(op.as_bytes()))
                {
                    return Some((i, *op));
                }
            }
        }
    }
    None
}

/// Split on a whitespace-delimited keyword (case-insensitive) outside quotes.
fn split_keyword<'a>(expr: &'a str, keyword: &str) -> Vec<&'a str> {
    let bytes = expr.as_bytes();
    let kw = keyword.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {
                let end = i + kw.len();
                if i > 0
                    && end < bytes.len()
                    && bytes[i - 1].is_ascii_whitespace()
                    && bytes[end].is_ascii_whitespace()
                    && bytes[i..end].eq_ignore_ascii_case(kw)
                {
                    parts.push(&expr[start..i]);
                    start = end;
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }

    parts.push(&expr[start..]);
    parts
}

/// Translate a SQL `LIKE` pattern into an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
