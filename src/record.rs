/// Dynamic field access on opaque records.
///
/// The pipeline never assumes a schema. It reads the fields named by a
/// [`ChartSpec`](crate::ChartSpec) through the [`Record`] trait, which any
/// record type can implement. `serde_json::Value` implements it out of the box
/// using dot notation for nested fields (`"user.name"`).
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// A single field value read from a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// An already-typed date/time; formatted directly when bucketing by date.
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    /// Whether the value counts as empty for grouping purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render the value as a bucket key.
    pub fn to_key_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Numeric view of the value. Numeric strings are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Numbers compare numerically (numeric strings included), timestamps
    /// compare with text through their formatted representation. Returns
    /// `None` for incompatible types.
    pub fn partial_compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Number(a), FieldValue::Text(_)) => a.partial_cmp(&other.as_f64()?),
            (FieldValue::Text(_), FieldValue::Number(b)) => self.as_f64()?.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(_), FieldValue::Text(b)) => {
                Some(self.to_key_string().as_str().cmp(b.as_str()))
            }
            (FieldValue::Text(a), FieldValue::Timestamp(_)) => {
                Some(a.as_str().cmp(other.to_key_string().as_str()))
            }
            _ => None,
        }
    }

    /// Total order used when sorting records by a field.
    ///
    /// Values order by type first (nulls first), then within their type.
    /// Text always compares lexically here, numeric or not.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| match (self, other) {
                (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
                (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
                (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
                (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }

    /// A string that identifies the value for de-duplication.
    ///
    /// Numeric text shares its identity with the number (`"7"` and `7`).
    pub(crate) fn identity(&self) -> String {
        match self {
            FieldValue::Null => "n:".to_string(),
            FieldValue::Bool(b) => format!("b:{b}"),
            FieldValue::Number(n) => format!("f:{}", format_number(*n)),
            FieldValue::Text(s) => match self.as_f64() {
                Some(n) if !s.trim().is_empty() => format!("f:{}", format_number(n)),
                _ => format!("s:{s}"),
            },
            FieldValue::Timestamp(ts) => format!("t:{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Timestamp(_) => 3,
            FieldValue::Text(_) => 4,
        }
    }
}

impl From<&JsonValue> for FieldValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(*b),
            JsonValue::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            JsonValue::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::from(&value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// Named attribute access on a record.
pub trait Record {
    /// Read a field by name. `None` means the field is absent.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Follow a related-entity accessor. `None` means no related entity.
    fn related(&self, name: &str) -> Option<&dyn Record>;
}

impl Record for JsonValue {
    fn field(&self, name: &str) -> Option<FieldValue> {
        get_field(self, name).map(FieldValue::from)
    }

    fn related(&self, name: &str) -> Option<&dyn Record> {
        match get_field(self, name)? {
            related @ JsonValue::Object(_) => Some(related as &dyn Record),
            _ => None,
        }
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }

    fn related(&self, name: &str) -> Option<&dyn Record> {
        (**self).related(name)
    }
}

/// Get a field from a JSON value using dot notation.
fn get_field<'a>(value: &'a JsonValue, field: &str) -> Option<&'a JsonValue> {
    let mut current = value;
    for part in field.split('.') {
        match current {
            JsonValue::Object(map) => {
                current = map.get(part)?;
            }
            JsonValue::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Integral numbers render without a fractional part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
