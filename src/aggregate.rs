/// Reduces a bucket of records to a single number.
use crate::error::{ChartError, ChartResult};
use crate::options::ChartSpec;
use crate::record::{FieldValue, Record};
use crate::types::AggregateFunction;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A function applied to each aggregated value.
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl Transform {
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: f64) -> f64 {
        (self.0)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Applies a chart's aggregate function to buckets.
pub struct Aggregator<'a> {
    spec: &'a ChartSpec,
}

impl<'a> Aggregator<'a> {
    pub fn new(spec: &'a ChartSpec) -> Self {
        Self { spec }
    }

    /// Aggregate one bucket.
    ///
    /// Records are taken in the given order; with a distinct field set, the
    /// first record carrying each value is kept.
    pub fn aggregate<R: Record>(&self, records: &[R]) -> ChartResult<f64> {
        let kept = self.distinct(records);

        let value = match self.spec.aggregate_function {
            AggregateFunction::Count => kept.len() as f64,
            AggregateFunction::Sum => self.values(&kept)?.iter().sum(),
            AggregateFunction::Avg => {
                let values = self.values(&kept)?;
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
        };

        Ok(match &self.spec.transform {
            Some(transform) => transform.apply(value),
            None => value,
        })
    }

    fn distinct<'r, R: Record>(&self, records: &'r [R]) -> Vec<&'r R> {
        let Some(field) = self.spec.distinct_field.as_deref() else {
            return records.iter().collect();
        };

        let mut seen = HashSet::new();
        records
            .iter()
            .filter(|r| {
                let identity = r.field(field).unwrap_or(FieldValue::Null).identity();
                seen.insert(identity)
            })
            .collect()
    }

    /// Numeric values of the aggregate field.
    fn values<R: Record>(&self, records: &[&R]) -> ChartResult<Vec<f64>> {
        let field = self.spec.aggregate_field.as_deref().ok_or_else(|| {
            ChartError::config(format!(
                "please specify aggregate_field option for {} aggregate",
                self.spec.aggregate_function
            ))
        })?;

        records
            .iter()
            .map(|r| match r.field(field) {
                None | Some(FieldValue::Null) => {
                    Err(ChartError::field(field, "is missing on a record"))
                }
                Some(v) => v.as_f64().ok_or_else(|| {
                    ChartError::field(field, format!("is not numeric: '{}'", v.to_key_string()))
                }),
            })
            .collect()
    }
}
