/// Gap filling for continuous time series.
///
/// Expands a sparse bucket map into one entry per calendar period between
/// the earliest and latest bucket. Filled keys use the same format as the
/// observed ones, so a monthly chart gains `2024-02`, never `2024-02-01`.
use crate::error::ChartResult;
use crate::types::Period;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

/// Fill every missing period between the first and last bucket with zero.
///
/// Bounds are found by calendar position, not by string order. An empty map
/// is returned unchanged; a key that is not a valid bucket of `period` is a
/// [`ChartError::ParseError`](crate::ChartError::ParseError).
pub fn fill(data: &BTreeMap<String, f64>, period: Period) -> ChartResult<BTreeMap<String, f64>> {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for key in data.keys() {
        let start = period.parse_key(key)?;
        bounds = Some(match bounds {
            None => (start, start),
            Some((first, last)) => (first.min(start), last.max(start)),
        });
    }
    let Some((first, last)) = bounds else {
        return Ok(data.clone());
    };

    let mut filled = BTreeMap::new();
    let mut cursor = Some(first);
    while let Some(start) = cursor.filter(|start| *start <= last) {
        let key = period.key(start);
        let value = match data.get(&key) {
            Some(value) => *value,
            None => {
                trace!(key = %key, "filling empty period");
                0.0
            }
        };
        filled.insert(key, value);
        cursor = period.next(start);
    }

    Ok(filled)
}
