/// Bucket key extraction.
///
/// Keys are strings. String charts use the grouping field as-is,
/// relationship charts read it from the related entity, and date charts
/// format the calendar period the field falls in.
use crate::calendar::{self, DEFAULT_DATE_FORMAT};
use crate::error::{ChartError, ChartResult};
use crate::options::ChartSpec;
use crate::record::{FieldValue, Record};
use crate::types::ReportType;
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Computes bucket keys for a chart.
pub struct KeyExtractor<'a> {
    spec: &'a ChartSpec,
}

impl<'a> KeyExtractor<'a> {
    pub fn new(spec: &'a ChartSpec) -> Self {
        Self { spec }
    }

    /// Bucket key of a record.
    pub fn key_of(&self, record: &dyn Record) -> ChartResult<String> {
        let field = self.spec.group_by_field.as_str();

        match self.spec.report_type {
            ReportType::GroupByString => record
                .field(field)
                .map(|v| v.to_key_string())
                .ok_or_else(|| ChartError::field(field, "is missing on a record")),
            ReportType::GroupByRelationship => {
                let relationship = self.spec.relationship_name.as_deref().unwrap_or_default();
                Ok(record
                    .related(relationship)
                    .and_then(|related| related.field(field))
                    .map(|v| v.to_key_string())
                    .unwrap_or_default())
            }
            ReportType::GroupByDate => match record.field(field) {
                None => Ok(String::new()),
                Some(v) if v.is_empty() => Ok(String::new()),
                Some(FieldValue::Timestamp(ts)) => Ok(self.spec.period.key(ts.date())),
                Some(raw) => {
                    let ts = self.parse(&raw.to_key_string())?;
                    Ok(self.spec.period.key(ts.date()))
                }
            },
        }
    }

    /// Parse a raw date with the configured format.
    ///
    /// Without a configured format the default layout is tried first, then
    /// other ISO-8601 layouts.
    fn parse(&self, raw: &str) -> ChartResult<NaiveDateTime> {
        match self.spec.date_format.as_deref() {
            Some(format) => calendar::parse_with_format(raw, format),
            None => calendar::parse_with_format(raw, DEFAULT_DATE_FORMAT)
                .or_else(|err| calendar::parse_lenient(raw).ok_or(err)),
        }
    }

    /// Stable sort of records by the raw grouping field, ascending.
    ///
    /// Records missing the field sort first.
    pub fn sort_records<R: Record>(&self, records: &mut [R]) {
        let field = self.spec.group_by_field.as_str();
        records.sort_by_cached_key(|r| SortKey(r.field(field)));
    }
}

/// Orders optional field values with absent values first.
struct SortKey(Option<FieldValue>);

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.sort_cmp(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
