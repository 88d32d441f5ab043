/// The record filter.
///
/// Filtering is split in two. [`RecordFilter::query_for`] turns a chart spec
/// and a series into a [`RecordQuery`] that the record source evaluates
/// (date window, raw conditions, scope). [`RecordFilter::retain_groupable`]
/// then drops records with an empty grouping field, which the pipeline does
/// itself after the fetch.
use crate::calendar;
use crate::error::ChartResult;
use crate::options::ChartSpec;
use crate::query::Filter;
use crate::record::Record;
use crate::series::Series;
use crate::types::{ChartType, FilterPeriod, ReportType};
use chrono::{Days, NaiveDate};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A scope predicate, passed opaquely to the record source.
#[derive(Clone)]
pub enum Predicate {
    /// Evaluated by calling it with each record.
    Callable(Arc<dyn Fn(&dyn Record) -> bool + Send + Sync>),
    /// A raw predicate string for the source's query engine.
    Raw(String),
}

impl Predicate {
    /// Wrap a closure as a predicate.
    pub fn callable(f: impl Fn(&dyn Record) -> bool + Send + Sync + 'static) -> Self {
        Self::Callable(Arc::new(f))
    }

    /// Wrap a raw predicate string.
    pub fn raw(expr: impl Into<String>) -> Self {
        Self::Raw(expr.into())
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Callable(_) => f.write_str("Callable(..)"),
            Predicate::Raw(expr) => f.debug_tuple("Raw").field(expr).finish(),
        }
    }
}

/// Date restrictions configured on a chart.
///
/// Only one of `days`, `period` and `range` takes effect, in that order,
/// and only when `field` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// Date field the window applies to.
    pub field: Option<String>,
    /// Keep records from the last N days.
    pub days: Option<u32>,
    /// Keep records since the start of the current week/month/year.
    pub period: Option<FilterPeriod>,
    /// Keep records within an inclusive date range.
    pub range: Option<(NaiveDate, NaiveDate)>,
}

/// Bound of a resolved time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    /// On or after the date.
    Since(NaiveDate),
    /// Within the inclusive range.
    Between(NaiveDate, NaiveDate),
}

/// A time window resolved against a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub field: String,
    pub bound: WindowBound,
    /// chrono format tried before the ISO-8601 layouts when reading dates.
    pub format: Option<String>,
}

impl TimeWindow {
    /// Whether the record's date field falls in the window.
    ///
    /// Dates compare at day granularity; records without a readable date
    /// field are outside every window.
    pub fn admits(&self, record: &dyn Record) -> bool {
        let value = record.field(&self.field);
        let Some(date) = value
            .as_ref()
            .and_then(|v| calendar::date_of(v, self.format.as_deref()))
        else {
            trace!(field = %self.field, value = ?value, "no readable date, outside window");
            return false;
        };
        match self.bound {
            WindowBound::Since(start) => date >= start,
            WindowBound::Between(start, end) => start <= date && date <= end,
        }
    }
}

/// Conditions a record source applies when fetching records for one series.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Date window, if any.
    pub window: Option<TimeWindow>,
    /// Raw predicate strings, combined with AND.
    pub conditions: Vec<String>,
    /// Scope predicate.
    pub scope: Option<Predicate>,
}

impl RecordQuery {
    /// Whether the query restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.window.is_none() && self.conditions.is_empty() && self.scope.is_none()
    }

    /// Compile raw predicates for in-process evaluation.
    pub fn matcher(&self) -> ChartResult<QueryMatcher<'_>> {
        let mut filters = self
            .conditions
            .iter()
            .map(|c| Filter::parse(c))
            .collect::<ChartResult<Vec<_>>>()?;
        if let Some(Predicate::Raw(expr)) = &self.scope {
            filters.push(Filter::parse(expr)?);
        }
        Ok(QueryMatcher {
            query: self,
            filters,
        })
    }
}

/// A [`RecordQuery`] with its raw predicates parsed.
pub struct QueryMatcher<'a> {
    query: &'a RecordQuery,
    filters: Vec<Filter>,
}

impl QueryMatcher<'_> {
    /// Whether a record satisfies every condition of the query.
    pub fn admits(&self, record: &dyn Record) -> bool {
        if let Some(window) = &self.query.window {
            if !window.admits(record) {
                return false;
            }
        }
        if let Some(Predicate::Callable(scope)) = &self.query.scope {
            if !scope(record) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches_record(record))
    }
}

/// Narrows records for one chart build.
pub struct RecordFilter<'a> {
    spec: &'a ChartSpec,
    today: NaiveDate,
}

impl<'a> RecordFilter<'a> {
    /// Create a filter; `today` anchors relative date windows.
    pub fn new(spec: &'a ChartSpec, today: NaiveDate) -> Self {
        Self { spec, today }
    }

    /// Resolve the configured date window. First configured rule wins.
    pub fn window(&self) -> Option<TimeWindow> {
        let window = &self.spec.window;
        let field = window.field.as_ref()?.clone();

        let bound = if let Some(days) = window.days {
            let start = self
                .today
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN);
            WindowBound::Since(start)
        } else if let Some(period) = window.period {
            WindowBound::Since(period.period().start_of(self.today))
        } else if let Some((start, end)) = window.range {
            WindowBound::Between(start, end)
        } else {
            return None;
        };

        Some(TimeWindow {
            field,
            bound,
            format: self.spec.date_format.clone(),
        })
    }

    /// Build the fetch conditions for a series.
    pub fn query_for(&self, series: &Series) -> RecordQuery {
        let mut query = RecordQuery {
            window: self.window(),
            ..RecordQuery::default()
        };

        if self.spec.chart_type == ChartType::Line && series.has_condition() {
            query.conditions.push(series.condition.trim().to_string());
        }

        if self.spec.chart_type != ChartType::Line {
            query.scope = self.spec.scope.clone();
        }

        query
    }

    /// Drop records whose grouping field is empty.
    ///
    /// Relationship charts keep every record: an absent related entity still
    /// counts, under the empty key.
    pub fn retain_groupable<R: Record>(&self, mut records: Vec<R>) -> Vec<R> {
        if self.spec.report_type != ReportType::GroupByRelationship {
            let field = self.spec.group_by_field.as_str();
            records.retain(|r| r.field(field).is_some_and(|v| !v.is_empty()));
        }
        records
    }

    /// Apply every filtering rule in-process.
    pub fn filter<R: Record>(&self, records: Vec<R>, series: &Series) -> ChartResult<Vec<R>> {
        let query = self.query_for(series);
        let matcher = query.matcher()?;
        let admitted = records.into_iter().filter(|r| matcher.admits(r)).collect();
        Ok(self.retain_groupable(admitted))
    }
}
