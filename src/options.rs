/// Chart configuration.
///
/// Callers describe a chart either with a [`ChartOptions`] map (typically
/// deserialized from JSON) or directly with the [`ChartSpec`] builder.
/// Either way, the result is an immutable [`ChartSpec`] that has passed
/// [`ChartSpec::validate`].
///
/// # Example
///
/// ```ignore
/// use chart_prep::{ChartOptions, ChartSpec};
///
/// let options: ChartOptions = serde_json::from_str(r#"{
///     "chart_title": "Users by month",
///     "report_type": "group_by_date",
///     "chart_type": "line",
///     "group_by_field": "created_at",
///     "group_by_period": "month"
/// }"#)?;
/// let spec = ChartSpec::from_options(&options)?;
/// assert_eq!(spec.name, "users_by_month");
/// ```
use crate::aggregate::Transform;
use crate::calendar;
use crate::error::{ChartError, ChartResult};
use crate::filter::{DateWindow, Predicate};
use crate::series::Series;
use crate::types::{AggregateFunction, ChartType, FilterPeriod, Period, ReportType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Raw chart options, named as callers write them.
///
/// Every field is optional here; [`ChartSpec::from_options`] enforces which
/// ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub chart_title: Option<String>,
    pub report_type: Option<String>,
    pub chart_type: Option<String>,
    pub group_by_field: Option<String>,
    pub group_by_period: Option<String>,
    pub group_by_field_format: Option<String>,
    pub relationship_name: Option<String>,
    pub aggregate_function: Option<String>,
    pub aggregate_field: Option<String>,
    pub field_distinct: Option<String>,
    pub continuous_time: bool,
    pub filter_field: Option<String>,
    pub filter_days: Option<JsonValue>,
    pub filter_period: Option<String>,
    pub range_date_start: Option<String>,
    pub range_date_end: Option<String>,
    pub conditions: Option<Vec<Series>>,
    pub scopes: Option<String>,
}

impl ChartOptions {
    /// Parse options from a JSON document.
    pub fn from_json(text: &str) -> ChartResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Validated, immutable configuration of one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    /// Display title.
    pub title: String,
    /// Identifier derived from the title (`"Users by month"` → `users_by_month`).
    pub name: String,
    pub report_type: ReportType,
    pub chart_type: ChartType,
    /// Field the records are grouped by.
    pub group_by_field: String,
    /// Related-entity accessor for relationship charts.
    pub relationship_name: Option<String>,
    /// Bucket granularity for date charts.
    pub period: Period,
    /// chrono format of raw date values; `None` uses
    /// [`DEFAULT_DATE_FORMAT`](crate::calendar::DEFAULT_DATE_FORMAT) and common
    /// ISO-8601 layouts.
    pub date_format: Option<String>,
    pub aggregate_function: AggregateFunction,
    pub aggregate_field: Option<String>,
    /// De-duplicate each bucket by this field before aggregating.
    pub distinct_field: Option<String>,
    pub transform: Option<Transform>,
    /// Fill empty periods between the first and last bucket.
    pub continuous_time: bool,
    pub window: DateWindow,
    /// Scope applied to non-line charts.
    pub scope: Option<Predicate>,
    /// Declared series; empty means one implicit unconditional series.
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// Create a chart with default aggregation (`count`) and granularity (`day`).
    pub fn new(
        title: impl Into<String>,
        report_type: ReportType,
        chart_type: ChartType,
        group_by_field: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            name: slug(&title),
            title,
            report_type,
            chart_type,
            group_by_field: group_by_field.into(),
            relationship_name: None,
            period: Period::default(),
            date_format: None,
            aggregate_function: AggregateFunction::default(),
            aggregate_field: None,
            distinct_field: None,
            transform: None,
            continuous_time: false,
            window: DateWindow::default(),
            scope: None,
            series: Vec::new(),
        }
    }

    /// Validate a raw option map into a chart spec.
    pub fn from_options(options: &ChartOptions) -> ChartResult<Self> {
        let title = required(&options.chart_title, "chart_title")?;
        let report_type: ReportType = required(&options.report_type, "report_type")?.parse()?;
        let group_by_field = required(&options.group_by_field, "group_by_field")?;
        let period = match present(&options.group_by_period) {
            Some(p) => p.parse()?,
            None => Period::default(),
        };
        let aggregate_function = match present(&options.aggregate_function) {
            Some(f) => f.parse()?,
            None => AggregateFunction::default(),
        };
        let chart_type: ChartType = required(&options.chart_type, "chart_type")?.parse()?;
        let days = options.filter_days.as_ref().map(parse_days).transpose()?;
        let filter_period = present(&options.filter_period)
            .map(str::parse::<FilterPeriod>)
            .transpose()?;

        let range = match (
            present(&options.range_date_start),
            present(&options.range_date_end),
        ) {
            (Some(start), Some(end)) => Some((
                parse_range_date(start, "range_date_start")?,
                parse_range_date(end, "range_date_end")?,
            )),
            _ => None,
        };

        let mut spec = Self::new(title, report_type, chart_type, group_by_field);
        spec.period = period;
        spec.aggregate_function = aggregate_function;
        spec.relationship_name = present(&options.relationship_name).map(String::from);
        spec.date_format = present(&options.group_by_field_format).map(String::from);
        spec.aggregate_field = present(&options.aggregate_field).map(String::from);
        spec.distinct_field = present(&options.field_distinct).map(String::from);
        spec.continuous_time = options.continuous_time;
        spec.window = DateWindow {
            field: present(&options.filter_field).map(String::from),
            days,
            period: filter_period,
            range,
        };
        spec.scope = present(&options.scopes).map(Predicate::raw);
        spec.series = options.conditions.clone().unwrap_or_default();

        spec.validate()?;
        Ok(spec)
    }

    /// Check the options that depend on each other.
    pub fn validate(&self) -> ChartResult<()> {
        if self.title.trim().is_empty() {
            return Err(missing("chart_title"));
        }
        if self.group_by_field.trim().is_empty() {
            return Err(missing("group_by_field"));
        }
        if self.report_type == ReportType::GroupByRelationship
            && self.relationship_name.as_deref().is_none_or(|r| r.trim().is_empty())
        {
            return Err(missing("relationship_name"));
        }
        if self.aggregate_function.needs_field()
            && self.aggregate_field.as_deref().is_none_or(|f| f.trim().is_empty())
        {
            return Err(ChartError::config(format!(
                "please specify aggregate_field option for {} aggregate",
                self.aggregate_function
            )));
        }
        Ok(())
    }

    /// Series to build, in declaration order.
    pub fn series_list(&self) -> Vec<Series> {
        if self.series.is_empty() {
            vec![Series::default()]
        } else {
            self.series.clone()
        }
    }

    /// Set the related-entity accessor.
    pub fn with_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationship_name = Some(name.into());
        self
    }

    /// Set the bucket granularity.
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Set the chrono format of raw date values.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the aggregate function and the field it reads.
    pub fn with_aggregate(mut self, function: AggregateFunction, field: impl Into<String>) -> Self {
        self.aggregate_function = function;
        self.aggregate_field = Some(field.into());
        self
    }

    /// De-duplicate buckets by a field.
    pub fn with_distinct(mut self, field: impl Into<String>) -> Self {
        self.distinct_field = Some(field.into());
        self
    }

    /// Apply a function to every aggregated value.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Enable or disable gap filling.
    pub fn continuous_time(mut self, enabled: bool) -> Self {
        self.continuous_time = enabled;
        self
    }

    /// Keep records from the last `days` days.
    pub fn filter_days(mut self, field: impl Into<String>, days: u32) -> Self {
        self.window.field = Some(field.into());
        self.window.days = Some(days);
        self
    }

    /// Keep records since the start of the current week, month or year.
    pub fn filter_period(mut self, field: impl Into<String>, period: FilterPeriod) -> Self {
        self.window.field = Some(field.into());
        self.window.period = Some(period);
        self
    }

    /// Keep records within an inclusive date range.
    pub fn filter_range(mut self, field: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.window.field = Some(field.into());
        self.window.range = Some((start, end));
        self
    }

    /// Set the scope predicate.
    pub fn with_scope(mut self, scope: Predicate) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Declare a series.
    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }
}

fn missing(option: &str) -> ChartError {
    ChartError::config(format!("please specify {option} option"))
}

/// A non-blank option value.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, option: &str) -> ChartResult<&'a str> {
    present(value).ok_or_else(|| missing(option))
}

fn parse_days(value: &JsonValue) -> ChartResult<u32> {
    let days = match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    days.and_then(|d| u32::try_from(d).ok())
        .ok_or_else(|| ChartError::config("filter_days option should be a non-negative integer"))
}

fn parse_range_date(value: &str, option: &str) -> ChartResult<NaiveDate> {
    calendar::parse_lenient(value)
        .map(|dt| dt.date())
        .ok_or_else(|| ChartError::config(format!("{option} option should be a date (YYYY-MM-DD)")))
}

/// Lower-case identifier with `_` separators.
///
/// Whitespace, dashes and underscores become a single separator; other
/// punctuation is dropped.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }
    out
}
