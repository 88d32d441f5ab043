/// Enumerated option types shared across the pipeline.
///
/// Each type parses from the option names callers use in their chart
/// configuration (`group_by_date`, `line`, `month`, ...). Parse failures are
/// reported as [`ChartError::ConfigError`] with a message listing the accepted
/// values.
use crate::error::ChartError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How records are mapped to bucket keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Key is the literal value of the grouping field.
    GroupByString,
    /// Key is the grouping field of a related entity.
    GroupByRelationship,
    /// Key is the calendar period the grouping field falls in.
    GroupByDate,
}

impl ReportType {
    /// The option name of this report type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupByString => "group_by_string",
            Self::GroupByRelationship => "group_by_relationship",
            Self::GroupByDate => "group_by_date",
        }
    }

    /// Whether keys are calendar periods.
    pub fn is_date(&self) -> bool {
        matches!(self, Self::GroupByDate)
    }
}

impl FromStr for ReportType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group_by_string" => Ok(Self::GroupByString),
            "group_by_relationship" => Ok(Self::GroupByRelationship),
            "group_by_date" => Ok(Self::GroupByDate),
            _ => Err(ChartError::config(
                "report_type option should contain one of these values - \
                 group_by_date/group_by_string/group_by_relationship",
            )),
        }
    }
}

/// The kind of chart the datasets are prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Pie => "pie",
        }
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "pie" => Ok(Self::Pie),
            _ => Err(ChartError::config(
                "chart_type option should contain one of these values - line/bar/pie",
            )),
        }
    }
}

/// Calendar granularity of date buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for Period {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ChartError::config(
                "group_by_period option should contain one of these values - day/week/month/year",
            )),
        }
    }
}

/// Named window ending today, used to restrict records by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPeriod {
    /// Since Monday of the current week.
    Week,
    /// Since the first day of the current month.
    Month,
    /// Since January 1st of the current year.
    Year,
}

impl FilterPeriod {
    /// The bucket granularity whose start this window begins at.
    pub fn period(&self) -> Period {
        match self {
            Self::Week => Period::Week,
            Self::Month => Period::Month,
            Self::Year => Period::Year,
        }
    }
}

impl FromStr for FilterPeriod {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ChartError::config(
                "filter_period option should contain one of these values - week/month/year",
            )),
        }
    }
}

/// Aggregate function applied to each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    /// Number of records in the bucket.
    #[default]
    Count,
    /// Sum of a numeric field.
    Sum,
    /// Average of a numeric field.
    Avg,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }

    /// Whether this function reads a value field.
    pub fn needs_field(&self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl FromStr for AggregateFunction {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            _ => Err(ChartError::config(
                "aggregate_function option should contain one of these values - count/sum/avg",
            )),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(ReportType, ChartType, Period, AggregateFunction);
