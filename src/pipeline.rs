/// The series orchestrator.
///
/// For each series of a chart: fetch records, drop ungroupable ones, sort by
/// the raw grouping field, bucket by key, aggregate each bucket and, for
/// continuous date charts, fill empty periods. Builds are all-or-nothing.
///
/// # Example
///
/// ```ignore
/// use chart_prep::{ChartBuilder, ChartSpec, ChartType, MemorySource, ReportType};
///
/// let spec = ChartSpec::new("Orders", ReportType::GroupByDate, ChartType::Line, "created_at")
///     .continuous_time(true);
/// let source = MemorySource::new(records);
/// let datasets = ChartBuilder::new(&spec).build(&source)?;
/// ```
use crate::aggregate::Aggregator;
use crate::error::ChartResult;
use crate::fill;
use crate::filter::RecordFilter;
use crate::key::KeyExtractor;
use crate::options::ChartSpec;
use crate::series::{Dataset, Series};
use crate::source::RecordSource;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Builds the datasets of one chart.
pub struct ChartBuilder<'a> {
    spec: &'a ChartSpec,
    today: NaiveDate,
}

impl<'a> ChartBuilder<'a> {
    /// Create a builder anchored at the current UTC date.
    pub fn new(spec: &'a ChartSpec) -> Self {
        Self {
            spec,
            today: Utc::now().date_naive(),
        }
    }

    /// Anchor relative date windows at `today`.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Build one dataset per series, in declaration order.
    ///
    /// Any failure aborts the whole build and is returned as a
    /// [`ChartError::PipelineError`](crate::ChartError::PipelineError).
    pub fn build<S: RecordSource>(&self, source: &S) -> ChartResult<Vec<Dataset>> {
        self.try_build(source).map_err(|err| {
            warn!(chart = %self.spec.name, error = %err, "chart build failed");
            err.into_pipeline()
        })
    }

    fn try_build<S: RecordSource>(&self, source: &S) -> ChartResult<Vec<Dataset>> {
        self.spec.validate()?;
        self.spec
            .series_list()
            .iter()
            .map(|series| self.build_series(source, series))
            .collect()
    }

    fn build_series<S: RecordSource>(&self, source: &S, series: &Series) -> ChartResult<Dataset> {
        let filter = RecordFilter::new(self.spec, self.today);
        let query = filter.query_for(series);
        let mut records = filter.retain_groupable(source.fetch(&query)?);

        debug!(
            chart = %self.spec.name,
            series = %series.name,
            records = records.len(),
            "records fetched"
        );

        if records.is_empty() {
            return Ok(Dataset::new(series, BTreeMap::new()));
        }

        let keys = KeyExtractor::new(self.spec);
        keys.sort_records(&mut records);

        let mut groups: BTreeMap<String, Vec<S::Item>> = BTreeMap::new();
        for record in records {
            let key = keys.key_of(&record)?;
            groups.entry(key).or_default().push(record);
        }

        let aggregator = Aggregator::new(self.spec);
        let mut data = groups
            .into_iter()
            .map(|(key, group)| Ok((key, aggregator.aggregate(&group)?)))
            .collect::<ChartResult<BTreeMap<_, _>>>()?;

        if self.spec.continuous_time {
            if self.spec.report_type.is_date() {
                data = fill::fill(&data, self.spec.period)?;
            } else {
                debug!(
                    chart = %self.spec.name,
                    report_type = %self.spec.report_type,
                    "continuous_time ignored for non-date chart"
                );
            }
        }

        debug!(
            chart = %self.spec.name,
            series = %series.name,
            buckets = data.len(),
            "dataset built"
        );

        Ok(Dataset::new(series, data))
    }
}

/// Build a chart's datasets anchored at the current UTC date.
pub fn build<S: RecordSource>(source: &S, spec: &ChartSpec) -> ChartResult<Vec<Dataset>> {
    ChartBuilder::new(spec).build(source)
}
