/// Record sources.
///
/// A [`RecordSource`] answers one [`RecordQuery`] per series. Sources backed
/// by a query engine translate the query into their own language; the
/// bundled [`MemorySource`] evaluates it in-process.
use crate::error::ChartResult;
use crate::filter::RecordQuery;
use crate::record::Record;
use serde_json::Value as JsonValue;
use tracing::trace;

/// Fetches the records matching a query.
pub trait RecordSource {
    type Item: Record;

    /// Fetch matching records, in source order.
    fn fetch(&self, query: &RecordQuery) -> ChartResult<Vec<Self::Item>>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    type Item = S::Item;

    fn fetch(&self, query: &RecordQuery) -> ChartResult<Vec<Self::Item>> {
        (**self).fetch(query)
    }
}

/// An in-memory collection of JSON records.
///
/// Raw predicates are parsed with [`Filter::parse`](crate::query::Filter::parse);
/// an unparseable predicate fails the fetch with a config error.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<JsonValue>,
}

impl MemorySource {
    pub fn new(records: Vec<JsonValue>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array.
    pub fn from_json(text: &str) -> ChartResult<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<JsonValue> for MemorySource {
    fn from_iter<I: IntoIterator<Item = JsonValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl RecordSource for MemorySource {
    type Item = JsonValue;

    fn fetch(&self, query: &RecordQuery) -> ChartResult<Vec<JsonValue>> {
        if query.is_unrestricted() {
            return Ok(self.records.clone());
        }

        let matcher = query.matcher()?;
        let records: Vec<JsonValue> = self
            .records
            .iter()
            .filter(|r| matcher.admits(*r))
            .cloned()
            .collect();
        trace!(
            total = self.records.len(),
            matched = records.len(),
            "memory source fetch"
        );
        Ok(records)
    }
}
