//! # chart-prep: Chart Dataset Preparation
//!
//! chart-prep turns a collection of records into labeled, bucketed datasets
//! ready for a charting library:
//! - **Filtering** - date windows, explicit ranges, raw predicates and scopes
//! - **Bucketing** - by field value, related-entity field, or calendar period
//! - **Aggregation** - count, sum or average, with optional de-duplication
//!   and a post-aggregate transform
//! - **Gap filling** - continuous time series with zero for empty periods
//!
//! ## Quick Start
//!
//! ```ignore
//! use chart_prep::prelude::*;
//!
//! let spec = ChartSpec::new("Signups", ReportType::GroupByDate, ChartType::Line, "created_at")
//!     .with_period(Period::Month)
//!     .continuous_time(true);
//!
//! let source = MemorySource::new(vec![
//!     json!({"created_at": "2024-01-05 10:00:00"}),
//!     json!({"created_at": "2024-03-20 16:30:00"}),
//! ]);
//!
//! let datasets = ChartBuilder::new(&spec).build(&source)?;
//! // {"2024-01": 1.0, "2024-02": 0.0, "2024-03": 1.0}
//! println!("{:?}", datasets[0].data);
//! ```
//!
//! ## Architecture
//!
//! One build runs, for each series of a chart:
//!
//! 1. **Record filter** (`filter`) - builds the [`RecordQuery`] a
//!    [`RecordSource`] evaluates, then drops records with an empty grouping field
//! 2. **Key extractor** (`key`) - sorts records by the raw grouping field and
//!    computes each record's bucket key
//! 3. **Aggregator** (`aggregate`) - reduces each bucket to a number
//! 4. **Period filler** (`fill`) - fills gaps in continuous date charts
//!
//! The pipeline is synchronous and keeps no state between builds. A failure in
//! any series aborts the build with a single [`ChartError::PipelineError`].

// Internal modules
mod error;
mod types;

pub mod aggregate;
pub mod calendar;
pub mod fill;
pub mod filter;
pub mod key;
pub mod options;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod series;
pub mod source;

// Public API exports
pub use aggregate::{Aggregator, Transform};
pub use error::{ChartError, ChartResult};
pub use filter::{DateWindow, Predicate, RecordFilter, RecordQuery, TimeWindow, WindowBound};
pub use key::KeyExtractor;
pub use options::{ChartOptions, ChartSpec};
pub use pipeline::{build, ChartBuilder};
pub use query::{CompareOp, Filter};
pub use record::{FieldValue, Record};
pub use series::{Dataset, Series};
pub use source::{MemorySource, RecordSource};
pub use types::{AggregateFunction, ChartType, FilterPeriod, Period, ReportType};

// Re-export commonly used external types for convenience
pub use chrono::NaiveDate;
pub use serde_json::{json, Value as JsonValue};

/// Prelude module for convenient imports.
///
/// Import everything you need with:
/// ```ignore
/// use chart_prep::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ChartError, ChartResult};
    pub use crate::options::{ChartOptions, ChartSpec};
    pub use crate::pipeline::{build, ChartBuilder};
    pub use crate::record::{FieldValue, Record};
    pub use crate::series::{Dataset, Series};
    pub use crate::source::{MemorySource, RecordSource};
    pub use crate::types::{AggregateFunction, ChartType, FilterPeriod, Period, ReportType};
    pub use crate::{Predicate, Transform};
    pub use chrono::NaiveDate;
    pub use serde_json::{json, Value as JsonValue};
}
