/// Series definitions and the datasets they produce.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, independently filtered run of the pipeline.
///
/// `condition` is a raw predicate handed to the record source; it only applies
/// to line charts. An empty condition matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Series {
    /// Display name of the dataset.
    pub name: String,
    /// Raw predicate restricting the series' records.
    pub condition: String,
    /// Display color of the dataset.
    pub color: String,
}

impl Series {
    /// Create a series with a display name and no condition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the raw predicate.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Whether the series carries a raw predicate.
    pub fn has_condition(&self) -> bool {
        !self.condition.trim().is_empty()
    }
}

/// The output of one series: bucket keys mapped to aggregated values.
///
/// `data` is ordered ascending by key and keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub color: String,
    pub data: BTreeMap<String, f64>,
}

impl Dataset {
    /// Create a dataset for a series.
    pub fn new(series: &Series, data: BTreeMap<String, f64>) -> Self {
        Self {
            name: series.name.clone(),
            color: series.color.clone(),
            data,
        }
    }

    /// Whether no bucket was produced.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value of a bucket.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.data.get(key).copied()
    }

    /// Bucket keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
