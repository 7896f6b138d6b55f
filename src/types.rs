use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// One raw row as fetched from the backend. Field names vary per report
/// feed (`lead_count` vs `total_leads`, `formFilled` vs `formfilled`), so
/// rows stay as loose JSON objects until the normalizer maps them onto the
/// canonical shape.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Additive counters keyed by canonical metric name.
pub type Counts = BTreeMap<String, u64>;

/// Percentage metrics keyed by derived metric name.
pub type Derived = BTreeMap<String, f64>;

/// A normalized leaf row: one counsellor, hour slot, or college line under
/// a group. Every metric of the report's universe is present in `counts`
/// (missing raw fields become 0).
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMetricRecord {
    pub group_key: String,
    pub leaf_key: String,
    pub counts: Counts,
    pub is_total_row: bool,
}

/// One entry per distinct group key, holding its leaves and the metric-wise
/// sum of their counts. `rolled_counts[m]` equals the sum of `counts[m]`
/// over `leaves` at all times after aggregation; sorting only reorders.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub key: String,
    pub leaves: Vec<CanonicalMetricRecord>,
    pub rolled_counts: Counts,
    pub derived: Derived,
    pub suppress: bool,
    pub is_total_row: bool,
}

impl GroupNode {
    pub fn new(key: String) -> Self {
        GroupNode {
            key,
            leaves: Vec::new(),
            rolled_counts: Counts::new(),
            derived: Derived::new(),
            suppress: false,
            is_total_row: false,
        }
    }
}

/// The full two-tier aggregation result for one report refresh. Rebuilt
/// wholesale from raw input on every refresh, never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTree {
    pub groups: Vec<GroupNode>,
    pub grand_total: GroupNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Group,
    Leaf,
    Total,
}

impl RowKind {
    pub fn label(self) -> &'static str {
        match self {
            RowKind::Group => "group",
            RowKind::Leaf => "leaf",
            RowKind::Total => "total",
        }
    }
}

/// One render-ready row of the flattened report, consumed by the table
/// preview and the CSV export so both show identical figures.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub kind: RowKind,
    pub key: String,
    pub counts: Counts,
    pub derived: Derived,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Caller-supplied knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Canonical or derived metric name, or `name`/`key` for the row label.
    /// `None` falls back to the report's primary volume metric, descending.
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    /// Hide the sentinel group from the projection when all its counts are
    /// zero. The hidden group still contributes to the grand total.
    pub suppress_empty_sentinel_group: bool,
    /// The activity counter used for zero-row demotion.
    pub primary_volume_metric: String,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown sort key `{key}`: not a canonical metric, derived metric, or row name")]
    UnknownSortKey { key: String },
}

/// Headline figures for one generated report, written to `summary.json`.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub report: String,
    pub groups: usize,
    pub leaves: usize,
    pub primary_metric: String,
    pub primary_total: u64,
}
