// Record normalization and group/leaf key resolution.
//
// Every report feed names its fields slightly differently, so each report
// supplies a `ReportShape`: the canonical metric universe, an alias table,
// and the rules for extracting the group and leaf identity of a row. The
// normalizer is pure and total: a record missing optional fields never
// fails, it just falls back to sentinels and zero counts.
use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde_json::Value;

use crate::types::{CanonicalMetricRecord, Counts, RawRecord, SortDirection};
use crate::util::{count_from_value, text_from_value};

/// How to pull one identity string out of a raw record: the first present
/// alias wins, and a missing or blank value falls back to the sentinel.
pub struct KeyRule {
    pub aliases: &'static [&'static str],
    pub sentinel: &'static str,
}

pub enum LeafRule {
    /// Leaf identity comes straight from an aliased field (counsellor,
    /// college, segment label).
    Field(KeyRule),
    /// Leaf identity is an hour-slot label (`"09:00-10:00"`) bucketed from
    /// an aliased timestamp field. Records landing in the same slot merge
    /// into one leaf during rollup.
    HourSlot(KeyRule),
}

/// Cross-tab handling for the API-disposition pivot: each raw record holds
/// a list of per-college cells whose sub-counts are folded into composite
/// `"<metric>:<college>"` count keys, plus plain per-metric row totals.
pub struct PivotRule {
    pub list_aliases: &'static [&'static str],
    pub college_aliases: &'static [&'static str],
    pub college_sentinel: &'static str,
    pub metrics: &'static [&'static str],
}

/// Per-report parametrization of the engine. One engine serves every report
/// screen; adding a report type means adding a shape, not a new pipeline.
pub struct ReportShape {
    pub name: &'static str,
    /// Payload key in the backend response and file slug for exports.
    pub slug: &'static str,
    /// Canonical metric universe; every normalized record carries all of
    /// these, defaulting to 0.
    pub metrics: &'static [&'static str],
    /// Canonical metric name -> accepted raw field names, in priority
    /// order. Metrics absent from this table are looked up by their own
    /// name only.
    pub aliases: &'static [(&'static str, &'static [&'static str])],
    pub group: KeyRule,
    pub leaf: LeafRule,
    pub pivot: Option<PivotRule>,
    pub primary_volume_metric: &'static str,
    pub default_sort: (&'static str, SortDirection),
    /// Column order for previews and CSV export.
    pub columns: &'static [&'static str],
}

/// Diagnostics from one normalization pass, printed with the load summary.
/// `duplicate_leaves` makes merge-by-sum visible: a backend bug that starts
/// emitting duplicate rows shows up here instead of silently vanishing
/// into the rollup.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub records_in: usize,
    pub sentinel_groups: usize,
    pub sentinel_leaves: usize,
    pub duplicate_leaves: usize,
}

pub fn normalize_records(
    records: &[RawRecord],
    shape: &ReportShape,
) -> (Vec<CanonicalMetricRecord>, NormalizeReport) {
    let mut report = NormalizeReport {
        records_in: records.len(),
        ..NormalizeReport::default()
    };
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());

    for raw in records {
        let rec = normalize_one(raw, shape, &mut report);
        if !seen.insert((rec.group_key.clone(), rec.leaf_key.clone())) {
            report.duplicate_leaves += 1;
        }
        out.push(rec);
    }
    (out, report)
}

fn normalize_one(
    raw: &RawRecord,
    shape: &ReportShape,
    report: &mut NormalizeReport,
) -> CanonicalMetricRecord {
    let group_key = match resolve_key(raw, shape.group.aliases) {
        Some(k) => k,
        None => {
            report.sentinel_groups += 1;
            shape.group.sentinel.to_string()
        }
    };

    let leaf_key = match &shape.leaf {
        LeafRule::Field(rule) => resolve_key(raw, rule.aliases).unwrap_or_else(|| {
            report.sentinel_leaves += 1;
            rule.sentinel.to_string()
        }),
        LeafRule::HourSlot(rule) => hour_slot(raw, rule.aliases).unwrap_or_else(|| {
            report.sentinel_leaves += 1;
            rule.sentinel.to_string()
        }),
    };

    let mut counts = Counts::new();
    for metric in shape.metrics {
        counts.insert((*metric).to_string(), metric_value(raw, metric, shape.aliases));
    }
    if let Some(pivot) = &shape.pivot {
        fold_pivot_cells(raw, pivot, &mut counts);
    }

    CanonicalMetricRecord {
        group_key,
        leaf_key,
        counts,
        is_total_row: false,
    }
}

fn resolve_key(raw: &RawRecord, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|a| text_from_value(raw.get(*a)))
}

fn metric_value(raw: &RawRecord, metric: &str, aliases: &[(&str, &[&str])]) -> u64 {
    match aliases.iter().find(|(m, _)| *m == metric) {
        Some((_, names)) => names
            .iter()
            .find(|a| raw.contains_key(**a))
            .map(|a| count_from_value(raw.get(*a)))
            .unwrap_or(0),
        None => count_from_value(raw.get(metric)),
    }
}

fn hour_slot(raw: &RawRecord, aliases: &[&str]) -> Option<String> {
    let stamp = aliases.iter().find_map(|a| text_from_value(raw.get(*a)))?;
    let hour = parse_hour(&stamp)?;
    Some(format!("{:02}:00-{:02}:00", hour, (hour + 1) % 24))
}

fn parse_hour(s: &str) -> Option<u32> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.hour());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.hour());
        }
    }
    None
}

fn fold_pivot_cells(raw: &RawRecord, pivot: &PivotRule, counts: &mut Counts) {
    let cells = pivot
        .list_aliases
        .iter()
        .find_map(|a| raw.get(*a))
        .and_then(Value::as_array);
    let Some(cells) = cells else { return };

    for cell in cells {
        let Some(obj) = cell.as_object() else { continue };
        let college = pivot
            .college_aliases
            .iter()
            .find_map(|a| text_from_value(obj.get(*a)))
            .unwrap_or_else(|| pivot.college_sentinel.to_string());
        for metric in pivot.metrics {
            let v = count_from_value(obj.get(*metric));
            *counts.entry(format!("{metric}:{college}")).or_insert(0) += v;
            *counts.entry((*metric).to_string()).or_insert(0) += v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static SHAPE: ReportShape = ReportShape {
        name: "Test Funnel",
        slug: "test_funnel",
        metrics: &["lead_count", "attempted", "formFilled"],
        aliases: &[
            ("lead_count", &["lead_count", "total_leads"]),
            ("formFilled", &["formFilled", "formfilled"]),
        ],
        group: KeyRule {
            aliases: &["supervisorName", "supervisor"],
            sentinel: "Unassigned",
        },
        leaf: LeafRule::Field(KeyRule {
            aliases: &["counsellorName", "counsellor"],
            sentinel: "Unknown",
        }),
        pivot: None,
        primary_volume_metric: "lead_count",
        default_sort: ("lead_count", SortDirection::Desc),
        columns: &["lead_count", "attempted", "formFilled"],
    };

    fn raw(v: serde_json::Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn first_present_alias_wins() {
        let recs = vec![raw(json!({
            "supervisor": "A", "counsellor": "X",
            "total_leads": 12, "formfilled": 3
        }))];
        let (out, _) = normalize_records(&recs, &SHAPE);
        assert_eq!(out[0].counts["lead_count"], 12);
        assert_eq!(out[0].counts["formFilled"], 3);
        assert_eq!(out[0].counts["attempted"], 0);
    }

    #[test]
    fn alias_order_takes_priority_over_later_names() {
        let recs = vec![raw(json!({
            "supervisor": "A", "counsellor": "X",
            "lead_count": 5, "total_leads": 99
        }))];
        let (out, _) = normalize_records(&recs, &SHAPE);
        assert_eq!(out[0].counts["lead_count"], 5);
    }

    #[test]
    fn blank_group_falls_back_to_sentinel() {
        let recs = vec![raw(json!({
            "supervisor": "", "counsellor": "X", "lead_count": 0
        }))];
        let (out, report) = normalize_records(&recs, &SHAPE);
        assert_eq!(out[0].group_key, "Unassigned");
        assert_eq!(report.sentinel_groups, 1);
    }

    #[test]
    fn every_metric_is_present_after_normalization() {
        let recs = vec![raw(json!({ "supervisor": "A", "counsellor": "X" }))];
        let (out, _) = normalize_records(&recs, &SHAPE);
        for metric in SHAPE.metrics {
            assert_eq!(out[0].counts.get(*metric), Some(&0));
        }
    }

    #[test]
    fn duplicate_pairs_are_tallied() {
        let recs = vec![
            raw(json!({ "supervisor": "A", "counsellor": "X", "lead_count": 1 })),
            raw(json!({ "supervisor": "A", "counsellor": "X", "lead_count": 2 })),
            raw(json!({ "supervisor": "A", "counsellor": "Y", "lead_count": 3 })),
        ];
        let (_, report) = normalize_records(&recs, &SHAPE);
        assert_eq!(report.duplicate_leaves, 1);
    }

    #[test]
    fn hour_slots_bucket_timestamps() {
        static SLOT_SHAPE: ReportShape = ReportShape {
            name: "Attempt Time",
            slug: "attempt_time",
            metrics: &["attempted", "connected"],
            aliases: &[],
            group: KeyRule {
                aliases: &["segment"],
                sentinel: "Unassigned",
            },
            leaf: LeafRule::HourSlot(KeyRule {
                aliases: &["attemptTime", "attempt_time"],
                sentinel: "No Slot",
            }),
            pivot: None,
            primary_volume_metric: "attempted",
            default_sort: ("attempted", SortDirection::Desc),
            columns: &["attempted", "connected"],
        };
        let recs = vec![
            raw(json!({ "segment": "Morning", "attempt_time": "2026-08-01T09:23:11", "attempted": 4 })),
            raw(json!({ "segment": "Morning", "attempt_time": "2026-08-01 09:59:59", "attempted": 2 })),
            raw(json!({ "segment": "Morning", "attempt_time": "not a time", "attempted": 1 })),
        ];
        let (out, report) = normalize_records(&recs, &SLOT_SHAPE);
        assert_eq!(out[0].leaf_key, "09:00-10:00");
        assert_eq!(out[1].leaf_key, "09:00-10:00");
        assert_eq!(out[2].leaf_key, "No Slot");
        assert_eq!(report.sentinel_leaves, 1);
        assert_eq!(report.duplicate_leaves, 1);
    }

    #[test]
    fn pivot_cells_fold_into_composite_keys() {
        static PIVOT_SHAPE: ReportShape = ReportShape {
            name: "Dispositions",
            slug: "dispositions",
            metrics: &["dnp", "tf", "proceed", "total"],
            aliases: &[],
            group: KeyRule {
                aliases: &["supervisor"],
                sentinel: "No Supervisor",
            },
            leaf: LeafRule::Field(KeyRule {
                aliases: &["counsellor"],
                sentinel: "Unassigned",
            }),
            pivot: Some(PivotRule {
                list_aliases: &["colleges", "collegeCells"],
                college_aliases: &["college", "collegeName"],
                college_sentinel: "Unknown College",
                metrics: &["dnp", "tf", "proceed", "total"],
            }),
            primary_volume_metric: "total",
            default_sort: ("total", SortDirection::Desc),
            columns: &["dnp", "tf", "proceed", "total"],
        };
        let recs = vec![raw(json!({
            "supervisor": "A", "counsellor": "X",
            "colleges": [
                { "college": "Northfield", "dnp": 2, "tf": 1, "proceed": 1, "total": 4 },
                { "college": "Lakeview", "dnp": 1, "tf": 0, "proceed": 3, "total": 4 }
            ]
        }))];
        let (out, _) = normalize_records(&recs, &PIVOT_SHAPE);
        let counts = &out[0].counts;
        assert_eq!(counts["dnp:Northfield"], 2);
        assert_eq!(counts["proceed:Lakeview"], 3);
        assert_eq!(counts["dnp"], 3);
        assert_eq!(counts["total"], 8);
    }
}
