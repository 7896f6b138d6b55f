// Per-report parametrization and the pipeline entry point.
//
// Each report screen of the dashboard is one `ReportShape`: the same
// engine run with different aliases, keys, and columns. The pipeline is a
// single synchronous pass per refresh; nothing is cached or patched
// incrementally.
use crate::normalize::{self, KeyRule, LeafRule, NormalizeReport, PivotRule, ReportShape};
use crate::project::{self, ExpandMap};
use crate::rollup;
use crate::sort;
use crate::types::{DisplayRow, EngineConfig, EngineError, RawRecord, SortDirection};
use crate::{derive, util};

/// Lead funnel: supervisor -> counsellor, full funnel counters.
pub static LEAD_FUNNEL: ReportShape = ReportShape {
    name: "Lead Funnel",
    slug: "lead_funnel",
    metrics: &[
        "lead_count",
        "attempted",
        "connected",
        "connectedAnytime",
        "icc",
        "formFilled",
        "admission",
        "preNI",
    ],
    aliases: &[
        ("lead_count", &["lead_count", "total_leads"]),
        ("connectedAnytime", &["connectedAnytime", "connected_anytime"]),
        ("icc", &["icc", "icc_count"]),
        ("formFilled", &["formFilled", "formfilled"]),
        ("preNI", &["preNI", "pre_ni"]),
    ],
    group: KeyRule {
        aliases: &["supervisorName", "supervisor"],
        sentinel: "No Supervisor",
    },
    leaf: LeafRule::Field(KeyRule {
        aliases: &["counsellorName", "counsellor", "counselor"],
        sentinel: "Unassigned",
    }),
    pivot: None,
    primary_volume_metric: "lead_count",
    default_sort: ("lead_count", SortDirection::Desc),
    columns: &[
        "lead_count",
        "attempted",
        "connected",
        "connectedAnytime",
        "connectedAnytimePercent",
        "icc",
        "iccPercent",
        "formFilled",
        "leadToForm",
        "admission",
        "formToAdmission",
        "leadToAdmission",
        "preNI",
        "preNIPercent",
    ],
};

/// Connected calls: supervisor -> counsellor, dialing outcomes.
pub static CONNECTED_CALLS: ReportShape = ReportShape {
    name: "Connected Calls",
    slug: "connected_calls",
    metrics: &["lead_count", "attempted", "connected", "connectedAnytime", "icc"],
    aliases: &[
        ("lead_count", &["lead_count", "total_leads"]),
        ("connectedAnytime", &["connectedAnytime", "connected_anytime"]),
        ("icc", &["icc", "icc_count"]),
    ],
    group: KeyRule {
        aliases: &["supervisorName", "supervisor"],
        sentinel: "No Supervisor",
    },
    leaf: LeafRule::Field(KeyRule {
        aliases: &["counsellorName", "counsellor", "counselor"],
        sentinel: "Unassigned",
    }),
    pivot: None,
    primary_volume_metric: "attempted",
    default_sort: ("connectedAnytimePercent", SortDirection::Desc),
    columns: &[
        "lead_count",
        "attempted",
        "connected",
        "connectedAnytime",
        "connectedAnytimePercent",
        "icc",
        "iccPercent",
    ],
};

/// NI/churn: supervisor -> counsellor, pre-NI volumes against leads.
pub static NI_CHURN: ReportShape = ReportShape {
    name: "NI / Churn",
    slug: "ni_churn",
    metrics: &["lead_count", "attempted", "preNI"],
    aliases: &[
        ("lead_count", &["lead_count", "total_leads"]),
        ("preNI", &["preNI", "pre_ni", "preNi"]),
    ],
    group: KeyRule {
        aliases: &["supervisorName", "supervisor"],
        sentinel: "No Supervisor",
    },
    leaf: LeafRule::Field(KeyRule {
        aliases: &["counsellorName", "counsellor", "counselor"],
        sentinel: "Unassigned",
    }),
    pivot: None,
    primary_volume_metric: "lead_count",
    default_sort: ("preNIPercent", SortDirection::Desc),
    columns: &["lead_count", "attempted", "preNI", "preNIPercent"],
};

/// Attempt time: day segment -> hour slot bucketed from attempt
/// timestamps. Attempts landing in the same slot merge into one leaf.
pub static ATTEMPT_TIME: ReportShape = ReportShape {
    name: "Attempt Time",
    slug: "attempt_time",
    metrics: &["attempted", "connected", "icc"],
    aliases: &[("icc", &["icc", "icc_count"])],
    group: KeyRule {
        aliases: &["segment", "shift"],
        sentinel: "Unassigned",
    },
    leaf: LeafRule::HourSlot(KeyRule {
        aliases: &["attemptTime", "attempt_time", "attempted_at"],
        sentinel: "No Slot",
    }),
    pivot: None,
    primary_volume_metric: "attempted",
    default_sort: ("name", SortDirection::Asc),
    columns: &["attempted", "connected", "icc"],
};

/// API dispositions: supervisor -> counsellor, cross-tabbed per college
/// into composite `"<metric>:<college>"` cells plus per-row totals.
pub static API_DISPOSITIONS: ReportShape = ReportShape {
    name: "API Dispositions",
    slug: "api_dispositions",
    metrics: &["dnp", "tf", "proceed", "total"],
    aliases: &[],
    group: KeyRule {
        aliases: &["supervisorName", "supervisor"],
        sentinel: "No Supervisor",
    },
    leaf: LeafRule::Field(KeyRule {
        aliases: &["counsellorName", "counsellor", "counselor"],
        sentinel: "Unassigned",
    }),
    pivot: Some(PivotRule {
        list_aliases: &["colleges", "collegeCells", "college_wise"],
        college_aliases: &["college", "collegeName", "college_name"],
        college_sentinel: "Unknown College",
        metrics: &["dnp", "tf", "proceed", "total"],
    }),
    primary_volume_metric: "total",
    default_sort: ("total", SortDirection::Desc),
    columns: &["dnp", "tf", "proceed", "total"],
};

pub static ALL_REPORTS: &[&ReportShape] = &[
    &LEAD_FUNNEL,
    &CONNECTED_CALLS,
    &NI_CHURN,
    &ATTEMPT_TIME,
    &API_DISPOSITIONS,
];

/// The configuration a report screen starts from before the user touches
/// the sort header or the filters.
pub fn default_config(shape: &ReportShape) -> EngineConfig {
    let (key, direction) = shape.default_sort;
    EngineConfig {
        sort_key: Some(key.to_string()),
        sort_direction: direction,
        suppress_empty_sentinel_group: true,
        primary_volume_metric: shape.primary_volume_metric.to_string(),
    }
}

/// Run the full pipeline for one report: normalize -> rollup -> derive ->
/// sort -> project. The sort plan is validated before any work happens, so
/// a bad sort key fails the run without producing partial output.
pub fn run_report(
    records: &[RawRecord],
    shape: &ReportShape,
    config: &EngineConfig,
    expand: &ExpandMap,
) -> Result<(Vec<DisplayRow>, NormalizeReport), EngineError> {
    let plan = sort::plan_sort(config, shape.metrics)?;
    let (normalized, diagnostics) = normalize::normalize_records(records, shape);
    let mut tree = rollup::build_tree(normalized, shape.group.sentinel);
    derive::enrich_tree(&mut tree);
    sort::sort_tree(&mut tree, &plan);
    Ok((project::project(&tree, config, expand), diagnostics))
}

/// Headline numbers for the cross-report summary file.
pub fn summarize(shape: &ReportShape, rows: &[DisplayRow]) -> crate::types::ReportSummary {
    use crate::types::RowKind;
    let primary_total = rows
        .last()
        .and_then(|total| total.counts.get(shape.primary_volume_metric))
        .copied()
        .unwrap_or(0);
    crate::types::ReportSummary {
        report: shape.name.to_string(),
        groups: rows.iter().filter(|r| r.kind == RowKind::Group).count(),
        leaves: rows.iter().filter(|r| r.kind == RowKind::Leaf).count(),
        primary_metric: shape.primary_volume_metric.to_string(),
        primary_total,
    }
}

/// Console diagnostics line for one generated report, mirroring the load
/// summary style.
pub fn describe_diagnostics(diag: &NormalizeReport) -> String {
    format!(
        "{} records normalized ({} without supervisor, {} without leaf identity, {} duplicate rows merged)",
        util::format_int(diag.records_in as u64),
        util::format_int(diag.sentinel_groups as u64),
        util::format_int(diag.sentinel_leaves as u64),
        util::format_int(diag.duplicate_leaves as u64),
    )
}
