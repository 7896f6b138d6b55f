// Derived percentage metrics computed from rolled-up counters.
use crate::types::{Counts, Derived, ReportTree};
use crate::util::round1;

/// The fixed ratio table: derived name, numerator metric, denominator
/// metric. Values are percentages (ratio x 100) rounded to one decimal.
pub static DERIVED_METRICS: &[(&str, &str, &str)] = &[
    ("connectedAnytimePercent", "connectedAnytime", "lead_count"),
    ("iccPercent", "icc", "lead_count"),
    ("leadToForm", "formFilled", "attempted"),
    ("formToAdmission", "admission", "formFilled"),
    ("leadToAdmission", "admission", "attempted"),
    ("preNIPercent", "preNI", "lead_count"),
];

pub fn is_derived_metric(name: &str) -> bool {
    DERIVED_METRICS.iter().any(|(d, _, _)| *d == name)
}

/// A zero denominator yields exactly 0, never NaN or a missing entry.
/// Sorting and "dash for zero" rendering both branch on numeric zero.
pub fn ratio_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round1(numerator as f64 / denominator as f64 * 100.0)
}

/// Compute every derived metric for one counts map. Metrics missing from
/// the map count as 0 on both sides of the ratio.
pub fn derive_counts(counts: &Counts) -> Derived {
    let mut out = Derived::new();
    for (name, num, den) in DERIVED_METRICS {
        let n = counts.get(*num).copied().unwrap_or(0);
        let d = counts.get(*den).copied().unwrap_or(0);
        out.insert((*name).to_string(), ratio_percent(n, d));
    }
    out
}

/// Enrich every group and the grand total in place. Leaf rows derive on
/// demand from the same table (their counts are already final), so the
/// tree's value invariant is untouched.
pub fn enrich_tree(tree: &mut ReportTree) {
    for group in &mut tree.groups {
        group.derived = derive_counts(&group.rolled_counts);
    }
    tree.grand_total.derived = derive_counts(&tree.grand_total.rolled_counts);
}
