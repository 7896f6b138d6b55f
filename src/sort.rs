// Deterministic ordering of groups and leaves.
//
// One comparator serves every report; callers pick the key, the direction,
// and the primary volume metric. The grand total never enters the
// comparator (it is structurally separate and appended last by the
// projector), and zero-activity rows always sink to the bottom of their
// tier regardless of direction.
use std::cmp::Ordering;

use crate::derive::{derive_counts, is_derived_metric};
use crate::types::{
    Counts, Derived, EngineConfig, EngineError, GroupNode, ReportTree, SortDirection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// The group or leaf label, compared case-insensitively.
    Name,
    /// A canonical counter.
    Count(String),
    /// An entry of the derived metric table.
    Derived(String),
}

#[derive(Debug, Clone)]
pub struct SortPlan {
    pub key: SortKey,
    pub direction: SortDirection,
    pub primary_volume_metric: String,
}

/// Resolve and validate the requested sort into a plan, before any rows
/// are produced. A sort key that is neither a canonical metric of this
/// report, a derived metric, nor the row-name pseudo-key is a caller bug
/// and is surfaced instead of silently ignored.
pub fn plan_sort(config: &EngineConfig, metrics: &[&str]) -> Result<SortPlan, EngineError> {
    let (key, direction) = match &config.sort_key {
        Some(requested) => (resolve_sort_key(requested, metrics)?, config.sort_direction),
        // No explicit sort: every refresh still has a defined order.
        None => (
            SortKey::Count(config.primary_volume_metric.clone()),
            SortDirection::Desc,
        ),
    };
    Ok(SortPlan {
        key,
        direction,
        primary_volume_metric: config.primary_volume_metric.clone(),
    })
}

fn resolve_sort_key(requested: &str, metrics: &[&str]) -> Result<SortKey, EngineError> {
    if requested == "name" || requested == "key" {
        return Ok(SortKey::Name);
    }
    if metrics.contains(&requested) {
        return Ok(SortKey::Count(requested.to_string()));
    }
    if is_derived_metric(requested) {
        return Ok(SortKey::Derived(requested.to_string()));
    }
    Err(EngineError::UnknownSortKey {
        key: requested.to_string(),
    })
}

/// Order groups, and leaves within each group, under one plan. Reordering
/// only; no counts or derived values are touched.
pub fn sort_tree(tree: &mut ReportTree, plan: &SortPlan) {
    let groups = std::mem::take(&mut tree.groups);
    tree.groups = sort_rows(groups, plan, |g: &GroupNode| {
        (g.key.clone(), g.rolled_counts.clone(), Some(g.derived.clone()))
    });
    for group in &mut tree.groups {
        let leaves = std::mem::take(&mut group.leaves);
        group.leaves = sort_rows(leaves, plan, |l| {
            (l.leaf_key.clone(), l.counts.clone(), None)
        });
    }
}

/// One sortable value. Missing values sort lowest in ascending order and
/// symmetrically in descending.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Missing,
    Num(f64),
    Text(String),
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    use FieldValue::*;
    match (a, b) {
        (Missing, Missing) => Ordering::Equal,
        (Missing, _) => Ordering::Less,
        (_, Missing) => Ordering::Greater,
        (Num(x), Num(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Text(x), Text(y)) => x.cmp(y),
        // A plan produces one value kind per run; keep mixed stable.
        _ => Ordering::Equal,
    }
}

fn sort_rows<T, F>(rows: Vec<T>, plan: &SortPlan, view: F) -> Vec<T>
where
    F: Fn(&T) -> (String, Counts, Option<Derived>),
{
    let mut decorated: Vec<(bool, FieldValue, T)> = rows
        .into_iter()
        .map(|row| {
            let (name, counts, derived) = view(&row);
            let demoted = counts
                .get(&plan.primary_volume_metric)
                .copied()
                .unwrap_or(0)
                == 0;
            let value = field_value(plan, &name, &counts, derived);
            (demoted, value, row)
        })
        .collect();

    // Zero-activity rows last in either direction; ties keep input order
    // (Vec::sort_by is stable).
    decorated.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let ord = compare_values(&a.1, &b.1);
            match plan.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        })
    });

    decorated.into_iter().map(|(_, _, row)| row).collect()
}

fn field_value(
    plan: &SortPlan,
    name: &str,
    counts: &Counts,
    derived: Option<Derived>,
) -> FieldValue {
    match &plan.key {
        SortKey::Name => FieldValue::Text(name.to_lowercase()),
        SortKey::Count(metric) => counts
            .get(metric)
            .map(|v| FieldValue::Num(*v as f64))
            .unwrap_or(FieldValue::Missing),
        SortKey::Derived(metric) => {
            let derived = derived.unwrap_or_else(|| derive_counts(counts));
            derived
                .get(metric)
                .map(|v| FieldValue::Num(*v))
                .unwrap_or(FieldValue::Missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::build_tree;
    use crate::types::CanonicalMetricRecord;

    fn rec(group: &str, leaf: &str, leads: u64) -> CanonicalMetricRecord {
        let mut counts = Counts::new();
        counts.insert("lead_count".to_string(), leads);
        CanonicalMetricRecord {
            group_key: group.to_string(),
            leaf_key: leaf.to_string(),
            counts,
            is_total_row: false,
        }
    }

    fn config(sort_key: Option<&str>, direction: SortDirection) -> EngineConfig {
        EngineConfig {
            sort_key: sort_key.map(str::to_string),
            sort_direction: direction,
            suppress_empty_sentinel_group: false,
            primary_volume_metric: "lead_count".to_string(),
        }
    }

    #[test]
    fn unknown_sort_key_is_rejected_up_front() {
        let cfg = config(Some("sessionsPerWeek"), SortDirection::Asc);
        let err = plan_sort(&cfg, &["lead_count"]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSortKey { key } if key == "sessionsPerWeek"));
    }

    #[test]
    fn derived_and_name_keys_resolve() {
        let cfg = config(Some("leadToForm"), SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        assert_eq!(plan.key, SortKey::Derived("leadToForm".to_string()));

        let cfg = config(Some("name"), SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        assert_eq!(plan.key, SortKey::Name);
    }

    #[test]
    fn missing_sort_key_defaults_to_primary_desc() {
        let cfg = config(None, SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        assert_eq!(plan.key, SortKey::Count("lead_count".to_string()));
        assert_eq!(plan.direction, SortDirection::Desc);
    }

    #[test]
    fn direction_flips_but_zero_rows_stay_last() {
        let cfg = config(Some("lead_count"), SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        let mut tree = build_tree(
            vec![
                rec("A", "X", 10),
                rec("A", "Y", 0),
                rec("A", "Z", 3),
                rec("A", "W", 0),
            ],
            "Unassigned",
        );
        sort_tree(&mut tree, &plan);
        let order: Vec<&str> = tree.groups[0]
            .leaves
            .iter()
            .map(|l| l.leaf_key.as_str())
            .collect();
        // Ascending among non-zero rows, zero rows after them in input order.
        assert_eq!(order, vec!["Z", "X", "Y", "W"]);

        let cfg = config(Some("lead_count"), SortDirection::Desc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        let mut tree = build_tree(
            vec![
                rec("A", "X", 10),
                rec("A", "Y", 0),
                rec("A", "Z", 3),
                rec("A", "W", 0),
            ],
            "Unassigned",
        );
        sort_tree(&mut tree, &plan);
        let order: Vec<&str> = tree.groups[0]
            .leaves
            .iter()
            .map(|l| l.leaf_key.as_str())
            .collect();
        assert_eq!(order, vec!["X", "Z", "Y", "W"]);
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let cfg = config(Some("name"), SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        let mut tree = build_tree(
            vec![rec("beta", "X", 1), rec("Alpha", "Y", 1), rec("alpine", "Z", 1)],
            "Unassigned",
        );
        sort_tree(&mut tree, &plan);
        let order: Vec<&str> = tree.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(order, vec!["Alpha", "alpine", "beta"]);
    }

    #[test]
    fn groups_sort_by_rolled_counts() {
        let cfg = config(Some("lead_count"), SortDirection::Desc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        let mut tree = build_tree(
            vec![rec("A", "X", 2), rec("B", "Y", 9), rec("C", "Z", 5)],
            "Unassigned",
        );
        sort_tree(&mut tree, &plan);
        let order: Vec<&str> = tree.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn sorting_never_changes_rolled_values() {
        let cfg = config(Some("lead_count"), SortDirection::Asc);
        let plan = plan_sort(&cfg, &["lead_count"]).unwrap();
        let mut tree = build_tree(
            vec![rec("A", "X", 10), rec("A", "Y", 5), rec("B", "Z", 1)],
            "Unassigned",
        );
        let before = tree.grand_total.rolled_counts.clone();
        let group_before: Counts = tree.groups[0].rolled_counts.clone();
        sort_tree(&mut tree, &plan);
        assert_eq!(tree.grand_total.rolled_counts, before);
        let a = tree.groups.iter().find(|g| g.key == "A").unwrap();
        assert_eq!(a.rolled_counts, group_before);
        let leaf_sum: u64 = a.leaves.iter().map(|l| l.counts["lead_count"]).sum();
        assert_eq!(leaf_sum, a.rolled_counts["lead_count"]);
    }
}
