// Two-level rollup: normalized records -> group tree + grand total.
use std::collections::HashMap;

use crate::types::{CanonicalMetricRecord, Counts, GroupNode, ReportTree};

/// Build the report tree in a single pass over normalized records.
///
/// Groups and leaves keep first-seen order here; ordering is the sort
/// stage's job. Two records normalizing to the same `(group, leaf)` pair
/// merge into one leaf by summing counts, so a duplicate backend row can
/// never double-render. Only additive sums are used, so the rolled result
/// is independent of input order.
///
/// A group whose key is the report's sentinel and whose counts are all
/// zero is marked `suppress`; the projector can then hide it while the
/// grand total still includes it.
pub fn build_tree(records: Vec<CanonicalMetricRecord>, group_sentinel: &str) -> ReportTree {
    let mut groups: Vec<GroupNode> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut leaf_index: HashMap<(String, String), usize> = HashMap::new();

    for rec in records {
        let gi = *group_index.entry(rec.group_key.clone()).or_insert_with(|| {
            groups.push(GroupNode::new(rec.group_key.clone()));
            groups.len() - 1
        });

        add_counts(&mut groups[gi].rolled_counts, &rec.counts);

        let leaf_key = (rec.group_key.clone(), rec.leaf_key.clone());
        match leaf_index.get(&leaf_key).copied() {
            Some(li) => {
                // Duplicate (group, leaf) pair: merge, don't append.
                add_counts(&mut groups[gi].leaves[li].counts, &rec.counts);
            }
            None => {
                leaf_index.insert(leaf_key, groups[gi].leaves.len());
                groups[gi].leaves.push(rec);
            }
        }
    }

    let mut grand_total = GroupNode::new("Total".to_string());
    grand_total.is_total_row = true;
    for group in &mut groups {
        add_counts(&mut grand_total.rolled_counts, &group.rolled_counts);
        group.suppress =
            group.key == group_sentinel && group.rolled_counts.values().all(|v| *v == 0);
    }

    ReportTree {
        groups,
        grand_total,
    }
}

fn add_counts(into: &mut Counts, from: &Counts) {
    for (metric, v) in from {
        *into.entry(metric.clone()).or_insert(0) += v;
    }
}
