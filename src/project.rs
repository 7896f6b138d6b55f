// Flattening the sorted tree into render-ready rows.
use std::collections::HashMap;

use crate::derive::derive_counts;
use crate::types::{DisplayRow, EngineConfig, ReportTree, RowKind};

/// Per-group expand/collapse flags, keyed by group key. Owned by the
/// presentation layer and read-only to the engine; it survives tree
/// rebuilds because it is addressed by key, not by position. Groups with
/// no entry are expanded.
#[derive(Debug, Clone, Default)]
pub struct ExpandMap {
    flags: HashMap<String, bool>,
}

impl ExpandMap {
    pub fn new() -> Self {
        ExpandMap::default()
    }

    pub fn is_expanded(&self, group_key: &str) -> bool {
        self.flags.get(group_key).copied().unwrap_or(true)
    }

    pub fn toggle(&mut self, group_key: &str) {
        let next = !self.is_expanded(group_key);
        self.flags.insert(group_key.to_string(), next);
    }
}

/// Flatten a sorted tree into the ordered row list the table renderer and
/// the exporters consume. Pure over the tree: re-projecting with the same
/// inputs reproduces the same rows, and a different expand map only changes
/// which leaf rows are present.
///
/// Suppressed groups are skipped (header and leaves) when the config asks
/// for it; their counts already live in the grand total. The total row is
/// appended last unconditionally.
pub fn project(tree: &ReportTree, config: &EngineConfig, expand: &ExpandMap) -> Vec<DisplayRow> {
    let mut rows = Vec::new();

    for group in &tree.groups {
        if config.suppress_empty_sentinel_group && group.suppress {
            continue;
        }
        rows.push(DisplayRow {
            kind: RowKind::Group,
            key: group.key.clone(),
            counts: group.rolled_counts.clone(),
            derived: group.derived.clone(),
            depth: 0,
        });
        if expand.is_expanded(&group.key) {
            for leaf in &group.leaves {
                rows.push(DisplayRow {
                    kind: RowKind::Leaf,
                    key: leaf.leaf_key.clone(),
                    counts: leaf.counts.clone(),
                    derived: derive_counts(&leaf.counts),
                    depth: 1,
                });
            }
        }
    }

    let total = &tree.grand_total;
    debug_assert!(total.is_total_row);
    rows.push(DisplayRow {
        kind: RowKind::Total,
        key: total.key.clone(),
        counts: total.rolled_counts.clone(),
        derived: total.derived.clone(),
        depth: 0,
    });
    rows
}
