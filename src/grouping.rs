// Group-By Reduction
//
// partition → count → sort. Rows are ordered by count descending, then by
// label ascending so that equal counts always come out in the same order.
// A key extractor returning `None` drops the record from every group.

use std::collections::BTreeMap;

/// One row of a grouped count, before it is given a report-specific shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub key: String,
    pub count: usize,
}

pub fn group_count<T, F>(records: impl IntoIterator<Item = T>, mut key: F) -> Vec<GroupRow>
where
    F: FnMut(&T) -> Option<String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        if let Some(k) = key(&record) {
            *counts.entry(k).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<GroupRow> = counts
        .into_iter()
        .map(|(key, count)| GroupRow { key, count })
        .collect();

    // BTreeMap already yields labels ascending; a stable sort on count keeps it
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}
