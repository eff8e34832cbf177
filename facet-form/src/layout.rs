use alloc::collections::BTreeMap;

use log::debug;

/// Fields sharing one row key, in their original relative order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowGroup<T> {
    /// Row id; 0 means "no explicit row"
    pub key: u32,

    /// Members of the row
    pub members: Vec<T>,
}

impl<T> RowGroup<T> {
    /// Whether the members share one rendered row. Members of row 0 each get
    /// a row of their own.
    pub fn is_shared(&self) -> bool {
        self.key != 0
    }

    /// Column span of each member, out of `total`
    pub fn span(&self, total: u8) -> u8 {
        if self.is_shared() {
            column_span(total, self.members.len())
        } else {
            total
        }
    }
}

/// Partitions `items` into rows by the key `row_of` returns.
///
/// Rows come out in ascending key order. Within a row, items keep their input
/// order.
pub fn group_by_row<T>(
    items: impl IntoIterator<Item = T>,
    row_of: impl Fn(&T) -> u32,
) -> Vec<RowGroup<T>> {
    let mut rows: BTreeMap<u32, Vec<T>> = BTreeMap::new();
    for item in items {
        rows.entry(row_of(&item)).or_default().push(item);
    }

    let groups: Vec<_> = rows
        .into_iter()
        .map(|(key, members)| RowGroup { key, members })
        .collect();
    debug!(
        "Grouped fields into rows {:?}",
        groups.iter().map(|g| (g.key, g.members.len())).collect::<Vec<_>>()
    );
    groups
}

/// Equal share of `total` columns for `members` fields.
///
/// Truncating division, never less than one column; leftover columns stay
/// empty at the end of the row.
pub fn column_span(total: u8, members: usize) -> u8 {
    if members == 0 {
        return total;
    }
    let span = usize::from(total) / members;
    span.clamp(1, usize::from(total.max(1))) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_ascending_and_stable() {
        facet_form_testhelpers::setup();

        let fields = [("a", 2), ("b", 0), ("c", 1), ("d", 2), ("e", 0), ("f", 1)];
        let groups = group_by_row(fields, |(_, row)| *row);

        let layout: Vec<(u32, Vec<&str>)> = groups
            .iter()
            .map(|g| (g.key, g.members.iter().map(|(name, _)| *name).collect()))
            .collect();
        assert_eq!(
            layout,
            [(0, vec!["b", "e"]), (1, vec!["c", "f"]), (2, vec!["a", "d"])]
        );
        assert_eq!(group_by_row(fields, |(_, row)| *row), groups);
    }

    #[test]
    fn columns_divide_with_truncation() {
        facet_form_testhelpers::setup();

        assert_eq!(column_span(12, 1), 12);
        assert_eq!(column_span(12, 2), 6);
        assert_eq!(column_span(12, 5), 2);
        assert_eq!(column_span(12, 13), 1);
        assert_eq!(column_span(12, 0), 12);
    }

    #[test]
    fn row_zero_is_never_shared() {
        facet_form_testhelpers::setup();

        let groups = group_by_row(["x", "y", "z"], |_| 0);
        assert_eq!(groups.len(), 1);
        assert!(!groups[0].is_shared());
        assert_eq!(groups[0].span(12), 12);
    }
}
