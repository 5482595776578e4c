/// ObjectStore Materialized View Implementation
///
/// A TableView is an ordered, stable snapshot of the row positions matching
/// a query, optionally sorted. It remembers the data generation it was built
/// at and can re-run its query and sort when that generation moves on.

use crate::column::ColumnValue;
use crate::error::{ObjectStoreError, Result};
use crate::query::Query;
use crate::row::Row;
use crate::table::{Table, TableRef};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single sort key: a column index and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: usize,
    pub ascending: bool,
}

impl SortKey {
    pub fn ascending(column: usize) -> Self {
        SortKey { column, ascending: true }
    }

    pub fn descending(column: usize) -> Self {
        SortKey { column, ascending: false }
    }
}

/// Ordered sequence of sort keys. The first key is primary, later keys
/// break ties. An empty order means "no explicit order".
///
/// ```
/// use objectstore::SortOrder;
///
/// let order = SortOrder::by(2, true).then(0, false);
/// assert_eq!(order.column_indices(), vec![2, 0]);
/// assert_eq!(order.ascending(), vec![true, false]);
/// assert!(SortOrder::default().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    pub fn new(keys: Vec<SortKey>) -> Self {
        SortOrder { keys }
    }

    /// Single-key order.
    pub fn by(column: usize, ascending: bool) -> Self {
        SortOrder {
            keys: vec![SortKey { column, ascending }],
        }
    }

    /// Append a tie-breaking key.
    pub fn then(mut self, column: usize, ascending: bool) -> Self {
        self.keys.push(SortKey { column, ascending });
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn column_indices(&self) -> Vec<usize> {
        self.keys.iter().map(|k| k.column).collect()
    }

    pub fn ascending(&self) -> Vec<bool> {
        self.keys.iter().map(|k| k.ascending).collect()
    }

    /// Check every key refers to an existing column of `table`.
    pub fn validate(&self, table: &Table) -> Result<()> {
        let count = table.column_count();
        match self.keys.iter().find(|k| k.column >= count) {
            Some(key) => Err(ObjectStoreError::ColumnOutOfBounds {
                column: key.column,
                count,
            }),
            None => Ok(()),
        }
    }
}

impl From<Vec<(usize, bool)>> for SortOrder {
    fn from(pairs: Vec<(usize, bool)>) -> Self {
        SortOrder {
            keys: pairs
                .into_iter()
                .map(|(column, ascending)| SortKey { column, ascending })
                .collect(),
        }
    }
}

/// Materialized, ordered row positions for a query.
///
/// # Examples
///
/// ```
/// use objectstore::{Table, Schema, ColumnType, ColumnValue, Query, SortOrder};
///
/// let schema = Schema::new(vec![
///     ("name".to_string(), ColumnType::String, false),
///     ("score".to_string(), ColumnType::Int, false),
/// ]);
/// let table = Table::new("students".to_string(), schema).into_ref();
/// table.borrow_mut().append_row(vec!["Bob".into(), ColumnValue::Int(85)]).unwrap();
/// table.borrow_mut().append_row(vec!["Alice".into(), ColumnValue::Int(92)]).unwrap();
///
/// let mut view = Query::new(table.clone()).find_all().unwrap();
/// view.sort(&SortOrder::by(1, false)).unwrap();
///
/// assert_eq!(view.size(), 2);
/// assert_eq!(view.get(0).unwrap().get(0).unwrap().as_string(), Some("Alice"));
/// ```
#[derive(Debug, Clone)]
pub struct TableView {
    query: Query,
    sort: SortOrder,
    /// positions[view_index] = absolute row position in the table
    positions: Vec<usize>,
    /// Data generation the positions were computed at
    generation: u64,
}

impl TableView {
    pub(crate) fn new(query: Query, positions: Vec<usize>, generation: u64) -> Self {
        TableView {
            query,
            sort: SortOrder::default(),
            positions,
            generation,
        }
    }

    pub fn table(&self) -> &TableRef {
        self.query.table()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn sort_order(&self) -> &SortOrder {
        &self.sort
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Absolute table position of the row at view index `index`.
    pub fn position_at(&self, index: usize) -> Option<usize> {
        self.positions.get(index).copied()
    }

    pub fn get(&self, index: usize) -> Result<Row> {
        let position = self.position_at(index).ok_or(ObjectStoreError::OutOfBounds {
            index,
            size: self.positions.len(),
        })?;
        Row::at(self.table(), position)
    }

    pub fn first(&self) -> Option<Row> {
        self.positions.first().and_then(|&p| Row::at(self.table(), p).ok())
    }

    pub fn last(&self) -> Option<Row> {
        self.positions.last().and_then(|&p| Row::at(self.table(), p).ok())
    }

    /// View index of the row at absolute table position `position`.
    pub fn find_by_source_ndx(&self, position: usize) -> Option<usize> {
        self.positions.iter().position(|&p| p == position)
    }

    /// Data generation this view was computed at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_sync(&self) -> bool {
        self.generation == self.table().borrow().generation()
    }

    /// Stable multi-key sort. Rows that compare equal on every key keep
    /// their current relative order.
    pub fn sort(&mut self, order: &SortOrder) -> Result<()> {
        {
            let table = self.query.table().borrow();
            order.validate(&table)?;
            sort_positions(&mut self.positions, &table, order);
        }
        self.sort = order.clone();
        Ok(())
    }

    /// Re-run the query and sort if the underlying data has changed since
    /// this view was built. Returns true if the view was rebuilt.
    ///
    /// On error the previous positions are left untouched.
    pub fn sync_if_needed(&mut self) -> Result<bool> {
        if self.is_in_sync() {
            return Ok(false);
        }

        let mut positions = self.query.evaluate()?;
        let generation = {
            let table = self.table().borrow();
            if !self.sort.is_empty() {
                self.sort.validate(&table)?;
                sort_positions(&mut positions, &table, &self.sort);
            }
            table.generation()
        };

        debug!(
            "re-synced view on '{}': {} rows (generation {} -> {})",
            self.table().borrow().name(),
            positions.len(),
            self.generation,
            generation
        );
        self.positions = positions;
        self.generation = generation;
        Ok(true)
    }

    /// Delete every row in this view from the table. The view is empty
    /// afterwards and in sync with the post-delete generation.
    pub fn delete_all(&mut self) -> Result<usize> {
        let removed = self.table().borrow_mut().delete_rows(&self.positions)?;
        self.positions.clear();
        let generation = self.table().borrow().generation();
        self.generation = generation;
        Ok(removed)
    }
}

fn sort_positions(positions: &mut [usize], table: &Table, order: &SortOrder) {
    // slice::sort_by is stable
    positions.sort_by(|&a, &b| {
        for key in order.keys() {
            let cmp = compare_values(table.value_ref(a, key.column), table.value_ref(b, key.column));
            let cmp = if key.ascending { cmp } else { cmp.reverse() };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}

/// Ascending comparison of two cells of the same column. Nulls sort before
/// every non-null value.
fn compare_values(a: Option<&ColumnValue>, b: Option<&ColumnValue>) -> Ordering {
    let a_is_null = a.map_or(true, ColumnValue::is_null);
    let b_is_null = b.map_or(true, ColumnValue::is_null);

    match (a_is_null, b_is_null) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    match (a, b) {
        (Some(ColumnValue::Int(a)), Some(ColumnValue::Int(b))) => a.cmp(b),
        (Some(ColumnValue::DateTime(a)), Some(ColumnValue::DateTime(b))) => a.cmp(b),
        (Some(ColumnValue::Float(a)), Some(ColumnValue::Float(b))) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Some(ColumnValue::Double(a)), Some(ColumnValue::Double(b))) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Some(ColumnValue::String(a)), Some(ColumnValue::String(b))) => a.cmp(b),
        (Some(ColumnValue::Bool(a)), Some(ColumnValue::Bool(b))) => a.cmp(b),
        // A column holds one type, so this only happens on corrupt input
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::table::Schema;
    use pretty_assertions::assert_eq;

    // columns: name, age (nullable), team
    fn make_table() -> TableRef {
        let schema = Schema::new(vec![
            ("name".to_string(), ColumnType::String, false),
            ("age".to_string(), ColumnType::Int, true),
            ("team".to_string(), ColumnType::String, false),
        ]);
        let mut t = Table::new("test".to_string(), schema);
        t.append_row(vec!["Charlie".into(), ColumnValue::Int(30), "red".into()]).unwrap();
        t.append_row(vec!["Alice".into(), ColumnValue::Int(25), "blue".into()]).unwrap();
        t.append_row(vec!["Bob".into(), ColumnValue::Null, "red".into()]).unwrap();
        t.append_row(vec!["Dave".into(), ColumnValue::Int(25), "red".into()]).unwrap();
        t.into_ref()
    }

    fn names(view: &TableView) -> Vec<String> {
        (0..view.size())
            .map(|i| view.get(i).unwrap().get(0).unwrap().as_string().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_unsorted_view_keeps_match_order() {
        let table = make_table();
        let view = Query::new(table).equal(2, "red").find_all().unwrap();
        assert_eq!(view.positions(), &[0, 2, 3]);
        assert_eq!(view.find_by_source_ndx(3), Some(2));
        assert_eq!(view.find_by_source_ndx(1), None);
    }

    #[test]
    fn test_sort_ascending_nulls_first() {
        let table = make_table();
        let mut view = Query::new(table).find_all().unwrap();
        view.sort(&SortOrder::by(1, true)).unwrap();
        assert_eq!(names(&view), vec!["Bob", "Alice", "Dave", "Charlie"]);
    }

    #[test]
    fn test_sort_descending() {
        let table = make_table();
        let mut view = Query::new(table).find_all().unwrap();
        view.sort(&SortOrder::by(0, false)).unwrap();
        assert_eq!(names(&view), vec!["Dave", "Charlie", "Bob", "Alice"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let table = make_table();
        let mut view = Query::new(table).find_all().unwrap();
        view.sort(&SortOrder::by(2, true)).unwrap();
        // "blue" first, then the three "red" rows in original order
        assert_eq!(names(&view), vec!["Alice", "Charlie", "Bob", "Dave"]);
    }

    #[test]
    fn test_sort_multi_column() {
        let table = make_table();
        let mut view = Query::new(table).find_all().unwrap();
        view.sort(&SortOrder::by(2, false).then(1, false)).unwrap();
        assert_eq!(names(&view), vec!["Charlie", "Dave", "Bob", "Alice"]);
    }

    #[test]
    fn test_sort_invalid_column() {
        let table = make_table();
        let mut view = Query::new(table).find_all().unwrap();
        let err = view.sort(&SortOrder::by(5, true)).unwrap_err();
        assert_eq!(err, ObjectStoreError::ColumnOutOfBounds { column: 5, count: 3 });
        assert_eq!(view.positions(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_sync_if_needed_rebuilds_after_mutation() {
        let table = make_table();
        let mut view = Query::new(table.clone()).equal(2, "red").find_all().unwrap();
        view.sort(&SortOrder::by(0, true)).unwrap();
        assert!(view.is_in_sync());
        assert!(!view.sync_if_needed().unwrap());

        table
            .borrow_mut()
            .append_row(vec!["Aaron".into(), ColumnValue::Int(40), "red".into()])
            .unwrap();
        assert!(!view.is_in_sync());
        assert!(view.sync_if_needed().unwrap());
        assert_eq!(names(&view), vec!["Aaron", "Bob", "Charlie", "Dave"]);
    }

    #[test]
    fn test_delete_all() {
        let table = make_table();
        let mut view = Query::new(table.clone()).equal(2, "red").find_all().unwrap();
        assert_eq!(view.delete_all().unwrap(), 3);
        assert!(view.is_empty());
        assert!(view.is_in_sync());
        assert_eq!(table.borrow().len(), 1);
    }

    #[test]
    fn test_first_last_and_bounds() {
        let table = make_table();
        let view = Query::new(table).equal(2, "red").find_all().unwrap();
        assert_eq!(view.first().unwrap().index(), Ok(0));
        assert_eq!(view.last().unwrap().index(), Ok(3));
        assert_eq!(
            view.get(3).unwrap_err(),
            ObjectStoreError::OutOfBounds { index: 3, size: 3 }
        );
    }
}
