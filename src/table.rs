/// ObjectStore Table Implementation
///
/// A Table is the full, unordered row storage of one object type: a
/// collection of typed columns sharing a schema. Rows are addressed by their
/// absolute position, which is also the table's native enumeration order.
/// Each row also carries a key that never changes and is never reused, so
/// row handles survive deletes of other rows.
///
/// Every mutation advances the data generation shared with the owning
/// session, which is how cached views detect that they are stale.
///
/// # Examples
///
/// ```
/// use objectstore::{Table, Schema, ColumnType, ColumnValue};
///
/// let schema = Schema::new(vec![
///     ("name".to_string(), ColumnType::String, false),
///     ("age".to_string(), ColumnType::Int, true),
/// ]);
///
/// let mut table = Table::new("Person".to_string(), schema);
/// table.append_row(vec!["Alice".into(), ColumnValue::Int(30)]).unwrap();
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_value(0, 0).unwrap().as_string(), Some("Alice"));
/// ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{ObjectStoreError, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared, single-threaded handle to a table.
pub type TableRef = Rc<RefCell<Table>>;

/// Schema definition with column names and types.
///
/// ```
/// use objectstore::{Schema, ColumnType};
///
/// let schema = Schema::new(vec![
///     ("id".to_string(), ColumnType::Int, false),      // Required
///     ("email".to_string(), ColumnType::String, false),  // Required
///     ("age".to_string(), ColumnType::Int, true),      // Nullable
/// ]);
///
/// assert_eq!(schema.len(), 3);
/// assert_eq!(schema.get_column_index("email"), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>, // (name, type, nullable)
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    /// Returns (name, type, nullable) for the column at index.
    pub fn get_column_info(&self, index: usize) -> Option<(&str, ColumnType, bool)> {
        self.columns.get(index).map(|(name, ty, nullable)| (name.as_str(), *ty, *nullable))
    }
}

/// Root table owning its data.
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    /// Row keys in position order; strictly increasing
    keys: Vec<u64>,
    next_key: u64,
    row_count: usize,
    /// Data generation shared with the owning session
    generation: Rc<Cell<u64>>,
    attached: bool,
}

impl Table {
    /// Create a free-standing table with its own generation counter.
    pub fn new(name: String, schema: Schema) -> Self {
        Self::with_generation(name, schema, Rc::new(Cell::new(0)))
    }

    pub(crate) fn with_generation(name: String, schema: Schema, generation: Rc<Cell<u64>>) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|(col_name, col_type, nullable)| Column::new(col_name.clone(), *col_type, *nullable))
            .collect();

        Table {
            name,
            schema,
            columns,
            keys: Vec::new(),
            next_key: 0,
            row_count: 0,
            generation,
            attached: true,
        }
    }

    /// Wrap the table in a shared handle.
    pub fn into_ref(self) -> TableRef {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_type(&self, column: usize) -> Result<ColumnType> {
        self.column(column).map(Column::column_type)
    }

    pub fn column_name(&self, column: usize) -> Result<&str> {
        self.column(column).map(Column::name)
    }

    fn column(&self, column: usize) -> Result<&Column> {
        self.columns.get(column).ok_or(ObjectStoreError::ColumnOutOfBounds {
            column,
            count: self.columns.len(),
        })
    }

    /// Current value of the data generation this table reports into.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn bump_generation(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// False once the owning session has been closed.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.attached {
            Ok(())
        } else {
            Err(ObjectStoreError::Invalidated)
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.row_count {
            return Err(ObjectStoreError::OutOfBounds {
                index: row,
                size: self.row_count,
            });
        }
        Ok(())
    }

    pub fn get_value(&self, row: usize, column: usize) -> Result<ColumnValue> {
        self.ensure_attached()?;
        self.check_row(row)?;
        self.column(column)?.get(row)
    }

    pub fn get_value_by_name(&self, row: usize, column: &str) -> Result<ColumnValue> {
        let col_idx = self
            .schema
            .get_column_index(column)
            .ok_or_else(|| ObjectStoreError::MissingValue(column.to_string()))?;
        self.get_value(row, col_idx)
    }

    /// Stable key of the row currently at `row`.
    pub fn row_key(&self, row: usize) -> Option<u64> {
        self.keys.get(row).copied()
    }

    /// Current position of the row with `key`, or None once it is deleted.
    pub fn position_of_key(&self, key: u64) -> Option<usize> {
        // keys are appended in increasing order and deletes keep that order
        self.keys.binary_search(&key).ok()
    }

    /// Borrow a cell without cloning; used by hot loops (sorting, aggregation,
    /// predicate evaluation) once bounds are known to be valid.
    #[inline]
    pub(crate) fn value_ref(&self, row: usize, column: usize) -> Option<&ColumnValue> {
        self.columns.get(column).and_then(|c| c.get_ref(row))
    }

    pub fn get_row(&self, row: usize) -> Result<Vec<ColumnValue>> {
        self.ensure_attached()?;
        self.check_row(row)?;
        self.columns.iter().map(|col| col.get(row)).collect()
    }

    /// Append a row given values in schema order.
    pub fn append_row(&mut self, values: Vec<ColumnValue>) -> Result<usize> {
        self.ensure_attached()?;

        if values.len() < self.columns.len() {
            let missing = self.columns[values.len()].name().to_string();
            return Err(ObjectStoreError::MissingValue(missing));
        }

        // Validate every cell before touching any column so a bad row is all-or-nothing
        for (col, value) in self.columns.iter().zip(values.iter()) {
            col.validate_value(value)?;
        }

        for (col, value) in self.columns.iter_mut().zip(values) {
            col.append(value)?;
        }

        self.keys.push(self.next_key);
        self.next_key += 1;
        self.row_count += 1;
        self.bump_generation();
        Ok(self.row_count - 1)
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: ColumnValue) -> Result<()> {
        self.ensure_attached()?;
        self.check_row(row)?;
        let count = self.columns.len();
        self.columns
            .get_mut(column)
            .ok_or(ObjectStoreError::ColumnOutOfBounds { column, count })?
            .set(row, value)?;
        self.bump_generation();
        Ok(())
    }

    /// Delete one row; later rows shift down by one position.
    pub fn delete_row(&mut self, row: usize) -> Result<Vec<ColumnValue>> {
        self.ensure_attached()?;
        self.check_row(row)?;

        let mut removed = Vec::with_capacity(self.columns.len());
        for col in self.columns.iter_mut() {
            removed.push(col.delete(row)?);
        }
        self.keys.remove(row);

        self.row_count -= 1;
        self.bump_generation();
        Ok(removed)
    }

    /// Delete a set of rows given by absolute position, in any order.
    /// Returns the number of distinct rows removed.
    pub fn delete_rows(&mut self, rows: &[usize]) -> Result<usize> {
        self.ensure_attached()?;
        for &row in rows {
            self.check_row(row)?;
        }

        let mut doomed = vec![false; self.row_count];
        for &row in rows {
            doomed[row] = true;
        }
        let removed = doomed.iter().filter(|&&d| d).count();
        if removed == 0 {
            return Ok(0);
        }

        for col in self.columns.iter_mut() {
            col.delete_positions(&doomed);
        }
        let mut position = 0;
        self.keys.retain(|_| {
            let keep = !doomed[position];
            position += 1;
            keep
        });

        self.row_count -= removed;
        self.bump_generation();
        Ok(removed)
    }

    pub fn delete_all_rows(&mut self) -> Result<()> {
        self.ensure_attached()?;
        for col in self.columns.iter_mut() {
            col.clear();
        }
        self.keys.clear();
        self.row_count = 0;
        self.bump_generation();
        Ok(())
    }

    /// Export table to JSON format (array of objects).
    pub fn to_json(&self) -> Result<String> {
        self.ensure_attached()?;
        let rows: Vec<serde_json::Value> = (0..self.row_count)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|col| {
                        let value = col.get_ref(row).map(ColumnValue::to_json).unwrap_or(serde_json::Value::Null);
                        (col.name().to_string(), value)
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("rows", &self.row_count)
            .field("columns", &self.columns)
            .field("attached", &self.attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        let schema = Schema::new(vec![
            ("name".to_string(), ColumnType::String, false),
            ("age".to_string(), ColumnType::Int, true),
        ]);
        let mut table = Table::new("Person".to_string(), schema);
        table.append_row(vec!["Alice".into(), ColumnValue::Int(30)]).unwrap();
        table.append_row(vec!["Bob".into(), ColumnValue::Null]).unwrap();
        table.append_row(vec!["Carol".into(), ColumnValue::Int(41)]).unwrap();
        table
    }

    #[test]
    fn test_table_append_and_read() {
        let table = people();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.get_value(2, 1).unwrap().as_int(), Some(41));
        assert_eq!(table.get_value_by_name(0, "name").unwrap().as_string(), Some("Alice"));
        assert!(table.get_value(1, 1).unwrap().is_null());
    }

    #[test]
    fn test_table_append_is_all_or_nothing() {
        let mut table = people();
        let before = table.generation();
        let err = table.append_row(vec!["Dan".into(), ColumnValue::Double(1.0)]);
        assert!(err.is_err());
        assert_eq!(table.len(), 3);
        assert_eq!(table.generation(), before);

        let err = table.append_row(vec!["Dan".into()]).unwrap_err();
        assert_eq!(err, ObjectStoreError::MissingValue("age".to_string()));
    }

    #[test]
    fn test_table_bounds() {
        let table = people();
        assert_eq!(
            table.get_value(3, 0),
            Err(ObjectStoreError::OutOfBounds { index: 3, size: 3 })
        );
        assert_eq!(
            table.column_type(7),
            Err(ObjectStoreError::ColumnOutOfBounds { column: 7, count: 2 })
        );
    }

    #[test]
    fn test_table_mutations_bump_generation() {
        let mut table = people();
        let g0 = table.generation();
        table.set_value(0, 1, ColumnValue::Int(31)).unwrap();
        let g1 = table.generation();
        assert!(g1 > g0);
        table.delete_row(0).unwrap();
        assert!(table.generation() > g1);
        assert_eq!(table.get_value(0, 0).unwrap().as_string(), Some("Bob"));
    }

    #[test]
    fn test_table_delete_rows() {
        let mut table = people();
        assert_eq!(table.delete_rows(&[2, 0, 2]).unwrap(), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_value(0, 0).unwrap().as_string(), Some("Bob"));
        assert!(table.delete_rows(&[4]).is_err());
    }

    #[test]
    fn test_row_keys_survive_deletes() {
        let mut table = people();
        let carol = table.row_key(2).unwrap();
        table.delete_row(0).unwrap();
        assert_eq!(table.position_of_key(carol), Some(1));

        let bob = table.row_key(0).unwrap();
        table.delete_rows(&[0]).unwrap();
        assert_eq!(table.position_of_key(bob), None);
        assert_eq!(table.position_of_key(carol), Some(0));

        // keys of deleted rows are not handed out again
        table.append_row(vec!["Dan".into(), ColumnValue::Null]).unwrap();
        assert!(table.row_key(1).unwrap() > carol);
        assert_eq!(table.position_of_key(bob), None);
    }

    #[test]
    fn test_table_detached_rejects_access() {
        let mut table = people();
        table.detach();
        assert_eq!(table.get_value(0, 0), Err(ObjectStoreError::Invalidated));
        assert_eq!(table.delete_all_rows(), Err(ObjectStoreError::Invalidated));
    }

    #[test]
    fn test_table_to_json() {
        let table = people();
        let json = table.to_json().unwrap();
        assert!(json.contains("\"name\": \"Alice\""));
        assert!(json.contains("\"age\": null"));
    }
}
