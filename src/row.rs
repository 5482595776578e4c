/// Row handle: a reference to one row of a table.
///
/// The handle holds the row's stable key, not its position, so it keeps
/// pointing at the same row when earlier rows are deleted. Once its own row
/// is deleted (or the table detached) every access fails with `Invalidated`.

use crate::column::ColumnValue;
use crate::error::{ObjectStoreError, Result};
use crate::table::TableRef;
use std::rc::Rc;

#[derive(Clone)]
pub struct Row {
    table: TableRef,
    key: u64,
}

impl Row {
    /// Handle to the row currently at `position`, bounds-checked against the table.
    pub fn at(table: &TableRef, position: usize) -> Result<Self> {
        let key = {
            let t = table.borrow();
            if !t.is_attached() {
                return Err(ObjectStoreError::Invalidated);
            }
            t.row_key(position).ok_or(ObjectStoreError::OutOfBounds {
                index: position,
                size: t.len(),
            })?
        };
        Ok(Row { table: table.clone(), key })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    /// Current absolute position of the row in its table.
    pub fn index(&self) -> Result<usize> {
        let table = self.table.borrow();
        if !table.is_attached() {
            return Err(ObjectStoreError::Invalidated);
        }
        table.position_of_key(self.key).ok_or(ObjectStoreError::Invalidated)
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn is_attached(&self) -> bool {
        self.index().is_ok()
    }

    pub fn belongs_to(&self, table: &TableRef) -> bool {
        Rc::ptr_eq(&self.table, table)
    }

    pub fn get(&self, column: usize) -> Result<ColumnValue> {
        let index = self.index()?;
        self.table.borrow().get_value(index, column)
    }

    pub fn get_by_name(&self, column: &str) -> Result<ColumnValue> {
        let index = self.index()?;
        self.table.borrow().get_value_by_name(index, column)
    }

    /// Render the row as a JSON object keyed by column name.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let index = self.index()?;
        let table = self.table.borrow();
        let values = table.get_row(index)?;
        let obj: serde_json::Map<String, serde_json::Value> = table
            .schema()
            .get_column_names()
            .into_iter()
            .zip(values.iter())
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        Ok(serde_json::Value::Object(obj))
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.table, &other.table) && self.key == other.key
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {{ table: '{}', key: {} }}", self.table.borrow().name(), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::table::{Schema, Table};

    fn table() -> TableRef {
        let schema = Schema::new(vec![
            ("name".to_string(), ColumnType::String, false),
            ("score".to_string(), ColumnType::Double, false),
        ]);
        let mut t = Table::new("Player".to_string(), schema);
        t.append_row(vec!["Ann".into(), ColumnValue::Double(7.5)]).unwrap();
        t.into_ref()
    }

    #[test]
    fn test_row_access() {
        let t = table();
        let row = Row::at(&t, 0).unwrap();
        assert_eq!(row.index(), Ok(0));
        assert_eq!(row.get(1).unwrap().as_double(), Some(7.5));
        assert_eq!(row.get_by_name("name").unwrap().as_string(), Some("Ann"));
        assert!(row.belongs_to(&t));
        assert!(Row::at(&t, 1).is_err());
    }

    #[test]
    fn test_row_detaches_when_deleted() {
        let t = table();
        let row = Row::at(&t, 0).unwrap();
        t.borrow_mut().delete_row(0).unwrap();
        assert!(!row.is_attached());
        assert_eq!(row.get(0), Err(ObjectStoreError::Invalidated));
        assert_eq!(row.index(), Err(ObjectStoreError::Invalidated));
    }

    #[test]
    fn test_row_follows_its_row_across_deletes() {
        let t = table();
        t.borrow_mut().append_row(vec!["Bea".into(), ColumnValue::Double(3.0)]).unwrap();
        t.borrow_mut().append_row(vec!["Cy".into(), ColumnValue::Double(9.0)]).unwrap();
        let bea = Row::at(&t, 1).unwrap();

        t.borrow_mut().delete_row(0).unwrap();
        assert!(bea.is_attached());
        assert_eq!(bea.index(), Ok(0));
        assert_eq!(bea.get(0).unwrap().as_string(), Some("Bea"));
        assert_eq!(bea, Row::at(&t, 0).unwrap());
        assert_ne!(bea, Row::at(&t, 1).unwrap());
    }

    #[test]
    fn test_row_to_json() {
        let t = table();
        let json = Row::at(&t, 0).unwrap().to_json().unwrap();
        assert_eq!(json["name"], serde_json::json!("Ann"));
        assert_eq!(json["score"], serde_json::json!(7.5));
    }
}
