/// ObjectStore Column Implementation
///
/// A Column is an array-like random-access data container indexed by row
/// position. Each Column has a type specifying the type of every value stored.
/// Nullable columns additionally accept `ColumnValue::Null`.

use crate::error::{ObjectStoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Column storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer
    Int,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// Seconds since 1970-01-01 00:00:00 UTC
    DateTime,
    String,
    Bool,
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    Int(i64),
    Float(f32),
    Double(f64),
    DateTime(i64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            ColumnValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            ColumnValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            ColumnValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value, widened to f64.
    /// Returns None for null, string and bool values.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int(n) | ColumnValue::DateTime(n) => Some(*n as f64),
            ColumnValue::Float(f) => Some(*f as f64),
            ColumnValue::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// The storage type this value belongs to, or None for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int(_) => Some(ColumnType::Int),
            ColumnValue::Float(_) => Some(ColumnType::Float),
            ColumnValue::Double(_) => Some(ColumnType::Double),
            ColumnValue::DateTime(_) => Some(ColumnType::DateTime),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Bool(_) => Some(ColumnType::Bool),
            ColumnValue::Null => None,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            ColumnValue::Int(n) | ColumnValue::DateTime(n) => serde_json::Value::Number((*n).into()),
            ColumnValue::Float(f) => serde_json::Number::from_f64(*f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ColumnValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ColumnValue::String(s) => serde_json::Value::String(s.clone()),
            ColumnValue::Bool(b) => serde_json::Value::Bool(*b),
            ColumnValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int(v)
    }
}

impl From<f32> for ColumnValue {
    fn from(v: f32) -> Self {
        ColumnValue::Float(v)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Double(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::String(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::String(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

/// A single typed column of a table.
/// Handles type checking and nullable values.
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    values: Vec<ColumnValue>,
}

impl Column {
    pub fn new(name: String, column_type: ColumnType, nullable: bool) -> Self {
        Column {
            name,
            column_type,
            nullable,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate a value against the column's type and nullability
    pub fn validate_value(&self, value: &ColumnValue) -> Result<()> {
        match value.column_type() {
            None if self.nullable => Ok(()),
            None => Err(ObjectStoreError::NotNullable(self.name.clone())),
            Some(ty) if ty == self.column_type => Ok(()),
            Some(_) => Err(ObjectStoreError::InvalidValue {
                column: self.name.clone(),
                expected: self.column_type,
            }),
        }
    }

    pub fn get(&self, index: usize) -> Result<ColumnValue> {
        self.get_ref(index).cloned().ok_or(ObjectStoreError::OutOfBounds {
            index,
            size: self.values.len(),
        })
    }

    /// Borrow the value at index without cloning.
    #[inline]
    pub fn get_ref(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    pub fn set(&mut self, index: usize, value: ColumnValue) -> Result<()> {
        self.validate_value(&value)?;
        let size = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(ObjectStoreError::OutOfBounds { index, size })?;
        *slot = value;
        Ok(())
    }

    pub fn append(&mut self, value: ColumnValue) -> Result<()> {
        self.validate_value(&value)?;
        self.values.push(value);
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<ColumnValue> {
        if index >= self.values.len() {
            return Err(ObjectStoreError::OutOfBounds {
                index,
                size: self.values.len(),
            });
        }
        Ok(self.values.remove(index))
    }

    /// Remove every row whose position is in `positions` (any order).
    /// Surviving rows keep their relative order.
    pub(crate) fn delete_positions(&mut self, positions: &[bool]) {
        let mut i = 0;
        self.values.retain(|_| {
            let keep = !positions.get(i).copied().unwrap_or(false);
            i += 1;
            keep
        });
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.get_ref(index).ok_or(ObjectStoreError::OutOfBounds {
            index,
            size: self.values.len(),
        })?.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnValue> + '_ {
        self.values.iter()
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, nullable: {}, len: {} }}",
            self.name,
            self.column_type,
            self.nullable,
            self.len()
        )
    }
}
