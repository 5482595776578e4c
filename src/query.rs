//! Query: compiled predicates over a single table.
//!
//! A query is built from typed conditions on column indices and combined
//! with AND / OR / NOT:
//! - `Query::new(table).greater(1, 30)`
//! - `Query::new(table).equal(0, "Alice").and_query(other)?`
//! - `Query::new(table).is_null(2).not()`
//!
//! A query with no conditions matches every row. Evaluation walks the table
//! in native row order, so matches are always reported in ascending position.

use crate::column::ColumnValue;
use crate::error::{ObjectStoreError, Result};
use crate::table::{Table, TableRef};
use crate::view::TableView;
use std::cmp::Ordering;
use std::rc::Rc;

/// A predicate expression evaluated against one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Compare column to a literal value
    Compare {
        column: usize,
        op: CompareOp,
        value: ColumnValue,
    },
    IsNull { column: usize },
    IsNotNull { column: usize },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Matches no row
    Never,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A predicate bound to the table it selects rows from.
#[derive(Clone)]
pub struct Query {
    table: TableRef,
    /// None matches every row
    expr: Option<Expr>,
}

impl Query {
    /// A query matching every row of `table`.
    pub fn new(table: TableRef) -> Self {
        Query { table, expr: None }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// True when the query has no conditions and matches every row.
    pub fn is_match_all(&self) -> bool {
        self.expr.is_none()
    }

    fn with_condition(mut self, cond: Expr) -> Self {
        self.expr = Some(match self.expr.take() {
            None => cond,
            Some(existing) => Expr::And(Box::new(existing), Box::new(cond)),
        });
        self
    }

    fn compare(self, column: usize, op: CompareOp, value: impl Into<ColumnValue>) -> Self {
        self.with_condition(Expr::Compare {
            column,
            op,
            value: value.into(),
        })
    }

    pub fn equal(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Eq, value)
    }

    pub fn not_equal(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Ne, value)
    }

    pub fn less(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Lt, value)
    }

    pub fn less_equal(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Le, value)
    }

    pub fn greater(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Gt, value)
    }

    pub fn greater_equal(self, column: usize, value: impl Into<ColumnValue>) -> Self {
        self.compare(column, CompareOp::Ge, value)
    }

    pub fn is_null(self, column: usize) -> Self {
        self.with_condition(Expr::IsNull { column })
    }

    pub fn is_not_null(self, column: usize) -> Self {
        self.with_condition(Expr::IsNotNull { column })
    }

    /// Negate the whole query. Negating a match-all query matches nothing.
    pub fn not(mut self) -> Self {
        self.expr = Some(match self.expr.take() {
            None => Expr::Never,
            Some(inner) => Expr::Not(Box::new(inner)),
        });
        self
    }

    fn ensure_same_table(&self, other: &Query) -> Result<()> {
        if Rc::ptr_eq(&self.table, &other.table) {
            return Ok(());
        }
        Err(ObjectStoreError::MismatchedTable {
            expected: self.table.borrow().name().to_string(),
            found: other.table.borrow().name().to_string(),
        })
    }

    /// Logical AND of this query with `other`; both must target the same table.
    pub fn and_query(self, other: Query) -> Result<Query> {
        self.ensure_same_table(&other)?;
        Ok(match other.expr {
            None => self,
            Some(cond) => self.with_condition(cond),
        })
    }

    /// Logical OR of this query with `other`; both must target the same table.
    pub fn or_query(mut self, other: Query) -> Result<Query> {
        self.ensure_same_table(&other)?;
        self.expr = match (self.expr.take(), other.expr) {
            (Some(a), Some(b)) => Some(Expr::Or(Box::new(a), Box::new(b))),
            // Either side matching everything makes the disjunction match everything
            _ => None,
        };
        Ok(self)
    }

    fn validate_columns(&self, table: &Table) -> Result<()> {
        let mut columns = Vec::new();
        if let Some(expr) = &self.expr {
            extract_columns(expr, &mut columns);
        }
        let count = table.column_count();
        for column in columns {
            if column >= count {
                return Err(ObjectStoreError::ColumnOutOfBounds { column, count });
            }
        }
        Ok(())
    }

    fn prepare(&self) -> Result<std::cell::Ref<'_, Table>> {
        let table = self.table.borrow();
        if !table.is_attached() {
            return Err(ObjectStoreError::Invalidated);
        }
        self.validate_columns(&table)?;
        Ok(table)
    }

    fn matches_row(&self, table: &Table, row: usize) -> bool {
        match &self.expr {
            None => true,
            Some(expr) => eval_expr(expr, table, row),
        }
    }

    /// Positions of all matching rows, in native row order.
    pub fn evaluate(&self) -> Result<Vec<usize>> {
        let table = self.prepare()?;
        Ok((0..table.len()).filter(|&row| self.matches_row(&table, row)).collect())
    }

    /// Materialize the matching rows into an unsorted view.
    pub fn find_all(&self) -> Result<TableView> {
        let positions = self.evaluate()?;
        let generation = self.table.borrow().generation();
        Ok(TableView::new(self.clone(), positions, generation))
    }

    pub fn count(&self) -> Result<usize> {
        let table = self.prepare()?;
        Ok((0..table.len()).filter(|&row| self.matches_row(&table, row)).count())
    }

    /// Number of matching rows with position in `start..end`.
    pub fn count_range(&self, start: usize, end: usize) -> Result<usize> {
        let table = self.prepare()?;
        let end = end.min(table.len());
        Ok((start.min(end)..end).filter(|&row| self.matches_row(&table, row)).count())
    }

    /// Whether the row at `position` exists and satisfies the predicate.
    pub fn matches(&self, position: usize) -> Result<bool> {
        let table = self.prepare()?;
        Ok(position < table.len() && self.matches_row(&table, position))
    }

    /// Delete every matching row from the table. Returns the number removed.
    pub fn remove(&self) -> Result<usize> {
        let positions = self.evaluate()?;
        self.table.borrow_mut().delete_rows(&positions)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.table.borrow().name())
            .field("expr", &self.expr)
            .finish()
    }
}

/// Evaluate an expression against the row at `row`.
pub fn eval_expr(expr: &Expr, table: &Table, row: usize) -> bool {
    match expr {
        Expr::Compare { column, op, value } => match table.value_ref(row, *column) {
            None => false,
            Some(col_val) => compare_values(col_val, *op, value),
        },
        Expr::IsNull { column } => matches!(table.value_ref(row, *column), Some(ColumnValue::Null)),
        Expr::IsNotNull { column } => {
            matches!(table.value_ref(row, *column), Some(v) if !v.is_null())
        }
        Expr::And(left, right) => eval_expr(left, table, row) && eval_expr(right, table, row),
        Expr::Or(left, right) => eval_expr(left, table, row) || eval_expr(right, table, row),
        Expr::Not(inner) => !eval_expr(inner, table, row),
        Expr::Never => false,
    }
}

/// Compare a cell to a literal.
///
/// Any comparison involving NULL is false; use IS NULL / IS NOT NULL.
/// Numeric types compare across Int/Float/Double/DateTime: Int and DateTime
/// compare exactly as i64, everything else by widening to f64.
fn compare_values(col_val: &ColumnValue, op: CompareOp, lit_val: &ColumnValue) -> bool {
    use ColumnValue::*;
    let ordering = match (col_val, lit_val) {
        (Null, _) | (_, Null) => return false,
        (Int(a), Int(b)) | (DateTime(a), DateTime(b)) | (Int(a), DateTime(b)) | (DateTime(a), Int(b)) => {
            a.partial_cmp(b)
        }
        (String(a), String(b)) => a.partial_cmp(b),
        (Bool(a), Bool(b)) => {
            return match op {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                // < > <= >= don't make sense for bools
                _ => false,
            };
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return false,
        },
    };

    match ordering {
        // NaN never compares
        None => false,
        Some(ord) => match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        },
    }
}

fn extract_columns(expr: &Expr, columns: &mut Vec<usize>) {
    match expr {
        Expr::Compare { column, .. } | Expr::IsNull { column } | Expr::IsNotNull { column } => {
            columns.push(*column)
        }
        Expr::And(left, right) | Expr::Or(left, right) => {
            extract_columns(left, columns);
            extract_columns(right, columns);
        }
        Expr::Not(inner) => extract_columns(inner, columns),
        Expr::Never => {}
    }
}
