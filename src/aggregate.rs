//! Aggregation over a column of a row set.
//!
//! The column's declared type selects one accumulator variant; the set of
//! variants is closed, so adding a storage type forces every aggregate to
//! decide how it handles it.
//!
//! | column   | min/max    | sum                  | average  |
//! |----------|------------|----------------------|----------|
//! | Int      | `Int`      | `Int` (i128 running) | `Double` |
//! | Float    | `Float`    | `Double`             | `Double` |
//! | Double   | `Double`   | `Double`             | `Double` |
//! | DateTime | `DateTime` | unsupported          | unsupported |
//!
//! Null cells are skipped. Min, max and average of zero values are `None`;
//! sum of zero values is the type's zero.

use crate::column::{ColumnType, ColumnValue};
use crate::error::{ObjectStoreError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate result value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mixed {
    Int(i64),
    Float(f32),
    Double(f64),
    /// Seconds since the Unix epoch
    DateTime(i64),
}

impl Mixed {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Mixed::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Mixed::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Mixed::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Mixed::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Mixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mixed::Int(v) => write!(f, "{}", v),
            Mixed::Float(v) => write!(f, "{}", v),
            Mixed::Double(v) => write!(f, "{}", v),
            Mixed::DateTime(v) => write!(f, "@{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Average,
}

impl AggregateOp {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Average => "average",
        }
    }
}

/// Keep the better of the running extremum and `value`. The first value
/// seen wins ties so results are deterministic. NaN is unordered and is
/// skipped like a null.
fn pick<T: PartialOrd + Copy>(best: Option<T>, value: T, op: AggregateOp) -> Option<T> {
    if value.partial_cmp(&value).is_none() {
        return best;
    }
    match best {
        None => Some(value),
        Some(b) => {
            let better = match op {
                AggregateOp::Min => value < b,
                _ => value > b,
            };
            Some(if better { value } else { b })
        }
    }
}

#[derive(Debug)]
pub struct IntAccumulator {
    op: AggregateOp,
    sum: i128,
    count: usize,
    best: Option<i64>,
}

#[derive(Debug)]
pub struct FloatAccumulator {
    op: AggregateOp,
    sum: f64,
    count: usize,
    best: Option<f32>,
}

#[derive(Debug)]
pub struct DoubleAccumulator {
    op: AggregateOp,
    sum: f64,
    count: usize,
    best: Option<f64>,
}

/// Timestamps have an order but no meaningful sum, so only min/max exist.
#[derive(Debug)]
pub struct DateTimeAccumulator {
    op: AggregateOp,
    best: Option<i64>,
}

/// One running aggregate, typed by the column it reads.
#[derive(Debug)]
pub enum Accumulator {
    Int(IntAccumulator),
    Float(FloatAccumulator),
    Double(DoubleAccumulator),
    DateTime(DateTimeAccumulator),
}

impl Accumulator {
    /// Select the accumulator for `column_type`, failing with `TypeMismatch`
    /// when the type has no accumulation for `op`.
    pub fn new(op: AggregateOp, column_type: ColumnType, column_name: &str) -> Result<Self> {
        let mismatch = || ObjectStoreError::TypeMismatch {
            operation: op.name(),
            column: column_name.to_string(),
            column_type,
        };

        Ok(match column_type {
            ColumnType::Int => Accumulator::Int(IntAccumulator { op, sum: 0, count: 0, best: None }),
            ColumnType::Float => Accumulator::Float(FloatAccumulator { op, sum: 0.0, count: 0, best: None }),
            ColumnType::Double => Accumulator::Double(DoubleAccumulator { op, sum: 0.0, count: 0, best: None }),
            ColumnType::DateTime => match op {
                AggregateOp::Min | AggregateOp::Max => Accumulator::DateTime(DateTimeAccumulator { op, best: None }),
                AggregateOp::Sum | AggregateOp::Average => return Err(mismatch()),
            },
            ColumnType::String | ColumnType::Bool => return Err(mismatch()),
        })
    }

    /// Feed one cell. Nulls and values of another type are skipped.
    pub fn add(&mut self, value: &ColumnValue) {
        match (self, value) {
            (Accumulator::Int(acc), ColumnValue::Int(v)) => {
                acc.sum += *v as i128;
                acc.count += 1;
                acc.best = pick(acc.best, *v, acc.op);
            }
            (Accumulator::Float(acc), ColumnValue::Float(v)) => {
                acc.sum += *v as f64;
                acc.count += 1;
                acc.best = pick(acc.best, *v, acc.op);
            }
            (Accumulator::Double(acc), ColumnValue::Double(v)) => {
                acc.sum += *v;
                acc.count += 1;
                acc.best = pick(acc.best, *v, acc.op);
            }
            (Accumulator::DateTime(acc), ColumnValue::DateTime(v)) => {
                acc.best = pick(acc.best, *v, acc.op);
            }
            _ => {}
        }
    }

    /// Produce the final value. `column_name` is only used for error text.
    pub fn finish(self, column_name: &str) -> Result<Option<Mixed>> {
        Ok(match self {
            Accumulator::Int(acc) => match acc.op {
                AggregateOp::Min | AggregateOp::Max => acc.best.map(Mixed::Int),
                AggregateOp::Sum => {
                    let total = i64::try_from(acc.sum)
                        .map_err(|_| ObjectStoreError::AggregateOverflow(column_name.to_string()))?;
                    Some(Mixed::Int(total))
                }
                AggregateOp::Average => average(acc.sum as f64, acc.count),
            },
            Accumulator::Float(acc) => match acc.op {
                AggregateOp::Min | AggregateOp::Max => acc.best.map(Mixed::Float),
                AggregateOp::Sum => Some(Mixed::Double(acc.sum)),
                AggregateOp::Average => average(acc.sum, acc.count),
            },
            Accumulator::Double(acc) => match acc.op {
                AggregateOp::Min | AggregateOp::Max => acc.best.map(Mixed::Double),
                AggregateOp::Sum => Some(Mixed::Double(acc.sum)),
                AggregateOp::Average => average(acc.sum, acc.count),
            },
            Accumulator::DateTime(acc) => acc.best.map(Mixed::DateTime),
        })
    }
}

fn average(sum: f64, count: usize) -> Option<Mixed> {
    if count == 0 {
        None
    } else {
        Some(Mixed::Double(sum / count as f64))
    }
}

/// Aggregate `column` over the given row positions of `table`.
pub fn aggregate_rows<I>(table: &Table, rows: I, column: usize, op: AggregateOp) -> Result<Option<Mixed>>
where
    I: IntoIterator<Item = usize>,
{
    let column_type = table.column_type(column)?;
    let column_name = table.column_name(column)?;
    let mut acc = Accumulator::new(op, column_type, column_name)?;

    for row in rows {
        if let Some(value) = table.value_ref(row, column) {
            acc.add(value);
        }
    }

    acc.finish(column_name)
}
