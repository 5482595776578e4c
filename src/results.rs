//! Results: a lazily evaluated view of the rows matching some criteria.
//!
//! A `Results` is always in one of four modes:
//!
//! - **Empty**: no backing store; every accessor returns an empty answer.
//! - **Table**: a whole table in native row order. Size and access are O(1)
//!   and never materialize anything.
//! - **Query**: a predicate plus an optional sort order. The first read that
//!   needs concrete row positions evaluates the query, sorts the matches and
//!   caches the resulting `TableView`. The cache is keyed by the session's
//!   data generation and rebuilt on the next read after any mutation.
//! - **TableView**: an already materialized view handed in by the caller,
//!   re-synced against its own query when stale.
//!
//! Deriving new results with [`Results::filter`] or [`Results::sort`] never
//! evaluates anything; the work is deferred to the first read of the derived
//! value.
//!
//! # Examples
//!
//! ```
//! use objectstore::{Config, Realm, Results, Query, Schema, SortOrder, ColumnType, ColumnValue, Mixed};
//!
//! let realm = Realm::open(Config::new("docs"));
//! let table = realm.add_table("Item", Schema::new(vec![
//!     ("price".to_string(), ColumnType::Int, false),
//! ])).unwrap();
//! realm.write(|| {
//!     let mut t = table.borrow_mut();
//!     for price in [10, -5, 7] {
//!         t.append_row(vec![ColumnValue::Int(price)])?;
//!     }
//!     Ok(())
//! }).unwrap();
//!
//! let results = Results::from_query(realm.clone(), Query::new(table.clone()), SortOrder::by(0, true));
//! assert_eq!(results.get(0).unwrap().get(0).unwrap().as_int(), Some(-5));
//! assert_eq!(results.sum(0).unwrap(), Some(Mixed::Int(12)));
//! assert_eq!(results.average(0).unwrap(), Some(Mixed::Double(4.0)));
//! ```

use crate::aggregate::{aggregate_rows, Accumulator, AggregateOp, Mixed};
use crate::error::{ObjectStoreError, Result};
use crate::query::Query;
use crate::realm::SharedRealm;
use crate::row::Row;
use crate::table::TableRef;
use crate::view::{SortOrder, TableView};
use log::{debug, trace, warn};
use std::cell::{Ref, RefCell};

/// The externally observed mode of a `Results`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsMode {
    Empty,
    Table,
    Query,
    TableView,
}

enum State {
    Empty,
    Table(TableRef),
    Query {
        query: Query,
        /// Materialized matches; None until first needed
        cache: RefCell<Option<TableView>>,
    },
    TableView(RefCell<TableView>),
}

/// Row source after validation and materialization.
enum Source<'a> {
    Empty,
    Table(&'a TableRef),
    View(Ref<'a, TableView>),
}

pub struct Results {
    realm: Option<SharedRealm>,
    state: State,
    sort: SortOrder,
}

impl Default for Results {
    fn default() -> Self {
        Results::empty()
    }
}

impl Clone for Results {
    /// Copies share the table and query; a cached materialization is not
    /// copied and is rebuilt lazily by the copy.
    fn clone(&self) -> Self {
        let state = match &self.state {
            State::Empty => State::Empty,
            State::Table(table) => State::Table(table.clone()),
            State::Query { query, .. } => State::Query {
                query: query.clone(),
                cache: RefCell::new(None),
            },
            State::TableView(view) => State::TableView(RefCell::new(view.borrow().clone())),
        };
        Results {
            realm: self.realm.clone(),
            state,
            sort: self.sort.clone(),
        }
    }
}

impl Results {
    /// Results that are always empty.
    pub fn empty() -> Self {
        Results {
            realm: None,
            state: State::Empty,
            sort: SortOrder::default(),
        }
    }

    /// Every row of `table`, in native order.
    pub fn from_table(realm: SharedRealm, table: TableRef) -> Self {
        Results {
            realm: Some(realm),
            state: State::Table(table),
            sort: SortOrder::default(),
        }
    }

    /// Rows matching `query`, ordered by `sort` (or match order if empty).
    /// Nothing is evaluated until the first read.
    pub fn from_query(realm: SharedRealm, query: Query, sort: SortOrder) -> Self {
        Self::lazy(Some(realm), query, sort)
    }

    /// Wrap an already materialized view.
    pub fn from_table_view(realm: SharedRealm, view: TableView) -> Self {
        let sort = view.sort_order().clone();
        Results {
            realm: Some(realm),
            state: State::TableView(RefCell::new(view)),
            sort,
        }
    }

    fn lazy(realm: Option<SharedRealm>, query: Query, sort: SortOrder) -> Self {
        Results {
            realm,
            state: State::Query {
                query,
                cache: RefCell::new(None),
            },
            sort,
        }
    }

    pub fn mode(&self) -> ResultsMode {
        match self.state {
            State::Empty => ResultsMode::Empty,
            State::Table(_) => ResultsMode::Table,
            State::Query { .. } => ResultsMode::Query,
            State::TableView(_) => ResultsMode::TableView,
        }
    }

    pub fn realm(&self) -> Option<&SharedRealm> {
        self.realm.as_ref()
    }

    pub fn has_backing_store(&self) -> bool {
        !matches!(self.state, State::Empty)
    }

    /// The table rows are drawn from, if any.
    pub fn table(&self) -> Option<TableRef> {
        match &self.state {
            State::Empty => None,
            State::Table(table) => Some(table.clone()),
            State::Query { query, .. } => Some(query.table().clone()),
            State::TableView(view) => Some(view.borrow().table().clone()),
        }
    }

    /// The sort order applied to this Results; empty when unsorted.
    pub fn current_sort(&self) -> &SortOrder {
        &self.sort
    }

    /// A query matching the same rows as this Results, or None in Empty mode.
    pub fn current_predicate(&self) -> Result<Option<Query>> {
        self.validate_read()?;
        Ok(match &self.state {
            State::Empty => None,
            State::Table(table) => Some(Query::new(table.clone())),
            State::Query { query, .. } => Some(query.clone()),
            State::TableView(view) => Some(view.borrow().query().clone()),
        })
    }

    /// True when a materialized view exists and is current with the data.
    /// Always false in Empty and Table modes, which never materialize.
    pub fn is_materialized(&self) -> bool {
        match &self.state {
            State::Empty | State::Table(_) => false,
            State::Query { cache, .. } => cache.borrow().as_ref().map_or(false, TableView::is_in_sync),
            State::TableView(view) => view.borrow().is_in_sync(),
        }
    }

    fn validate_read(&self) -> Result<()> {
        if let Some(realm) = &self.realm {
            if !realm.is_valid() {
                warn!("read from Results of closed realm '{}'", realm.config().name);
                return Err(ObjectStoreError::Invalidated);
            }
        }
        if let Some(table) = self.table() {
            if !table.borrow().is_attached() {
                return Err(ObjectStoreError::Invalidated);
            }
        }
        Ok(())
    }

    fn validate_write(&self) -> Result<()> {
        self.validate_read()?;
        let realm = self.realm.as_ref().ok_or(ObjectStoreError::WrongTransactionState {
            expected: "an active write transaction",
        })?;
        if realm.is_read_only() {
            return Err(ObjectStoreError::ReadOnly);
        }
        if !realm.is_in_write_transaction() {
            return Err(ObjectStoreError::WrongTransactionState {
                expected: "an active write transaction",
            });
        }
        Ok(())
    }

    /// Bring the cached view up to date with the data. A failure leaves the
    /// previous cache in place.
    fn materialize(&self) -> Result<()> {
        match &self.state {
            State::Empty | State::Table(_) => Ok(()),
            State::Query { query, cache } => {
                if cache.borrow().as_ref().map_or(false, TableView::is_in_sync) {
                    trace!("materialized view is current");
                    return Ok(());
                }

                let mut view = query.find_all()?;
                if !self.sort.is_empty() {
                    view.sort(&self.sort)?;
                }
                debug!(
                    "materialized {} rows of '{}' at generation {}",
                    view.size(),
                    query.table().borrow().name(),
                    view.generation()
                );
                *cache.borrow_mut() = Some(view);
                Ok(())
            }
            State::TableView(view) => {
                view.borrow_mut().sync_if_needed()?;
                Ok(())
            }
        }
    }

    fn resolve(&self) -> Result<Source<'_>> {
        self.validate_read()?;
        self.materialize()?;
        Ok(match &self.state {
            State::Empty => Source::Empty,
            State::Table(table) => Source::Table(table),
            State::Query { cache, .. } => match Ref::filter_map(cache.borrow(), Option::as_ref) {
                Ok(view) => Source::View(view),
                Err(_) => Source::Empty,
            },
            State::TableView(view) => Source::View(view.borrow()),
        })
    }

    /// Number of rows. In Query mode this materializes on first call;
    /// afterwards it is O(1) until the data changes.
    pub fn size(&self) -> Result<usize> {
        Ok(match self.resolve()? {
            Source::Empty => 0,
            Source::Table(table) => table.borrow().len(),
            Source::View(view) => view.size(),
        })
    }

    /// Row at logical position `index`; fails with `OutOfBounds` past the end.
    pub fn get(&self, index: usize) -> Result<Row> {
        match self.resolve()? {
            Source::Empty => Err(ObjectStoreError::OutOfBounds { index, size: 0 }),
            Source::Table(table) => Row::at(table, index),
            Source::View(view) => view.get(index),
        }
    }

    pub fn first(&self) -> Result<Option<Row>> {
        Ok(match self.resolve()? {
            Source::Empty => None,
            Source::Table(table) => Row::at(table, 0).ok(),
            Source::View(view) => view.first(),
        })
    }

    pub fn last(&self) -> Result<Option<Row>> {
        Ok(match self.resolve()? {
            Source::Empty => None,
            Source::Table(table) => {
                let len = table.borrow().len();
                len.checked_sub(1).and_then(|last| Row::at(table, last).ok())
            }
            Source::View(view) => view.last(),
        })
    }

    /// Logical index of the row at absolute table position `position`, or
    /// None if that row is not part of these results.
    pub fn index_of(&self, position: usize) -> Result<Option<usize>> {
        self.validate_read()?;
        match &self.state {
            State::Empty => Ok(None),
            State::Table(table) => Ok((position < table.borrow().len()).then_some(position)),
            // Unsorted matches are in table order, so the index is the
            // number of matches before the row; no materialization needed
            State::Query { query, .. } if self.sort.is_empty() && !self.is_materialized() => {
                if query.matches(position)? {
                    Ok(Some(query.count_range(0, position)?))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(match self.resolve()? {
                Source::View(view) => view.find_by_source_ndx(position),
                Source::Empty | Source::Table(_) => None,
            }),
        }
    }

    /// Logical index of `row`. The row must be live and come from the same
    /// table as these results.
    pub fn index_of_row(&self, row: &Row) -> Result<Option<usize>> {
        self.validate_read()?;
        let position = row.index()?;
        if let Some(table) = self.table() {
            if !row.belongs_to(&table) {
                return Err(ObjectStoreError::MismatchedTable {
                    expected: table.borrow().name().to_string(),
                    found: row.table().borrow().name().to_string(),
                });
            }
        }
        self.index_of(position)
    }

    /// Rows in logical order, captured at call time.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Row>> {
        let rows: Vec<Row> = match self.resolve()? {
            Source::Empty => Vec::new(),
            Source::Table(table) => {
                let len = table.borrow().len();
                (0..len).map(|i| Row::at(table, i)).collect::<Result<_>>()?
            }
            Source::View(view) => view.positions().iter().map(|&p| Row::at(view.table(), p)).collect::<Result<_>>()?,
        };
        Ok(rows.into_iter())
    }

    /// Delete every row in these results from the database. `size()` is 0
    /// afterwards. Requires an active write transaction.
    pub fn clear(&self) -> Result<()> {
        match &self.state {
            State::Empty => Ok(()),
            State::Table(table) => {
                self.validate_write()?;
                table.borrow_mut().delete_all_rows()?;
                debug!("cleared table '{}'", table.borrow().name());
                Ok(())
            }
            State::Query { query, cache } => {
                self.validate_write()?;
                let removed = query.remove()?;
                cache.borrow_mut().take();
                debug!("cleared {} rows of '{}'", removed, query.table().borrow().name());
                Ok(())
            }
            State::TableView(view) => {
                self.validate_write()?;
                let mut view = view.borrow_mut();
                view.sync_if_needed()?;
                let removed = view.delete_all()?;
                debug!("cleared {} rows of materialized view", removed);
                Ok(())
            }
        }
    }

    fn source_query(&self) -> Option<Query> {
        match &self.state {
            State::Empty => None,
            State::Table(table) => Some(Query::new(table.clone())),
            State::Query { query, .. } => Some(query.clone()),
            State::TableView(view) => Some(view.borrow().query().clone()),
        }
    }

    /// New Results matching this one's rows AND `query`, keeping the current
    /// sort order. Filtering empty results yields empty results.
    pub fn filter(&self, query: Query) -> Result<Results> {
        self.validate_read()?;
        match self.source_query() {
            None => Ok(Results::empty()),
            Some(current) => {
                let combined = current.and_query(query)?;
                Ok(Results::lazy(self.realm.clone(), combined, self.sort.clone()))
            }
        }
    }

    /// New Results over the same rows with `order` replacing the current sort.
    /// An empty order restores match order. Sorting empty results yields
    /// empty results.
    pub fn sort(&self, order: SortOrder) -> Result<Results> {
        self.validate_read()?;
        match self.source_query() {
            None => Ok(Results::empty()),
            Some(current) => {
                order.validate(&current.table().borrow())?;
                Ok(Results::lazy(self.realm.clone(), current, order))
            }
        }
    }

    fn aggregate(&self, column: usize, op: AggregateOp) -> Result<Option<Mixed>> {
        self.validate_read()?;
        // Reject bad columns before paying for materialization
        if let Some(table) = self.table() {
            let table = table.borrow();
            Accumulator::new(op, table.column_type(column)?, table.column_name(column)?)?;
        }

        match self.resolve()? {
            Source::Empty => Ok(None),
            Source::Table(table) => {
                let table = table.borrow();
                aggregate_rows(&table, 0..table.len(), column, op)
            }
            Source::View(view) => {
                let table = view.table().borrow();
                aggregate_rows(&table, view.positions().iter().copied(), column, op)
            }
        }
    }

    /// Largest value of `column`, or None when no row has a value.
    pub fn max(&self, column: usize) -> Result<Option<Mixed>> {
        self.aggregate(column, AggregateOp::Max)
    }

    /// Smallest value of `column`, or None when no row has a value.
    pub fn min(&self, column: usize) -> Result<Option<Mixed>> {
        self.aggregate(column, AggregateOp::Min)
    }

    /// Mean of `column` over the matching rows, or None when no row has a value.
    pub fn average(&self, column: usize) -> Result<Option<Mixed>> {
        self.aggregate(column, AggregateOp::Average)
    }

    /// Sum of `column`; zero when no row has a value. Int columns sum to
    /// `Mixed::Int`; Float and Double columns both sum to `Mixed::Double`, so
    /// an empty Float column gives `Mixed::Double(0.0)`.
    pub fn sum(&self, column: usize) -> Result<Option<Mixed>> {
        self.aggregate(column, AggregateOp::Sum)
    }
}

impl std::fmt::Debug for Results {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Results")
            .field("mode", &self.mode())
            .field("sort", &self.sort)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
