/// ObjectStore session ("Realm").
///
/// A Realm owns the tables of one database, the write-transaction state and
/// the data generation counter every table reports its mutations into.
/// It is shared between `Results` and callers as `SharedRealm`.
///
/// # Examples
///
/// ```
/// use objectstore::{Config, Realm, Schema, ColumnType, ColumnValue};
///
/// let realm = Realm::open(Config::new("demo"));
/// let people = realm.add_table("Person", Schema::new(vec![
///     ("age".to_string(), ColumnType::Int, false),
/// ])).unwrap();
///
/// realm.write(|| {
///     people.borrow_mut().append_row(vec![ColumnValue::Int(30)])
/// }).unwrap();
///
/// assert_eq!(people.borrow().len(), 1);
/// assert!(!realm.is_in_write_transaction());
/// ```

use crate::config::Config;
use crate::error::{ObjectStoreError, Result};
use crate::table::{Schema, Table, TableRef};
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type SharedRealm = Rc<Realm>;

pub struct Realm {
    config: Config,
    tables: RefCell<Vec<TableRef>>,
    /// Bumped by every table mutation
    generation: Rc<Cell<u64>>,
    in_write: Cell<bool>,
    valid: Cell<bool>,
}

impl Realm {
    pub fn open(config: Config) -> SharedRealm {
        info!("opening realm '{}' (read_only: {})", config.name, config.read_only);
        Rc::new(Realm {
            config,
            tables: RefCell::new(Vec::new()),
            generation: Rc::new(Cell::new(0)),
            in_write: Cell::new(false),
            valid: Cell::new(true),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    pub fn is_in_write_transaction(&self) -> bool {
        self.in_write.get()
    }

    /// Monotonically increasing version of the data in this realm.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ObjectStoreError::Invalidated)
        }
    }

    /// Create a table for a new object type.
    pub fn add_table(&self, name: &str, schema: Schema) -> Result<TableRef> {
        self.ensure_valid()?;
        let mut tables = self.tables.borrow_mut();
        if tables.iter().any(|t| t.borrow().name() == name) {
            return Err(ObjectStoreError::DuplicateTable(name.to_string()));
        }
        let table = Table::with_generation(name.to_string(), schema, self.generation.clone()).into_ref();
        tables.push(table.clone());
        debug!("realm '{}': added table '{}'", self.config.name, name);
        Ok(table)
    }

    pub fn table(&self, name: &str) -> Result<TableRef> {
        self.ensure_valid()?;
        self.tables
            .borrow()
            .iter()
            .find(|t| t.borrow().name() == name)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NoSuchTable(name.to_string()))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().iter().map(|t| t.borrow().name().to_string()).collect()
    }

    pub fn begin_write(&self) -> Result<()> {
        self.ensure_valid()?;
        if self.is_read_only() {
            return Err(ObjectStoreError::ReadOnly);
        }
        if self.in_write.get() {
            return Err(ObjectStoreError::WrongTransactionState {
                expected: "no active write transaction",
            });
        }
        self.in_write.set(true);
        debug!("realm '{}': begin write at generation {}", self.config.name, self.generation());
        Ok(())
    }

    pub fn commit_write(&self) -> Result<()> {
        self.ensure_valid()?;
        if !self.in_write.get() {
            return Err(ObjectStoreError::WrongTransactionState {
                expected: "an active write transaction",
            });
        }
        self.in_write.set(false);
        debug!("realm '{}': commit at generation {}", self.config.name, self.generation());
        Ok(())
    }

    /// Run `f` inside a write transaction. The transaction is committed
    /// whether or not `f` succeeds; its error is returned afterwards.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.begin_write()?;
        let result = f();
        self.commit_write()?;
        result
    }

    /// Close the session. Every table is detached and every `Results`
    /// created from this realm becomes invalid.
    pub fn close(&self) {
        if !self.valid.replace(false) {
            return;
        }
        self.in_write.set(false);
        for table in self.tables.borrow().iter() {
            table.borrow_mut().detach();
        }
        info!("closed realm '{}'", self.config.name);
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("name", &self.config.name)
            .field("valid", &self.valid.get())
            .field("in_write", &self.in_write.get())
            .field("generation", &self.generation.get())
            .finish()
    }
}
