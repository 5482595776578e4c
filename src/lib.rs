/// ObjectStore - Embedded Object Store with Lazy Results
///
/// Tables of typed columns grouped into a session (`Realm`), composable
/// queries, and `Results`: a lazily evaluated, cached collection of the rows
/// matching some criteria that can be further filtered, sorted, aggregated
/// and cleared.

pub mod aggregate;
pub mod column;
pub mod config;
pub mod error;
pub mod query;
pub mod realm;
pub mod results;
pub mod row;
pub mod table;
pub mod view;

pub use aggregate::{AggregateOp, Mixed};
pub use column::{Column, ColumnType, ColumnValue};
pub use config::Config;
pub use error::{ObjectStoreError, Result};
pub use query::{CompareOp, Expr, Query};
pub use realm::{Realm, SharedRealm};
pub use results::{Results, ResultsMode};
pub use row::Row;
pub use table::{Schema, Table, TableRef};
pub use view::{SortKey, SortOrder, TableView};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRODUCT: usize = 0;
    const QUANTITY: usize = 1;
    const PRICE: usize = 2;
    const DISCONTINUED: usize = 3;

    fn inventory() -> (SharedRealm, TableRef) {
        let realm = Realm::open(Config::new("inventory"));
        let table = realm
            .add_table(
                "Product",
                Schema::new(vec![
                    ("product".to_string(), ColumnType::String, false),
                    ("quantity".to_string(), ColumnType::Int, false),
                    ("price".to_string(), ColumnType::Double, true),
                    ("discontinued".to_string(), ColumnType::Bool, false),
                ]),
            )
            .unwrap();

        realm
            .write(|| {
                let mut t = table.borrow_mut();
                t.append_row(vec!["Widget".into(), ColumnValue::Int(10), ColumnValue::Double(9.99), false.into()])?;
                t.append_row(vec!["Gadget".into(), ColumnValue::Int(5), ColumnValue::Double(19.99), false.into()])?;
                t.append_row(vec!["Doohickey".into(), ColumnValue::Int(15), ColumnValue::Double(4.99), true.into()])?;
                t.append_row(vec!["Gizmo".into(), ColumnValue::Int(0), ColumnValue::Null, false.into()])?;
                Ok(())
            })
            .unwrap();
        (realm, table)
    }

    fn products(results: &Results) -> Vec<String> {
        results
            .iter()
            .unwrap()
            .map(|row| row.get(PRODUCT).unwrap().as_string().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_complete_workflow() {
        let (realm, table) = inventory();
        let all = Results::from_table(realm.clone(), table.clone());
        assert_eq!(all.size().unwrap(), 4);

        let in_stock = all.filter(Query::new(table.clone()).greater(QUANTITY, 0i64)).unwrap();
        let by_price = in_stock.sort(SortOrder::by(PRICE, false)).unwrap();
        assert_eq!(products(&by_price), vec!["Gadget", "Widget", "Doohickey"]);

        let active = by_price
            .filter(Query::new(table.clone()).equal(DISCONTINUED, false))
            .unwrap();
        assert_eq!(products(&active), vec!["Gadget", "Widget"]);
        assert_eq!(active.sum(QUANTITY).unwrap(), Some(Mixed::Int(15)));
        assert_eq!(active.max(PRICE).unwrap(), Some(Mixed::Double(19.99)));

        // Nulls are skipped by aggregates and sort first ascending
        assert_eq!(all.min(PRICE).unwrap(), Some(Mixed::Double(4.99)));
        let cheapest_first = all.sort(SortOrder::by(PRICE, true)).unwrap();
        assert_eq!(products(&cheapest_first), vec!["Gizmo", "Doohickey", "Widget", "Gadget"]);

        realm.write(|| active.clear()).unwrap();
        assert_eq!(all.size().unwrap(), 2);
        assert_eq!(products(&by_price), vec!["Doohickey"]);
        assert_eq!(active.size().unwrap(), 0);
    }

    #[test]
    fn test_results_follow_writes() {
        let (realm, table) = inventory();
        let cheap = Results::from_query(
            realm.clone(),
            Query::new(table.clone()).less(PRICE, 10.0f64),
            SortOrder::by(PRICE, true),
        );
        assert_eq!(products(&cheap), vec!["Doohickey", "Widget"]);

        realm
            .write(|| {
                table
                    .borrow_mut()
                    .append_row(vec!["Thingamajig".into(), ColumnValue::Int(3), ColumnValue::Double(1.5), false.into()])
            })
            .unwrap();
        assert_eq!(products(&cheap), vec!["Thingamajig", "Doohickey", "Widget"]);
        assert_eq!(cheap.index_of(4).unwrap(), Some(0));
    }

    #[test]
    fn test_multi_key_sort() {
        let (realm, table) = inventory();
        let sorted = Results::from_table(realm, table)
            .sort(SortOrder::by(DISCONTINUED, true).then(QUANTITY, false))
            .unwrap();
        assert_eq!(products(&sorted), vec!["Widget", "Gadget", "Gizmo", "Doohickey"]);
    }

    #[test]
    fn test_closed_realm_invalidates_everything() {
        let (realm, table) = inventory();
        let results = Results::from_table(realm.clone(), table.clone());
        let row = results.first().unwrap().unwrap();
        realm.close();

        assert_eq!(results.size(), Err(ObjectStoreError::Invalidated));
        assert_eq!(results.clear(), Err(ObjectStoreError::Invalidated));
        assert!(!row.is_attached());
        assert_eq!(table.borrow().get_value(0, PRODUCT), Err(ObjectStoreError::Invalidated));
    }

    #[test]
    fn test_row_json_export() {
        let (realm, table) = inventory();
        let results = Results::from_table(realm, table);
        let json = results.get(3).unwrap().to_json().unwrap();
        assert_eq!(json["product"], "Gizmo");
        assert_eq!(json["price"], serde_json::Value::Null);
    }
}
