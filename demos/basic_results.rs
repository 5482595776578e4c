use objectstore::*;

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let realm = Realm::open(Config::new("demo"));
    let people = realm.add_table(
        "Person",
        Schema::new(vec![
            ("name".to_string(), ColumnType::String, false),
            ("age".to_string(), ColumnType::Int, false),
            ("height".to_string(), ColumnType::Float, true),
        ]),
    )?;

    realm.write(|| {
        let mut t = people.borrow_mut();
        t.append_row(vec!["Ada".into(), ColumnValue::Int(36), ColumnValue::Float(1.65)])?;
        t.append_row(vec!["Brian".into(), ColumnValue::Int(17), ColumnValue::Null])?;
        t.append_row(vec!["Chen".into(), ColumnValue::Int(52), ColumnValue::Float(1.80)])?;
        t.append_row(vec!["Dana".into(), ColumnValue::Int(29), ColumnValue::Float(1.72)])?;
        Ok(())
    })?;

    let everyone = Results::from_table(realm.clone(), people.clone());
    let adults = everyone
        .filter(Query::new(people.clone()).greater_equal(1, 18i64))?
        .sort(SortOrder::by(1, false))?;

    println!("{} people, {} adults", everyone.size()?, adults.size()?);
    for row in adults.iter()? {
        println!("  {}", row.to_json()?);
    }
    if let Some(avg) = adults.average(1)? {
        println!("average adult age: {}", avg);
    }
    if let Some(tallest) = everyone.max(2)? {
        println!("tallest: {}", tallest);
    }

    realm.write(|| everyone.filter(Query::new(people.clone()).less(1, 18i64))?.clear())?;
    println!("after removing minors: {} people", everyone.size()?);

    realm.close();
    Ok(())
}
