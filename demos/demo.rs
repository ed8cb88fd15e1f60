use flatdb::*;

fn main() -> QueryResult<()> {
    println!("Flat-file Database Demo\n");

    let dir = std::env::temp_dir().join(format!("flatdb-demo-{}", std::process::id()));
    let mut db = Database::open(StoreConfig::new(&dir))?;

    // Create table "People"
    let schema = Schema::new(vec![
        ColumnHeader::new("Name", StorageType::String),
        ColumnHeader::new("Age", StorageType::Integer),
        ColumnHeader::new("Height", StorageType::Decimal),
    ]);
    let table = db.create_table("People", schema)?;
    println!("Created table 'People' at {:?}", table.path());

    // Insert data
    println!("Inserting data...");
    db.execute(
        "ADD [Foo Bar, 46, 1.82] IN People
         ADD [Joe Blow, 96, 1.7] IN People
         ADD ['Smith, Jane', 31, 1.65] IN People",
    )?;
    println!("Inserted 3 entries\n");

    print_entries("All people:", &db.execute("GET IN People")?);

    let old = db.execute("GET WHERE Age IS 96 IN People")?;
    if let Some(joe) = old.first() {
        db.execute(&format!("SET ENTRY {} TO [*, 97, *] IN People", joe.id))?;
    }
    print_entries(
        "After the birthday:",
        &db.execute("GET WHERE Name INCLUDES Joe IN People")?,
    );

    db.execute("REMOVE WHERE Age NOT 97 AND Height NOT 1.65 IN People")?;
    print_entries("After removal:", &db.execute("GET IN People")?);

    match db.execute("GET WHERE Age IS old IN People") {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("Rejected query: {e}\n"),
    }

    println!("Tables in database:");
    for table_name in db.list_tables() {
        println!("  - {}", table_name);
    }

    db.execute("DROP People")?;
    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

fn print_entries(title: &str, entries: &EntrySet) {
    println!("{title}");
    println!("{:<18} {:<14} {:<5} {:<6}", "ID", "NAME", "AGE", "HEIGHT");
    println!("{}", "-".repeat(46));
    for entry in entries {
        let cell = |column: &str| entry.get(column).map(Value::to_string).unwrap_or_default();
        println!(
            "{:<18} {:<14} {:<5} {:<6}",
            entry.id,
            cell("Name"),
            cell("Age"),
            cell("Height")
        );
    }
    println!();
}
