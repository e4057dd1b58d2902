mod common;

use anyhow::Result;
use common::{as_i64, as_text, build_store, write_extract, SALES_ROWS};
use rusqlite::Connection;
use sales_normalizer::constants::BUILD_ORDER;
use sales_normalizer::storage::{self, ResultSet};
use sales_normalizer::{EtlError, Pipeline};
use std::path::Path;
use tempfile::tempdir;

fn dump(db: &Path) -> Result<Vec<ResultSet>> {
    let conn = storage::connect_read_only(db)?;
    BUILD_ORDER
        .iter()
        .map(|table| Ok(storage::query(&conn, &format!("SELECT * FROM {table} ORDER BY 1"))?))
        .collect()
}

#[test]
fn test_example_row_is_normalized() -> Result<()> {
    let dir = tempdir()?;
    let (db, result) = build_store(dir.path(), &SALES_ROWS[..1])?;

    assert_eq!(result.rows_for("Customer"), Some(1));
    assert_eq!(result.rows_for("OrderDetail"), Some(2));

    let conn = Connection::open(&db)?;
    let (first, last): (String, String) = conn.query_row(
        "SELECT FirstName, LastName FROM Customer",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(first, "Jane");
    assert_eq!(last, "A Doe");

    let orders = storage::query(
        &conn,
        "SELECT p.ProductName, od.OrderDate, od.QuantityOrdered,
                ROUND(p.ProductUnitPrice * od.QuantityOrdered, 2) AS LineTotal
         FROM OrderDetail od JOIN Product p ON p.ProductID = od.ProductID
         ORDER BY od.OrderID",
    )?;
    assert_eq!(orders.len(), 2);
    assert_eq!(as_text(orders.get(0, "ProductName").unwrap()), "Widget");
    assert_eq!(as_text(orders.get(0, "OrderDate").unwrap()), "2023-01-15");
    assert_eq!(as_i64(orders.get(0, "QuantityOrdered").unwrap()), 2);
    assert_eq!(as_text(orders.get(1, "ProductName").unwrap()), "Gadget");
    assert_eq!(as_text(orders.get(1, "OrderDate").unwrap()), "2023-03-01");
    assert_eq!(as_i64(orders.get(1, "QuantityOrdered").unwrap()), 1);
    Ok(())
}

#[test]
fn test_phase_counts_and_short_rows() -> Result<()> {
    let dir = tempdir()?;
    let (_, result) = build_store(dir.path(), SALES_ROWS)?;

    let tables: Vec<&str> = result.phases.iter().map(|p| p.table).collect();
    assert_eq!(tables, BUILD_ORDER.to_vec());
    assert_eq!(result.rows_for("Region"), Some(2));
    assert_eq!(result.rows_for("Country"), Some(4));
    assert_eq!(result.rows_for("Customer"), Some(4));
    assert_eq!(result.rows_for("ProductCategory"), Some(3));
    assert_eq!(result.rows_for("Product"), Some(4));
    assert_eq!(result.rows_for("OrderDetail"), Some(6));
    assert!(result.phases.iter().all(|p| p.skipped == 1));
    Ok(())
}

#[test]
fn test_surrogate_keys_follow_sort_order() -> Result<()> {
    let dir = tempdir()?;
    let (db, _) = build_store(dir.path(), SALES_ROWS)?;
    let conn = Connection::open(&db)?;

    let names = |sql: &str| -> Result<Vec<String>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    };

    assert_eq!(names("SELECT Region FROM Region ORDER BY RegionID")?, ["Europe", "NorthAm"]);
    assert_eq!(
        names("SELECT Country FROM Country ORDER BY CountryID")?,
        ["France", "Germany", "Spain", "USA"]
    );
    assert_eq!(
        names("SELECT FirstName || ' ' || LastName FROM Customer ORDER BY CustomerID")?,
        ["Anna Berg", "Jane A Doe", "Louis Martin", "Pablo Ruiz"]
    );
    assert_eq!(
        names("SELECT ProductName FROM Product ORDER BY ProductID")?,
        ["Bolt", "Gadget", "Gear", "Widget"]
    );
    assert_eq!(
        names("SELECT ProductCategory FROM ProductCategory ORDER BY ProductCategoryID")?,
        ["CatA", "CatB", "CatC"]
    );

    // Order IDs follow file order
    let customers: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT CustomerID FROM OrderDetail ORDER BY OrderID")?;
        let rows = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    assert_eq!(customers, vec![2, 2, 1, 3, 3, 4]);
    Ok(())
}

#[test]
fn test_referential_integrity_and_uniqueness() -> Result<()> {
    let dir = tempdir()?;
    let (db, _) = build_store(dir.path(), SALES_ROWS)?;
    let conn = Connection::open(&db)?;

    let violations = storage::query(&conn, "PRAGMA foreign_key_check")?;
    assert!(violations.is_empty());

    let orphans: i64 = conn.query_row(
        "SELECT COUNT(*) FROM OrderDetail od
         LEFT JOIN Customer c ON c.CustomerID = od.CustomerID
         LEFT JOIN Product p ON p.ProductID = od.ProductID
         WHERE c.CustomerID IS NULL OR p.ProductID IS NULL",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(orphans, 0);

    for (table, key) in [
        ("Region", "Region"),
        ("Country", "Country, RegionID"),
        ("Customer", "FirstName, LastName, Address, City, CountryID"),
        ("ProductCategory", "ProductCategory, ProductCategoryDescription"),
        ("Product", "ProductName, ProductUnitPrice, ProductCategoryID"),
    ] {
        let duplicates: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1)"),
            [],
            |r| r.get(0),
        )?;
        assert_eq!(duplicates, 0, "duplicates in {table}");
    }
    Ok(())
}

#[test]
fn test_rebuild_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let (db, _) = build_store(dir.path(), SALES_ROWS)?;
    let first = dump(&db)?;

    let input = dir.path().join("sales.tsv");
    Pipeline::new(&input, &db).run()?;
    assert_eq!(dump(&db)?, first);

    // Replacing tables in place gives the same contents
    Pipeline::new(&input, &db).with_reset(false).run()?;
    assert_eq!(dump(&db)?, first);
    Ok(())
}

#[test]
fn test_in_place_rebuild_accepts_fewer_keys() -> Result<()> {
    let dir = tempdir()?;
    let (db, _) = build_store(dir.path(), SALES_ROWS)?;

    // Dropping Jane removes NorthAm, USA, Widget, Gadget, CatA and CatB
    let input = write_extract(dir.path(), &SALES_ROWS[1..])?;
    let result = Pipeline::new(&input, &db).with_reset(false).run()?;
    assert_eq!(result.rows_for("Region"), Some(1));
    assert_eq!(result.rows_for("OrderDetail"), Some(4));

    let fresh = tempdir()?;
    let (fresh_db, _) = build_store(fresh.path(), &SALES_ROWS[1..])?;
    assert_eq!(dump(&db)?, dump(&fresh_db)?);

    let conn = Connection::open(&db)?;
    assert!(storage::query(&conn, "PRAGMA foreign_key_check")?.is_empty());
    Ok(())
}

#[test]
fn test_repeated_product_or_category_keeps_last_listing() -> Result<()> {
    let dir = tempdir()?;
    let (db, result) = build_store(
        dir.path(),
        &[
            "Ann Lee\t2 B St\tRome\tItaly\tEurope\tCup\tWare\tKitchen\t7.25\t1\t20230101",
            "Bo Kim\t3 C St\tSeoul\tKorea\tAsia\tCup\tWare\tKitchenware\t7.50\t2\t20230201",
        ],
    )?;
    assert_eq!(result.rows_for("ProductCategory"), Some(1));
    assert_eq!(result.rows_for("Product"), Some(1));
    assert_eq!(result.rows_for("OrderDetail"), Some(2));

    let conn = Connection::open(&db)?;
    let (price, description): (f64, String) = conn.query_row(
        "SELECT p.ProductUnitPrice, c.ProductCategoryDescription
         FROM Product p JOIN ProductCategory c ON c.ProductCategoryID = p.ProductCategoryID
         WHERE p.ProductName = 'Cup'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(price, 7.5);
    assert_eq!(description, "Kitchenware");
    Ok(())
}

#[test]
fn test_single_token_customer_name_aborts() -> Result<()> {
    let dir = tempdir()?;
    let input = write_extract(
        dir.path(),
        &["Madonna\t1 Pop St\tDetroit\tUSA\tNorthAm\tMic\tCatM\tDescM\t10\t1\t20230101"],
    )?;

    let err = Pipeline::new(&input, dir.path().join("out.db")).run().unwrap_err();
    assert!(matches!(err, EtlError::Parse { line: 2, .. }), "{err}");
    Ok(())
}

#[test]
fn test_missing_input_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let err = Pipeline::new(dir.path().join("nope.tsv"), dir.path().join("out.db"))
        .run()
        .unwrap_err();
    assert!(matches!(err, EtlError::Io(_)));
    Ok(())
}
