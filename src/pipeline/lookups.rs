//! Natural key to surrogate key mappings, read fresh from the store.
//!
//! A lookup is an immutable value built from whatever the dimension table
//! holds right now; nothing is cached between calls.

use crate::constants::{
    COUNTRY_TABLE, CUSTOMER_TABLE, PRODUCT_CATEGORY_TABLE, PRODUCT_TABLE, REGION_TABLE,
};
use crate::error::{EtlError, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    table: &'static str,
    keys: HashMap<String, i64>,
}

impl Lookup {
    fn from_pairs<I>(table: &'static str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        // Later rows win when two share a natural key
        let keys: HashMap<String, i64> = pairs.into_iter().collect();
        debug!("Materialized {} lookup with {} keys", table, keys.len());
        Self { table, keys }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn get(&self, natural_key: &str) -> Option<i64> {
        self.keys.get(natural_key).copied()
    }

    /// Surrogate key for `natural_key`; a missing key is a referential error.
    pub fn resolve(&self, natural_key: &str) -> Result<i64> {
        self.get(natural_key)
            .ok_or_else(|| EtlError::missing_key(self.table, natural_key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn load(conn: &Connection, table: &'static str, sql: &str) -> Result<Lookup> {
    let mut stmt = conn.prepare(sql)?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Lookup::from_pairs(table, pairs))
}

/// Region name -> RegionID
pub fn region_lookup(conn: &Connection) -> Result<Lookup> {
    load(
        conn,
        REGION_TABLE,
        "SELECT Region, RegionID FROM Region ORDER BY RegionID",
    )
}

/// Country name -> CountryID
pub fn country_lookup(conn: &Connection) -> Result<Lookup> {
    load(
        conn,
        COUNTRY_TABLE,
        "SELECT Country, CountryID FROM Country ORDER BY CountryID",
    )
}

/// "FirstName LastName" -> CustomerID
pub fn customer_lookup(conn: &Connection) -> Result<Lookup> {
    load(
        conn,
        CUSTOMER_TABLE,
        "SELECT FirstName || ' ' || LastName, CustomerID FROM Customer ORDER BY CustomerID",
    )
}

/// Category code -> ProductCategoryID
pub fn product_category_lookup(conn: &Connection) -> Result<Lookup> {
    load(
        conn,
        PRODUCT_CATEGORY_TABLE,
        "SELECT ProductCategory, ProductCategoryID FROM ProductCategory ORDER BY ProductCategoryID",
    )
}

/// Product name -> ProductID
pub fn product_lookup(conn: &Connection) -> Result<Lookup> {
    load(
        conn,
        PRODUCT_TABLE,
        "SELECT ProductName, ProductID FROM Product ORDER BY ProductID",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE Region (RegionID INTEGER PRIMARY KEY, Region TEXT);
            INSERT INTO Region VALUES (1, 'Asia'), (2, 'Europe');
            CREATE TABLE Customer (CustomerID INTEGER PRIMARY KEY, FirstName TEXT, LastName TEXT);
            INSERT INTO Customer VALUES (1, 'Ann', 'Lee'), (2, 'Jane', 'A Doe'), (3, 'Ann', 'Lee');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_region_lookup() {
        let lookup = region_lookup(&store()).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.resolve("Europe").unwrap(), 2);
        assert_eq!(lookup.table(), "Region");
    }

    #[test]
    fn test_customer_lookup_keys_on_full_name() {
        let lookup = customer_lookup(&store()).unwrap();
        assert_eq!(lookup.get("Jane A Doe"), Some(2));
        // duplicate name: highest id wins
        assert_eq!(lookup.get("Ann Lee"), Some(3));
    }

    #[test]
    fn test_missing_key_is_referential_error() {
        let lookup = region_lookup(&store()).unwrap();
        match lookup.resolve("Atlantis") {
            Err(EtlError::MissingKey { table, key }) => {
                assert_eq!(table, "Region");
                assert_eq!(key, "Atlantis");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_reflects_current_table() {
        let conn = store();
        assert_eq!(region_lookup(&conn).unwrap().len(), 2);
        conn.execute("INSERT INTO Region VALUES (3, 'Oceania')", []).unwrap();
        assert_eq!(region_lookup(&conn).unwrap().get("Oceania"), Some(3));
    }

    #[test]
    fn test_lookup_on_missing_table_fails() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(product_lookup(&conn), Err(EtlError::Sqlite(_))));
    }
}
