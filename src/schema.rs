//! Table definitions for the normalized sales schema.
//!
//! Surrogate keys are bound explicitly by the builders, so every insert
//! statement names its primary key column.

use crate::constants::{
    COUNTRY_TABLE, CUSTOMER_TABLE, ORDER_DETAIL_TABLE, PRODUCT_CATEGORY_TABLE, PRODUCT_TABLE,
    REGION_TABLE,
};

/// DDL plus the insert statement used to bulk-load one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub ddl: &'static str,
    pub insert: &'static str,
    /// Tables whose rows point into this one, children first. Their rows are
    /// cleared when this table is rebuilt in place.
    pub dependents: &'static [&'static str],
}

pub static REGION: TableSpec = TableSpec {
    name: REGION_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS Region (
            RegionID INTEGER NOT NULL PRIMARY KEY,
            Region TEXT NOT NULL UNIQUE
        );"#,
    insert: "INSERT INTO Region (RegionID, Region) VALUES (?1, ?2)",
    dependents: &[ORDER_DETAIL_TABLE, CUSTOMER_TABLE, COUNTRY_TABLE],
};

pub static COUNTRY: TableSpec = TableSpec {
    name: COUNTRY_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS Country (
            CountryID INTEGER NOT NULL PRIMARY KEY,
            Country TEXT NOT NULL,
            RegionID INTEGER NOT NULL,
            FOREIGN KEY (RegionID) REFERENCES Region(RegionID)
        );"#,
    insert: "INSERT INTO Country (CountryID, Country, RegionID) VALUES (?1, ?2, ?3)",
    dependents: &[ORDER_DETAIL_TABLE, CUSTOMER_TABLE],
};

pub static CUSTOMER: TableSpec = TableSpec {
    name: CUSTOMER_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS Customer (
            CustomerID INTEGER NOT NULL PRIMARY KEY,
            FirstName TEXT NOT NULL,
            LastName TEXT NOT NULL,
            Address TEXT NOT NULL,
            City TEXT NOT NULL,
            CountryID INTEGER NOT NULL,
            FOREIGN KEY (CountryID) REFERENCES Country(CountryID)
        );"#,
    insert: "INSERT INTO Customer (CustomerID, FirstName, LastName, Address, City, CountryID) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    dependents: &[ORDER_DETAIL_TABLE],
};

pub static PRODUCT_CATEGORY: TableSpec = TableSpec {
    name: PRODUCT_CATEGORY_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS ProductCategory (
            ProductCategoryID INTEGER NOT NULL PRIMARY KEY,
            ProductCategory TEXT NOT NULL UNIQUE,
            ProductCategoryDescription TEXT NOT NULL
        );"#,
    insert: "INSERT INTO ProductCategory (ProductCategoryID, ProductCategory, ProductCategoryDescription) \
             VALUES (?1, ?2, ?3)",
    dependents: &[ORDER_DETAIL_TABLE, PRODUCT_TABLE],
};

pub static PRODUCT: TableSpec = TableSpec {
    name: PRODUCT_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS Product (
            ProductID INTEGER NOT NULL PRIMARY KEY,
            ProductName TEXT NOT NULL UNIQUE,
            ProductUnitPrice REAL NOT NULL,
            ProductCategoryID INTEGER NOT NULL,
            FOREIGN KEY (ProductCategoryID) REFERENCES ProductCategory(ProductCategoryID)
        );"#,
    insert: "INSERT INTO Product (ProductID, ProductName, ProductUnitPrice, ProductCategoryID) \
             VALUES (?1, ?2, ?3, ?4)",
    dependents: &[ORDER_DETAIL_TABLE],
};

pub static ORDER_DETAIL: TableSpec = TableSpec {
    name: ORDER_DETAIL_TABLE,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS OrderDetail (
            OrderID INTEGER NOT NULL PRIMARY KEY,
            CustomerID INTEGER NOT NULL,
            ProductID INTEGER NOT NULL,
            OrderDate TEXT NOT NULL,
            QuantityOrdered INTEGER NOT NULL,
            FOREIGN KEY (CustomerID) REFERENCES Customer(CustomerID),
            FOREIGN KEY (ProductID) REFERENCES Product(ProductID)
        );"#,
    insert: "INSERT INTO OrderDetail (OrderID, CustomerID, ProductID, OrderDate, QuantityOrdered) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
    dependents: &[],
};

/// All tables in build order.
pub fn all_tables() -> [&'static TableSpec; 6] {
    [
        &REGION,
        &COUNTRY,
        &CUSTOMER,
        &PRODUCT_CATEGORY,
        &PRODUCT,
        &ORDER_DETAIL,
    ]
}
