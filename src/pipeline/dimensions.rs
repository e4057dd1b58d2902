//! Dimension builders: Region, Country, Customer, ProductCategory, Product.
//!
//! Every builder scans the extract, keeps the distinct natural-key tuples in
//! sorted order, numbers them 1..N in that order and replaces its table in
//! one transaction. Builders with a parent dimension resolve the foreign key
//! through a lookup read from the store just before the insert.

use crate::constants::{
    COUNTRY_TABLE, CUSTOMER_TABLE, PRODUCT_CATEGORY_TABLE, PRODUCT_TABLE, REGION_TABLE,
};
use crate::error::Result;
use crate::extract::{parse_unit_price, CustomerRecord, ExtractReader, RawRow, SalesRecord};
use crate::pipeline::lookups::{country_lookup, product_category_lookup, region_lookup};
use crate::pipeline::PhaseReport;
use crate::schema;
use crate::storage::{self, TableRow};
use rusqlite::{params, Statement};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Distinct natural keys in build order, plus how many rows were too short.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan<K> {
    pub keys: Vec<K>,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub region_id: i64,
    pub region: String,
}

impl TableRow for RegionRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.region_id, self.region])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CountryKey {
    pub country: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRow {
    pub country_id: i64,
    pub country: String,
    pub region_id: i64,
}

impl TableRow for CountryRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.country_id, self.country, self.region_id])
    }
}

/// Field order gives the sort: full name first, the rest break ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CustomerKey {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRow {
    pub customer_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub country_id: i64,
}

impl TableRow for CustomerRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.customer_id,
            self.first_name,
            self.last_name,
            self.address,
            self.city,
            self.country_id
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CategoryKey {
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCategoryRow {
    pub product_category_id: i64,
    pub category: String,
    pub description: String,
}

impl TableRow for ProductCategoryRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.product_category_id,
            self.category,
            self.description
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductKey {
    pub name: String,
    pub unit_price: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub product_category_id: i64,
}

impl TableRow for ProductRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.product_id,
            self.name,
            self.unit_price,
            self.product_category_id
        ])
    }
}

/// Surrogate key for the `index`-th key in sorted order.
fn surrogate(index: usize) -> i64 {
    index as i64 + 1
}

fn scan_customers<I, K, F>(rows: I, mut keys_of: F) -> Result<Scan<K>>
where
    I: IntoIterator<Item = Result<RawRow>>,
    K: Ord,
    F: FnMut(CustomerRecord) -> Result<K>,
{
    let mut keys = BTreeSet::new();
    let mut skipped = 0;
    for row in rows {
        let row = row?;
        match CustomerRecord::from_row(&row) {
            Some(record) => {
                keys.insert(keys_of(record)?);
            }
            None => {
                debug!(line = row.line, fields = row.len(), "Skipping short row");
                skipped += 1;
            }
        }
    }
    Ok(Scan {
        keys: keys.into_iter().collect(),
        skipped,
    })
}

fn scan_sales<I, F>(rows: I, mut visit: F) -> Result<usize>
where
    I: IntoIterator<Item = Result<RawRow>>,
    F: FnMut(&SalesRecord) -> Result<()>,
{
    let mut skipped = 0;
    for row in rows {
        let row = row?;
        match SalesRecord::from_row(&row) {
            Some(record) => visit(&record)?,
            None => {
                debug!(line = row.line, fields = row.len(), "Skipping short row");
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

/// Region names, ascending.
pub fn collect_regions<I>(rows: I) -> Result<Scan<String>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    scan_customers(rows, |r| Ok(r.region))
}

/// Distinct (country, region) pairs sorted by country name.
pub fn collect_countries<I>(rows: I) -> Result<Scan<CountryKey>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    scan_customers(rows, |r| {
        Ok(CountryKey {
            country: r.country,
            region: r.region,
        })
    })
}

/// Distinct customer tuples sorted by "FirstName LastName".
pub fn collect_customers<I>(rows: I) -> Result<Scan<CustomerKey>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    scan_customers(rows, |r| {
        let name = r.name()?;
        Ok(CustomerKey {
            full_name: name.full(),
            first_name: name.first,
            last_name: name.last,
            address: r.address,
            city: r.city,
            country: r.country,
        })
    })
}

/// One entry per category code, sorted by code. A code listed with more than
/// one description keeps the last description in file order.
pub fn collect_categories<I>(rows: I) -> Result<Scan<CategoryKey>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    let mut latest: BTreeMap<String, String> = BTreeMap::new();
    let skipped = scan_sales(rows, |record| {
        for (category, description) in record.category_pairs() {
            let previous = latest.insert(category.to_string(), description.to_string());
            if previous.is_some_and(|p| p != description) {
                warn!(
                    line = record.line(),
                    category, "Category listed with another description; keeping the later one"
                );
            }
        }
        Ok(())
    })?;
    Ok(Scan {
        keys: latest
            .into_iter()
            .map(|(category, description)| CategoryKey {
                category,
                description,
            })
            .collect(),
        skipped,
    })
}

/// One entry per product name, sorted by name. A product seen with another
/// price or category keeps the last one in file order.
pub fn collect_products<I>(rows: I) -> Result<Scan<ProductKey>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    let mut latest: BTreeMap<String, (f64, String)> = BTreeMap::new();
    let skipped = scan_sales(rows, |record| {
        for (name, category, price) in record.product_triples() {
            let unit_price = parse_unit_price(record.line(), price)?;
            let previous = latest.insert(name.to_string(), (unit_price, category.to_string()));
            if previous.is_some_and(|(p, c)| p != unit_price || c != category) {
                warn!(
                    line = record.line(),
                    product = name,
                    "Product listed with another price or category; keeping the later one"
                );
            }
        }
        Ok(())
    })?;
    Ok(Scan {
        keys: latest
            .into_iter()
            .map(|(name, (unit_price, category))| ProductKey {
                name,
                unit_price,
                category,
            })
            .collect(),
        skipped,
    })
}

#[instrument(skip_all, fields(table = REGION_TABLE))]
pub fn build_region_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let scan = collect_regions(ExtractReader::open(input)?)?;
    let rows: Vec<RegionRow> = scan
        .keys
        .into_iter()
        .enumerate()
        .map(|(i, region)| RegionRow {
            region_id: surrogate(i),
            region,
        })
        .collect();

    let mut conn = storage::connect(database, false)?;
    let inserted = storage::rebuild_table(&mut conn, &schema::REGION, &rows)?;
    Ok(PhaseReport::new(REGION_TABLE, inserted, scan.skipped))
}

#[instrument(skip_all, fields(table = COUNTRY_TABLE))]
pub fn build_country_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let scan = collect_countries(ExtractReader::open(input)?)?;

    let mut conn = storage::connect(database, false)?;
    let regions = region_lookup(&conn)?;
    let rows = scan
        .keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            Ok(CountryRow {
                country_id: surrogate(i),
                region_id: regions.resolve(&key.region)?,
                country: key.country,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = storage::rebuild_table(&mut conn, &schema::COUNTRY, &rows)?;
    Ok(PhaseReport::new(COUNTRY_TABLE, inserted, scan.skipped))
}

#[instrument(skip_all, fields(table = CUSTOMER_TABLE))]
pub fn build_customer_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let scan = collect_customers(ExtractReader::open(input)?)?;

    let mut conn = storage::connect(database, false)?;
    let countries = country_lookup(&conn)?;
    let rows = scan
        .keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            Ok(CustomerRow {
                customer_id: surrogate(i),
                country_id: countries.resolve(&key.country)?,
                first_name: key.first_name,
                last_name: key.last_name,
                address: key.address,
                city: key.city,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = storage::rebuild_table(&mut conn, &schema::CUSTOMER, &rows)?;
    Ok(PhaseReport::new(CUSTOMER_TABLE, inserted, scan.skipped))
}

#[instrument(skip_all, fields(table = PRODUCT_CATEGORY_TABLE))]
pub fn build_product_category_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let scan = collect_categories(ExtractReader::open(input)?)?;
    let rows: Vec<ProductCategoryRow> = scan
        .keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| ProductCategoryRow {
            product_category_id: surrogate(i),
            category: key.category,
            description: key.description,
        })
        .collect();

    let mut conn = storage::connect(database, false)?;
    let inserted = storage::rebuild_table(&mut conn, &schema::PRODUCT_CATEGORY, &rows)?;
    Ok(PhaseReport::new(PRODUCT_CATEGORY_TABLE, inserted, scan.skipped))
}

#[instrument(skip_all, fields(table = PRODUCT_TABLE))]
pub fn build_product_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let scan = collect_products(ExtractReader::open(input)?)?;

    let mut conn = storage::connect(database, false)?;
    let categories = product_category_lookup(&conn)?;
    let rows = scan
        .keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            Ok(ProductRow {
                product_id: surrogate(i),
                product_category_id: categories.resolve(&key.category)?,
                name: key.name,
                unit_price: key.unit_price,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = storage::rebuild_table(&mut conn, &schema::PRODUCT, &rows)?;
    Ok(PhaseReport::new(PRODUCT_TABLE, inserted, scan.skipped))
}
