//! Reader for the tab-delimited sales extract.
//!
//! The reader itself never rejects a line for being short; each consumer
//! applies its own minimum field count (`CustomerRecord` needs 5 fields,
//! `SalesRecord` needs 11).

use crate::constants::*;
use crate::error::{EtlError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

static ORDER_DATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").expect("valid regex"));

/// One data line split into fields. `line` is 1-based and counts the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn parse(line: usize, text: &str) -> Self {
        let fields = text
            .trim()
            .split(FIELD_DELIMITER)
            .map(String::from)
            .collect();
        Self { line, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or_default()
    }
}

/// Lazy iterator over the data lines of an extract. The header line is
/// skipped unconditionally.
pub struct ExtractReader<R: BufRead> {
    lines: Lines<R>,
    line: usize,
}

impl ExtractReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ExtractReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let mut lines = reader.lines();
        // Header; an empty input simply yields no rows
        let line = match lines.next() {
            Some(_) => 1,
            None => 0,
        };
        Self { lines, line }
    }
}

impl<R: BufRead> Iterator for ExtractReader<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.lines.next()?;
        self.line += 1;
        Some(
            text.map(|t| RawRow::parse(self.line, &t))
                .map_err(EtlError::from),
        )
    }
}

/// The customer/geography columns of a row with at least five fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub line: usize,
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub region: String,
}

impl CustomerRecord {
    /// `None` when the row is too short to describe a customer.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        if row.len() < CUSTOMER_MIN_FIELDS {
            return None;
        }
        Some(Self {
            line: row.line,
            full_name: row.field(CUSTOMER_NAME_FIELD).to_string(),
            address: row.field(ADDRESS_FIELD).to_string(),
            city: row.field(CITY_FIELD).to_string(),
            country: row.field(COUNTRY_FIELD).to_string(),
            region: row.field(REGION_FIELD).to_string(),
        })
    }

    pub fn name(&self) -> Result<PersonName> {
        PersonName::split(&self.full_name)
            .ok_or_else(|| EtlError::parse(self.line, "customer name", self.full_name.as_str()))
    }
}

/// A customer name split into first and last name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// First whitespace token is the first name; everything after it, joined
    /// by single spaces, is the last name. Needs at least two tokens.
    pub fn split(full_name: &str) -> Option<Self> {
        let mut tokens = full_name.split_whitespace();
        let first = tokens.next()?;
        let rest: Vec<&str> = tokens.collect();
        if rest.is_empty() {
            return None;
        }
        Some(Self {
            first: first.to_string(),
            last: rest.join(" "),
        })
    }

    /// "FirstName LastName", the natural key of a customer.
    pub fn full(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// A row with all eleven fields. The list columns hold parallel sequences:
/// index `i` of each list describes the same order line.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub customer: CustomerRecord,
    pub product_names: Vec<String>,
    pub product_categories: Vec<String>,
    pub category_descriptions: Vec<String>,
    pub unit_prices: Vec<String>,
    pub quantities: Vec<String>,
    pub order_dates: Vec<String>,
}

/// One element of the product/quantity/date lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine<'a> {
    pub product_name: &'a str,
    pub quantity: &'a str,
    pub order_date: &'a str,
}

impl SalesRecord {
    /// `None` when the row has fewer than eleven fields.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        if row.len() < SALES_MIN_FIELDS {
            return None;
        }
        let customer = CustomerRecord::from_row(row)?;
        let list = |index: usize| -> Vec<String> {
            row.field(index)
                .split(LIST_DELIMITER)
                .map(String::from)
                .collect()
        };
        Some(Self {
            customer,
            product_names: list(PRODUCT_NAMES_FIELD),
            product_categories: list(PRODUCT_CATEGORIES_FIELD),
            category_descriptions: list(CATEGORY_DESCRIPTIONS_FIELD),
            unit_prices: list(UNIT_PRICES_FIELD),
            quantities: list(QUANTITIES_FIELD),
            order_dates: list(ORDER_DATES_FIELD),
        })
    }

    pub fn line(&self) -> usize {
        self.customer.line
    }

    /// `(category, description)` pairs, truncated to the shorter list.
    pub fn category_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.product_categories
            .iter()
            .zip(&self.category_descriptions)
            .map(|(c, d)| (c.as_str(), d.as_str()))
    }

    /// `(name, category, unit price)` triples, truncated to the shortest list.
    pub fn product_triples(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.product_names
            .iter()
            .zip(&self.product_categories)
            .zip(&self.unit_prices)
            .map(|((n, c), p)| (n.as_str(), c.as_str(), p.as_str()))
    }

    /// Order lines zipped from the product, quantity and date lists.
    ///
    /// Lists of unequal length are truncated to the shortest one; trailing
    /// entries of the longer lists are dropped.
    pub fn order_lines(&self) -> impl Iterator<Item = OrderLine<'_>> + '_ {
        self.product_names
            .iter()
            .zip(&self.quantities)
            .zip(&self.order_dates)
            .map(|((p, q), d)| OrderLine {
                product_name: p,
                quantity: q,
                order_date: d,
            })
    }

    /// True when the product, quantity and date lists have the same length.
    pub fn order_lists_aligned(&self) -> bool {
        self.product_names.len() == self.quantities.len()
            && self.quantities.len() == self.order_dates.len()
    }
}

pub fn parse_unit_price(line: usize, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| EtlError::parse(line, "unit price", raw))
}

pub fn parse_quantity(line: usize, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| EtlError::parse(line, "quantity", raw))
}

/// `YYYYMMDD` to `YYYY-MM-DD`. The token must be a real calendar date.
pub fn iso_order_date(line: usize, raw: &str) -> Result<String> {
    let token = raw.trim();
    if !ORDER_DATE_TOKEN.is_match(token) {
        return Err(EtlError::parse(line, "order date", raw));
    }
    NaiveDate::parse_from_str(token, "%Y%m%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| EtlError::parse(line, "order date", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Name\tAddress\tCity\tCountry\tRegion\tProductName\tProductCategory\tProductCategoryDescription\tProductUnitPrice\tQuantityOrderded\tOrderDate";
    const JANE: &str = "Jane A Doe\t1 Main St\tMetropolis\tUSA\tNorthAm\tWidget;Gadget\tCatA;CatB\tDescA;DescB\t9.99;19.99\t2;1\t20230115;20230301";

    fn rows(text: &str) -> Vec<RawRow> {
        ExtractReader::from_reader(Cursor::new(text.to_string()))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_reader_skips_header_and_numbers_lines() {
        let text = format!("{HEADER}\n{JANE}\nshort\tline\n");
        let rows = rows(&text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].len(), 11);
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[1].fields, vec!["short", "line"]);
    }

    #[test]
    fn test_reader_on_empty_and_header_only_input() {
        assert!(rows("").is_empty());
        assert!(rows(HEADER).is_empty());
    }

    #[test]
    fn test_row_is_trimmed_before_splitting() {
        let row = RawRow::parse(2, "  a\tb\tc  \r");
        assert_eq!(row.fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_consumer_thresholds() {
        let four = RawRow::parse(2, "a\tb\tc\td");
        let five = RawRow::parse(3, "Ann Lee\tb\tc\td\te");
        assert!(CustomerRecord::from_row(&four).is_none());
        assert!(CustomerRecord::from_row(&five).is_some());
        assert!(SalesRecord::from_row(&five).is_none());
        assert!(SalesRecord::from_row(&RawRow::parse(4, JANE)).is_some());
    }

    #[test]
    fn test_name_splitting() {
        let jane = PersonName::split("Jane A Doe").unwrap();
        assert_eq!(jane.first, "Jane");
        assert_eq!(jane.last, "A Doe");
        assert_eq!(jane.full(), "Jane A Doe");

        let two = PersonName::split("  Bob   Smith ").unwrap();
        assert_eq!((two.first.as_str(), two.last.as_str()), ("Bob", "Smith"));

        let spaced = PersonName::split("Ana  Maria   Lopez").unwrap();
        assert_eq!(spaced.full(), "Ana Maria Lopez");

        assert!(PersonName::split("Cher").is_none());
        assert!(PersonName::split("   ").is_none());
    }

    #[test]
    fn test_single_token_name_is_parse_error() {
        let record = CustomerRecord::from_row(&RawRow::parse(7, "Cher\ta\tb\tc\td")).unwrap();
        match record.name() {
            Err(EtlError::Parse { line, field, .. }) => {
                assert_eq!(line, 7);
                assert_eq!(field, "customer name");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sales_record_lists() {
        let record = SalesRecord::from_row(&RawRow::parse(2, JANE)).unwrap();
        assert_eq!(record.customer.full_name, "Jane A Doe");
        assert_eq!(record.customer.region, "NorthAm");
        assert!(record.order_lists_aligned());

        let pairs: Vec<_> = record.category_pairs().collect();
        assert_eq!(pairs, vec![("CatA", "DescA"), ("CatB", "DescB")]);

        let triples: Vec<_> = record.product_triples().collect();
        assert_eq!(triples, vec![("Widget", "CatA", "9.99"), ("Gadget", "CatB", "19.99")]);

        let lines: Vec<_> = record.order_lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].product_name, "Gadget");
        assert_eq!(lines[1].quantity, "1");
        assert_eq!(lines[1].order_date, "20230301");
    }

    #[test]
    fn test_order_lines_truncate_to_shortest_list() {
        let row = RawRow::parse(
            2,
            "Jane Doe\ta\tb\tc\td\tP1;P2;P3\tC1;C2;C3\tD1;D2;D3\t1;2;3\t5;6\t20230101;20230102;20230103",
        );
        let record = SalesRecord::from_row(&row).unwrap();
        assert!(!record.order_lists_aligned());

        let lines: Vec<_> = record.order_lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "P1");
        assert_eq!(lines[1].order_date, "20230102");
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(parse_unit_price(2, " 19.99 ").unwrap(), 19.99);
        assert_eq!(parse_quantity(2, "3").unwrap(), 3);
        assert!(matches!(parse_unit_price(2, "abc"), Err(EtlError::Parse { .. })));
        assert!(matches!(parse_quantity(2, "1.5"), Err(EtlError::Parse { .. })));
    }

    #[test]
    fn test_order_date_reformatting() {
        assert_eq!(iso_order_date(2, "20230115").unwrap(), "2023-01-15");
        assert_eq!(iso_order_date(2, "20240229").unwrap(), "2024-02-29");
        assert!(iso_order_date(2, "2023-01-15").is_err());
        assert!(iso_order_date(2, "2023011").is_err());
        assert!(iso_order_date(2, "20230230").is_err());
        assert!(iso_order_date(2, "").is_err());
    }
}
