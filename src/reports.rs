//! Fixed library of analytical reports over the normalized schema.
//!
//! Each report is available as SQL text (`report_sql`) or executed
//! (`run_report`). Customer-level detail and totals round to two decimals;
//! country, quarter and month aggregates round to whole numbers. Rounding is
//! SQLite `ROUND`, which rounds halves away from zero.

use crate::error::{EtlError, Result};
use crate::pipeline::lookups::customer_lookup;
use crate::storage::{self, ResultSet};
use rusqlite::Connection;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    /// Every order line of one customer with its line total
    CustomerOrderDetails,
    /// Lifetime total of one customer
    CustomerTotal,
    CustomerTotals,
    RegionTotals,
    CountryTotals,
    CountryRankWithinRegion,
    TopCountryPerRegion,
    QuarterlyCustomerTotals,
    QuarterlyTopCustomers,
    MonthlyTotals,
    MaxDaysWithoutOrder,
}

impl Report {
    pub const ALL: [Report; 11] = [
        Report::CustomerOrderDetails,
        Report::CustomerTotal,
        Report::CustomerTotals,
        Report::RegionTotals,
        Report::CountryTotals,
        Report::CountryRankWithinRegion,
        Report::TopCountryPerRegion,
        Report::QuarterlyCustomerTotals,
        Report::QuarterlyTopCustomers,
        Report::MonthlyTotals,
        Report::MaxDaysWithoutOrder,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Report::CustomerOrderDetails => "customer-order-details",
            Report::CustomerTotal => "customer-total",
            Report::CustomerTotals => "customer-totals",
            Report::RegionTotals => "region-totals",
            Report::CountryTotals => "country-totals",
            Report::CountryRankWithinRegion => "country-rank-within-region",
            Report::TopCountryPerRegion => "top-country-per-region",
            Report::QuarterlyCustomerTotals => "quarterly-customer-totals",
            Report::QuarterlyTopCustomers => "quarterly-top-customers",
            Report::MonthlyTotals => "monthly-totals",
            Report::MaxDaysWithoutOrder => "max-days-without-order",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Report::CustomerOrderDetails => "Order lines of one customer with rounded line totals",
            Report::CustomerTotal => "Lifetime total of one customer",
            Report::CustomerTotals => "Lifetime totals of all customers, highest first",
            Report::RegionTotals => "Sales per region, highest first",
            Report::CountryTotals => "Sales per country rounded to whole units, highest first",
            Report::CountryRankWithinRegion => "Countries ranked by sales within their region",
            Report::TopCountryPerRegion => "Best selling country of each region",
            Report::QuarterlyCustomerTotals => "Customer sales per quarter and year",
            Report::QuarterlyTopCustomers => "Top five customers of each quarter and year",
            Report::MonthlyTotals => "Sales per calendar month, ranked",
            Report::MaxDaysWithoutOrder => "Longest gap between consecutive orders per customer",
        }
    }

    pub fn needs_customer(&self) -> bool {
        matches!(self, Report::CustomerOrderDetails | Report::CustomerTotal)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
        Report::ALL
            .into_iter()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| EtlError::UnknownReport(name.to_string()))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Report {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Report::from_name(s)
    }
}

/// Maps the month part of an ISO date to a quarter label.
const QUARTER_CASE: &str = r#"
        CASE
            WHEN CAST(SUBSTR(od.OrderDate, 6, 2) AS INTEGER) BETWEEN 1 AND 3 THEN 'Q1'
            WHEN CAST(SUBSTR(od.OrderDate, 6, 2) AS INTEGER) BETWEEN 4 AND 6 THEN 'Q2'
            WHEN CAST(SUBSTR(od.OrderDate, 6, 2) AS INTEGER) BETWEEN 7 AND 9 THEN 'Q3'
            ELSE 'Q4'
        END"#;

const MONTH_CASE: &str = r#"
        CASE SUBSTR(od.OrderDate, 6, 2)
            WHEN '01' THEN 'January'
            WHEN '02' THEN 'February'
            WHEN '03' THEN 'March'
            WHEN '04' THEN 'April'
            WHEN '05' THEN 'May'
            WHEN '06' THEN 'June'
            WHEN '07' THEN 'July'
            WHEN '08' THEN 'August'
            WHEN '09' THEN 'September'
            WHEN '10' THEN 'October'
            WHEN '11' THEN 'November'
            WHEN '12' THEN 'December'
        END"#;

const COUNTRY_REGION_RANKING: &str = r#"
    SELECT r.Region,
           cu.Country,
           ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered)) AS CountryTotal,
           RANK() OVER (
               PARTITION BY r.Region
               ORDER BY SUM(p.ProductUnitPrice * od.QuantityOrdered) DESC
           ) AS CountryRegionalRank
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    JOIN Country cu ON c.CountryID = cu.CountryID
    JOIN Region r ON cu.RegionID = r.RegionID
    GROUP BY r.Region, cu.Country"#;

fn customer_id(conn: &Connection, customer_name: &str) -> Result<i64> {
    customer_lookup(conn)?.resolve(customer_name.trim())
}

/// SQL for every order line of one customer.
pub fn customer_order_details_sql(conn: &Connection, customer_name: &str) -> Result<String> {
    let id = customer_id(conn, customer_name)?;
    Ok(format!(
        r#"
    SELECT c.FirstName || ' ' || c.LastName AS Name,
           p.ProductName,
           od.OrderDate,
           p.ProductUnitPrice,
           od.QuantityOrdered,
           ROUND(p.ProductUnitPrice * od.QuantityOrdered, 2) AS Total
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    WHERE c.CustomerID = {id}
    ORDER BY od.OrderID"#
    ))
}

/// SQL for the lifetime total of one customer.
pub fn customer_total_sql(conn: &Connection, customer_name: &str) -> Result<String> {
    let id = customer_id(conn, customer_name)?;
    Ok(format!(
        r#"
    SELECT c.FirstName || ' ' || c.LastName AS Name,
           ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered), 2) AS Total
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    WHERE c.CustomerID = {id}
    GROUP BY c.CustomerID, c.FirstName, c.LastName"#
    ))
}

pub fn customer_totals_sql() -> String {
    r#"
    SELECT c.FirstName || ' ' || c.LastName AS Name,
           ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered), 2) AS Total
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    GROUP BY c.CustomerID, c.FirstName, c.LastName
    ORDER BY Total DESC, Name"#
        .to_string()
}

pub fn region_totals_sql() -> String {
    r#"
    SELECT r.Region,
           ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered), 2) AS Total
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    JOIN Country cu ON c.CountryID = cu.CountryID
    JOIN Region r ON cu.RegionID = r.RegionID
    GROUP BY r.Region
    ORDER BY Total DESC, r.Region"#
        .to_string()
}

pub fn country_totals_sql() -> String {
    r#"
    SELECT cu.Country,
           ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered)) AS Total
    FROM OrderDetail od
    JOIN Customer c ON od.CustomerID = c.CustomerID
    JOIN Product p ON od.ProductID = p.ProductID
    JOIN Country cu ON c.CountryID = cu.CountryID
    GROUP BY cu.Country
    ORDER BY Total DESC, cu.Country"#
        .to_string()
}

pub fn country_rank_within_region_sql() -> String {
    format!(
        r#"
    WITH RankedCountries AS ({COUNTRY_REGION_RANKING}
    )
    SELECT Region, Country, CountryTotal, CountryRegionalRank AS TotalRank
    FROM RankedCountries
    ORDER BY Region ASC, TotalRank ASC, Country ASC"#
    )
}

pub fn top_country_per_region_sql() -> String {
    format!(
        r#"
    WITH RankedCountries AS ({COUNTRY_REGION_RANKING}
    )
    SELECT Region, Country, CountryTotal, CountryRegionalRank
    FROM RankedCountries
    WHERE CountryRegionalRank = 1
    ORDER BY Region ASC, Country ASC"#
    )
}

fn customer_sales_cte() -> String {
    format!(
        r#"
    CustomerSales AS (
        SELECT {QUARTER_CASE} AS Quarter,
               CAST(SUBSTR(od.OrderDate, 1, 4) AS INTEGER) AS Year,
               od.CustomerID,
               ROUND(SUM(p.ProductUnitPrice * od.QuantityOrdered)) AS Total
        FROM OrderDetail od
        JOIN Product p ON od.ProductID = p.ProductID
        GROUP BY Quarter, Year, od.CustomerID
    )"#
    )
}

pub fn quarterly_customer_totals_sql() -> String {
    format!(
        r#"
    WITH {}
    SELECT Quarter, Year, CustomerID, Total
    FROM CustomerSales
    ORDER BY Year, Quarter, CustomerID"#,
        customer_sales_cte()
    )
}

pub fn quarterly_top_customers_sql() -> String {
    format!(
        r#"
    WITH {},
    RankedSales AS (
        SELECT Quarter, Year, CustomerID, Total,
               RANK() OVER (PARTITION BY Quarter, Year ORDER BY Total DESC) AS CustomerRank
        FROM CustomerSales
    )
    SELECT Quarter, Year, CustomerID, Total, CustomerRank
    FROM RankedSales
    WHERE CustomerRank <= 5
    ORDER BY Year, Quarter, CustomerRank, CustomerID"#,
        customer_sales_cte()
    )
}

/// Line totals are rounded before summing, then the sum is rounded again.
pub fn monthly_totals_sql() -> String {
    format!(
        r#"
    WITH MonthlySales AS (
        SELECT {MONTH_CASE} AS Month,
               SUM(ROUND(p.ProductUnitPrice * od.QuantityOrdered)) AS Total
        FROM Product p
        JOIN OrderDetail od ON od.ProductID = p.ProductID
        GROUP BY Month
    )
    SELECT Month, ROUND(Total) AS Total, RANK() OVER (ORDER BY Total DESC) AS TotalRank
    FROM MonthlySales
    ORDER BY TotalRank, Month"#
    )
}

/// For each customer the largest number of days between two consecutive
/// orders, with the order date that closed the gap. Ties go to the earliest
/// such order date; customers with a single order have no row.
pub fn max_days_without_order_sql() -> String {
    r#"
    WITH CustomerOrders AS (
        SELECT c.CustomerID, c.FirstName, c.LastName, cu.Country, od.OrderDate,
               LAG(od.OrderDate) OVER (PARTITION BY c.CustomerID ORDER BY od.OrderDate) AS PreviousOrderDate
        FROM OrderDetail od
        JOIN Customer c ON od.CustomerID = c.CustomerID
        JOIN Country cu ON c.CountryID = cu.CountryID
    ),
    DaysBetweenOrders AS (
        SELECT CustomerID, FirstName, LastName, Country, OrderDate, PreviousOrderDate,
               JULIANDAY(OrderDate) - JULIANDAY(PreviousOrderDate) AS DaysWithoutOrder
        FROM CustomerOrders
        WHERE PreviousOrderDate IS NOT NULL
    ),
    MaxDays AS (
        SELECT CustomerID, MAX(DaysWithoutOrder) AS MaxDaysWithoutOrder
        FROM DaysBetweenOrders
        GROUP BY CustomerID
    )
    SELECT DISTINCT d.CustomerID, d.FirstName, d.LastName, d.Country,
           d.OrderDate, d.PreviousOrderDate, m.MaxDaysWithoutOrder
    FROM DaysBetweenOrders d
    JOIN MaxDays m
      ON d.CustomerID = m.CustomerID AND d.DaysWithoutOrder = m.MaxDaysWithoutOrder
    WHERE d.OrderDate = (
        SELECT MIN(db.OrderDate)
        FROM DaysBetweenOrders db
        JOIN MaxDays md
          ON db.CustomerID = md.CustomerID AND db.DaysWithoutOrder = md.MaxDaysWithoutOrder
        WHERE db.CustomerID = d.CustomerID
    )
    ORDER BY m.MaxDaysWithoutOrder DESC, d.CustomerID DESC"#
        .to_string()
}

/// SQL text for `report`. Customer reports need `customer`, which is
/// resolved to its CustomerID through the store's Customer table.
pub fn report_sql(conn: &Connection, report: Report, customer: Option<&str>) -> Result<String> {
    let needs = || {
        customer.ok_or_else(|| {
            EtlError::Config(format!("report '{}' needs a customer name", report))
        })
    };
    let sql = match report {
        Report::CustomerOrderDetails => customer_order_details_sql(conn, needs()?)?,
        Report::CustomerTotal => customer_total_sql(conn, needs()?)?,
        Report::CustomerTotals => customer_totals_sql(),
        Report::RegionTotals => region_totals_sql(),
        Report::CountryTotals => country_totals_sql(),
        Report::CountryRankWithinRegion => country_rank_within_region_sql(),
        Report::TopCountryPerRegion => top_country_per_region_sql(),
        Report::QuarterlyCustomerTotals => quarterly_customer_totals_sql(),
        Report::QuarterlyTopCustomers => quarterly_top_customers_sql(),
        Report::MonthlyTotals => monthly_totals_sql(),
        Report::MaxDaysWithoutOrder => max_days_without_order_sql(),
    };
    Ok(sql)
}

/// Build and execute `report` on `conn`.
pub fn run_report(conn: &Connection, report: Report, customer: Option<&str>) -> Result<ResultSet> {
    let sql = report_sql(conn, report, customer)?;
    let result = storage::query(conn, &sql)?;
    debug!(report = %report, rows = result.len(), "Report executed");
    Ok(result)
}
