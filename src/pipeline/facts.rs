//! OrderDetail fact table builder.

use crate::constants::ORDER_DETAIL_TABLE;
use crate::error::Result;
use crate::extract::{iso_order_date, parse_quantity, ExtractReader, RawRow, SalesRecord};
use crate::metrics::PipelineMetrics;
use crate::pipeline::lookups::{customer_lookup, product_lookup, Lookup};
use crate::pipeline::PhaseReport;
use crate::schema;
use crate::storage::{self, TableRow};
use rusqlite::{params, Statement};
use std::path::Path;
use tracing::{instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetailRow {
    pub order_id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub order_date: String,
    pub quantity: i64,
}

impl TableRow for OrderDetailRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.order_id,
            self.customer_id,
            self.product_id,
            self.order_date,
            self.quantity
        ])
    }
}

/// Fact rows in extract order, plus bookkeeping about rows that were skipped
/// or whose lists had to be truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactScan {
    pub rows: Vec<OrderDetailRow>,
    pub skipped: usize,
    pub misaligned: usize,
}

/// Expand each sales row into one fact row per order line.
///
/// Product, quantity and date lists are zipped; when their lengths differ the
/// extra entries of the longer lists are dropped. Unknown customers or
/// products and unparseable quantities or dates abort the scan.
pub fn collect_order_details<I>(rows: I, customers: &Lookup, products: &Lookup) -> Result<FactScan>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    let mut scan = FactScan {
        rows: Vec::new(),
        skipped: 0,
        misaligned: 0,
    };

    for row in rows {
        let Some(record) = SalesRecord::from_row(&row?) else {
            scan.skipped += 1;
            continue;
        };

        if !record.order_lists_aligned() {
            scan.misaligned += 1;
            warn!(
                line = record.line(),
                products = record.product_names.len(),
                quantities = record.quantities.len(),
                dates = record.order_dates.len(),
                "Order lists differ in length; truncating to the shortest"
            );
        }

        let customer_id = customers.resolve(&record.customer.name()?.full())?;
        for order in record.order_lines() {
            let order_id = scan.rows.len() as i64 + 1;
            scan.rows.push(OrderDetailRow {
                order_id,
                customer_id,
                product_id: products.resolve(order.product_name)?,
                order_date: iso_order_date(record.line(), order.order_date)?,
                quantity: parse_quantity(record.line(), order.quantity)?,
            });
        }
    }

    Ok(scan)
}

#[instrument(skip_all, fields(table = ORDER_DETAIL_TABLE))]
pub fn build_order_detail_table(input: &Path, database: &Path) -> Result<PhaseReport> {
    let mut conn = storage::connect(database, false)?;
    let customers = customer_lookup(&conn)?;
    let products = product_lookup(&conn)?;

    let scan = collect_order_details(ExtractReader::open(input)?, &customers, &products)?;
    PipelineMetrics::record_misaligned_rows(scan.misaligned);

    let inserted = storage::rebuild_table(&mut conn, &schema::ORDER_DETAIL, &scan.rows)?;
    Ok(PhaseReport::new(ORDER_DETAIL_TABLE, inserted, scan.skipped).with_misaligned(scan.misaligned))
}
