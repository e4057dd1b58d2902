#![allow(dead_code)]

use anyhow::Result;
use rusqlite::types::Value;
use sales_normalizer::{Pipeline, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "CustomerName\tAddress\tCity\tCountry\tRegion\tProductName\tProductCategory\tProductCategoryDescription\tProductUnitPrice\tQuantityOrdered\tOrderDate";

/// Four customers over two regions. France and Germany tie on 100.
pub const SALES_ROWS: &[&str] = &[
    "Jane A Doe\t1 Main St\tMetropolis\tUSA\tNorthAm\tWidget;Gadget\tCatA;CatB\tDescA;DescB\t9.99;19.99\t2;1\t20230115;20230301",
    "Anna Berg\t5 Ring\tBerlin\tGermany\tEurope\tGear\tCatC\tDescC\t50\t2\t20230210",
    "Louis Martin\t9 Rue\tParis\tFrance\tEurope\tGear;Gear\tCatC;CatC\tDescC;DescC\t50;50\t1;1\t20230105;20230411",
    "Pablo Ruiz\t3 Calle\tMadrid\tSpain\tEurope\tBolt\tCatC\tDescC\t5.25\t2\t20230720",
    "Trailing\tjunk",
];

pub fn write_extract(dir: &Path, rows: &[&str]) -> Result<PathBuf> {
    let path = dir.join("sales.tsv");
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    fs::write(&path, text)?;
    Ok(path)
}

/// Write `rows` to an extract in `dir` and build a fresh store from it.
pub fn build_store(dir: &Path, rows: &[&str]) -> Result<(PathBuf, PipelineResult)> {
    let input = write_extract(dir, rows)?;
    let database = dir.join("normalized.db");
    let result = Pipeline::new(&input, &database).run()?;
    Ok((database, result))
}

pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        other => panic!("not numeric: {other:?}"),
    }
}

pub fn as_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => panic!("not text: {other:?}"),
    }
}

pub fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        other => panic!("not an integer: {other:?}"),
    }
}
