use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use rusqlite::types::Value;
use sales_normalizer::config::Config;
use sales_normalizer::logging::init_logging;
use sales_normalizer::query::{run_query, QueryResponse};
use sales_normalizer::reports::{run_report, Report};
use sales_normalizer::storage::{self, ResultSet};
use sales_normalizer::{metrics, server, Pipeline};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sales_normalizer")]
#[command(about = "Normalize a flat sales extract into SQLite and run reports over it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every table from the sales extract
    Build {
        /// Tab-separated extract with a header line
        #[arg(long)]
        input: Option<PathBuf>,
        /// SQLite store to write
        #[arg(long)]
        database: Option<PathBuf>,
        /// Replace tables in place instead of deleting the store first
        #[arg(long)]
        keep_existing: bool,
    },
    /// Run one named report
    Report {
        name: String,
        /// Customer full name, for the per-customer reports
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// List the available reports
    Reports,
    /// Execute a read-only SQL statement
    Query {
        sql: String,
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Serve queries and reports over HTTP
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn print_result(result: &ResultSet) {
    println!("{}", result.columns.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(format_value).collect();
        println!("{}", cells.join("\t"));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Build {
            input,
            database,
            keep_existing,
        } => {
            let pipeline = Pipeline::new(
                input.unwrap_or_else(|| config.pipeline.input_path.clone()),
                database.unwrap_or_else(|| config.pipeline.database_path.clone()),
            )
            .with_reset(config.pipeline.reset_store && !keep_existing);

            let result = tokio::task::spawn_blocking(move || pipeline.run())
                .await?
                .map_err(|e| {
                    error!("Pipeline failed: {}", e);
                    e
                })?;

            for phase in &result.phases {
                println!(
                    "{}\t{} rows\t{} skipped\t{} misaligned",
                    phase.table, phase.rows, phase.skipped, phase.misaligned
                );
            }
            println!(
                "Loaded {} rows in {:.2}s",
                result.total_rows(),
                result.duration_secs
            );
        }
        Commands::Report {
            name,
            customer,
            database,
        } => {
            let report = Report::from_name(&name)?;
            let db = database.unwrap_or_else(|| config.pipeline.database_path.clone());
            let conn = storage::connect_read_only(&db)
                .with_context(|| format!("opening {}", db.display()))?;
            let result = run_report(&conn, report, customer.as_deref())?;
            print_result(&result);
        }
        Commands::Reports => {
            for report in Report::ALL {
                let marker = if report.needs_customer() { " (--customer)" } else { "" };
                println!("{}{}\t{}", report.name(), marker, report.description());
            }
        }
        Commands::Query { sql, database } => {
            let db = database.unwrap_or_else(|| config.pipeline.database_path.clone());
            match run_query(&db, &sql) {
                QueryResponse::Ok { columns, rows } => {
                    println!("{}", columns.join("\t"));
                    for row in rows {
                        let cells: Vec<String> = row
                            .iter()
                            .map(|v| match v {
                                serde_json::Value::String(s) => s.clone(),
                                serde_json::Value::Null => String::new(),
                                other => other.to_string(),
                            })
                            .collect();
                        println!("{}", cells.join("\t"));
                    }
                }
                QueryResponse::Error { message } => anyhow::bail!(message),
            }
        }
        Commands::Serve { port, database } => {
            metrics::init_metrics();
            let db = match database {
                Some(db) => db,
                None => config.server.store_path(&config.pipeline.database_path)?,
            };
            let port = port.unwrap_or(config.server.port);
            info!(database = %db.display(), port, "Starting query server");
            server::start_server(db, port).await?;
        }
    }

    Ok(())
}
