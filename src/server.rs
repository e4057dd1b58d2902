use crate::query::{run_query, QueryRequest, QueryResponse};
use crate::reports::{run_report, Report};
use crate::storage;
use axum::{
    extract::{Path as UrlPath, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Location of the store every request reads from
#[derive(Debug, Clone)]
struct StorePath(Arc<PathBuf>);

#[derive(Debug, Deserialize)]
struct ReportParams {
    customer: Option<String>,
}

fn status_for(response: &QueryResponse) -> StatusCode {
    if response.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sales-normalizer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn query_handler(
    Extension(StorePath(db)): Extension<StorePath>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let response = tokio::task::spawn_blocking(move || run_query(&db, &request.sql))
        .await
        .unwrap_or_else(|e| QueryResponse::error(e.to_string()));
    (status_for(&response), Json(response))
}

async fn list_reports() -> impl IntoResponse {
    let reports: Vec<_> = Report::ALL
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name(),
                "description": r.description(),
                "needs_customer": r.needs_customer(),
            })
        })
        .collect();
    Json(reports)
}

async fn report_handler(
    Extension(StorePath(db)): Extension<StorePath>,
    UrlPath(name): UrlPath<String>,
    Query(params): Query<ReportParams>,
) -> impl IntoResponse {
    let report = match Report::from_name(&name) {
        Ok(report) => report,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(QueryResponse::error(e.to_string())),
            )
        }
    };

    let response = tokio::task::spawn_blocking(move || {
        let result = storage::connect_read_only(db.as_path())
            .and_then(|conn| run_report(&conn, report, params.customer.as_deref()));
        QueryResponse::from(result)
    })
    .await
    .unwrap_or_else(|e| QueryResponse::error(e.to_string()));
    (status_for(&response), Json(response))
}

async fn metrics_handler() -> impl IntoResponse {
    match crate::metrics::render() {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Create the HTTP router serving queries and reports from the store at `db`
pub fn create_server(db: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query_handler))
        .route("/reports", get(list_reports))
        .route("/reports/:name", get(report_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(StorePath(Arc::new(db))))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(db: PathBuf, port: u16) -> anyhow::Result<()> {
    let app = create_server(db);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Health check: http://localhost:{port}/health");
    info!("Query endpoint: POST http://localhost:{port}/query");

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
