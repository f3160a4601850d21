//! Endpoint handlers.

use actix_web::{get, post, web, HttpResponse};
use tracing::debug;

use crate::api::models::{ExecuteSqlRequest, OutdatedPageQuery, RowResponse, RowsResponse};
use crate::error::WikiError;
use crate::query::QueryExecutor;

/// POST /execute-sql
///
/// Runs a single SELECT and returns every row.
#[post("/execute-sql")]
pub async fn execute_sql(
    executor: web::Data<QueryExecutor>,
    body: web::Json<ExecuteSqlRequest>,
) -> Result<HttpResponse, WikiError> {
    let request = body.into_inner();
    debug!("execute-sql: {}", request.query);

    let rows = executor.execute_sql(&request.query).await?;
    Ok(HttpResponse::Ok().json(RowsResponse { result: rows }))
}

/// GET /outdated-page?category=...
#[get("/outdated-page")]
pub async fn outdated_page(
    executor: web::Data<QueryExecutor>,
    params: web::Query<OutdatedPageQuery>,
) -> Result<HttpResponse, WikiError> {
    let row = executor.outdated_page(&params.category).await?;
    Ok(HttpResponse::Ok().json(RowResponse { result: row }))
}
