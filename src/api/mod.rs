//! HTTP API for the wiki assistant.
//!
//! Two endpoints: `POST /execute-sql` runs a caller-supplied SELECT and
//! `GET /outdated-page` looks up the outdated page of a category.

pub mod error;
pub mod handlers;
pub mod models;

use actix_web::web;

pub use error::{json_config, query_config};
pub use models::{ErrorResponse, ExecuteSqlRequest, OutdatedPageQuery, RowResponse, RowsResponse};

/// Registers the API endpoints and their extractor error handlers.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(handlers::execute_sql)
        .service(handlers::outdated_page);
}
