//! HTTP mapping of service errors.

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use tracing::error;

use crate::api::models::ErrorResponse;
use crate::error::WikiError;

impl WikiError {
    /// The message shown to HTTP clients.
    ///
    /// Server-side failures get a fixed message; their cause is only logged.
    pub fn client_detail(&self) -> String {
        match self {
            Self::InvalidQuery => "Invalid SQL query.".to_string(),
            Self::NotSelect(_) => "Only SELECT queries are allowed.".to_string(),
            Self::NotFound { .. } => self.to_string(),
            Self::AddressResolution(_) => "Failed to get database IP address.".to_string(),
            Self::Connection(_) => "Database connection error.".to_string(),
            Self::Query(_) => "Database error.".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error.".to_string(),
        }
    }
}

impl ResponseError for WikiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidQuery | Self::NotSelect(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_client_error() {
            error!("{}: {}", self.category(), self);
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.client_detail()))
    }
}

fn unprocessable(detail: String) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(ErrorResponse::new(detail))
}

/// JSON body extraction failures answer 422 with the reason.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        InternalError::from_response(err, unprocessable(detail)).into()
    })
}

/// Query string extraction failures answer 422 with the reason.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        InternalError::from_response(err, unprocessable(detail)).into()
    })
}
