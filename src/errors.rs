use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use chrono::Datelike;
use sqlx::Error as SqlxError;
use std::env::VarError;
use tera::Context;
use thiserror::Error;

use crate::{structs::FieldErrors, TEMPLATES};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0:?}")]
    Validation(FieldErrors),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient stock. Available quantity: {available}.")]
    InsufficientStock { available: i64 },

    #[error("Import failed: {0}")]
    ImportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Internal server error")]
    InternalServerError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::ImportError(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigError(_)
            | AppError::PasswordError(_)
            | AppError::SessionError(_)
            | AppError::IdentityError(_)
            | AppError::TemplateError(_)
            | AppError::CsvError(_)
            | AppError::InternalServerError
            | AppError::IoError(_)
            | AppError::EnvVarError(_)
            | AppError::DatabaseError(_)
            | AppError::MigrationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::Unauthenticated => HttpResponse::SeeOther()
                .append_header((header::LOCATION, "/login"))
                .finish(),
            AppError::NotFound | AppError::Forbidden => render_error_page(status),
            _ if status.is_server_error() => {
                // Open transactions are rolled back when their guard drops on the error path.
                log::error!("500 Error: {}", self);
                render_error_page(status)
            }
            _ => HttpResponse::build(status)
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
        }
    }
}

/// Renders `errors/<code>.html`, falling back to a plain body if the template fails.
fn render_error_page(status: StatusCode) -> HttpResponse {
    let mut context = Context::new();
    context.insert("year", &chrono::Utc::now().year());
    context.insert("version", env!("CARGO_PKG_VERSION"));

    let template = format!("errors/{}.html", status.as_u16());
    match TEMPLATES.render(&template, &context) {
        Ok(rendered) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(e) => {
            log::error!("Failed to render error page {}: {}", template, e);
            HttpResponse::build(status).body(status.to_string())
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InsufficientStock { available: 2 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DatabaseError(SqlxError::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let resp = AppError::Unauthenticated.error_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[test]
    fn insufficient_stock_message_reports_available_quantity() {
        let err = AppError::InsufficientStock { available: 3 };
        assert_eq!(err.to_string(), "Insufficient stock. Available quantity: 3.");
    }
}
