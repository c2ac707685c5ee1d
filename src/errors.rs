//! Errors for trawl tracker
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum TrawlTrackerError {
    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Template error")]
    TemplateError(#[from] minijinja::Error),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Malformed field {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("Invalid location: ({lat}, {lon})")]
    InvalidLocation { lat: f64, lon: f64 },

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Report {0} not found")]
    ReportNotFound(i64),

    #[error("Report {0} has no photo")]
    PhotoNotFound(i64),
}

impl TrawlTrackerError {
    /// HTTP status reported to clients for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedField { .. } | Self::InvalidLocation { .. } | Self::InvalidForm(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ReportNotFound(_) | Self::PhotoNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrawlTrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log
        let body = if status.is_server_error() {
            error!("Request failed: {:?}", self);
            status.canonical_reason().unwrap_or("Error").to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let malformed = TrawlTrackerError::MalformedField {
            field: "date",
            value: "yesterday".to_string(),
        };
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TrawlTrackerError::PhotoNotFound(3).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TrawlTrackerError::DatabaseError(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
