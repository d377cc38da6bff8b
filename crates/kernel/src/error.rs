//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::listing::ListError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("listing error")]
    Listing(#[source] ListError),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl From<ListError> for AppError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Database(e) => AppError::Database(e),
            e if e.is_client_error() => AppError::BadRequest(e.to_string()),
            e => AppError::Listing(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Listing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Client errors are echoed; server-side details only go to the log
        let body = match &self {
            AppError::Listing(e) => {
                tracing::error!(error = %e, "listing configuration error");
                "internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_sort_is_a_bad_request() {
        let err = AppError::from(ListError::MalformedSort("x".to_string()));
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_field_is_a_bad_request() {
        let err = AppError::from(ListError::UnknownField(
            "column customer.nonexistent does not exist".to_string(),
        ));
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("nonexistent")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn shaping_errors_are_server_errors() {
        for err in [
            ListError::DerivedFieldEdit("total_price".to_string()),
            ListError::ColumnAlreadyExists("name".to_string()),
        ] {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn storage_errors_pass_through() {
        let err = AppError::from(ListError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }
}
