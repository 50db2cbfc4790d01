//! Error handling for the application

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Rewrite constraint violations into a client-facing 400.
    ///
    /// Anything else is passed through untouched.
    pub fn on_conflict(self, msg: impl Into<String>) -> Self {
        match &self {
            AppError::Database(sqlx::Error::Database(db))
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                AppError::BadRequest(msg.into())
            }
            _ => self,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "Record not found".to_string())
            }
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::warn!("Unique violation: {}", db);
                (StatusCode::BAD_REQUEST, "Record already exists".to_string())
            }
            AppError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                tracing::warn!("Foreign key violation: {}", db);
                (
                    StatusCode::BAD_REQUEST,
                    "Record is referenced by other records".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

/// Malformed bodies are 400; well-formed JSON of the wrong shape is 422
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// A database error carrying only a constraint kind
#[cfg(test)]
pub(crate) mod testing {
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::fmt;

    #[derive(Debug, Clone, Copy)]
    pub enum Violation {
        Unique,
        ForeignKey,
    }

    #[derive(Debug)]
    pub struct ConstraintError(pub Violation);

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?} violation", self.0)
        }
    }

    impl std::error::Error for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            match self.0 {
                Violation::Unique => "duplicate key value violates unique constraint",
                Violation::ForeignKey => "update or delete violates foreign key constraint",
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                Violation::Unique => ErrorKind::UniqueViolation,
                Violation::ForeignKey => ErrorKind::ForeignKeyViolation,
            }
        }
    }

    pub fn violation(kind: Violation) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation("x").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_on_conflict_leaves_other_errors() {
        let err = AppError::not_found("Pricing version not found").on_conflict("dup");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_on_conflict_rewrites_constraint_violations() {
        use testing::{violation, Violation};

        let err = AppError::from(violation(Violation::ForeignKey)).on_conflict("in use");
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == "in use"));

        let err = AppError::from(violation(Violation::Unique)).on_conflict("duplicate");
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == "duplicate"));

        let raw = AppError::from(violation(Violation::ForeignKey)).into_response();
        assert_eq!(raw.status(), StatusCode::BAD_REQUEST);
    }
}
