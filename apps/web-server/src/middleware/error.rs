//! Error handling - failures rendered as HTML error pages.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType};
use tera::Context;
use thiserror::Error;

use yatube_core::error::{DomainError, RepoError};
use yatube_core::ports::{AuthError, StorageError};

use crate::templates;

/// Shown in place of storage-level constraint details.
pub const CONFLICTING_DATA: &str = "Данные не могут быть сохранены.";

/// Application-level error type that renders the matching error page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut context = Context::new();
        let template = match self {
            AppError::NotFound(detail) => {
                tracing::debug!("Not found: {}", detail);
                "core/404.html"
            }
            AppError::BadRequest(detail) => {
                context.insert("detail", detail);
                "core/400.html"
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "core/500.html"
            }
        };

        let body = match templates::render(template, &context) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(template, error = %e, "Failed to render error page");
                self.status_code().to_string()
            }
        };

        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(body)
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("{} '{}' not found", entity_type, key))
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => {
                tracing::warn!("Constraint violation: {}", msg);
                AppError::BadRequest(CONFLICTING_DATA.to_string())
            }
            RepoError::Connection(msg) => {
                AppError::Internal(format!("Database connection error: {}", msg))
            }
            RepoError::Query(msg) => AppError::Internal(format!("Database query error: {}", msg)),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(path) => AppError::NotFound(path),
            StorageError::Io(e) => AppError::Internal(format!("Media storage error: {}", e)),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::Internal(format!("Template error: {:?}", err))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_not_found_renders_custom_page() {
        let response = AppError::from(DomainError::not_found("Group", "general")).error_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body()).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains("data-template=\"core/404.html\""));
    }

    #[actix_rt::test]
    async fn test_database_errors_render_server_error() {
        let response = AppError::from(RepoError::Query("boom".to_string())).error_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body()).await.unwrap();
        assert!(!std::str::from_utf8(&body).unwrap().contains("boom"));
    }

    #[actix_rt::test]
    async fn test_constraint_details_stay_hidden() {
        let error = AppError::from(RepoError::Constraint("author 3 does not exist".to_string()));
        let response = error.error_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body()).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains(CONFLICTING_DATA));
        assert!(!body.contains("author 3"));
    }

    #[test]
    fn test_repo_not_found_maps_to_404() {
        assert_eq!(
            AppError::from(RepoError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StorageError::InvalidPath("../x".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
