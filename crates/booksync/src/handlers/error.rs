use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use booksync_core::book::BookError;
use booksync_core::storage::{repository_error_to_status_code, RepositoryError};

pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        if self.0.downcast_ref::<BookError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }

        if let Some(repo_error) = self.0.downcast_ref::<RepositoryError>() {
            let code = repository_error_to_status_code(repo_error);
            return StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        }

        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self.0, "Request failed");
        }

        (status_code, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = AppError::from(BookError::EmptyTitle).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_errors_use_status_mapping() {
        let not_found = AppError::from(RepositoryError::NotFound {
            entity_type: "Book",
            id: "X".to_string(),
        });
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let timeout = AppError::from(RepositoryError::Timeout(10_000));
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let response = AppError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
