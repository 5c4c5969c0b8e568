use std::any::Any;

use axum::response::{IntoResponse, Response};

use super::AppError;

/// Fallback handler for unknown paths.
pub async fn not_found() -> Response {
    AppError::NotFound("The requested resource was not found".to_string()).into_response()
}

/// Handler for routes hit with an HTTP method they do not serve.
pub async fn method_not_allowed() -> Response {
    AppError::MethodNotAllowed("The HTTP method is not allowed for this resource".to_string())
        .into_response()
}

/// Panic handler for `tower_http::catch_panic::CatchPanicLayer`.
///
/// Turns an unexpected handler panic into a 500 with the standard error body.
/// The panic payload is logged, never returned.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::InternalServerError(format!("handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_not_found_handler() {
        assert_eq!(not_found().await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed_handler() {
        assert_eq!(
            method_not_allowed().await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_handle_panic_returns_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
