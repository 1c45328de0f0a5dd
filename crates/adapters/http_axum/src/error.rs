//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use glowhub_domain::error::GlowHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`GlowHubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(GlowHubError);

impl From<GlowHubError> for ApiError {
    fn from(err: GlowHubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GlowHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            GlowHubError::InvalidProperty(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            GlowHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            GlowHubError::ShutDown => (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()),
            GlowHubError::Transport(err) => {
                tracing::error!(error = %err, "transport error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use glowhub_domain::error::{NotFoundError, PropertyError, ValidationError};

    use super::*;

    fn status_of(err: GlowHubError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn should_map_validation_to_bad_request() {
        assert_eq!(
            status_of(ValidationError::EmptyName.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn should_map_invalid_property_to_bad_request() {
        assert_eq!(
            status_of(PropertyError::Unknown("hue".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn should_map_not_found_to_404() {
        let err = NotFoundError {
            entity: "Device",
            id: "KL-01".to_string(),
        };
        assert_eq!(status_of(err.into()), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_shutdown_to_503() {
        assert_eq!(
            status_of(GlowHubError::ShutDown),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
