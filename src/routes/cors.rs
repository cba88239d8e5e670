use axum::http::StatusCode;

use super::FormError;

/// CORS preflight. The allow headers are added to every response by the
/// router, so the reply itself is an empty 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> FormError {
    FormError::MethodNotAllowed
}
