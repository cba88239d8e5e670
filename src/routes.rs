mod contact;
mod cors;
mod health_check;
mod newsletter;

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_macros::FromRequest;
pub use contact::*;
pub use cors::*;
pub use health_check::*;
pub use newsletter::*;

use crate::domain::ValidationErrors;

pub const JSON_UTF8: &str = "application/json; charset=utf-8";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(FormError))]
pub struct AppJson<T>(pub T);

/// Body of every form endpoint reply.
#[derive(serde::Serialize, Debug)]
pub struct FormResponse {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    message: String,
}

impl FormResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for FormResponse {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to serialize a form response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[derive(thiserror::Error)]
pub enum FormError {
    #[error("{}", .0.body_text())]
    Rejected(#[from] JsonRejection),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Too many requests. Please wait a moment before trying again.")]
    RateLimited { retry_after: Duration },
    #[error("Method not allowed. Please use POST.")]
    MethodNotAllowed,
    #[error("An error occurred. Please try again later.")]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Rejected(rejection) => rejection.status(),
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(exception.details = ?self, exception.message = %self);
        } else {
            tracing::info!(exception.message = %self, "Rejected a form request");
        }

        let mut response = FormResponse::failure(status, self.to_string()).into_response();
        if let Self::RateLimited { retry_after } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }
        response
    }
}

fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
