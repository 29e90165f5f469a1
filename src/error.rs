use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::client::ClientError;
use crate::response::ApiErrorResponse;
use crate::supply::SupplyError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid token parameter: {0}")]
    InvalidTicker(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Token data is incomplete: {0}")]
    InvalidInput(#[from] SupplyError),
    #[error("Token data not found for: {0}")]
    TokenNotFound(String),
    #[error("Failed to fetch token data from upstream API: {0}")]
    UpstreamUnavailable(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal server error")]
    Internal(String),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(ticker) => ApiError::TokenNotFound(ticker),
            ClientError::Unavailable(reason) => ApiError::UpstreamUnavailable(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code: StatusCode = match self {
            ApiError::InvalidTicker(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidInput(_) | ApiError::TokenNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(ref detail) => {
                tracing::error!("Internal error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiErrorResponse::send(status_code.as_u16(), Some(self.to_string()))
    }
}
