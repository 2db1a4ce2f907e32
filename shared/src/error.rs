use crate::http::json_response;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

/// Failures reported to the caller
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    /// Identity provider rejected both call shapes
    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Unexpected(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Provider(_) | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let message = self.to_string();
        json_response(self.status(), &ErrorResponse { error: &message })
    }
}

/// Error returned by an identity-provider or caller-resolution call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{message}")]
    Rejected { code: Option<String>, message: String },

    #[error("identity provider returned no user")]
    MissingUser,
}

impl ProviderError {
    pub fn rejected(code: Option<&str>, message: impl Into<String>) -> Self {
        ProviderError::Rejected {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Provider error code, such as `UsernameExistsException`
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Rejected { code, .. } => code.as_deref(),
            ProviderError::MissingUser => None,
        }
    }
}

/// Error returned by the profile store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("profile store request failed: {0}")]
    Request(String),

    #[error("profile for {0} does not exist")]
    NotFound(String),
}
